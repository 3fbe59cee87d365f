//! `digest.*`: hashing, HMAC, base64 variants, constant-time compare.

use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_md5(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Md5>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// AWS SigV4 signing-key derivation chain: date -> region -> service ->
/// `"aws4_request"`, each step an HMAC-SHA256 keyed by the previous
/// step's output, per AWS's documented algorithm. The final signature
/// is HMAC-SHA256(derived_key, string_to_sign).
fn awsv4_signing_key(secret_key: &[u8], date_stamp: &[u8], region: &[u8], service: &[u8]) -> Vec<u8> {
    let mut date_key = b"AWS4".to_vec();
    date_key.extend_from_slice(secret_key);
    let k_date = hmac_sha256(&date_key, date_stamp);
    let k_region = hmac_sha256(&k_date, region);
    let k_service = hmac_sha256(&k_region, service);
    hmac_sha256(&k_service, b"aws4_request")
}

fn awsv4_signature(secret_key: &[u8], date_stamp: &[u8], region: &[u8], service: &[u8], string_to_sign: &[u8]) -> Vec<u8> {
    let signing_key = awsv4_signing_key(secret_key, date_stamp, region, service);
    hmac_sha256(&signing_key, string_to_sign)
}

/// Constant-time equality check, per §8 property 5: `secure_is_equal(a, a)`
/// is always true, and comparison time does not depend on *where* a
/// mismatch occurs for equal-length inputs.
fn secure_is_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

pub fn dispatch(
    func: &str,
    args: &[Value],
    _ctx: &mut Context,
) -> Result<Option<Value>, EngineError> {
    let s = |i: usize| args.get(i).map(Value::as_string).unwrap_or_default();

    Ok(Some(match func {
        "hash_md5" => Value::String(md5_hex(s(0).as_bytes())),
        "hash_sha1" => Value::String(sha1_hex(s(0).as_bytes())),
        "hash_sha256" => Value::String(sha256_hex(s(0).as_bytes())),
        "hash_sha512" => Value::String(sha512_hex(s(0).as_bytes())),
        "hash_xxh32" => Value::String(format!("{:08x}", xxhash_rust::xxh32::xxh32(s(0).as_bytes(), 0))),
        "hash_xxh64" => Value::String(format!("{:016x}", xxhash_rust::xxh64::xxh64(s(0).as_bytes(), 0))),
        "hash_crc32" => Value::String(format!("{:08x}", crc32fast::hash(s(0).as_bytes()))),
        "hash_crc32b" => Value::String(format!("{:08X}", crc32fast::hash(s(0).as_bytes()))),
        "hmac_md5" => Value::String(hex::encode(hmac_md5(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_md5_base64" => Value::String(STANDARD.encode(hmac_md5(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_sha1" => Value::String(hex::encode(hmac_sha1(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_sha1_base64" => Value::String(STANDARD.encode(hmac_sha1(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_sha256" => Value::String(hex::encode(hmac_sha256(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_sha256_base64" => Value::String(STANDARD.encode(hmac_sha256(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_sha512" => Value::String(hex::encode(hmac_sha512(s(0).as_bytes(), s(1).as_bytes()))),
        "hmac_sha512_base64" => Value::String(STANDARD.encode(hmac_sha512(s(0).as_bytes(), s(1).as_bytes()))),
        "base64" => Value::String(STANDARD.encode(s(0).as_bytes())),
        "base64_decode" => decode_base64(&STANDARD, &s(0)),
        "base64url" => Value::String(URL_SAFE.encode(s(0).as_bytes())),
        "base64url_decode" => decode_base64(&URL_SAFE, &s(0)),
        "base64url_nopad" => Value::String(URL_SAFE_NO_PAD.encode(s(0).as_bytes())),
        "base64url_nopad_decode" => decode_base64(&URL_SAFE_NO_PAD, &s(0)),
        "secure_is_equal" => Value::Bool(secure_is_equal(&s(0), &s(1))),
        // awsv4_hmac(secret_key, date_stamp, region, service, string_to_sign)
        "awsv4_hmac" => Value::String(hex::encode(awsv4_signature(
            s(0).as_bytes(),
            s(1).as_bytes(),
            s(2).as_bytes(),
            s(3).as_bytes(),
            s(4).as_bytes(),
        ))),
        _ => return Ok(None),
    }))
}

fn decode_base64(engine: &impl base64::Engine, input: &str) -> Value {
    match engine.decode(input.as_bytes()) {
        Ok(bytes) => Value::String(String::from_utf8_lossy(&bytes).to_string()),
        Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_is_equal_reflexive() {
        assert!(secure_is_equal("hello world", "hello world"));
        assert!(!secure_is_equal("hello", "world"));
        assert!(!secure_is_equal("short", "longer-string"));
    }

    #[test]
    fn md5_matches_known_vector() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn hmac_variants_round_trip_through_dispatch() {
        let mut ctx = Context::new();
        for (func, base64_func) in [
            ("hmac_md5", "hmac_md5_base64"),
            ("hmac_sha1", "hmac_sha1_base64"),
            ("hmac_sha256", "hmac_sha256_base64"),
            ("hmac_sha512", "hmac_sha512_base64"),
        ] {
            let args = [Value::string("key"), Value::string("the quick brown fox")];
            let hex_result = dispatch(func, &args, &mut ctx).unwrap().unwrap().as_string();
            let b64_result = dispatch(base64_func, &args, &mut ctx).unwrap().unwrap().as_string();
            assert!(!hex_result.is_empty());
            assert_eq!(STANDARD.decode(b64_result).unwrap(), hex::decode(hex_result).unwrap());
        }
    }

    #[test]
    fn awsv4_signing_key_matches_aws_documented_example() {
        // From AWS's own "Examples of how to derive a signing key"
        // documentation for Signature Version 4.
        let key = awsv4_signing_key(
            b"wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            b"20150830",
            b"us-east-1",
            b"iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b"
        );
    }

    #[test]
    fn awsv4_signature_is_hmac_of_signing_key_over_string_to_sign() {
        let signing_key = awsv4_signing_key(b"secret", b"20150830", b"us-east-1", b"iam");
        let expected = hmac_sha256(&signing_key, b"string-to-sign");
        let actual = awsv4_signature(b"secret", b"20150830", b"us-east-1", b"iam", b"string-to-sign");
        assert_eq!(actual, expected);
    }

    #[test]
    fn base64_round_trips() {
        let mut ctx = Context::new();
        let encoded = dispatch("base64", &[Value::string("hi")], &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(encoded.as_string(), "aGk=");
        let decoded = dispatch("base64_decode", &[encoded], &mut ctx).unwrap().unwrap();
        assert_eq!(decoded.as_string(), "hi");
    }
}
