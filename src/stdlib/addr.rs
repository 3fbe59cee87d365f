//! `addr.*`: address family predicates and bit extraction.

use crate::context::Context;
use crate::error::EngineError;
use crate::ip::{parse_ip, IpFamily};
use crate::value::Value;

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let addr = args.first().map(Value::as_string).unwrap_or_default();

    let v = match func {
        "is_ipv4" => Value::Bool(matches!(parse_ip(&addr), Some(p) if p.family == IpFamily::V4)),
        "is_ipv6" => Value::Bool(matches!(parse_ip(&addr), Some(p) if p.family == IpFamily::V6)),
        "is_unix" => Value::Bool(addr.starts_with('/')),
        "extract_bits" => {
            let start = args.get(1).map(Value::as_i64).unwrap_or(0) as u32;
            let len = args.get(2).map(Value::as_i64).unwrap_or(0) as u32;
            match parse_ip(&addr) {
                Some(parsed) => Value::Integer(extract_bits(&parsed.bits, start, len)),
                None => Value::Integer(0),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn extract_bits(bits: &str, start: u32, len: u32) -> i64 {
    let chars: Vec<char> = bits.chars().collect();
    let mut value: i64 = 0;
    for i in 0..len {
        let idx = (start + i) as usize;
        value <<= 1;
        if chars.get(idx) == Some(&'1') {
            value |= 1;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ipv4_vs_ipv6() {
        let mut ctx = Context::new();
        assert!(dispatch("is_ipv4", &[Value::string("192.168.1.1")], &mut ctx).unwrap().unwrap().as_bool());
        assert!(!dispatch("is_ipv4", &[Value::string("::1")], &mut ctx).unwrap().unwrap().as_bool());
        assert!(dispatch("is_ipv6", &[Value::string("::1")], &mut ctx).unwrap().unwrap().as_bool());
    }

    #[test]
    fn is_unix_checks_leading_slash() {
        let mut ctx = Context::new();
        assert!(dispatch("is_unix", &[Value::string("/var/run/sock")], &mut ctx).unwrap().unwrap().as_bool());
    }
}
