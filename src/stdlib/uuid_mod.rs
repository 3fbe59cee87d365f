//! `uuid.*`: generation and validation.

use uuid::Uuid;

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

fn namespace_uuid(name: &str) -> Uuid {
    match name {
        "dns" => Uuid::NAMESPACE_DNS,
        "url" => Uuid::NAMESPACE_URL,
        "oid" => Uuid::NAMESPACE_OID,
        "x500" => Uuid::NAMESPACE_X500,
        _ => Uuid::NAMESPACE_DNS,
    }
}

pub fn dispatch(func: &str, args: &[Value], _ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    let v = match func {
        "version4" => Value::String(Uuid::new_v4().to_string()),
        "version7" => Value::String(Uuid::now_v7().to_string()),
        "version3" => {
            let ns = namespace_uuid(&args.first().map(Value::as_string).unwrap_or_default());
            let name = args.get(1).map(Value::as_string).unwrap_or_default();
            Value::String(Uuid::new_v3(&ns, name.as_bytes()).to_string())
        }
        "version5" => {
            let ns = namespace_uuid(&args.first().map(Value::as_string).unwrap_or_default());
            let name = args.get(1).map(Value::as_string).unwrap_or_default();
            Value::String(Uuid::new_v5(&ns, name.as_bytes()).to_string())
        }
        "dns" => Value::String(Uuid::NAMESPACE_DNS.to_string()),
        "url" => Value::String(Uuid::NAMESPACE_URL.to_string()),
        "oid" => Value::String(Uuid::NAMESPACE_OID.to_string()),
        "x500" => Value::String(Uuid::NAMESPACE_X500.to_string()),
        "is_valid" => {
            let s = args.first().map(Value::as_string).unwrap_or_default();
            Value::Bool(Uuid::parse_str(&s).is_ok())
        }
        "is_version3" => is_version(args, 3),
        "is_version4" => is_version(args, 4),
        "is_version5" => is_version(args, 5),
        "is_version7" => is_version(args, 7),
        "encode" => {
            let s = args.first().map(Value::as_string).unwrap_or_default();
            match Uuid::parse_str(&s) {
                Ok(u) => Value::String(hex::encode(u.as_bytes())),
                Err(_) => Value::Null,
            }
        }
        "decode" => {
            let s = args.first().map(Value::as_string).unwrap_or_default();
            match hex::decode(&s).ok().and_then(|bytes| Uuid::from_slice(&bytes).ok()) {
                Some(u) => Value::String(u.to_string()),
                None => Value::Null,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(v))
}

fn is_version(args: &[Value], version: usize) -> Value {
    let s = args.first().map(Value::as_string).unwrap_or_default();
    Value::Bool(
        Uuid::parse_str(&s)
            .map(|u| u.get_version_num() == version)
            .unwrap_or(false),
    )
}
