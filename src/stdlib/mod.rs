//! VCL standard library: prefix-dispatched built-in functions (§6.2).
//!
//! Each submodule owns one dotted-path prefix (`digest.*`, `math.*`, ...)
//! and exposes `dispatch(suffix, args, ctx) -> Result<Option<Value>, EngineError>`,
//! returning `Ok(None)` for a suffix it does not recognize so the
//! caller can report an `unknown_function` diagnostic rather than
//! silently returning null for a typo.

pub mod accept;
pub mod addr;
pub mod bin;
pub mod digest;
pub mod free;
pub mod header_mod;
pub mod math_mod;
pub mod querystring;
pub mod ratelimit;
pub mod setcookie;
pub mod std_mod;
pub mod table_mod;
pub mod time_mod;
pub mod uuid_mod;

use crate::context::Context;
use crate::error::EngineError;
use crate::value::Value;

/// Route a VCL function call by its dotted name to the owning
/// submodule, or to the free-function table when it carries no
/// registered prefix (or its prefix is itself part of the full name,
/// e.g. `fastly.hash`, `boltsort.sort`, `h2.push`).
pub fn dispatch(name: &str, args: &[Value], ctx: &mut Context) -> Result<Option<Value>, EngineError> {
    if let Some((prefix, suffix)) = name.split_once('.') {
        let routed = match prefix {
            "std" => std_mod::dispatch(suffix, args, ctx)?,
            "digest" => digest::dispatch(suffix, args, ctx)?,
            "math" => math_mod::dispatch(suffix, args, ctx)?,
            "table" => table_mod::dispatch(suffix, args, ctx)?,
            "header" => header_mod::dispatch(suffix, args, ctx)?,
            "time" => time_mod::dispatch(suffix, args, ctx)?,
            "querystring" => querystring::dispatch(suffix, args, ctx)?,
            "uuid" => uuid_mod::dispatch(suffix, args, ctx)?,
            "addr" => addr::dispatch(suffix, args, ctx)?,
            "accept" => accept::dispatch(suffix, args, ctx)?,
            "bin" => bin::dispatch(suffix, args, ctx)?,
            "ratelimit" => ratelimit::dispatch(suffix, args, ctx)?,
            "setcookie" => setcookie::dispatch(suffix, args, ctx)?,
            _ => None,
        };
        if let Some(value) = routed {
            return Ok(Some(value));
        }
    }
    free::dispatch(name, args, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_prefixed_call_to_its_submodule() {
        let mut ctx = Context::new();
        let result = dispatch("digest.hash_md5", &[Value::string("")], &mut ctx).unwrap().unwrap();
        assert_eq!(result.as_string(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn routes_dotted_free_function_by_full_name() {
        let mut ctx = Context::new();
        let result = dispatch("fastly.hash", &[Value::string("x")], &mut ctx).unwrap().unwrap();
        assert!(!result.as_string().is_empty());
    }

    #[test]
    fn routes_unprefixed_free_function() {
        let mut ctx = Context::new();
        let result = dispatch("substr", &[Value::string("hello"), Value::Integer(1), Value::Integer(3)], &mut ctx)
            .unwrap()
            .unwrap();
        assert_eq!(result.as_string(), "ell");
    }

    #[test]
    fn unknown_function_name_is_none() {
        let mut ctx = Context::new();
        assert!(dispatch("totally.unknown.thing", &[], &mut ctx).unwrap().is_none());
    }
}
