//! ACL membership testing against a named ACL declaration.

use crate::ast::AclDecl;
use crate::ip::{matches_prefix, parse_ip};

/// `ip ~ acl_name` is true iff `ip` matches any entry in `acl`.
/// Entries with no prefix length require exact string equality (after
/// canonicalizing to the bit representation); malformed input on
/// either side is treated as "no match" for that entry.
pub fn test_membership(acl: &AclDecl, ip: &str) -> bool {
    let candidate = match parse_ip(ip) {
        Some(c) => c,
        None => return false,
    };

    acl.entries.iter().any(|entry| {
        let base = match parse_ip(&entry.ip) {
            Some(b) => b,
            None => return false,
        };
        match entry.prefix_len {
            Some(len) => matches_prefix(&candidate, &base, len as usize),
            None => candidate == base,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AclDecl;

    #[test]
    fn exact_entry_requires_equality() {
        let acl = AclDecl::new("t").with_entry("10.0.0.1", None);
        assert!(test_membership(&acl, "10.0.0.1"));
        assert!(!test_membership(&acl, "10.0.0.2"));
    }

    #[test]
    fn prefixed_entry_matches_cidr_block() {
        let acl = AclDecl::new("t").with_entry("10.0.0.0", Some(8));
        assert!(test_membership(&acl, "10.1.2.3"));
        assert!(!test_membership(&acl, "11.0.0.0"));
    }

    #[test]
    fn malformed_query_ip_is_false() {
        let acl = AclDecl::new("t").with_entry("10.0.0.0", Some(8));
        assert!(!test_membership(&acl, "not-an-ip"));
    }

    #[test]
    fn ipv6_acl_block() {
        let acl = AclDecl::new("v6").with_entry("2001:db8::", Some(32));
        assert!(test_membership(&acl, "2001:db8::1"));
        assert!(!test_membership(&acl, "2001:db9::"));
    }
}
