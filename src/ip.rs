//! IPv4/IPv6 parsing, normalization and CIDR prefix arithmetic.
//!
//! Both address families are reduced to a fixed-width bit string (32
//! bits for IPv4, 128 for IPv6) so that prefix comparison is a single
//! slice comparison regardless of family.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    V4,
    V6,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIp {
    pub family: IpFamily,
    /// One bit per char, '0'/'1', MSB-first. Length 32 or 128.
    pub bits: String,
}

/// Parse a dotted-quad or colon-hex address into its fixed-width bit
/// representation. Returns `None` on malformed input.
pub fn parse_ip(addr: &str) -> Option<ParsedIp> {
    let addr = addr.trim();
    if addr.contains(':') {
        parse_ipv6(addr).map(|bits| ParsedIp {
            family: IpFamily::V6,
            bits,
        })
    } else {
        parse_ipv4(addr).map(|bits| ParsedIp {
            family: IpFamily::V4,
            bits,
        })
    }
}

fn parse_ipv4(addr: &str) -> Option<String> {
    let parts: Vec<&str> = addr.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut bits = String::with_capacity(32);
    for part in parts {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let octet: u16 = part.parse().ok()?;
        if octet > 255 {
            return None;
        }
        bits.push_str(&format!("{:08b}", octet));
    }
    Some(bits)
}

/// IPv6 normalization per §4.4: a `::` may appear at most once; expand
/// it to fill to exactly 8 hextets; each hextet is padded to 4 hex
/// digits; conversion to binary concatenates per-hextet 16-bit
/// representations.
fn parse_ipv6(addr: &str) -> Option<String> {
    let double_colon_count = addr.matches("::").count();
    if double_colon_count > 1 {
        return None;
    }

    let hextets: Vec<String> = if double_colon_count == 1 {
        let mut halves = addr.splitn(2, "::");
        let left = halves.next().unwrap_or("");
        let right = halves.next().unwrap_or("");

        let left_groups: Vec<&str> = if left.is_empty() {
            Vec::new()
        } else {
            left.split(':').collect()
        };
        let right_groups: Vec<&str> = if right.is_empty() {
            Vec::new()
        } else {
            right.split(':').collect()
        };

        // Support an embedded IPv4-mapped tail, e.g. ::ffff:1.2.3.4
        let right_groups = expand_ipv4_tail(&right_groups)?;

        let missing = 8usize
            .checked_sub(left_groups.len() + right_groups.len())?;
        let mut all = Vec::with_capacity(8);
        all.extend(left_groups.iter().map(|s| s.to_string()));
        all.extend(std::iter::repeat("0".to_string()).take(missing));
        all.extend(right_groups.iter().map(|s| s.to_string()));
        all
    } else {
        let groups: Vec<&str> = addr.split(':').collect();
        let groups = expand_ipv4_tail(&groups)?;
        groups.iter().map(|s| s.to_string()).collect()
    };

    if hextets.len() != 8 {
        return None;
    }

    let mut bits = String::with_capacity(128);
    for hextet in &hextets {
        if hextet.is_empty() || hextet.len() > 4 || !hextet.chars().all(|c| c.is_ascii_hexdigit())
        {
            return None;
        }
        let value = u16::from_str_radix(hextet, 16).ok()?;
        bits.push_str(&format!("{:016b}", value));
    }
    Some(bits)
}

/// If the last one or two groups form a dotted-quad IPv4 tail (as in
/// `::ffff:192.0.2.1`), replace them with their two 16-bit hextet
/// equivalents.
fn expand_ipv4_tail<'a>(groups: &[&'a str]) -> Option<Vec<String>> {
    if let Some(last) = groups.last() {
        if last.contains('.') {
            let v4_bits = parse_ipv4(last)?;
            let hi = u16::from_str_radix(&v4_bits[0..16], 2).ok()?;
            let lo = u16::from_str_radix(&v4_bits[16..32], 2).ok()?;
            let mut out: Vec<String> = groups[..groups.len() - 1]
                .iter()
                .map(|s| s.to_string())
                .collect();
            out.push(format!("{:x}", hi));
            out.push(format!("{:x}", lo));
            return Some(out);
        }
    }
    Some(groups.iter().map(|s| s.to_string()).collect())
}

/// Test whether `candidate` falls within `base/prefix_len`.
///
/// A family mismatch between candidate and base always yields `false`
/// (never a match) per §4.4 — this is why IPv4-mapped IPv6 addresses
/// are matched as IPv6 entries only.
pub fn matches_prefix(candidate: &ParsedIp, base: &ParsedIp, prefix_len: usize) -> bool {
    if candidate.family != base.family {
        return false;
    }
    let max_len = match base.family {
        IpFamily::V4 => 32,
        IpFamily::V6 => 128,
    };
    if prefix_len > max_len {
        return false;
    }
    candidate.bits[..prefix_len] == base.bits[..prefix_len]
}
