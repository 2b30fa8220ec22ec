use std::net::IpAddr;

/// Parses `network/prefix` notation, rejecting prefixes longer than the
/// address family allows.
pub fn parse_cidr(cidr: &str) -> Option<(IpAddr, u8)> {
    let (network, prefix_len) = cidr.trim().split_once('/')?;
    let prefix_len: u8 = prefix_len.parse().ok()?;
    let network: IpAddr = network.parse().ok()?;

    let max = match network {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    (prefix_len <= max).then_some((network, prefix_len))
}

/// Reports whether `ip` lies inside `cidr`. Malformed ranges and mixed
/// address families never match.
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = parse_cidr(cidr) else {
        return false;
    };

    match (ip, network) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u32::from_be_bytes(ip.octets());
            let net_bits = u32::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u128::from_be_bytes(ip.octets());
            let net_bits = u128::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(value: &str) -> IpAddr {
        value.parse().unwrap()
    }

    #[test]
    fn v4_ranges() {
        assert!(ip_in_cidr(&ip("192.168.1.42"), "192.168.1.0/24"));
        assert!(!ip_in_cidr(&ip("192.168.2.1"), "192.168.1.0/24"));
        assert!(ip_in_cidr(&ip("10.1.2.3"), "0.0.0.0/0"));
        assert!(ip_in_cidr(&ip("10.1.2.3"), "10.1.2.3/32"));
    }

    #[test]
    fn v6_ranges() {
        assert!(ip_in_cidr(&ip("fd00::1"), "fd00::/8"));
        assert!(!ip_in_cidr(&ip("fe80::1"), "fd00::/8"));
    }

    #[test]
    fn mixed_families_and_malformed_ranges_never_match() {
        assert!(!ip_in_cidr(&ip("::1"), "127.0.0.0/8"));
        assert!(!ip_in_cidr(&ip("127.0.0.1"), "127.0.0.0"));
        assert!(!ip_in_cidr(&ip("127.0.0.1"), "127.0.0.0/33"));
        assert!(!ip_in_cidr(&ip("127.0.0.1"), "localhost/8"));
    }

    #[test]
    fn parse_cidr_checks_prefix_length() {
        assert_eq!(parse_cidr("10.0.0.0/8"), Some((ip("10.0.0.0"), 8)));
        assert_eq!(parse_cidr("::/129"), None);
    }
}
