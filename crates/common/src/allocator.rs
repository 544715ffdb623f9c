//! Host address allocation over a CIDR block
//!
//! Addresses are handed out lowest-first in ascending numeric order. IPv4
//! networks skip the network and broadcast addresses, IPv6 networks skip only
//! the network address. Point-to-point prefixes (/31, /127) use both
//! addresses and single-host prefixes (/32, /128) use the one address.

use crate::{Error, Result};
use ipnetwork::IpNetwork;
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::warn;

/// Parse a network prefix. Host bits must be zero.
pub fn parse_cidr(cidr: &str) -> Result<IpNetwork> {
    let network: IpNetwork = cidr
        .trim()
        .parse()
        .map_err(|_| Error::InvalidCidr(cidr.to_string()))?;

    if network.ip() != network.network() {
        return Err(Error::InvalidCidr(format!("{} has host bits set", cidr)));
    }

    Ok(network)
}

/// Inclusive numeric range of usable host addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HostRange {
    first: u128,
    last: u128,
    v6: bool,
}

impl HostRange {
    fn of(network: &IpNetwork) -> Self {
        match network {
            IpNetwork::V4(net) => {
                let base = u32::from(net.network()) as u128;
                let last_addr = base + ((1u128 << (32 - net.prefix() as u32)) - 1);
                let (first, last) = match net.prefix() {
                    32 => (base, base),
                    31 => (base, last_addr),
                    _ => (base + 1, last_addr - 1),
                };
                Self { first, last, v6: false }
            }
            IpNetwork::V6(net) => {
                let base = u128::from(net.network());
                let host_bits = 128 - net.prefix() as u32;
                let mask = if host_bits == 128 {
                    u128::MAX
                } else {
                    (1u128 << host_bits) - 1
                };
                let last_addr = base | mask;
                let (first, last) = match net.prefix() {
                    128 => (base, base),
                    127 => (base, last_addr),
                    _ => (base + 1, last_addr),
                };
                Self { first, last, v6: true }
            }
        }
    }

    fn addr(&self, value: u128) -> IpAddr {
        if self.v6 {
            IpAddr::V6(Ipv6Addr::from(value))
        } else {
            IpAddr::V4(Ipv4Addr::from(value as u32))
        }
    }

    fn value(&self, ip: IpAddr) -> Option<u128> {
        match (ip, self.v6) {
            (IpAddr::V4(v4), false) => Some(u32::from(v4) as u128),
            (IpAddr::V6(v6), true) => Some(u128::from(v6)),
            _ => None,
        }
    }

    fn contains(&self, ip: IpAddr) -> bool {
        self.value(ip)
            .map(|v| v >= self.first && v <= self.last)
            .unwrap_or(false)
    }
}

/// Allocates host addresses within one network
#[derive(Debug, Clone)]
pub struct AddressAllocator {
    network: IpNetwork,
    range: HostRange,
}

impl AddressAllocator {
    /// Build an allocator from a CIDR string
    pub fn new(cidr: &str) -> Result<Self> {
        Ok(Self::from_network(parse_cidr(cidr)?))
    }

    pub fn from_network(network: IpNetwork) -> Self {
        let range = HostRange::of(&network);
        Self { network, range }
    }

    pub fn network(&self) -> IpNetwork {
        self.network
    }

    /// Canonical `addr/len` form
    pub fn cidr(&self) -> String {
        self.network.to_string()
    }

    pub fn prefix(&self) -> u8 {
        self.network.prefix()
    }

    /// Number of usable host addresses (saturates for an IPv6 /0)
    pub fn usable_hosts(&self) -> u128 {
        (self.range.last - self.range.first).saturating_add(1)
    }

    /// The `n`-th usable host, zero based
    pub fn nth_host(&self, n: u128) -> Option<IpAddr> {
        let value = self.range.first.checked_add(n)?;
        (value <= self.range.last).then(|| self.range.addr(value))
    }

    /// Whether `ip` is a usable host of this network
    pub fn contains_host(&self, ip: IpAddr) -> bool {
        self.range.contains(ip)
    }

    /// Parse an explicitly supplied address and check it is a usable host
    pub fn check_host(&self, ip: &str) -> Result<IpAddr> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| Error::InvalidAddress(ip.to_string()))?;

        if !self.contains_host(addr) {
            return Err(Error::AddressOutOfRange {
                ip: addr.to_string(),
                cidr: self.cidr(),
            });
        }

        Ok(addr)
    }

    /// Lowest usable host not present in `assigned`
    ///
    /// Unparsable entries in `assigned` are ignored. The scan stops after at
    /// most `assigned.len() + 1` candidates, so large IPv6 prefixes are cheap.
    pub fn next_free<'a, I>(&self, assigned: I) -> Result<IpAddr>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let taken: BTreeSet<IpAddr> = assigned
            .into_iter()
            .filter_map(|s| match s.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    warn!("Ignoring unparsable assigned address {:?} in {}", s, self.network);
                    None
                }
            })
            .collect();

        let mut candidate = self.range.first;
        loop {
            let addr = self.range.addr(candidate);
            if !taken.contains(&addr) {
                return Ok(addr);
            }
            if candidate == self.range.last {
                return Err(Error::AddressSpaceExhausted { cidr: self.cidr() });
            }
            candidate += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("10.0.0.0/30", "10.0.0.1" ; "ipv4 skips network address")]
    #[test_case("192.168.7.0/24", "192.168.7.1" ; "ipv4 slash 24")]
    #[test_case("10.0.0.0/31", "10.0.0.0" ; "ipv4 point to point")]
    #[test_case("10.9.9.9/32", "10.9.9.9" ; "ipv4 single host")]
    #[test_case("fd00::/64", "fd00::1" ; "ipv6 skips network address")]
    #[test_case("fd00::/127", "fd00::" ; "ipv6 point to point")]
    #[test_case("fd00::7/128", "fd00::7" ; "ipv6 single host")]
    fn test_first_free(cidr: &str, expected: &str) {
        let alloc = AddressAllocator::new(cidr).unwrap();
        assert_eq!(alloc.next_free([]).unwrap().to_string(), expected);
    }

    #[test_case("10.0.0.0/30", 2)]
    #[test_case("10.0.0.0/29", 6)]
    #[test_case("10.0.0.0/31", 2)]
    #[test_case("10.0.0.0/32", 1)]
    #[test_case("fd00::/120", 255)]
    #[test_case("fd00::/127", 2)]
    fn test_usable_hosts(cidr: &str, expected: u128) {
        assert_eq!(AddressAllocator::new(cidr).unwrap().usable_hosts(), expected);
    }

    #[test_case("10.0.0.1/24" ; "host bits set")]
    #[test_case("10.0.0.0/33" ; "prefix too long")]
    #[test_case("not-a-network" ; "garbage")]
    #[test_case("" ; "empty")]
    fn test_invalid_cidr(cidr: &str) {
        assert!(matches!(AddressAllocator::new(cidr), Err(Error::InvalidCidr(_))));
    }

    #[test]
    fn test_skips_assigned_and_fills_gaps() {
        let alloc = AddressAllocator::new("10.1.0.0/24").unwrap();
        let next = alloc.next_free(["10.1.0.1", "10.1.0.2", "10.1.0.4"]).unwrap();
        assert_eq!(next.to_string(), "10.1.0.3");
    }

    #[test]
    fn test_exhaustion() {
        let alloc = AddressAllocator::new("10.0.0.0/30").unwrap();
        let err = alloc.next_free(["10.0.0.2", "10.0.0.1"]).unwrap_err();
        assert!(matches!(err, Error::AddressSpaceExhausted { cidr } if cidr == "10.0.0.0/30"));
    }

    #[test]
    fn test_ignores_foreign_and_garbage_entries() {
        let alloc = AddressAllocator::new("10.0.0.0/30").unwrap();
        let next = alloc.next_free(["", "fd00::1", "10.0.0.1", "bogus"]).unwrap();
        assert_eq!(next.to_string(), "10.0.0.2");
    }

    #[test]
    fn test_large_ipv6_prefix_is_cheap() {
        let alloc = AddressAllocator::new("fd00::/48").unwrap();
        let taken: Vec<String> = (1..=64u128)
            .map(|i| {
                let base = u128::from("fd00::".parse::<Ipv6Addr>().unwrap());
                Ipv6Addr::from(base + i).to_string()
            })
            .collect();
        let next = alloc.next_free(taken.iter().map(String::as_str)).unwrap();
        assert_eq!(next.to_string(), "fd00::41");
    }

    #[test]
    fn test_nth_host_and_containment() {
        let alloc = AddressAllocator::new("10.0.0.0/30").unwrap();
        assert_eq!(alloc.nth_host(0).unwrap().to_string(), "10.0.0.1");
        assert_eq!(alloc.nth_host(1).unwrap().to_string(), "10.0.0.2");
        assert!(alloc.nth_host(2).is_none());

        assert!(alloc.contains_host("10.0.0.2".parse().unwrap()));
        assert!(!alloc.contains_host("10.0.0.0".parse().unwrap()));
        assert!(!alloc.contains_host("10.0.0.3".parse().unwrap()));
        assert!(!alloc.contains_host("fd00::1".parse().unwrap()));
    }

    #[test]
    fn test_check_host() {
        let alloc = AddressAllocator::new("10.0.0.0/24").unwrap();
        assert_eq!(alloc.check_host("10.0.0.9").unwrap().to_string(), "10.0.0.9");
        assert!(matches!(alloc.check_host("10.0.1.9"), Err(Error::AddressOutOfRange { .. })));
        assert!(matches!(alloc.check_host("10.0.0.255"), Err(Error::AddressOutOfRange { .. })));
        assert!(matches!(alloc.check_host("10.0.0"), Err(Error::InvalidAddress(_))));
    }

    #[test]
    fn test_canonical_cidr() {
        assert_eq!(AddressAllocator::new(" 10.0.0.0/8 ").unwrap().cidr(), "10.0.0.0/8");
        assert_eq!(AddressAllocator::new("fd00:0::/64").unwrap().cidr(), "fd00::/64");
    }
}
