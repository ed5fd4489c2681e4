//! Deterministic IPv4 assignment for cluster nodes

use std::{fmt, net::Ipv4Addr, str::FromStr};

use serde::Serialize;

use crate::{
    environment::Environment,
    error::{Error, Result},
    node_type::NodeType,
};

/// An IPv4 network in CIDR notation, e.g. `192.168.1.0/24`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Subnet {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Subnet {
    pub fn new(network: Ipv4Addr, prefix: u8) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidSubnet {
            subnet: format!("{network}/{prefix}"),
            reason,
        };
        if prefix > 32 {
            return Err(invalid(format!("prefix length {prefix} is larger than 32")));
        }
        if u32::from(network) & !Self::mask(prefix) != 0 {
            return Err(invalid("host bits are set".to_owned()));
        }
        Ok(Self { network, prefix })
    }

    fn mask(prefix: u8) -> u32 {
        u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0)
    }

    pub fn network_address(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses in the subnet, network and broadcast included
    pub fn capacity(&self) -> u64 {
        1u64 << (32 - self.prefix as u32)
    }

    /// The address `offset` positions after the network address. Wraps past 255.255.255.255.
    pub fn nth(&self, offset: u32) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network).wrapping_add(offset))
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & Self::mask(self.prefix) == u32::from(self.network)
    }
}

impl FromStr for Ipv4Subnet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSubnet {
            subnet: s.to_owned(),
            reason: reason.to_owned(),
        };
        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, prefix),
            None => (s.trim(), "32"),
        };
        let network: Ipv4Addr = addr.parse().map_err(|_| invalid("not an IPv4 address"))?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid("bad prefix length"))?;
        Self::new(network, prefix).map_err(|err| match err {
            Error::InvalidSubnet { reason, .. } => invalid(&reason),
            other => other,
        })
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Interface configuration handed to cloud-init
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpConfig {
    pub ip_address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns_servers: Vec<String>,
    pub domains: Vec<String>,
}

/// Address of the `index`th node of `node_type`: network address + type offset + index.
///
/// The gateway is always the first host of the subnet. Nothing here checks the
/// result against the subnet size; callers size the subnet.
pub fn allocate(node_type: NodeType, index: u32, env: &Environment) -> IpConfig {
    let network = env.network();
    let offset = env.settings(node_type).network_offset;
    IpConfig {
        ip_address: network.subnet.nth(offset.wrapping_add(index)),
        gateway: network.subnet.nth(1),
        dns_servers: network.dns_servers.clone(),
        domains: network.domains.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::tests::test_environment;

    #[test]
    fn parses_cidr() {
        let subnet: Ipv4Subnet = "192.168.1.0/24".parse().expect("subnet should parse");
        assert_eq!(subnet.network_address(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(subnet.prefix(), 24);
        assert_eq!(subnet.capacity(), 256);
        assert_eq!(subnet.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn bare_address_is_a_host_network() {
        let subnet: Ipv4Subnet = "10.0.0.7".parse().expect("subnet should parse");
        assert_eq!(subnet.capacity(), 1);
    }

    #[test]
    fn rejects_host_bits_and_garbage() {
        assert!("192.168.1.5/24".parse::<Ipv4Subnet>().is_err());
        assert!("192.168.1.0/33".parse::<Ipv4Subnet>().is_err());
        assert!("not-a-subnet".parse::<Ipv4Subnet>().is_err());
        assert!("0.0.0.0/0".parse::<Ipv4Subnet>().is_ok());
    }

    #[test]
    fn allocates_from_type_offset() {
        let env = test_environment(1);
        let master = allocate(NodeType::Master, 1, &env);
        let worker = allocate(NodeType::Worker, 2, &env);

        assert_eq!(master.ip_address, Ipv4Addr::new(192, 168, 10, 11));
        assert_eq!(worker.ip_address, Ipv4Addr::new(192, 168, 10, 22));
        assert_eq!(master.gateway, Ipv4Addr::new(192, 168, 10, 1));
        assert_eq!(master.dns_servers, vec!["192.168.10.2".to_owned()]);
        assert_eq!(worker.domains, vec!["lab.local".to_owned()]);
    }

    #[test]
    fn allocation_is_deterministic() {
        let env = test_environment(1);
        assert_eq!(
            allocate(NodeType::Worker, 4, &env),
            allocate(NodeType::Worker, 4, &env)
        );
    }

    #[test]
    fn no_collisions_within_a_type() {
        let env = test_environment(1);
        let addrs: Vec<_> = (1..=9)
            .map(|i| allocate(NodeType::Master, i, &env).ip_address)
            .collect();
        for (i, a) in addrs.iter().enumerate() {
            for (j, b) in addrs.iter().enumerate() {
                assert_eq!(a == b, i == j);
            }
        }
    }

    #[test]
    fn overflowing_the_subnet_is_not_checked() {
        let env = test_environment(1);
        // worker offset 20 + 300 lands well past the /24
        let cfg = allocate(NodeType::Worker, 300, &env);
        assert_eq!(cfg.ip_address, Ipv4Addr::new(192, 168, 11, 64));
        assert!(!env.network().subnet.contains(cfg.ip_address));
    }
}
