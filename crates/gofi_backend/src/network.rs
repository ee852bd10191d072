use gofi_domain::LOOPBACK_IPV4;
use std::net::{IpAddr, Ipv4Addr};

/// Private IPv4 ranges, tried in this order for every interface address.
const PRIVATE_IPV4_RANGES: [(Ipv4Addr, u8); 3] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
];

#[derive(Debug, thiserror::Error)]
pub enum NetworkResolutionError {
    #[error("failed to enumerate network interfaces: {0}")]
    InterfaceEnumeration(String),
}

/// Source of the addresses assigned to local network interfaces.
pub trait InterfaceAddrs {
    fn interface_addrs(&self) -> Result<Vec<IpAddr>, NetworkResolutionError>;
}

/// Reads interface addresses from the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInterfaces;

#[cfg(unix)]
impl InterfaceAddrs for SystemInterfaces {
    fn interface_addrs(&self) -> Result<Vec<IpAddr>, NetworkResolutionError> {
        let addrs = nix::ifaddrs::getifaddrs()
            .map_err(|err| NetworkResolutionError::InterfaceEnumeration(err.to_string()))?;

        let mut out = Vec::new();
        for ifaddr in addrs {
            let Some(address) = ifaddr.address else {
                continue;
            };
            if let Some(v4) = address.as_sockaddr_in() {
                out.push(IpAddr::V4(v4.ip()));
            } else if let Some(v6) = address.as_sockaddr_in6() {
                out.push(IpAddr::V6(v6.ip()));
            }
        }
        Ok(out)
    }
}

#[cfg(not(unix))]
impl InterfaceAddrs for SystemInterfaces {
    fn interface_addrs(&self) -> Result<Vec<IpAddr>, NetworkResolutionError> {
        Err(NetworkResolutionError::InterfaceEnumeration(
            "interface enumeration is not supported on this platform".to_owned(),
        ))
    }
}

pub fn check_ip(ip: &str) -> bool {
    ip.parse::<IpAddr>().is_ok()
}

/// Returns `candidate` when it parses as an address, otherwise the first private IPv4
/// address found on a local interface, otherwise the loopback address.
pub fn resolve_advertised_ip(
    candidate: &str,
    interfaces: &dyn InterfaceAddrs,
) -> Result<String, NetworkResolutionError> {
    if check_ip(candidate) {
        return Ok(candidate.to_owned());
    }

    let addrs = interfaces.interface_addrs()?;
    tracing::debug!(?addrs, "local interface addresses");

    Ok(first_private_ipv4(&addrs)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| LOOPBACK_IPV4.to_owned()))
}

fn first_private_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
    addrs.iter().find_map(|addr| match addr {
        IpAddr::V4(v4) if !v4.is_loopback() && is_private_ipv4(*v4) => Some(*v4),
        _ => None,
    })
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    PRIVATE_IPV4_RANGES
        .iter()
        .any(|(network, prefix)| in_network(ip, *network, *prefix))
}

fn in_network(ip: Ipv4Addr, network: Ipv4Addr, prefix: u8) -> bool {
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
    u32::from(ip) & mask == u32::from(network) & mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticInterfaces;
    use std::net::Ipv6Addr;

    struct BrokenInterfaces;

    impl InterfaceAddrs for BrokenInterfaces {
        fn interface_addrs(&self) -> Result<Vec<IpAddr>, NetworkResolutionError> {
            Err(NetworkResolutionError::InterfaceEnumeration(
                "permission denied".to_owned(),
            ))
        }
    }

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn check_ip_accepts_v4_and_v6() {
        assert!(check_ip("10.1.2.3"));
        assert!(check_ip("::1"));
        assert!(check_ip("fe80::1"));
        assert!(!check_ip(""));
        assert!(!check_ip("localhost"));
        assert!(!check_ip("10.1.2"));
        assert!(!check_ip("256.0.0.1"));
    }

    #[test]
    fn valid_candidate_is_returned_unchanged() {
        let resolved = resolve_advertised_ip("10.1.2.3", &BrokenInterfaces).unwrap();
        assert_eq!(resolved, "10.1.2.3");

        let resolved = resolve_advertised_ip("8.8.8.8", &BrokenInterfaces).unwrap();
        assert_eq!(resolved, "8.8.8.8");
    }

    #[test]
    fn empty_candidate_discovers_lan_address() {
        assert_eq!(
            resolve_advertised_ip("", &StaticInterfaces::lan()).unwrap(),
            "192.168.1.50"
        );
    }

    #[test]
    fn invalid_candidate_falls_back_to_discovery() {
        let interfaces = StaticInterfaces(vec![v4(172, 20, 0, 7)]);
        assert_eq!(
            resolve_advertised_ip("not-an-ip", &interfaces).unwrap(),
            "172.20.0.7"
        );
    }

    #[test]
    fn public_ipv6_and_loopback_are_skipped() {
        let interfaces = StaticInterfaces(vec![
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V6("fd00::5".parse().unwrap()),
            v4(8, 8, 4, 4),
            v4(127, 0, 0, 1),
        ]);
        assert_eq!(resolve_advertised_ip("", &interfaces).unwrap(), "127.0.0.1");
    }

    #[test]
    fn first_matching_interface_wins() {
        let interfaces = StaticInterfaces(vec![
            v4(8, 8, 4, 4),
            v4(192, 168, 0, 2),
            v4(10, 0, 0, 9),
        ]);
        assert_eq!(
            resolve_advertised_ip("", &interfaces).unwrap(),
            "192.168.0.2"
        );
    }

    #[test]
    fn no_interfaces_falls_back_to_loopback() {
        assert_eq!(
            resolve_advertised_ip("", &StaticInterfaces(Vec::new())).unwrap(),
            "127.0.0.1"
        );
    }

    #[test]
    fn enumeration_failure_is_an_error() {
        let err = resolve_advertised_ip("", &BrokenInterfaces).unwrap_err();
        assert!(err.to_string().contains("permission denied"), "{err}");
    }

    #[test]
    fn private_range_boundaries() {
        assert!(is_private_ipv4(Ipv4Addr::new(10, 255, 255, 255)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 16, 0, 0)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 31, 255, 255)));
        assert!(!is_private_ipv4(Ipv4Addr::new(172, 32, 0, 0)));
        assert!(!is_private_ipv4(Ipv4Addr::new(172, 15, 255, 255)));
        assert!(is_private_ipv4(Ipv4Addr::new(192, 168, 255, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(192, 169, 0, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(11, 0, 0, 1)));
    }
}
