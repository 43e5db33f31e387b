use crate::core::error::MappingError;
use std::net::Ipv4Addr;

/// Gateway of the IPv4 default route
#[cfg(target_os = "linux")]
pub fn default_gateway() -> Result<Ipv4Addr, MappingError> {
    let data = std::fs::read_to_string("/proc/net/route")
        .map_err(|e| MappingError::Gateway(format!("cannot read /proc/net/route: {}", e)))?;
    parse_route_table(&data)
        .ok_or_else(|| MappingError::Gateway("no default route found".to_string()))
}

#[cfg(not(target_os = "linux"))]
pub fn default_gateway() -> Result<Ipv4Addr, MappingError> {
    Err(MappingError::Gateway(
        "default route discovery is only supported on Linux".to_string(),
    ))
}

/// RTF_GATEWAY: the route goes through a gateway
const RTF_GATEWAY: u32 = 0x2;

/// Find the default route in the contents of `/proc/net/route`.
///
/// Addresses there are little-endian hex, e.g. `0102000A` is `10.0.2.1`.
/// Default routes without a gateway (point-to-point links such as a
/// WireGuard interface) and malformed rows are skipped.
pub fn parse_route_table(data: &str) -> Option<Ipv4Addr> {
    for line in data.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || parts[1] != "00000000" {
            continue;
        }

        let (Ok(gw), Ok(flags)) = (
            u32::from_str_radix(parts[2], 16),
            u32::from_str_radix(parts[3], 16),
        ) else {
            continue;
        };

        if gw == 0 || flags & RTF_GATEWAY == 0 {
            continue;
        }

        let bytes = gw.to_le_bytes();
        return Some(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]));
    }
    None
}
