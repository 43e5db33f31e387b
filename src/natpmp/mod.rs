//! NAT Port Mapping Protocol (RFC 6886) client.
//!
//! The gateway is asked to forward an external port to an internal one for a
//! limited lease. Only the mapping request is implemented; the external
//! address request and mapping deletion are not needed here.

pub mod client;
pub mod gateway;
pub mod wire;

use crate::core::error::MappingError;
use std::fmt;

pub use client::NatPmpClient;

/// Transport protocol of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    /// Request opcode; the response opcode is this plus 128
    pub fn opcode(self) -> u8 {
        match self {
            Protocol::Udp => 1,
            Protocol::Tcp => 2,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Tcp => write!(f, "TCP"),
        }
    }
}

/// A mapping granted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub protocol: Protocol,
    pub internal_port: u16,
    /// Port reachable from outside the NAT
    pub external_port: u16,
    /// Lease actually granted, may differ from the requested one
    pub lifetime_seconds: u32,
    /// Seconds since the gateway's port mapping table was initialized
    pub epoch: u32,
}

/// Something that can open a port on the NAT gateway
#[allow(async_fn_in_trait)]
pub trait PortMapper {
    async fn request_mapping(
        &self,
        protocol: Protocol,
        internal_port: u16,
        lease_seconds: u32,
    ) -> Result<PortMapping, MappingError>;
}
