use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use super::wire::{decode_response, encode_request, NATPMP_PORT, RESPONSE_LEN};
use super::{PortMapper, PortMapping, Protocol};
use crate::core::error::MappingError;

const DEFAULT_INITIAL_TIMEOUT: Duration = Duration::from_millis(250);
const DEFAULT_ATTEMPTS: u32 = 4;

/// NAT-PMP client bound to one gateway
#[derive(Debug, Clone)]
pub struct NatPmpClient {
    gateway: SocketAddrV4,
    initial_timeout: Duration,
    attempts: u32,
}

impl NatPmpClient {
    pub fn new(gateway: Ipv4Addr) -> Self {
        Self::with_gateway_addr(SocketAddrV4::new(gateway, NATPMP_PORT))
    }

    /// Talk to a gateway listening somewhere other than port 5351
    pub fn with_gateway_addr(gateway: SocketAddrV4) -> Self {
        Self {
            gateway,
            initial_timeout: DEFAULT_INITIAL_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    /// Retransmit up to `attempts` times, doubling the wait after each one
    pub fn with_retransmission(mut self, initial_timeout: Duration, attempts: u32) -> Self {
        self.initial_timeout = initial_timeout;
        self.attempts = attempts.max(1);
        self
    }

    pub fn gateway(&self) -> SocketAddrV4 {
        self.gateway
    }

    async fn recv_from_gateway(
        &self,
        socket: &UdpSocket,
        protocol: Protocol,
    ) -> Result<PortMapping, MappingError> {
        let mut buf = [0u8; RESPONSE_LEN];
        loop {
            let (size, addr) = socket.recv_from(&mut buf).await?;
            if addr != SocketAddr::V4(self.gateway) {
                debug!(source = %addr, "Ignoring NAT-PMP datagram from unexpected source");
                continue;
            }
            return decode_response(protocol, &buf[..size]);
        }
    }
}

impl PortMapper for NatPmpClient {
    async fn request_mapping(
        &self,
        protocol: Protocol,
        internal_port: u16,
        lease_seconds: u32,
    ) -> Result<PortMapping, MappingError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        let request = encode_request(protocol, internal_port, 0, lease_seconds);

        let mut wait = self.initial_timeout;
        for attempt in 1..=self.attempts {
            socket.send_to(&request, self.gateway).await?;
            debug!(
                gateway = %self.gateway,
                protocol = %protocol,
                internal_port = internal_port,
                attempt = attempt,
                wait_ms = wait.as_millis() as u64,
                "NAT-PMP mapping request sent"
            );

            match timeout(wait, self.recv_from_gateway(&socket, protocol)).await {
                Ok(result) => return result,
                Err(_) => debug!(attempt = attempt, "NAT-PMP request timed out"),
            }

            wait *= 2;
        }

        Err(MappingError::Timeout {
            gateway: self.gateway,
            attempts: self.attempts,
        })
    }
}
