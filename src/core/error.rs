// Centralized error handling for the warden

use crate::natpmp::Protocol;
use reqwest::StatusCode;
use std::fmt;
use std::net::SocketAddrV4;
use thiserror::Error;

/// Result codes a NAT-PMP gateway can answer with (RFC 6886 section 3.5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    UnsupportedVersion,
    NotAuthorized,
    NetworkFailure,
    OutOfResources,
    UnsupportedOpcode,
    Unknown(u16),
}

impl ResultCode {
    /// Map a non-zero wire value to its meaning
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => ResultCode::UnsupportedVersion,
            2 => ResultCode::NotAuthorized,
            3 => ResultCode::NetworkFailure,
            4 => ResultCode::OutOfResources,
            5 => ResultCode::UnsupportedOpcode,
            other => ResultCode::Unknown(other),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::UnsupportedVersion => write!(f, "unsupported version (1)"),
            ResultCode::NotAuthorized => write!(f, "not authorized/refused (2)"),
            ResultCode::NetworkFailure => write!(f, "network failure (3)"),
            ResultCode::OutOfResources => write!(f, "out of resources (4)"),
            ResultCode::UnsupportedOpcode => write!(f, "unsupported opcode (5)"),
            ResultCode::Unknown(code) => write!(f, "unknown result code ({})", code),
        }
    }
}

/// Errors raised while talking to the NAT-PMP gateway
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("Failed to discover default gateway: {0}")]
    Gateway(String),

    #[error("NAT-PMP socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NAT-PMP gateway {gateway} did not answer after {attempts} attempts")]
    Timeout { gateway: SocketAddrV4, attempts: u32 },

    #[error("Invalid NAT-PMP response: {0}")]
    InvalidResponse(&'static str),

    #[error("NAT-PMP gateway refused mapping: {0}")]
    Refused(ResultCode),
}

/// Errors raised by the torrent client control API
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to send request to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned error status: {status}")]
    Status { endpoint: String, status: StatusCode },

    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Torrent client rejected the configured credentials")]
    LoginRejected,
}

/// Coarse classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Mapping,
    Transport,
    Status,
    Decode,
    HealthCheck,
}

/// First failure of a run; every variant is fatal
#[derive(Error, Debug)]
pub enum RunError {
    #[error("{protocol} port mapping failed: {source}")]
    Mapping {
        protocol: Protocol,
        #[source]
        source: MappingError,
    },

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no running downloads ({stalled} stalled without peers)")]
    HealthCheck { stalled: usize },
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Mapping { .. } => ErrorKind::Mapping,
            RunError::Client(ClientError::Transport { .. }) => ErrorKind::Transport,
            RunError::Client(ClientError::Status { .. }) => ErrorKind::Status,
            RunError::Client(ClientError::LoginRejected) => ErrorKind::Status,
            RunError::Client(ClientError::Decode { .. }) => ErrorKind::Decode,
            RunError::HealthCheck { .. } => ErrorKind::HealthCheck,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_from_code() {
        assert_eq!(ResultCode::from_code(2), ResultCode::NotAuthorized);
        assert_eq!(ResultCode::from_code(5), ResultCode::UnsupportedOpcode);
        assert_eq!(ResultCode::from_code(42), ResultCode::Unknown(42));
    }

    #[test]
    fn test_health_check_message() {
        let err = RunError::HealthCheck { stalled: 2 };
        assert!(err.to_string().starts_with("no running downloads"));
        assert_eq!(err.kind(), ErrorKind::HealthCheck);
    }

    #[test]
    fn test_mapping_error_kind() {
        let err = RunError::Mapping {
            protocol: Protocol::Udp,
            source: MappingError::Refused(ResultCode::NetworkFailure),
        };
        assert_eq!(err.kind(), ErrorKind::Mapping);
        assert_eq!(
            err.to_string(),
            "UDP port mapping failed: NAT-PMP gateway refused mapping: network failure (3)"
        );
    }

    #[test]
    fn test_client_error_kinds() {
        let status = RunError::from(ClientError::Status {
            endpoint: "http://localhost:8080/api/v2/torrents/info".to_string(),
            status: StatusCode::FORBIDDEN,
        });
        assert_eq!(status.kind(), ErrorKind::Status);

        let login = RunError::from(ClientError::LoginRejected);
        assert_eq!(login.kind(), ErrorKind::Status);
    }
}
