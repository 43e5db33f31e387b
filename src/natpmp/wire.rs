use super::{PortMapping, Protocol};
use crate::core::error::{MappingError, ResultCode};

pub const NATPMP_PORT: u16 = 5351;
pub const VERSION: u8 = 0;
pub const REQUEST_LEN: usize = 12;
pub const RESPONSE_LEN: usize = 16;

/// Build a mapping request. A zero external port lets the gateway choose.
pub fn encode_request(
    protocol: Protocol,
    internal_port: u16,
    external_port: u16,
    lifetime: u32,
) -> [u8; REQUEST_LEN] {
    let mut req = [0u8; REQUEST_LEN];
    req[0] = VERSION;
    req[1] = protocol.opcode();
    // bytes 2..4 are reserved and must be zero
    req[4..6].copy_from_slice(&internal_port.to_be_bytes());
    req[6..8].copy_from_slice(&external_port.to_be_bytes());
    req[8..12].copy_from_slice(&lifetime.to_be_bytes());
    req
}

/// Parse a mapping response to a request for `protocol`
pub fn decode_response(protocol: Protocol, resp: &[u8]) -> Result<PortMapping, MappingError> {
    // Error responses may be truncated to the 8-byte header
    if resp.len() < 4 {
        return Err(MappingError::InvalidResponse("Response too short"));
    }

    if resp[0] != VERSION {
        return Err(MappingError::InvalidResponse("Unsupported version"));
    }

    if resp[1] != protocol.opcode() + 128 {
        return Err(MappingError::InvalidResponse("Unexpected opcode"));
    }

    let result_code = u16::from_be_bytes([resp[2], resp[3]]);
    if result_code != 0 {
        return Err(MappingError::Refused(ResultCode::from_code(result_code)));
    }

    if resp.len() < RESPONSE_LEN {
        return Err(MappingError::InvalidResponse("Response too short"));
    }

    Ok(PortMapping {
        protocol,
        epoch: u32::from_be_bytes([resp[4], resp[5], resp[6], resp[7]]),
        internal_port: u16::from_be_bytes([resp[8], resp[9]]),
        external_port: u16::from_be_bytes([resp[10], resp[11]]),
        lifetime_seconds: u32::from_be_bytes([resp[12], resp[13], resp[14], resp[15]]),
    })
}
