// src/wire.rs
//! Fixed 16-byte wire record: [8-byte timestamp][4-byte price][4-byte quantity],
//! all little-endian, no padding, no checksum, no sequence number. Any datagram
//! that is not exactly [`RECORD_LEN`] bytes is invalid framing.

use serde::Serialize;

/// Exact size of one wire record.
pub const RECORD_LEN: usize = 16;

/// One decoded price/quantity update. Immutable once decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MarketUpdate {
    /// Microseconds since an arbitrary epoch. Informational only; the book
    /// resolves conflicts by application order, not by this field.
    pub ts_us: u64,
    /// Price in minor currency units (cents).
    pub price: u32,
    /// Quantity at that price. Zero is valid and means an explicit empty level.
    pub qty: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Input length differs from [`RECORD_LEN`].
    Length { got: usize },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Length { got } => {
                write!(f, "bad frame length: got {got} bytes, want {RECORD_LEN}")
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// Parses one record. Pure function of the input bytes; no field range
/// validation beyond framing.
pub fn decode(bytes: &[u8]) -> Result<MarketUpdate, FrameError> {
    if bytes.len() != RECORD_LEN {
        return Err(FrameError::Length { got: bytes.len() });
    }

    let ts_us = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let price = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let qty = u32::from_le_bytes(bytes[12..16].try_into().unwrap());

    Ok(MarketUpdate { ts_us, price, qty })
}

/// Inverse of [`decode`]; used by the test sender.
pub fn encode(upd: &MarketUpdate) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0..8].copy_from_slice(&upd.ts_us.to_le_bytes());
    out[8..12].copy_from_slice(&upd.price.to_le_bytes());
    out[12..16].copy_from_slice(&upd.qty.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let upd = MarketUpdate { ts_us: 1000, price: 1005, qty: 50 };
        let bytes = encode(&upd);
        assert_eq!(bytes.len(), RECORD_LEN);
        assert_eq!(decode(&bytes).unwrap(), upd);
    }

    #[test]
    fn field_layout_is_little_endian() {
        let mut bytes = [0u8; RECORD_LEN];
        bytes[0] = 0x01; // ts_us = 1
        bytes[8] = 0xE8;
        bytes[9] = 0x03; // price = 1000
        bytes[12] = 0x0A; // qty = 10
        let upd = decode(&bytes).unwrap();
        assert_eq!(upd.ts_us, 1);
        assert_eq!(upd.price, 1000);
        assert_eq!(upd.qty, 10);
    }

    #[test]
    fn rejects_short_and_long_frames() {
        assert_eq!(decode(&[0u8; 15]), Err(FrameError::Length { got: 15 }));
        assert_eq!(decode(&[0u8; 17]), Err(FrameError::Length { got: 17 }));
        assert_eq!(decode(&[]), Err(FrameError::Length { got: 0 }));
    }

    #[test]
    fn zero_quantity_is_valid() {
        let upd = decode(&encode(&MarketUpdate { ts_us: 7, price: 42, qty: 0 })).unwrap();
        assert_eq!(upd.qty, 0);
    }
}
