//! Value serialization for the object path of a [`Page`](crate::Page)
//!
//! The page itself only stores bytes. A [`Codec`] turns values into bytes and
//! back; [`frame`] / [`unframe`] wrap the codec output in a 4-byte length
//! prefix so that block padding never leaks into decoding.
//!
//! ```text
//! [4-byte LE length][codec payload][zero padding up to block boundary]
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Size of the length prefix written in front of every encoded value
pub const FRAME_HEADER_LEN: usize = 4;

/// Serializer collaborator
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON codec backed by serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| Error::Serialization(format!("Failed to serialize value: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize value: {}", e)))
    }
}

/// Prefix `payload` with its length
pub fn frame(payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        Error::Serialization(format!(
            "Encoded value of {} bytes exceeds the 4-byte length prefix",
            payload.len()
        ))
    })?;

    let mut result = Vec::with_capacity(payload.len() + FRAME_HEADER_LEN);
    result.extend_from_slice(&len.to_le_bytes());
    result.extend_from_slice(payload);
    Ok(result)
}

/// Strip the length prefix and any trailing padding
pub fn unframe(bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(Error::Serialization(format!(
            "Frame too short: {} bytes",
            bytes.len()
        )));
    }

    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let body = &bytes[FRAME_HEADER_LEN..];
    if body.len() < len {
        return Err(Error::Serialization(format!(
            "Incomplete frame: expected {} bytes, got {}",
            len,
            body.len()
        )));
    }

    Ok(&body[..len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        data: Vec<u8>,
    }

    #[test]
    fn test_json_codec() -> Result<()> {
        let codec = JsonCodec;
        let value = Sample {
            name: "Hello World".to_string(),
            data: vec![1, 2, 3],
        };
        let bytes = codec.encode(&value)?;
        let decoded: Sample = codec.decode(&bytes)?;
        assert_eq!(decoded, value);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let codec = JsonCodec;
        let result: Result<Sample> = codec.decode(b"not json");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_unframe_ignores_padding() -> Result<()> {
        let mut framed = frame(b"42")?;
        framed.extend_from_slice(&[0; 10]);
        assert_eq!(unframe(&framed)?, b"42");
        Ok(())
    }

    #[test]
    fn test_unframe_rejects_truncated() {
        assert!(matches!(unframe(&[1, 0]), Err(Error::Serialization(_))));

        let framed = [10, 0, 0, 0, b'x'];
        assert!(matches!(unframe(&framed), Err(Error::Serialization(_))));
    }
}
