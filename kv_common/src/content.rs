use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::{DataType, KvError};

/// Common flags value for a JSON document
pub const JSON_FLAGS: u32 = 0x0200_0006;
/// Common flags value for an opaque binary document
pub const BINARY_FLAGS: u32 = 0x0300_0000;

/// An encoded document body together with the metadata needed to decode it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub bytes: Bytes,
    pub data_type: DataType,
    pub flags: u32,
}

impl Content {
    /// Serialize `value` to JSON
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Content, KvError> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Content {
            bytes: Bytes::from(bytes),
            data_type: DataType::JSON,
            flags: JSON_FLAGS,
        })
    }

    /// Already encoded JSON, stored as is. Passing a plain string to
    /// [Content::json] would store a JSON string literal instead.
    pub fn raw_json(json: impl Into<String>) -> Content {
        Content {
            bytes: Bytes::from(json.into()),
            data_type: DataType::JSON,
            flags: JSON_FLAGS,
        }
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Content {
        Content {
            bytes: bytes.into(),
            data_type: DataType::RAW,
            flags: BINARY_FLAGS,
        }
    }

    /// Decode the body as JSON into `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, KvError> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }
}
