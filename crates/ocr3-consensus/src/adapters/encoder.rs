//! Protobuf map encoder
//!
//! Encodes the outcome map with the same deterministic wire format used
//! for consensus messages, optionally prefixed with configured bytes.

use crate::error::EncodeError;
use crate::ports::{Encoder, EncoderFactory};
use crate::wire::{value::Kind, Map};
use prost::Message;
use std::sync::Arc;

/// Config key holding a bytes prefix prepended to every report.
pub const PREFIX_CONFIG_KEY: &str = "prefix";

#[derive(Debug, Default, Clone)]
pub struct ProtoMapEncoder {
    prefix: Vec<u8>,
}

impl ProtoMapEncoder {
    pub fn with_prefix(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Builds an encoder from an optional config map.
    ///
    /// Recognised key: `prefix` (bytes). Any other value type is rejected.
    pub fn from_config(config: Option<&Map>) -> Result<Self, EncodeError> {
        let Some(config) = config else {
            return Ok(Self::default());
        };
        match config.get(PREFIX_CONFIG_KEY).and_then(|v| v.kind.as_ref()) {
            None => Ok(Self::default()),
            Some(Kind::BytesValue(prefix)) => Ok(Self::with_prefix(prefix.clone())),
            Some(_) => Err(EncodeError::InvalidConfig(format!(
                "{PREFIX_CONFIG_KEY} must be bytes"
            ))),
        }
    }
}

impl Encoder for ProtoMapEncoder {
    fn encode(&self, input: &Map) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(self.prefix.len() + input.encoded_len());
        out.extend_from_slice(&self.prefix);
        input
            .encode(&mut out)
            .map_err(|e| EncodeError::Failed(e.to_string()))?;
        Ok(out)
    }
}

/// Factory registered under a name for encoder overrides.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtoMapEncoderFactory;

impl EncoderFactory for ProtoMapEncoderFactory {
    fn build(&self, config: Option<&Map>) -> Result<Arc<dyn Encoder>, EncodeError> {
        Ok(Arc::new(ProtoMapEncoder::from_config(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Value;

    #[test]
    fn test_encode_without_prefix() {
        let map = Map::new().with("k", "v");
        let bytes = ProtoMapEncoder::default().encode(&map).unwrap();
        assert_eq!(bytes, map.encode_to_vec());
    }

    #[test]
    fn test_encode_with_configured_prefix() {
        let config = Map::new().with(PREFIX_CONFIG_KEY, Value::bytes(vec![0xAB, 0xCD]));
        let encoder = ProtoMapEncoderFactory.build(Some(&config)).unwrap();

        let map = Map::new().with("k", "v");
        let bytes = encoder.encode(&map).unwrap();
        assert_eq!(&bytes[..2], &[0xAB, 0xCD]);
        assert_eq!(Map::decode(&bytes[2..]).unwrap(), map);
    }

    #[test]
    fn test_invalid_config() {
        let config = Map::new().with(PREFIX_CONFIG_KEY, "not bytes");
        assert!(matches!(
            ProtoMapEncoder::from_config(Some(&config)),
            Err(EncodeError::InvalidConfig(_))
        ));
    }
}
