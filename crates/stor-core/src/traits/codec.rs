//! Pluggable payload encoding

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::StorError;

/// How JSON objects come back from a dynamic decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeShape {
    /// Objects are ordered key/value mappings, in document order
    #[default]
    Mapping,
    /// Objects are named-field records, fields in canonical order
    Record,
}

impl DecodeShape {
    /// Shape selected by the `decode_as_mapping` option
    pub fn from_mapping_flag(as_mapping: bool) -> Self {
        if as_mapping {
            DecodeShape::Mapping
        } else {
            DecodeShape::Record
        }
    }
}

/// Trait for pluggable payload encodings
///
/// Implement this trait to add custom encodings. Payloads end up in text
/// columns and files, so encodings should produce UTF-8.
pub trait Codec: Send + Sync + Clone + 'static {
    /// Name of the codec (for debugging/metrics)
    fn name(&self) -> &str;

    /// Encode a value to bytes
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, StorError>;

    /// Decode bytes into a typed value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, StorError>;

    /// Decode bytes into a dynamic value, honoring the codec's shape
    fn decode_value(&self, bytes: &[u8]) -> Result<Value, StorError>;
}

/// JSON codec (default)
///
/// Human-readable, and the only format the relational `value` column is
/// expected to hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    shape: DecodeShape,
}

impl JsonCodec {
    /// Create a JSON codec with the given decode shape
    pub fn new(shape: DecodeShape) -> Self {
        Self { shape }
    }

    /// The decode shape used by [`Codec::decode_value`]
    pub fn shape(&self) -> DecodeShape {
        self.shape
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, StorError> {
        serde_json::to_vec(value).map_err(|e| StorError::Encoding(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, StorError> {
        serde_json::from_slice(bytes).map_err(|e| StorError::Encoding(e.to_string()))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, StorError> {
        let value: Value = self.decode(bytes)?;
        Ok(match self.shape {
            DecodeShape::Mapping => value,
            DecodeShape::Record => into_record(value),
        })
    }
}

/// Rebuild every object with its fields in canonical order
fn into_record(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<(String, Value)> = map.into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, into_record(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(into_record).collect()),
        other => other,
    }
}
