//! Pluggable document codecs
//!
//! A codec turns a [`Document`] into the bytes kept in the store and back.
//! The engine only ever talks to `dyn Codec`, so swapping JSON for YAML or
//! MessagePack is a configuration change.

use crate::core::config::CodecFormat;
use crate::core::error::CodecError;
use crate::types::Document;
use bytes::Bytes;
use std::sync::Arc;

/// Serialize/deserialize stored documents
pub trait Codec: Send + Sync {
    /// Short codec name used in logs
    fn name(&self) -> &'static str;

    /// Serialize a document into its stored form
    fn encode(&self, doc: &Document) -> Result<Bytes, CodecError>;

    /// Deserialize a stored document, failing on malformed input
    fn decode(&self, raw: &[u8]) -> Result<Document, CodecError>;
}

/// JSON text codec (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, doc: &Document) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(doc)?))
    }

    fn decode(&self, raw: &[u8]) -> Result<Document, CodecError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// YAML text codec
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn encode(&self, doc: &Document) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_yaml::to_string(doc)?))
    }

    fn decode(&self, raw: &[u8]) -> Result<Document, CodecError> {
        Ok(serde_yaml::from_slice(raw)?)
    }
}

/// MessagePack binary codec
///
/// Maps are written with string keys so documents decode back into objects
/// rather than arrays of pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec;

impl Codec for MessagePackCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn encode(&self, doc: &Document) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(rmp_serde::to_vec_named(doc)?))
    }

    fn decode(&self, raw: &[u8]) -> Result<Document, CodecError> {
        Ok(rmp_serde::from_slice(raw)?)
    }
}

/// Build the codec selected by configuration
pub fn codec_for(format: CodecFormat) -> Arc<dyn Codec> {
    match format {
        CodecFormat::Json => Arc::new(JsonCodec),
        CodecFormat::Yaml => Arc::new(YamlCodec),
        CodecFormat::Msgpack => Arc::new(MessagePackCodec),
    }
}
