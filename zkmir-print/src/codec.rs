//! Binary schema file format (§6.1): an 8-byte magic, a major/minor version
//! pair, a length-prefixed JSON metadata blob, then a `bincode`-encoded
//! `Schema`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use zkmir_spec::{Field, Schema, SpecError, FORMAT_MAGIC, FORMAT_MAJOR, FORMAT_MINOR};

use crate::error::{PrintError, Result};

/// Free-form metadata carried alongside a schema in the binary envelope
/// (author, build id, anything a caller wants to round-trip with the file).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Encode `schema` into the §6.1 binary envelope.
pub fn encode_schema<F: Field + Serialize>(attributes: &Attributes, schema: &Schema<F>) -> Result<Vec<u8>> {
    let metadata = serde_json::to_vec(attributes).map_err(|e| PrintError::MalformedMetadata(e.to_string()))?;
    let payload = bincode::serialize(schema)?;

    let mut out = Vec::with_capacity(8 + 2 + 2 + 4 + metadata.len() + payload.len());
    out.extend_from_slice(FORMAT_MAGIC);
    out.extend_from_slice(&FORMAT_MAJOR.to_be_bytes());
    out.extend_from_slice(&FORMAT_MINOR.to_be_bytes());
    out.extend_from_slice(&(metadata.len() as u32).to_be_bytes());
    out.extend_from_slice(&metadata);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a §6.1 binary envelope, rejecting a major-version mismatch or a
/// file whose minor version is newer than this reader understands.
pub fn decode_schema<F: Field + for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<(Attributes, Schema<F>)> {
    let header_len = FORMAT_MAGIC.len() + 2 + 2 + 4;
    if bytes.len() < header_len {
        return Err(PrintError::Truncated { expected: header_len, got: bytes.len() });
    }
    let (magic, rest) = bytes.split_at(FORMAT_MAGIC.len());
    if magic != FORMAT_MAGIC.as_slice() {
        return Err(PrintError::BadMagic(magic.to_vec()));
    }
    let (major_bytes, rest) = rest.split_at(2);
    let (minor_bytes, rest) = rest.split_at(2);
    let file_major = u16::from_be_bytes([major_bytes[0], major_bytes[1]]);
    let file_minor = u16::from_be_bytes([minor_bytes[0], minor_bytes[1]]);
    if file_major != FORMAT_MAJOR || file_minor > FORMAT_MINOR {
        return Err(SpecError::IncompatibleFormat {
            file_major,
            file_minor,
            reader_major: FORMAT_MAJOR,
            reader_minor: FORMAT_MINOR,
        }
        .into());
    }

    let (meta_len_bytes, rest) = rest.split_at(4);
    let meta_len = u32::from_be_bytes([meta_len_bytes[0], meta_len_bytes[1], meta_len_bytes[2], meta_len_bytes[3]]) as usize;
    if rest.len() < meta_len {
        return Err(PrintError::Truncated { expected: meta_len, got: rest.len() });
    }
    let (metadata, payload) = rest.split_at(meta_len);
    let attributes: Attributes = serde_json::from_slice(metadata).map_err(|e| PrintError::MalformedMetadata(e.to_string()))?;
    let schema: Schema<F> = bincode::deserialize(payload)?;
    Ok((attributes, schema))
}
