//! `Upload-Metadata` header codec.
//!
//! The header is a comma-separated list of `key base64value` pairs:
//!
//! ```text
//! filename dGVzdC5iaW4=,fingerprint YWJj
//! ```
//!
//! Values use the standard base64 alphabet; padding is optional when
//! decoding. Bytes that are not UTF-8 are replaced, never rejected.

use std::collections::HashMap;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Standard alphabet, accepting values with or without `=` padding.
const DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors produced while decoding an `Upload-Metadata` header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("metadata header is missing")]
    Missing,

    #[error("metadata entry '{key}' has no value")]
    MissingValue { key: String },

    #[error("invalid base64 encoding: '{value}'")]
    InvalidEncoding { value: String },

    #[error("duplicate metadata key: '{key}'")]
    DuplicateKey { key: String },
}

/// Decodes a metadata header into a key/value map.
///
/// Pairs are split on `,` and then on the first space. Blanks are not
/// trimmed: `"a YQ==, b Yg=="` yields an empty key for the second pair
/// whose value `"b Yg=="` is not valid base64, so the whole header is
/// rejected.
pub fn parse_metadata(header: Option<&str>) -> Result<HashMap<String, String>, MetadataError> {
    let header = header.ok_or(MetadataError::Missing)?;
    let mut parsed = HashMap::new();

    for pair in header.split(',') {
        let (key, encoded) = pair
            .split_once(' ')
            .ok_or_else(|| MetadataError::MissingValue { key: pair.to_string() })?;

        let bytes = DECODER
            .decode(encoded)
            .map_err(|_| MetadataError::InvalidEncoding {
                value: encoded.to_string(),
            })?;
        let value = String::from_utf8_lossy(&bytes).into_owned();

        if parsed.insert(key.to_string(), value).is_some() {
            return Err(MetadataError::DuplicateKey {
                key: key.to_string(),
            });
        }
    }

    Ok(parsed)
}

/// Encodes key/value pairs into a metadata header (client side).
pub fn encode_metadata<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key} {}", STANDARD.encode(value.as_bytes())))
        .collect::<Vec<_>>()
        .join(",")
}
