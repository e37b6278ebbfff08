//! Formats opaque row keys, families, qualifiers and encoded cell keys for
//! logs and error messages.

use itertools::Itertools as _;

use super::keycode::CellKey;

/// Formats raw byte slices without any decoding.
pub struct Raw;

impl Raw {
    /// Formats raw bytes as escaped ASCII strings.
    pub fn bytes(bytes: &[u8]) -> String {
        let escaped = bytes
            .iter()
            .copied()
            .flat_map(std::ascii::escape_default)
            .collect_vec();
        format!("\"{}\"", String::from_utf8_lossy(&escaped))
    }

    /// Formats an encoded cell key as `row/family:qualifier@timestamp`.
    /// Keys that fail to decode are shown as raw bytes.
    pub fn cell_key(key: &[u8]) -> String {
        match CellKey::decode(key) {
            Ok(k) => format!(
                "{}/{}:{}@{}",
                Self::bytes(&k.row),
                Self::bytes(&k.family),
                Self::bytes(&k.qualifier),
                k.timestamp
            ),
            Err(_) => Self::bytes(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_bytes() {
        assert_eq!(Raw::bytes(b"row1"), "\"row1\"");
        assert_eq!(Raw::bytes(b"a\x00\xff"), "\"a\\x00\\xff\"");
    }

    #[test]
    fn test_cell_key() {
        let key = CellKey {
            row: b"row1".to_vec(),
            family: b"vio1".to_vec(),
            qualifier: b"col1".to_vec(),
            timestamp: 42,
        };
        assert_eq!(Raw::cell_key(&key.encode()), "\"row1\"/\"vio1\":\"col1\"@42");
        assert_eq!(Raw::cell_key(b"junk"), "\"junk\"");
    }
}
