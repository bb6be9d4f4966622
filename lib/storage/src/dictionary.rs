//! Append-only key dictionary
//!
//! Every top-level field name written to a store gets a short encoded id the
//! first time it is seen. The id is a 1-byte width marker followed by the
//! payload bytes:
//!
//! | index         | marker | payload                  |
//! |---------------|--------|--------------------------|
//! | 0..=255       | `0x00` | 1 byte                   |
//! | 256..=65535   | `0x01` | 2 bytes BE of index-255  |
//! | above         | `0x02` | 4 bytes BE of index      |
//!
//! Ids are never freed or reassigned, so records compressed long ago stay
//! decodable.

use ahash::AHashMap;

const MARKER_U8: u8 = 0x00;
const MARKER_U16: u8 = 0x01;
const MARKER_U32: u8 = 0x02;

/// Encoded id for the `index`-th dictionary entry
pub fn encode_index(index: u64) -> Vec<u8> {
    if index <= 255 {
        vec![MARKER_U8, index as u8]
    } else if index <= 65535 {
        let mut code = vec![MARKER_U16];
        code.extend_from_slice(&((index - 255) as u16).to_be_bytes());
        code
    } else {
        let mut code = vec![MARKER_U32];
        code.extend_from_slice(&(index as u32).to_be_bytes());
        code
    }
}

/// Inverse of [`encode_index`]; `None` for a malformed code
pub fn decode_index(code: &[u8]) -> Option<u64> {
    match code {
        [MARKER_U8, b] => Some(u64::from(*b)),
        [MARKER_U16, hi, lo] => Some(u64::from(u16::from_be_bytes([*hi, *lo])) + 255),
        [MARKER_U32, a, b, c, d] => Some(u64::from(u32::from_be_bytes([*a, *b, *c, *d]))),
        _ => None,
    }
}

/// Two-way mapping between field names and encoded ids
#[derive(Debug, Clone, Default)]
pub struct KeyDictionary {
    by_name: AHashMap<String, Vec<u8>>,
    by_code: AHashMap<Vec<u8>, String>,
}

impl KeyDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self, name: &str) -> Option<&[u8]> {
        self.by_name.get(name).map(Vec::as_slice)
    }

    pub fn name(&self, code: &[u8]) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    pub fn insert(&mut self, name: String, code: Vec<u8>) {
        self.by_code.insert(code.clone(), name.clone());
        self.by_name.insert(name, code);
    }

    /// Take over every entry of `other`
    pub fn merge(&mut self, other: KeyDictionary) {
        for (name, code) in other.by_name {
            self.insert(name, code);
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
