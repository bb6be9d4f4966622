//! Record value encoding
//!
//! A record is a JSON object. On disk its top-level field names are replaced
//! by dictionary codes (MessagePack binary), nested values are written as
//! plain MessagePack and the whole map is zstd-compressed. Decompression is
//! capped at [`MAX_DECOMPRESSED_SIZE`]; larger payloads are rejected as
//! corrupt.

use ebiodiv_core::{Error, Result};
use rmpv::Value as Packed;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A stored value: a JSON object keyed by field name
pub type Record = Map<String, Value>;

pub const MAX_DECOMPRESSED_SIZE: usize = 1_048_576;

pub const COMPRESSION_LEVEL: i32 = 3;

/// Convert a JSON value to its MessagePack form
pub fn to_packed(value: &Value) -> Packed {
    match value {
        Value::Null => Packed::Nil,
        Value::Bool(b) => Packed::Boolean(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Packed::from(u)
            } else if let Some(i) = n.as_i64() {
                Packed::from(i)
            } else {
                Packed::F64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Packed::from(s.as_str()),
        Value::Array(items) => Packed::Array(items.iter().map(to_packed).collect()),
        Value::Object(map) => Packed::Map(
            map.iter()
                .map(|(k, v)| (Packed::from(k.as_str()), to_packed(v)))
                .collect(),
        ),
    }
}

/// Convert a MessagePack value back to JSON
///
/// Binary and extension values never come from [`to_packed`] and mark the
/// record as corrupt.
pub fn from_packed(value: Packed) -> Result<Value> {
    Ok(match value {
        Packed::Nil => Value::Null,
        Packed::Boolean(b) => Value::Bool(b),
        Packed::Integer(i) => match (i.as_u64(), i.as_i64()) {
            (Some(u), _) => Value::from(u),
            (None, Some(i)) => Value::from(i),
            _ => return Err(Error::CorruptRecord(format!("integer out of range: {:?}", i))),
        },
        Packed::F32(f) => float(f64::from(f))?,
        Packed::F64(f) => float(f)?,
        Packed::String(s) => Value::String(
            s.into_str()
                .ok_or_else(|| Error::CorruptRecord("invalid utf-8 string".into()))?,
        ),
        Packed::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_packed)
                .collect::<Result<Vec<_>>>()?,
        ),
        Packed::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries {
                let key = match k {
                    Packed::String(s) => s
                        .into_str()
                        .ok_or_else(|| Error::CorruptRecord("invalid utf-8 key".into()))?,
                    other => {
                        return Err(Error::CorruptRecord(format!("non-string map key: {}", other)))
                    }
                };
                map.insert(key, from_packed(v)?);
            }
            Value::Object(map)
        }
        Packed::Binary(_) | Packed::Ext(..) => {
            return Err(Error::CorruptRecord("unexpected binary value".into()))
        }
    })
}

fn float(f: f64) -> Result<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| Error::CorruptRecord(format!("non-finite float: {}", f)))
}

/// Serialize and compress a MessagePack value
///
/// Values whose serialized form exceeds [`MAX_DECOMPRESSED_SIZE`] are
/// rejected, since they could never be decompressed again.
pub fn compress(value: &Packed) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    if buf.len() > MAX_DECOMPRESSED_SIZE {
        return Err(Error::Serialization(format!(
            "record of {} bytes exceeds the {} byte limit",
            buf.len(),
            MAX_DECOMPRESSED_SIZE
        )));
    }
    Ok(zstd::encode_all(buf.as_slice(), COMPRESSION_LEVEL)?)
}

/// Decompress and deserialize a MessagePack value
pub fn decompress(bytes: &[u8]) -> Result<Packed> {
    let buf = zstd::bulk::decompress(bytes, MAX_DECOMPRESSED_SIZE)
        .map_err(|e| Error::CorruptRecord(format!("decompression failed: {}", e)))?;
    rmpv::decode::read_value(&mut buf.as_slice())
        .map_err(|e| Error::CorruptRecord(format!("invalid messagepack: {}", e)))
}

/// Dictionary-table key for a field name
pub fn pack_name(name: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &Packed::from(name))
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(buf)
}

pub fn unpack_name(bytes: &[u8]) -> Result<String> {
    let mut slice = bytes;
    match rmpv::decode::read_value(&mut slice) {
        Ok(Packed::String(s)) => s
            .into_str()
            .ok_or_else(|| Error::CorruptRecord("invalid utf-8 field name".into())),
        Ok(other) => Err(Error::CorruptRecord(format!("invalid field name: {}", other))),
        Err(e) => Err(Error::CorruptRecord(e.to_string())),
    }
}

/// Convert any serializable value into a [`Record`]
pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Serialization(format!("expected an object, got {}", other))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_values_survive() {
        let value = json!({
            "a": [1, -2, 3.5, null, true, "x"],
            "b": {"c": {"d": u64::MAX}},
            "e": i64::MIN
        });
        let packed = decompress(&compress(&to_packed(&value)).unwrap()).unwrap();
        assert_eq!(from_packed(packed).unwrap(), value);
    }

    #[test]
    fn test_decompression_cap() {
        // compresses to a few hundred bytes but expands past the cap
        let mut buf = Vec::new();
        let big = Packed::Binary(vec![0u8; MAX_DECOMPRESSED_SIZE + 1]);
        rmpv::encode::write_value(&mut buf, &big).unwrap();
        let bomb = zstd::encode_all(buf.as_slice(), COMPRESSION_LEVEL).unwrap();
        assert!(bomb.len() < 64 * 1024);
        assert!(matches!(decompress(&bomb), Err(Error::CorruptRecord(_))));
    }

    #[test]
    fn test_oversized_value_rejected_on_write() {
        let big = Packed::from("a".repeat(MAX_DECOMPRESSED_SIZE));
        assert!(matches!(compress(&big), Err(Error::Serialization(_))));

        // just under the limit once the string header is counted
        let fits = Packed::from("a".repeat(MAX_DECOMPRESSED_SIZE - 5));
        let packed = compress(&fits).unwrap();
        assert_eq!(decompress(&packed).unwrap(), fits);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        assert!(matches!(decompress(b"not zstd"), Err(Error::CorruptRecord(_))));
        assert!(matches!(
            from_packed(Packed::Binary(vec![1, 2])),
            Err(Error::CorruptRecord(_))
        ));
    }

    #[test]
    fn test_field_names() {
        let packed = pack_name("genus").unwrap();
        assert_eq!(unpack_name(&packed).unwrap(), "genus");
        assert!(unpack_name(&[0xc0]).is_err());
    }
}
