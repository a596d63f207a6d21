//! Wire codec for stored entries
//!
//! Byte-oriented backend drivers (networked or durable stores) persist
//! entries through this bincode bridge. The enum tag distinguishes a
//! facade-written envelope from a raw legacy value, so both survive a
//! round trip.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::backend::StoredEntry;
use crate::cache::types::error_types::CacheError;

/// Encode a stored entry for a byte-oriented backend
pub fn encode_entry<V>(entry: &StoredEntry<V>) -> Result<Vec<u8>, CacheError>
where
    V: Serialize,
{
    bincode::serde::encode_to_vec(entry, bincode::config::standard())
        .map_err(|e| CacheError::Codec(e.to_string()))
}

/// Decode a stored entry previously produced by `encode_entry`
pub fn decode_entry<V>(bytes: &[u8]) -> Result<StoredEntry<V>, CacheError>
where
    V: DeserializeOwned,
{
    let (entry, _len) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| CacheError::Codec(e.to_string()))?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::envelope::WrappedValue;

    #[test]
    fn test_wrapped_and_raw_survive_the_wire() {
        let wrapped: StoredEntry<String> =
            StoredEntry::Wrapped(WrappedValue::from_ttl("v".to_string(), 1_000, 60, None));
        let decoded: StoredEntry<String> = decode_entry(&encode_entry(&wrapped).unwrap()).unwrap();
        assert_eq!(decoded, wrapped);

        let raw: StoredEntry<String> = StoredEntry::Raw("legacy".to_string());
        let decoded: StoredEntry<String> = decode_entry(&encode_entry(&raw).unwrap()).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn test_garbage_is_a_codec_error() {
        let result = decode_entry::<String>(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(CacheError::Codec(_))));
    }
}
