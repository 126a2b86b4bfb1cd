use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde::{Deserializer, Serializer};

/// Enable serde to serialize [`Option<Bytes>`] as an optional hex encoded [`String`]
pub fn serialize<S: Serializer>(v: &Option<Bytes>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => Option::<String>::serialize(&Some(hex::encode(v)), s),
        None => Option::<String>::serialize(&None, s),
    }
}

/// Enable serde to deserialize an optional hex encoded [`String`] back into [`Option<Bytes>`]
pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Bytes>, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(stringified) => {
            let decoded = hex::decode(stringified.into_bytes())
                .map_err(|e| serde::de::Error::custom(format!("Unable to hex::decode {}", e)))?;
            Ok(Some(decoded.into()))
        }
        None => Ok(None),
    }
}
