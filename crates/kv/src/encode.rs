//! Encoder and decoder functions plugged into an [`EntStore`](crate::EntStore).
//!
//! A store is configured with four functions:
//!
//! - a key encoder turning an entity into its bucket key
//! - a body encoder turning an entity into its stored value
//! - a decoder turning a raw `(key, value)` entry into `(key, T)`
//! - a converter turning a decoded `T` back into an [`Entity`]
//!
//! The helpers here cover the common shapes: id-keyed buckets with postcard or
//! JSON bodies.

use entkv_types::{Entity, codec};
use serde::{Serialize, de::DeserializeOwned};
use snafu::ResultExt;

use crate::error::{DecodeSnafu, EncodeError, Result, SerializeSnafu};

/// Encodes an entity into a key or a stored value.
pub type EncodeEntFn<B> = Box<dyn Fn(&Entity<B>) -> Result<Vec<u8>, EncodeError> + Send + Sync>;

/// Decodes a raw bucket entry into its key and decoded value.
pub type DecodeBucketEntFn<T> = Box<dyn Fn(&[u8], &[u8]) -> Result<(Vec<u8>, T)> + Send + Sync>;

/// Converts a decoded value back into an entity.
pub type DecodedValToEntFn<T, B> = Box<dyn Fn(&[u8], &T) -> Result<Entity<B>> + Send + Sync>;

/// Encodes the entity's id as 8 big-endian bytes.
///
/// # Errors
///
/// Returns [`EncodeError::Missing`] if the id is unset.
pub fn encode_id_key<B>(ent: &Entity<B>) -> Result<Vec<u8>, EncodeError> {
    if !ent.id.is_valid() {
        return Err(EncodeError::Missing { field: "id" });
    }
    Ok(ent.id.to_bytes().to_vec())
}

/// Encodes the entity body with postcard.
///
/// # Errors
///
/// Returns [`EncodeError::Missing`] if the body is absent, or
/// [`EncodeError::Serialize`] if postcard rejects it.
pub fn encode_body_postcard<B: Serialize>(ent: &Entity<B>) -> Result<Vec<u8>, EncodeError> {
    let body = ent.body.as_ref().ok_or(EncodeError::Missing { field: "body" })?;
    codec::encode(body).context(SerializeSnafu { field: "body" })
}

/// Encodes the entity body as JSON.
///
/// # Errors
///
/// Returns [`EncodeError::Missing`] if the body is absent, or
/// [`EncodeError::Serialize`] if serde_json rejects it.
pub fn encode_body_json<B: Serialize>(ent: &Entity<B>) -> Result<Vec<u8>, EncodeError> {
    let body = ent.body.as_ref().ok_or(EncodeError::Missing { field: "body" })?;
    codec::encode_json(body).context(SerializeSnafu { field: "body" })
}

/// Builds a decoder for postcard-encoded values of `resource`.
pub fn decode_postcard_body<T: DeserializeOwned + 'static>(
    resource: impl Into<String>,
) -> impl Fn(&[u8], &[u8]) -> Result<(Vec<u8>, T)> + Send + Sync + 'static {
    let resource = resource.into();
    move |key, value| {
        let decoded = codec::decode(value).context(DecodeSnafu { resource: resource.as_str() })?;
        Ok((key.to_vec(), decoded))
    }
}

/// Builds a decoder for JSON-encoded values of `resource`.
pub fn decode_json_body<T: DeserializeOwned + 'static>(
    resource: impl Into<String>,
) -> impl Fn(&[u8], &[u8]) -> Result<(Vec<u8>, T)> + Send + Sync + 'static {
    let resource = resource.into();
    move |key, value| {
        let decoded =
            codec::decode_json(value).context(DecodeSnafu { resource: resource.as_str() })?;
        Ok((key.to_vec(), decoded))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use entkv_test_utils::Foo;
    use entkv_types::Id;

    use super::*;
    use crate::error::ErrorCode;

    fn foo_ent(id: u64) -> Entity<Foo> {
        Entity::new(Id::new(id), Id::new(9000), "foo_0", Foo::new(id, 9000, "foo_0"))
    }

    #[test]
    fn test_id_key_is_big_endian() {
        let key = encode_id_key(&foo_ent(9000)).expect("encode");
        assert_eq!(key, vec![0, 0, 0, 0, 0, 0, 0x23, 0x28]);
    }

    #[test]
    fn test_id_key_requires_id() {
        let err = encode_id_key::<Foo>(&Entity::with_org_name(Id::new(1), "x")).unwrap_err();
        assert_eq!(err.field(), "id");
    }

    #[test]
    fn test_body_encoders_require_body() {
        let ent: Entity<Foo> = Entity::with_id(Id::new(1));
        assert!(matches!(
            encode_body_postcard(&ent),
            Err(EncodeError::Missing { field: "body" })
        ));
        assert!(matches!(encode_body_json(&ent), Err(EncodeError::Missing { field: "body" })));
    }

    #[test]
    fn test_json_decoder_returns_key_and_value() {
        let ent = foo_ent(3);
        let raw = encode_body_json(&ent).expect("encode");
        let decode = decode_json_body::<Foo>("foo");

        let (key, value) = decode(b"k", &raw).expect("decode");
        assert_eq!(key, b"k".to_vec());
        assert_eq!(Some(value), ent.body);
    }

    #[test]
    fn test_postcard_decoder_reports_decode_error() {
        let decode = decode_postcard_body::<Foo>("foo");
        let err = decode(b"k", &[0xFF]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(err.to_string().contains("failed to decode foo"));
    }
}
