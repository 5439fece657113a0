//! Organization/name secondary index.
//!
//! The index maps `(org_id, name)` to the id of the entity holding that name.
//!
//! ```text
//! key   = org_id (8 bytes, big-endian) ++ name (UTF-8, lower-cased unless case sensitive)
//! value = id (8 bytes, big-endian)
//! ```
//!
//! Since the org id is fixed width, every name owned by an organization shares
//! the 8-byte [`org_prefix`], and a prefix scan lists them in name order.

use entkv_types::{Entity, ID_LEN, Id};
use snafu::OptionExt;

use crate::{
    error::{EncodeError, Result, UnexpectedDecodeValueSnafu},
    store::EntStore,
};

/// Builds an index store mapping `(org_id, name)` to entity ids.
///
/// Lookups through the returned store decode to the indexed [`Id`]. Converting a
/// decoded entry back to an entity recovers the organization and the stored
/// (possibly lower-cased) name from the key.
pub fn org_name_index<B: 'static>(
    resource: impl Into<String>,
    bucket: impl Into<Vec<u8>>,
    case_sensitive: bool,
) -> EntStore<B, Id> {
    let resource = resource.into();
    let decode_resource = resource.clone();
    EntStore::new(
        resource,
        bucket,
        move |ent: &Entity<B>| encode_org_name_key(ent, case_sensitive),
        encode_indexed_id,
        move |key: &[u8], value: &[u8]| {
            let id = Id::from_bytes(value).context(UnexpectedDecodeValueSnafu {
                resource: decode_resource.as_str(),
                expected: "8-byte id",
            })?;
            Ok((key.to_vec(), id))
        },
        index_entry_to_ent,
    )
}

/// Index key for `name` within `org_id`.
pub fn index_key(org_id: Id, name: &str, case_sensitive: bool) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN + name.len());
    key.extend_from_slice(&org_id.to_bytes());
    if case_sensitive {
        key.extend_from_slice(name.as_bytes());
    } else {
        key.extend_from_slice(name.to_lowercase().as_bytes());
    }
    key
}

/// Prefix shared by every index key of `org_id`.
pub fn org_prefix(org_id: Id) -> Vec<u8> {
    org_id.to_bytes().to_vec()
}

fn encode_org_name_key<B>(ent: &Entity<B>, case_sensitive: bool) -> Result<Vec<u8>, EncodeError> {
    if !ent.org_id.is_valid() {
        return Err(EncodeError::Missing { field: "org_id" });
    }
    if ent.name.is_empty() {
        return Err(EncodeError::Missing { field: "name" });
    }
    Ok(index_key(ent.org_id, &ent.name, case_sensitive))
}

fn encode_indexed_id<B>(ent: &Entity<B>) -> Result<Vec<u8>, EncodeError> {
    if !ent.id.is_valid() {
        return Err(EncodeError::Missing { field: "id" });
    }
    Ok(ent.id.to_bytes().to_vec())
}

fn index_entry_to_ent<B>(key: &[u8], id: &Id) -> Result<Entity<B>> {
    let org_id = key.get(..ID_LEN).and_then(Id::from_bytes).unwrap_or_default();
    let name = key.get(ID_LEN..).map(String::from_utf8_lossy).unwrap_or_default();
    Ok(Entity { id: *id, org_id, name: name.into_owned(), body: None })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use entkv_store::{Database, ReadTxn, WriteTxn};
    use entkv_test_utils::Foo;

    use super::*;
    use crate::error::{ErrorCode, KvError};

    const BUCKET: &[u8] = b"foo_index";

    #[test]
    fn test_index_key_layout() {
        let key = index_key(Id::new(9000), "Foo_0", false);
        assert_eq!(&key[..ID_LEN], &[0, 0, 0, 0, 0, 0, 0x23, 0x28]);
        assert_eq!(&key[ID_LEN..], b"foo_0");

        let sensitive = index_key(Id::new(9000), "Foo_0", true);
        assert_eq!(&sensitive[ID_LEN..], b"Foo_0");
        assert!(key.starts_with(&org_prefix(Id::new(9000))));
    }

    #[test]
    fn test_put_stores_encoded_id() {
        let index = org_name_index::<Foo>("foo", BUCKET, false);
        let db = Database::open_in_memory();
        let mut tx = db.write().expect("write");
        index.init(&mut tx).expect("init");

        let ent = Entity::new(Id::new(1), Id::new(9000), "Foo_0", Foo::new(1, 9000, "Foo_0"));
        index.put(&mut tx, &ent).expect("put");

        let raw = tx
            .get(BUCKET, &index_key(Id::new(9000), "foo_0", false))
            .expect("get")
            .expect("index entry present");
        assert_eq!(raw, Id::new(1).to_bytes().to_vec());

        let found =
            index.find_ent(&tx, &Entity::with_org_name(Id::new(9000), "FOO_0")).expect("find");
        assert_eq!(found, Id::new(1));
    }

    #[test]
    fn test_key_requires_org_and_name() {
        let index = org_name_index::<Foo>("foo", BUCKET, false);

        let no_org = index.entity_key(&Entity::with_org_name(Id::UNSET, "x")).unwrap_err();
        assert!(matches!(no_org, KvError::InvalidKey { field: "org_id", .. }));

        let no_name = index.entity_key(&Entity::with_org_name(Id::new(1), "")).unwrap_err();
        assert!(matches!(no_name, KvError::InvalidKey { field: "name", .. }));
    }

    #[test]
    fn test_corrupt_index_value_is_internal() {
        let index = org_name_index::<Foo>("foo", BUCKET, false);
        let db = Database::open_in_memory();
        let mut tx = db.write().expect("write");
        index.init(&mut tx).expect("init");
        let key = index_key(Id::new(1), "x", false);
        tx.put(BUCKET, &key, b"short").expect("put raw");

        let err = index.find_ent(&tx, &Entity::with_org_name(Id::new(1), "x")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
        assert!(matches!(err, KvError::UnexpectedDecodeValue { .. }));
    }

    #[test]
    fn test_decode_to_ent_recovers_org_and_name() {
        let index = org_name_index::<Foo>("foo", BUCKET, true);
        let key = index_key(Id::new(9003), "foo_2", true);

        let ent = index.decode_to_ent(&key, &Id::new(3)).expect("decode");
        assert_eq!(ent.id, Id::new(3));
        assert_eq!(ent.org_id, Id::new(9003));
        assert_eq!(ent.name, "foo_2");
        assert!(ent.body.is_none());
    }
}
