//! Single-bucket entity store.
//!
//! An [`EntStore`] binds a bucket to four pluggable functions (see
//! [`encode`](crate::encode)) and implements put, point lookup, point delete,
//! paginated find and filtered bulk delete on top of any transaction.
//!
//! `B` is the body type written through [`Entity`]; `T` is the type the decoder
//! produces on reads. They are usually the same, except for index stores, which
//! write entities and read back the [`Id`](entkv_types::Id) they point to.

use entkv_store::{ReadTxn, WriteTxn};
use entkv_types::Entity;
use snafu::{IntoError, OptionExt, ResultExt};
use tracing::{Span, debug, trace};

use crate::{
    encode::{DecodedValToEntFn, DecodeBucketEntFn, EncodeEntFn},
    error::{EncodeError, EncodingSnafu, KvError, NotFoundSnafu, Result, StorageSnafu},
    opts::{DeleteOpts, DeleteRelationFn, FindOpts, Paginator},
    scan::Scan,
};

/// Entity store over one bucket.
pub struct EntStore<B, T> {
    resource: String,
    bucket: Vec<u8>,
    encode_key: EncodeEntFn<B>,
    encode_body: EncodeEntFn<B>,
    decode: DecodeBucketEntFn<T>,
    decode_to_ent: DecodedValToEntFn<T, B>,
}

impl<B: 'static, T: 'static> EntStore<B, T> {
    /// Creates a store for `resource` backed by `bucket`.
    ///
    /// `resource` names the entity in error messages ("dashboard not found").
    pub fn new(
        resource: impl Into<String>,
        bucket: impl Into<Vec<u8>>,
        encode_key: impl Fn(&Entity<B>) -> Result<Vec<u8>, EncodeError> + Send + Sync + 'static,
        encode_body: impl Fn(&Entity<B>) -> Result<Vec<u8>, EncodeError> + Send + Sync + 'static,
        decode: impl Fn(&[u8], &[u8]) -> Result<(Vec<u8>, T)> + Send + Sync + 'static,
        decode_to_ent: impl Fn(&[u8], &T) -> Result<Entity<B>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            resource: resource.into(),
            bucket: bucket.into(),
            encode_key: Box::new(encode_key),
            encode_body: Box::new(encode_body),
            decode: Box::new(decode),
            decode_to_ent: Box::new(decode_to_ent),
        }
    }
}

/// A decoded bucket entry.
pub(crate) struct Decoded<T> {
    /// Key exactly as stored.
    pub(crate) raw_key: Vec<u8>,
    /// Key as returned by the decoder.
    pub(crate) key: Vec<u8>,
    pub(crate) value: T,
}

/// Decoding iterator over a [`Scan`].
pub(crate) struct DecodedScan<'s, B, T> {
    store: &'s EntStore<B, T>,
    scan: Scan,
}

impl<B, T> Iterator for DecodedScan<'_, B, T> {
    type Item = Result<Decoded<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (raw_key, raw_value) = self.scan.next()?;
        Some(
            self.store
                .decode_entry(&raw_key, &raw_value)
                .map(|(key, value)| Decoded { raw_key, key, value }),
        )
    }
}

impl<B, T> EntStore<B, T> {
    /// Name of the stored resource.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Bucket backing this store.
    pub fn bucket(&self) -> &[u8] {
        &self.bucket
    }

    /// Encodes the bucket key for `ent`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidKey`] if the key encoder rejects the entity.
    pub fn entity_key(&self, ent: &Entity<B>) -> Result<Vec<u8>> {
        (self.encode_key)(ent).map_err(|source| self.invalid(source))
    }

    /// Encodes the stored value for `ent`.
    ///
    /// # Errors
    ///
    /// - [`KvError::InvalidKey`] if the body is missing
    /// - [`KvError::Encoding`] if the body cannot be serialized
    pub fn entity_value(&self, ent: &Entity<B>) -> Result<Vec<u8>> {
        (self.encode_body)(ent).map_err(|source| match source {
            EncodeError::Missing { .. } => self.invalid(source),
            EncodeError::Serialize { .. } => {
                EncodingSnafu { resource: self.resource.as_str() }.into_error(source)
            },
        })
    }

    /// Decodes a raw entry read from this store's bucket.
    ///
    /// # Errors
    ///
    /// Propagates the decoder's error.
    pub fn decode_entry(&self, key: &[u8], value: &[u8]) -> Result<(Vec<u8>, T)> {
        (self.decode)(key, value)
    }

    /// Converts a decoded value back into an entity.
    ///
    /// # Errors
    ///
    /// Propagates the converter's error.
    pub fn decode_to_ent(&self, key: &[u8], value: &T) -> Result<Entity<B>> {
        (self.decode_to_ent)(key, value)
    }

    /// Creates the bucket if it does not exist. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Storage`] if the engine rejects the bucket name.
    pub fn init<W: WriteTxn + ?Sized>(&self, tx: &mut W) -> Result<()> {
        let _span = self.span(tx.span(), "init").entered();
        tx.create_bucket_if_not_exists(&self.bucket).context(StorageSnafu)
    }

    /// Writes `ent` under its encoded key, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// - [`KvError::InvalidKey`] if the key cannot be encoded or the body is missing
    /// - [`KvError::Encoding`] if the body cannot be serialized
    /// - [`KvError::Storage`] if the engine rejects the write
    pub fn put<W: WriteTxn + ?Sized>(&self, tx: &mut W, ent: &Entity<B>) -> Result<()> {
        let _span = self.span(tx.span(), "put").entered();
        let key = self.entity_key(ent)?;
        let value = self.entity_value(ent)?;
        self.put_encoded(tx, &key, &value)
    }

    pub(crate) fn put_encoded<W: WriteTxn + ?Sized>(
        &self,
        tx: &mut W,
        key: &[u8],
        value: &[u8],
    ) -> Result<()> {
        tx.put(&self.bucket, key, value).context(StorageSnafu)?;
        trace!(key_len = key.len(), value_len = value.len(), "put entity");
        Ok(())
    }

    /// Looks up the entity addressed by `ent`'s encoded key.
    ///
    /// # Errors
    ///
    /// - [`KvError::InvalidKey`] if the key cannot be encoded
    /// - [`KvError::NotFound`] if nothing is stored under the key
    pub fn find_ent<R: ReadTxn + ?Sized>(&self, tx: &R, ent: &Entity<B>) -> Result<T> {
        let _span = self.span(tx.span(), "find_ent").entered();
        let key = self.entity_key(ent)?;
        let Some(raw) = tx.get(&self.bucket, &key).context(StorageSnafu)? else {
            debug!("entity not found");
            return NotFoundSnafu { resource: self.resource.as_str() }.fail();
        };
        let (_, value) = self.decode_entry(&key, &raw)?;
        Ok(value)
    }

    /// Deletes the entity addressed by `ent`, returning its prior decoded value.
    ///
    /// # Errors
    ///
    /// - [`KvError::InvalidKey`] if the key cannot be encoded
    /// - [`KvError::NotFound`] if nothing is stored under the key
    pub fn delete_ent<W: WriteTxn + ?Sized>(&self, tx: &mut W, ent: &Entity<B>) -> Result<T> {
        self.delete_ent_with(tx, ent, &mut [])
    }

    /// Deletes the entity addressed by `ent`, then runs `relations` against it.
    ///
    /// # Errors
    ///
    /// As [`EntStore::delete_ent`], plus any error a relation returns.
    pub fn delete_ent_with<W: WriteTxn + ?Sized>(
        &self,
        tx: &mut W,
        ent: &Entity<B>,
        relations: &mut [DeleteRelationFn<'_, W, T>],
    ) -> Result<T> {
        let _span = self.span(tx.span(), "delete_ent").entered();
        let key = self.entity_key(ent)?;
        let raw = tx
            .get(&self.bucket, &key)
            .context(StorageSnafu)?
            .context(NotFoundSnafu { resource: self.resource.as_str() })?;
        let (decoded_key, value) = self.decode_entry(&key, &raw)?;
        tx.delete(&self.bucket, &key).context(StorageSnafu)?;
        for relation in relations.iter_mut() {
            relation(&mut *tx, &decoded_key, &value)?;
        }
        Ok(value)
    }

    /// Visits entries in key order, passing each admitted one to `capture`.
    ///
    /// The filter runs before `offset` and `limit` are applied. An error from
    /// `capture` stops the scan and is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns decode, storage or capture errors.
    pub fn find<R, F>(&self, tx: &R, opts: &FindOpts<'_, T>, mut capture: F) -> Result<()>
    where
        R: ReadTxn + ?Sized,
        F: FnMut(&[u8], T) -> Result<()>,
    {
        let _span = self.span(tx.span(), "find").entered();
        let mut page = Paginator::new(opts.offset, opts.limit);
        let mut captured = 0usize;
        for item in self.scan(tx, &opts.prefix, opts.descending)? {
            let Decoded { key, value, .. } = item?;
            if !opts.admits(&key, &value) || !page.admit() {
                continue;
            }
            capture(&key, value)?;
            captured += 1;
            if page.is_full() {
                break;
            }
        }
        debug!(captured, "find complete");
        Ok(())
    }

    /// Collects every entry [`EntStore::find`] would capture.
    ///
    /// # Errors
    ///
    /// As [`EntStore::find`].
    pub fn find_all<R: ReadTxn + ?Sized>(&self, tx: &R, opts: &FindOpts<'_, T>) -> Result<Vec<T>> {
        let mut found = Vec::new();
        self.find(tx, opts, |_, value| {
            found.push(value);
            Ok(())
        })?;
        Ok(found)
    }

    /// Deletes every entry matching the filter, running the relations for each.
    ///
    /// Returns the number of entries deleted. Relation functions run in the same
    /// transaction, so an error from any of them leaves nothing deleted once the
    /// caller aborts.
    ///
    /// # Errors
    ///
    /// Returns decode, storage or relation errors.
    pub fn delete<W: WriteTxn + ?Sized>(
        &self,
        tx: &mut W,
        mut opts: DeleteOpts<'_, W, T>,
    ) -> Result<usize> {
        let _span = self.span(tx.span(), "delete").entered();
        let mut deleted = 0usize;
        for item in self.scan(&*tx, &[], false)? {
            let Decoded { raw_key, key, value } = item?;
            if !(opts.filter)(&key, &value) {
                continue;
            }
            tx.delete(&self.bucket, &raw_key).context(StorageSnafu)?;
            for relation in &mut opts.relations {
                relation(&mut *tx, &key, &value)?;
            }
            deleted += 1;
        }
        debug!(deleted, "delete complete");
        Ok(deleted)
    }

    /// Opens a decoding scan over this store's bucket.
    pub(crate) fn scan<R: ReadTxn + ?Sized>(
        &self,
        tx: &R,
        prefix: &[u8],
        descending: bool,
    ) -> Result<DecodedScan<'_, B, T>> {
        let cursor = tx.cursor(&self.bucket).context(StorageSnafu)?;
        Ok(DecodedScan { store: self, scan: Scan::new(cursor, prefix, descending) })
    }

    fn invalid(&self, source: EncodeError) -> KvError {
        KvError::InvalidKey { resource: self.resource.clone(), field: source.field(), source }
    }

    fn span(&self, parent: &Span, op: &'static str) -> Span {
        tracing::debug_span!(
            parent: parent,
            "entkv.store",
            op,
            resource = %self.resource,
            bucket = %String::from_utf8_lossy(&self.bucket),
        )
    }
}

impl<B, T> std::fmt::Debug for EntStore<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntStore")
            .field("resource", &self.resource)
            .field("bucket", &String::from_utf8_lossy(&self.bucket))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use entkv_store::{Database, WriteTransaction};
    use entkv_test_utils::{Foo, foo_ent};
    use entkv_types::Id;

    use super::*;
    use crate::{
        encode::{decode_postcard_body, encode_body_postcard, encode_id_key},
        error::ErrorCode,
    };

    fn foo_store() -> EntStore<Foo, Foo> {
        EntStore::new(
            "foo",
            b"foo_ents".to_vec(),
            encode_id_key,
            encode_body_postcard,
            decode_postcard_body("foo"),
            |_, foo: &Foo| Ok(foo.to_entity()),
        )
    }

    fn seeded(store: &EntStore<Foo, Foo>, ids: &[u64]) -> Database {
        let db = Database::open_in_memory();
        db.update(|tx| {
            store.init(tx)?;
            for id in ids {
                store.put(tx, &foo_ent(*id, 9000, &format!("foo_{id}")))?;
            }
            Ok::<_, KvError>(())
        })
        .expect("seed");
        db
    }

    #[test]
    fn test_put_then_find_ent() {
        let store = foo_store();
        let db = seeded(&store, &[1]);

        let found = store.find_ent(&db.read(), &Entity::with_id(Id::new(1))).expect("find");
        assert_eq!(found, Foo::new(1, 9000, "foo_1"));
    }

    #[test]
    fn test_find_ent_missing_is_not_found() {
        let store = foo_store();
        let db = seeded(&store, &[]);

        let err = store.find_ent(&db.read(), &Entity::with_id(Id::new(7))).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "foo not found");
    }

    #[test]
    fn test_put_without_id_is_invalid() {
        let store = foo_store();
        let db = seeded(&store, &[]);
        let mut tx = db.write().expect("write");

        let ent = Entity::new(Id::UNSET, Id::new(1), "x", Foo::new(0, 1, "x"));
        let err = store.put(&mut tx, &ent).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Invalid);
        assert!(matches!(err, KvError::InvalidKey { field: "id", .. }));
    }

    #[test]
    fn test_put_without_body_is_invalid() {
        let store = foo_store();
        let db = seeded(&store, &[]);
        let mut tx = db.write().expect("write");

        let err = store.put(&mut tx, &Entity::with_id(Id::new(1))).unwrap_err();
        assert!(matches!(err, KvError::InvalidKey { field: "body", .. }));
    }

    #[test]
    fn test_operations_before_init_report_storage_error() {
        let store = foo_store();
        let db = Database::open_in_memory();

        let err = store.find_ent(&db.read(), &Entity::with_id(Id::new(1))).unwrap_err();
        assert!(matches!(err, KvError::Storage { .. }));
    }

    #[test]
    fn test_delete_ent_returns_prior_value_and_runs_relations() {
        let store = foo_store();
        let db = seeded(&store, &[1, 2]);
        let mut tx = db.write().expect("write");

        let mut seen = Vec::new();
        {
            let relation: DeleteRelationFn<'_, WriteTransaction<'_>, Foo> =
                Box::new(|_tx, _key, foo| {
                    seen.push(foo.id);
                    Ok(())
                });
            let prior = store
                .delete_ent_with(&mut tx, &Entity::with_id(Id::new(2)), &mut [relation])
                .expect("delete");
            assert_eq!(prior.name, "foo_2");
        }
        assert_eq!(seen, vec![Id::new(2)]);

        let err = store.delete_ent(&mut tx, &Entity::with_id(Id::new(2))).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_stops_on_capture_error() {
        let store = foo_store();
        let db = seeded(&store, &[1, 2, 3]);

        let mut visited = 0;
        let err = store
            .find(&db.read(), &FindOpts::new(), |_, _| {
                visited += 1;
                Err(KvError::callback("stop"))
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "stop");
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_find_passes_decoded_key() {
        let store = foo_store();
        let db = seeded(&store, &[5]);

        let mut keys = Vec::new();
        store
            .find(&db.read(), &FindOpts::new(), |key, _| {
                keys.push(key.to_vec());
                Ok(())
            })
            .expect("find");
        assert_eq!(keys, vec![Id::new(5).to_bytes().to_vec()]);
    }

    #[test]
    fn test_delete_returns_count() {
        let store = foo_store();
        let db = seeded(&store, &[1, 2, 3, 4]);

        let deleted = db
            .update(|tx| store.delete(tx, DeleteOpts::new(|_, foo: &Foo| foo.id.value() % 2 == 0)))
            .expect("delete");
        assert_eq!(deleted, 2);

        let left = store.find_all(&db.read(), &FindOpts::new()).expect("find");
        let ids: Vec<u64> = left.iter().map(|f| f.id.value()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
