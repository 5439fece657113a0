//! Entity store with an organization/name secondary index.
//!
//! [`IndexedStore`] composes two [`EntStore`]s: the entity store keyed by id, and an
//! [`org_name_index`] keyed by `(org_id, name)`. Every write touches both buckets
//! inside the caller's transaction, so the pair commits or aborts together.
//!
//! # Invariants
//!
//! - Every entity has exactly one index entry, under its current `(org_id, name)`.
//! - No two entities share an index key: a put that would steal another entity's
//!   name fails with [`KvError::Conflict`].
//! - Renaming or re-parenting an entity removes its previous index entry.

use entkv_store::{ReadTxn, WriteTxn};
use entkv_types::{Entity, Id, config::StoreConfig};
use snafu::ResultExt;
use tracing::{Span, debug};

use crate::{
    encode::encode_id_key,
    error::{EncodeError, KvError, MissingKeySnafu, Result, StorageSnafu},
    index::org_name_index,
    opts::{DeleteOpts, FindOpts, Paginator},
    store::{Decoded, EntStore},
};

/// Entity store kept in sync with an organization/name index.
pub struct IndexedStore<B, T> {
    resource: String,
    entities: EntStore<B, T>,
    index: EntStore<B, Id>,
}

impl<B: 'static, T: 'static> IndexedStore<B, T> {
    /// Builds an id-keyed entity store and its index from `config`.
    pub fn from_config(
        config: &StoreConfig,
        encode_body: impl Fn(&Entity<B>) -> Result<Vec<u8>, EncodeError> + Send + Sync + 'static,
        decode: impl Fn(&[u8], &[u8]) -> Result<(Vec<u8>, T)> + Send + Sync + 'static,
        decode_to_ent: impl Fn(&[u8], &T) -> Result<Entity<B>> + Send + Sync + 'static,
    ) -> Self {
        let entities = EntStore::new(
            config.resource.as_str(),
            config.entity_bucket.as_bytes(),
            encode_id_key,
            encode_body,
            decode,
            decode_to_ent,
        );
        let index = org_name_index(
            config.resource.as_str(),
            config.index_bucket.as_bytes(),
            config.case_sensitive_names,
        );
        Self::new(entities, index)
    }
}

impl<B, T> IndexedStore<B, T> {
    /// Composes an entity store with its index.
    pub fn new(entities: EntStore<B, T>, index: EntStore<B, Id>) -> Self {
        Self { resource: entities.resource().to_string(), entities, index }
    }

    /// Name of the stored resource.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Bucket holding the entities.
    pub fn entity_bucket(&self) -> &[u8] {
        self.entities.bucket()
    }

    /// Bucket holding the index.
    pub fn index_bucket(&self) -> &[u8] {
        self.index.bucket()
    }

    /// Index key under which `(org_id, name)` is stored.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidKey`] if either part is unset.
    pub fn index_key(&self, org_id: Id, name: &str) -> Result<Vec<u8>> {
        self.index.entity_key(&Entity::with_org_name(org_id, name))
    }

    /// Creates both buckets. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Storage`] if the engine rejects either bucket.
    pub fn init<W: WriteTxn + ?Sized>(&self, tx: &mut W) -> Result<()> {
        let _span = self.span(tx.span(), "init").entered();
        self.entities.init(tx)?;
        self.index.init(tx)
    }

    /// Writes `ent` and its index entry.
    ///
    /// # Errors
    ///
    /// - [`KvError::InvalidKey`] if the id, organization, name or body is missing
    /// - [`KvError::Conflict`] if another entity already holds the name
    /// - Encoding, decoding and storage errors from either store
    pub fn put<W: WriteTxn + ?Sized>(&self, tx: &mut W, ent: &Entity<B>) -> Result<()> {
        let _span = self.span(tx.span(), "put").entered();
        // No write happens until every key and value has encoded.
        let entity_key = self.entities.entity_key(ent)?;
        let entity_value = self.entities.entity_value(ent)?;
        let index_key = self.index.entity_key(ent)?;
        let index_value = self.index.entity_value(ent)?;

        if let Some(raw) = tx.get(self.index.bucket(), &index_key).context(StorageSnafu)? {
            let (_, existing) = self.index.decode_entry(&index_key, &raw)?;
            if existing != ent.id {
                debug!(
                    id = %ent.id,
                    existing = %existing,
                    "name already indexed to another entity"
                );
                return Err(KvError::Conflict {
                    resource: self.resource.clone(),
                    org_id: ent.org_id,
                    name: ent.name.clone(),
                    existing,
                });
            }
        }

        if let Some(raw) = tx.get(self.entities.bucket(), &entity_key).context(StorageSnafu)? {
            let (key, prior) = self.entities.decode_entry(&entity_key, &raw)?;
            let previous = self.entities.decode_to_ent(&key, &prior)?;
            match self.index.entity_key(&previous) {
                Ok(stale_key) if stale_key != index_key => {
                    tx.delete(self.index.bucket(), &stale_key).context(StorageSnafu)?;
                    debug!(id = %ent.id, "removed stale index entry");
                },
                _ => {},
            }
        }

        self.index.put_encoded(tx, &index_key, &index_value)?;
        self.entities.put_encoded(tx, &entity_key, &entity_value)
    }

    /// Looks up an entity by id, or by organization and name when the id is unset.
    ///
    /// # Errors
    ///
    /// - [`KvError::MissingKey`] if `ent` carries no id, organization or name
    /// - [`KvError::InvalidKey`] if only part of the organization/name pair is set
    /// - [`KvError::NotFound`] if no entity matches
    pub fn find_ent<R: ReadTxn + ?Sized>(&self, tx: &R, ent: &Entity<B>) -> Result<T> {
        let _span = self.span(tx.span(), "find_ent").entered();
        let id = self.resolve_id(tx, ent)?;
        self.entities.find_ent(tx, &Entity::with_id(id))
    }

    /// Visits entities in order.
    ///
    /// Without a prefix this scans the entity bucket in id order. With a prefix
    /// (typically [`org_prefix`](crate::org_prefix)) it scans the index in name
    /// order and looks up each entity; keys passed to the filter and to `capture`
    /// are then index keys.
    ///
    /// # Errors
    ///
    /// As [`EntStore::find`]. An index entry pointing at a missing entity
    /// surfaces as [`KvError::NotFound`].
    pub fn find<R, F>(&self, tx: &R, opts: &FindOpts<'_, T>, mut capture: F) -> Result<()>
    where
        R: ReadTxn + ?Sized,
        F: FnMut(&[u8], T) -> Result<()>,
    {
        if opts.prefix.is_empty() {
            return self.entities.find(tx, opts, capture);
        }

        let _span = self.span(tx.span(), "find").entered();
        let mut page = Paginator::new(opts.offset, opts.limit);
        for item in self.index.scan(tx, &opts.prefix, opts.descending)? {
            let Decoded { key, value: id, .. } = item?;
            let value = self.entities.find_ent(tx, &Entity::with_id(id))?;
            if !opts.admits(&key, &value) || !page.admit() {
                continue;
            }
            capture(&key, value)?;
            if page.is_full() {
                break;
            }
        }
        Ok(())
    }

    /// Collects every entity [`IndexedStore::find`] would capture.
    ///
    /// # Errors
    ///
    /// As [`IndexedStore::find`].
    pub fn find_all<R: ReadTxn + ?Sized>(&self, tx: &R, opts: &FindOpts<'_, T>) -> Result<Vec<T>> {
        let mut found = Vec::new();
        self.find(tx, opts, |_, value| {
            found.push(value);
            Ok(())
        })?;
        Ok(found)
    }

    /// Visits raw index entries, yielding each index key and the id it points to.
    ///
    /// # Errors
    ///
    /// As [`EntStore::find`].
    pub fn find_index<R, F>(&self, tx: &R, opts: &FindOpts<'_, Id>, capture: F) -> Result<()>
    where
        R: ReadTxn + ?Sized,
        F: FnMut(&[u8], Id) -> Result<()>,
    {
        self.index.find(tx, opts, capture)
    }

    /// Deletes an entity and its index entry, returning the deleted value.
    ///
    /// `ent` may address the entity by id or by organization and name.
    ///
    /// # Errors
    ///
    /// - [`KvError::MissingKey`] if `ent` carries no key
    /// - [`KvError::NotFound`] if the entity or its index entry is missing
    pub fn delete_ent<W: WriteTxn + ?Sized>(&self, tx: &mut W, ent: &Entity<B>) -> Result<T> {
        let _span = self.span(tx.span(), "delete_ent").entered();
        let id = self.resolve_id(&*tx, ent)?;
        let lookup = Entity::with_id(id);
        let key = self.entities.entity_key(&lookup)?;

        let existing = self.entities.delete_ent(tx, &lookup)?;
        let canonical = self.entities.decode_to_ent(&key, &existing)?;
        self.index.delete_ent(tx, &canonical)?;
        Ok(existing)
    }

    /// Deletes every entity matching the filter along with its index entry.
    ///
    /// The caller's relations run first for each entity, then the index entry is
    /// removed. Returns the number of entities deleted.
    ///
    /// # Errors
    ///
    /// As [`EntStore::delete`].
    pub fn delete<'a, W: WriteTxn + ?Sized>(
        &'a self,
        tx: &mut W,
        opts: DeleteOpts<'a, W, T>,
    ) -> Result<usize> {
        let _span = self.span(tx.span(), "delete").entered();
        let entities = &self.entities;
        let index = &self.index;
        let opts = opts.relation(move |tx: &mut W, key: &[u8], value: &T| {
            let ent = entities.decode_to_ent(key, value)?;
            index.delete_ent(tx, &ent).map(|_| ())
        });
        self.entities.delete(tx, opts)
    }

    fn resolve_id<R: ReadTxn + ?Sized>(&self, tx: &R, ent: &Entity<B>) -> Result<Id> {
        if ent.id.is_valid() {
            return Ok(ent.id);
        }
        if !ent.has_key() {
            return MissingKeySnafu { resource: self.resource.as_str() }.fail();
        }
        self.index.find_ent(tx, ent)
    }

    fn span(&self, parent: &Span, op: &'static str) -> Span {
        tracing::debug_span!(parent: parent, "entkv.indexed", op, resource = %self.resource)
    }
}

impl<B, T> std::fmt::Debug for IndexedStore<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedStore")
            .field("entities", &self.entities)
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use entkv_store::Database;
    use entkv_test_utils::{Foo, foo_ent};

    use super::*;
    use crate::{decode_json_body, encode_body_json, org_prefix};

    fn store(case_sensitive: bool) -> IndexedStore<Foo, Foo> {
        let config = StoreConfig::builder()
            .resource("foo")
            .entity_bucket("foo_ents")
            .index_bucket("foo_index")
            .case_sensitive_names(case_sensitive)
            .build()
            .expect("valid config");
        IndexedStore::from_config(
            &config,
            encode_body_json,
            decode_json_body("foo"),
            |_, foo: &Foo| Ok(foo.to_entity()),
        )
    }

    fn db_for(store: &IndexedStore<Foo, Foo>) -> Database {
        let db = Database::open_in_memory();
        db.update(|tx| store.init(tx)).expect("init");
        db
    }

    #[test]
    fn test_from_config_uses_configured_buckets() {
        let store = store(false);
        assert_eq!(store.resource(), "foo");
        assert_eq!(store.entity_bucket(), b"foo_ents");
        assert_eq!(store.index_bucket(), b"foo_index");
    }

    #[test]
    fn test_rename_moves_index_entry() {
        let store = store(false);
        let db = db_for(&store);
        db.update(|tx| store.put(tx, &foo_ent(1, 9000, "before"))).expect("put");
        db.update(|tx| store.put(tx, &foo_ent(1, 9000, "after"))).expect("rename");

        let tx = db.read();
        let old = store
            .find_ent(&tx, &Entity::with_org_name(Id::new(9000), "before"))
            .unwrap_err();
        assert!(old.is_not_found());
        let new =
            store.find_ent(&tx, &Entity::with_org_name(Id::new(9000), "after")).expect("find");
        assert_eq!(new.id, Id::new(1));

        let mut index_keys = Vec::new();
        store
            .find_index(&tx, &FindOpts::new(), |key, _| {
                index_keys.push(key.to_vec());
                Ok(())
            })
            .expect("scan index");
        assert_eq!(index_keys, vec![store.index_key(Id::new(9000), "after").expect("key")]);
    }

    #[test]
    fn test_reparent_moves_index_entry() {
        let store = store(false);
        let db = db_for(&store);
        db.update(|tx| store.put(tx, &foo_ent(1, 9000, "foo"))).expect("put");
        db.update(|tx| store.put(tx, &foo_ent(1, 9001, "foo"))).expect("move");

        let tx = db.read();
        let in_org = |org: u64| {
            store.find_all(&tx, &FindOpts::new().prefix(org_prefix(Id::new(org)))).expect("find")
        };
        assert!(in_org(9000).is_empty());
        let in_new = in_org(9001);
        assert_eq!(in_new.len(), 1);
    }

    #[test]
    fn test_name_taken_by_other_entity_conflicts() {
        let store = store(false);
        let db = db_for(&store);
        db.update(|tx| store.put(tx, &foo_ent(1, 9000, "Shared"))).expect("put");

        let err = db.update(|tx| store.put(tx, &foo_ent(2, 9000, "shared"))).unwrap_err();
        assert!(matches!(err, KvError::Conflict { existing, .. } if existing == Id::new(1)));

        let err = store.find_ent(&db.read(), &Entity::with_id(Id::new(2))).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_case_sensitive_names_are_distinct() {
        let store = store(true);
        let db = db_for(&store);
        db.update(|tx| {
            store.put(tx, &foo_ent(1, 9000, "Foo"))?;
            store.put(tx, &foo_ent(2, 9000, "foo"))
        })
        .expect("distinct names");

        let err = store
            .find_ent(&db.read(), &Entity::with_org_name(Id::new(9000), "FOO"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_partial_org_name_key_is_invalid() {
        let store = store(false);
        let db = db_for(&store);

        let err =
            store.find_ent(&db.read(), &Entity::with_org_name(Id::new(9000), "")).unwrap_err();
        assert!(err.is_invalid());
        assert!(matches!(err, KvError::InvalidKey { field: "name", .. }));
    }

    #[test]
    fn test_put_without_body_writes_nothing() {
        let store = store(false);
        let db = db_for(&store);
        db.update(|tx| store.put(tx, &foo_ent(1, 9000, "before"))).expect("put");

        let mut tx = db.write().expect("write");
        let mut renamed = Entity::with_org_name(Id::new(9000), "after");
        renamed.id = Id::new(1);
        let err = store.put(&mut tx, &renamed).unwrap_err();
        assert!(matches!(err, KvError::InvalidKey { field: "body", .. }));
        let mut fresh = Entity::with_org_name(Id::new(9000), "new");
        fresh.id = Id::new(7);
        assert!(store.put(&mut tx, &fresh).unwrap_err().is_invalid());
        tx.commit();

        let tx = db.read();
        let mut entries = Vec::new();
        store
            .find_index(&tx, &FindOpts::new(), |key, id| {
                entries.push((key.to_vec(), id));
                Ok(())
            })
            .expect("scan index");
        let before = store.index_key(Id::new(9000), "before").expect("key");
        assert_eq!(entries, vec![(before, Id::new(1))]);
        assert_eq!(store.find_ent(&tx, &Entity::with_id(Id::new(1))).expect("find").name, "before");
    }
}
