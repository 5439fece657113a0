//! entkv: typed entity storage over transactional buckets.
//!
//! This crate layers entity semantics on the engine in `entkv-store`:
//!
//! - [`EntStore`]: a single bucket with pluggable key/body encoders and decoders,
//!   supporting put, point lookup, point delete, paginated find and filtered delete
//! - [`org_name_index`]: an [`EntStore`] mapping `(org_id, name)` to entity ids
//! - [`IndexedStore`]: an entity store and its index kept consistent inside one
//!   transaction, so entities can be addressed by id or by organization and name
//!
//! Every operation takes the caller's transaction. Nothing here commits: the
//! caller decides whether a sequence of operations is kept or discarded.
//!
//! ## Example
//!
//! ```
//! use entkv::{FindOpts, IndexedStore, decode_json_body, encode_body_json, org_prefix};
//! use entkv_store::Database;
//! use entkv_types::{Entity, Id, config::StoreConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Dashboard {
//!     id: Id,
//!     org_id: Id,
//!     name: String,
//!     title: String,
//! }
//!
//! let config = StoreConfig::builder()
//!     .resource("dashboard")
//!     .entity_bucket("dashboards")
//!     .index_bucket("dashboard_index")
//!     .build()?;
//! let store = IndexedStore::<Dashboard, Dashboard>::from_config(
//!     &config,
//!     encode_body_json,
//!     decode_json_body("dashboard"),
//!     // Rebuilds the addressing fields so deletes and renames find the index entry.
//!     |_, d: &Dashboard| {
//!         Ok(Entity { id: d.id, org_id: d.org_id, name: d.name.clone(), body: None })
//!     },
//! );
//!
//! let ops = Dashboard {
//!     id: Id::new(1),
//!     org_id: Id::new(10),
//!     name: "Ops".to_string(),
//!     title: "ops board".to_string(),
//! };
//! let db = Database::open_in_memory();
//! db.update(|tx| {
//!     store.init(tx)?;
//!     store.put(tx, &Entity::new(ops.id, ops.org_id, ops.name.clone(), ops.clone()))
//! })?;
//!
//! let tx = db.read();
//! let board = store.find_ent(&tx, &Entity::with_org_name(Id::new(10), "ops"))?;
//! assert_eq!(board, ops);
//!
//! let all = store.find_all(&tx, &FindOpts::new().prefix(org_prefix(Id::new(10))))?;
//! assert_eq!(all.len(), 1);
//!
//! db.update(|tx| store.delete_ent(tx, &Entity::with_id(Id::new(1))))?;
//! assert!(store.find_ent(&db.read(), &Entity::with_org_name(Id::new(10), "ops")).is_err());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod encode;
pub mod error;
mod index;
mod indexed;
pub mod opts;
mod scan;
mod store;

pub use encode::{
    DecodedValToEntFn, DecodeBucketEntFn, EncodeEntFn, decode_json_body, decode_postcard_body,
    encode_body_json, encode_body_postcard, encode_id_key,
};
pub use error::{EncodeError, ErrorCode, KvError, Result};
pub use index::{index_key, org_name_index, org_prefix};
pub use indexed::IndexedStore;
pub use opts::{DeleteOpts, DeleteRelationFn, FilterFn, FindOpts};
pub use store::EntStore;
