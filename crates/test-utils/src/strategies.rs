//! Proptest strategies for entkv domain types.
//!
//! # Usage
//!
//! ```no_run
//! use entkv_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(ents in strategies::arb_foo_ents(16)) {
//!         // test invariant with randomly generated entities
//!     }
//! }
//! ```

use entkv_types::{Entity, Id};
use proptest::prelude::*;

use crate::fixtures::Foo;

/// Generates an organization id from a small pool, so generated entities collide
/// on organizations often.
pub fn arb_org_id() -> impl Strategy<Value = Id> {
    (9000u64..9004).prop_map(Id::new)
}

/// Generates a name of 1-12 characters with mixed case.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,11}"
}

/// Generates up to `max` entities with distinct ids and distinct
/// case-insensitive names per organization.
pub fn arb_foo_ents(max: usize) -> impl Strategy<Value = Vec<Entity<Foo>>> {
    proptest::collection::vec((arb_org_id(), arb_name()), 0..=max).prop_map(|pairs| {
        let mut seen = std::collections::HashSet::new();
        pairs
            .into_iter()
            .filter(|(org, name)| seen.insert((*org, name.to_lowercase())))
            .zip(1u64..)
            .map(|((org, name), id)| Foo::new(id, org.value(), name).into_entity())
            .collect()
    })
}
