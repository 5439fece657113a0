//! Entity fixtures.

use entkv_types::{Entity, Id};
use serde::{Deserialize, Serialize};

/// Minimal entity body carrying its own addressing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Foo {
    /// Primary identifier.
    pub id: Id,
    /// Owning organization.
    pub org_id: Id,
    /// Name, unique within the organization.
    pub name: String,
}

impl Foo {
    /// Creates a body from raw ids.
    pub fn new(id: u64, org_id: u64, name: impl Into<String>) -> Self {
        Self { id: Id::new(id), org_id: Id::new(org_id), name: name.into() }
    }

    /// Addressing fields of this body as a key-only entity.
    pub fn to_entity(&self) -> Entity<Foo> {
        Entity { id: self.id, org_id: self.org_id, name: self.name.clone(), body: None }
    }

    /// Wraps this body in an entity ready to be written.
    pub fn into_entity(self) -> Entity<Foo> {
        Entity::new(self.id, self.org_id, self.name.clone(), self)
    }
}

/// Writable entity whose body mirrors its addressing fields.
pub fn foo_ent(id: u64, org_id: u64, name: &str) -> Entity<Foo> {
    Foo::new(id, org_id, name).into_entity()
}

/// The standard seed set: two entities in org 9000, one each in 9003 and 9004.
pub fn seed_ents() -> Vec<Entity<Foo>> {
    vec![
        foo_ent(1, 9000, "foo_0"),
        foo_ent(2, 9000, "foo_1"),
        foo_ent(3, 9003, "foo_2"),
        foo_ent(4, 9004, "foo_3"),
    ]
}
