//! Relation metadata consumed from the host persistence layer.
//!
//! The engine never inspects live queries to learn how a parent reaches its
//! related collection; everything here derives from static relation
//! descriptors supplied through [`RelationCatalog`].

mod resolve;

#[cfg(test)]
mod tests;

pub use resolve::{JoinHop, ResolutionError, ResolvedPath, resolve};

use crate::{filter::FilterChain, value::Value};

///
/// RelationKind
///
/// How a relation reaches its target rows.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationKind {
    /// Target table carries a foreign key back to the owner.
    HasMany { foreign_key: String },

    /// Target rows are reached via an intermediate join entity. The
    /// intermediate carries `through_foreign_key` back to the owner and
    /// declares `source` as its own relation onto the target.
    HasManyThrough {
        through: String,
        through_foreign_key: String,
        source: String,
    },

    /// Owner carries `foreign_key` referencing the target's primary key.
    /// Used as the connecting reflection of a through hop.
    BelongsTo { foreign_key: String },
}

///
/// RelationModel
///
/// One relation descriptor: name, target entity, reach strategy, and the
/// relation's built-in scope (the association's own filter, replayed before
/// any caller-supplied chain). The built-in scope may be empty.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationModel {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub scope: FilterChain,
}

impl RelationModel {
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::HasMany {
                foreign_key: foreign_key.into(),
            },
            scope: FilterChain::new(),
        }
    }

    pub fn has_many_through(
        name: impl Into<String>,
        target: impl Into<String>,
        through: impl Into<String>,
        through_foreign_key: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::HasManyThrough {
                through: through.into(),
                through_foreign_key: through_foreign_key.into(),
                source: source.into(),
            },
            scope: FilterChain::new(),
        }
    }

    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            kind: RelationKind::BelongsTo {
                foreign_key: foreign_key.into(),
            },
            scope: FilterChain::new(),
        }
    }

    /// Attach a built-in scope chain to this relation.
    #[must_use]
    pub fn scoped(mut self, scope: FilterChain) -> Self {
        self.scope = scope;
        self
    }
}

///
/// RelationCatalog
///
/// Host-supplied relation metadata: relation descriptors per (entity,
/// relation name) plus primary-key metadata per entity.
///

pub trait RelationCatalog {
    fn relation(&self, entity: &str, name: &str) -> Option<&RelationModel>;

    fn primary_key(&self, entity: &str) -> Option<&str>;
}

impl<C> RelationCatalog for std::sync::Arc<C>
where
    C: RelationCatalog + ?Sized,
{
    fn relation(&self, entity: &str, name: &str) -> Option<&RelationModel> {
        (**self).relation(entity, name)
    }

    fn primary_key(&self, entity: &str) -> Option<&str> {
        (**self).primary_key(entity)
    }
}

///
/// EntityIdentity
///
/// Primary-identifier accessor per entity instance. The engine treats parent
/// entities as plain data: it reads the entity name and identifier, nothing
/// else, and never installs behavior on the instance itself.
///

pub trait EntityIdentity {
    fn entity(&self) -> &'static str;

    fn id(&self) -> Value;
}
