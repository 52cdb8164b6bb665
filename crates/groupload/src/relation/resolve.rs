//! Module: relation::resolve
//! Responsibility: translate a relation path into the pieces a grouped query
//! needs: join target, grouping key, dedup requirement.
//! Does not own: query execution or scope materialization.

use crate::{
    filter::FilterChain,
    relation::{RelationCatalog, RelationKind},
};
use core::fmt;

///
/// JoinHop
///
/// The intermediate hop of a through relation, as seen by the grouped query:
/// the join entity, its foreign key back to the parent (the grouping key
/// lives there), its foreign key referencing the target, and the target's
/// primary key for row-identity deduplication.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinHop {
    pub entity: String,
    pub parent_key: String,
    pub source_key: String,
    pub target_primary_key: String,
}

///
/// ResolvedPath
///
/// Everything grouped-query construction needs for one relation path.
/// Derived once per aggregation from static metadata; carries the relation's
/// built-in scope so the executor can replay it ahead of the caller's chain.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPath {
    pub target: String,
    pub group_column: String,
    pub requires_distinct: bool,
    pub join: Option<JoinHop>,
    pub scope: FilterChain,
}

///
/// ResolutionError
///
/// Fatal configuration errors. There is no safe default grouping for a path
/// the catalog cannot describe, so these surface to the caller immediately
/// and are never retried.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionError {
    UnknownRelation { entity: String, relation: String },

    MissingThroughSource {
        entity: String,
        relation: String,
        through: String,
        source: String,
    },

    UnsupportedThroughSource { through: String, source: String },

    ThroughTargetMismatch {
        entity: String,
        relation: String,
        declared: String,
        through: String,
        source: String,
        reached: String,
    },

    MissingPrimaryKey { entity: String },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRelation { entity, relation } => {
                write!(f, "unknown relation: {entity}.{relation}")
            }
            Self::MissingThroughSource {
                entity,
                relation,
                through,
                source,
            } => write!(
                f,
                "through relation {entity}.{relation}: intermediate {through} declares no relation named {source}"
            ),
            Self::UnsupportedThroughSource { through, source } => write!(
                f,
                "through source {through}.{source} does not reference the target with a foreign key"
            ),
            Self::ThroughTargetMismatch {
                entity,
                relation,
                declared,
                through,
                source,
                reached,
            } => write!(
                f,
                "through relation {entity}.{relation} targets {declared} but {through}.{source} reaches {reached}"
            ),
            Self::MissingPrimaryKey { entity } => {
                write!(f, "entity {entity} declares no primary key")
            }
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Resolve a relation path for grouped-query construction.
///
/// Direct relations group on the target-side foreign key with no join and no
/// dedup. Through relations group on the intermediate's parent-facing key and
/// always require dedup, because a many-to-many join can reach the same
/// target row through multiple join rows.
pub fn resolve<C>(catalog: &C, entity: &str, relation: &str) -> Result<ResolvedPath, ResolutionError>
where
    C: RelationCatalog + ?Sized,
{
    let model =
        catalog
            .relation(entity, relation)
            .ok_or_else(|| ResolutionError::UnknownRelation {
                entity: entity.to_string(),
                relation: relation.to_string(),
            })?;

    match &model.kind {
        RelationKind::HasMany { foreign_key } | RelationKind::BelongsTo { foreign_key } => {
            Ok(ResolvedPath {
                target: model.target.clone(),
                group_column: foreign_key.clone(),
                requires_distinct: false,
                join: None,
                scope: model.scope.clone(),
            })
        }
        RelationKind::HasManyThrough {
            through,
            through_foreign_key,
            source,
        } => {
            let connecting = catalog.relation(through, source).ok_or_else(|| {
                ResolutionError::MissingThroughSource {
                    entity: entity.to_string(),
                    relation: relation.to_string(),
                    through: through.clone(),
                    source: source.clone(),
                }
            })?;

            let RelationKind::BelongsTo { foreign_key } = &connecting.kind else {
                return Err(ResolutionError::UnsupportedThroughSource {
                    through: through.clone(),
                    source: source.clone(),
                });
            };

            if connecting.target != model.target {
                return Err(ResolutionError::ThroughTargetMismatch {
                    entity: entity.to_string(),
                    relation: relation.to_string(),
                    declared: model.target.clone(),
                    through: through.clone(),
                    source: source.clone(),
                    reached: connecting.target.clone(),
                });
            }

            let target_primary_key = catalog.primary_key(&model.target).ok_or_else(|| {
                ResolutionError::MissingPrimaryKey {
                    entity: model.target.clone(),
                }
            })?;

            Ok(ResolvedPath {
                target: model.target.clone(),
                group_column: through_foreign_key.clone(),
                requires_distinct: true,
                join: Some(JoinHop {
                    entity: through.clone(),
                    parent_key: through_foreign_key.clone(),
                    source_key: foreign_key.clone(),
                    target_primary_key: target_primary_key.to_string(),
                }),
                scope: model.scope.clone(),
            })
        }
    }
}
