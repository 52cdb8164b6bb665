use crate::{
    relation::{RelationModel, ResolutionError, resolve},
    test_support::{MemCatalog, fixture_catalog},
};

#[test]
fn direct_relation_groups_on_the_target_foreign_key() {
    let catalog = fixture_catalog();
    let path = resolve(&catalog, "authors", "posts").expect("direct relation should resolve");

    assert_eq!(path.target, "posts");
    assert_eq!(path.group_column, "author_id");
    assert!(!path.requires_distinct);
    assert!(path.join.is_none());
}

#[test]
fn through_relation_groups_on_the_intermediate_parent_key() {
    let catalog = fixture_catalog();
    let path = resolve(&catalog, "authors", "tags").expect("through relation should resolve");

    assert_eq!(path.target, "tags");
    assert_eq!(path.group_column, "author_id");
    assert!(path.requires_distinct);

    let join = path.join.expect("through relation should carry a join hop");
    assert_eq!(join.entity, "taggings");
    assert_eq!(join.parent_key, "author_id");
    assert_eq!(join.source_key, "tag_id");
    assert_eq!(join.target_primary_key, "id");
}

#[test]
fn unknown_relation_is_a_resolution_error() {
    let catalog = fixture_catalog();
    let err = resolve(&catalog, "authors", "comments")
        .expect_err("unknown relation should not resolve");

    assert!(matches!(err, ResolutionError::UnknownRelation { .. }));
}

#[test]
fn missing_through_source_is_fatal() {
    // The intermediate declares no relation named "tag".
    let catalog = MemCatalog::new()
        .entity("tags", "id")
        .with_relation(
            "authors",
            RelationModel::has_many_through("tags", "tags", "taggings", "author_id", "tag"),
        );

    let err = resolve(&catalog, "authors", "tags")
        .expect_err("through relation without a source reflection should fail");

    assert!(matches!(
        err,
        ResolutionError::MissingThroughSource { ref through, ref source, .. }
            if through == "taggings" && source == "tag"
    ));
}

#[test]
fn through_source_must_be_a_foreign_key_reference() {
    // "tag" exists on the intermediate but reaches the target as has_many.
    let catalog = MemCatalog::new()
        .entity("tags", "id")
        .with_relation(
            "authors",
            RelationModel::has_many_through("tags", "tags", "taggings", "author_id", "tag"),
        )
        .with_relation("taggings", RelationModel::has_many("tag", "tags", "tagging_id"));

    let err = resolve(&catalog, "authors", "tags")
        .expect_err("non-belongs-to source reflection should fail");

    assert!(matches!(err, ResolutionError::UnsupportedThroughSource { .. }));
}

#[test]
fn through_source_targeting_a_different_entity_is_rejected() {
    let catalog = MemCatalog::new()
        .entity("tags", "id")
        .with_relation(
            "authors",
            RelationModel::has_many_through("tags", "tags", "taggings", "author_id", "tag"),
        )
        .with_relation("taggings", RelationModel::belongs_to("tag", "labels", "tag_id"));

    let err = resolve(&catalog, "authors", "tags")
        .expect_err("mismatched source target should fail");

    assert!(matches!(
        err,
        ResolutionError::ThroughTargetMismatch { ref declared, ref reached, .. }
            if declared == "tags" && reached == "labels"
    ));
}

#[test]
fn through_target_without_primary_key_metadata_is_rejected() {
    let catalog = MemCatalog::new()
        .with_relation(
            "authors",
            RelationModel::has_many_through("tags", "tags", "taggings", "author_id", "tag"),
        )
        .with_relation("taggings", RelationModel::belongs_to("tag", "tags", "tag_id"));

    let err = resolve(&catalog, "authors", "tags")
        .expect_err("missing primary-key metadata should fail");

    assert!(matches!(
        err,
        ResolutionError::MissingPrimaryKey { ref entity } if entity == "tags"
    ));
}

#[test]
fn built_in_scope_travels_with_the_resolved_path() {
    use crate::{filter::{FilterChain, FilterOp}, value::Value};

    let scope = FilterChain::new().append(FilterOp::new(
        "where_eq",
        [Value::Text("label".into()), Value::Text("Even".into())],
    ));
    let catalog = MemCatalog::new().with_relation(
        "authors",
        RelationModel::has_many("posts", "posts", "author_id").scoped(scope.clone()),
    );

    let path = resolve(&catalog, "authors", "posts").expect("scoped relation should resolve");
    assert_eq!(path.scope, scope);
}
