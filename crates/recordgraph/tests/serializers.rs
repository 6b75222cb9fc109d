//! Column serializers applied during mapping.

#![allow(clippy::unwrap_used, clippy::panic, missing_docs)]

use std::sync::Arc;

use bytes::Bytes;
use recordgraph::{
    BindingCache, Error, FnSerializer, FromRow, MapperConfig, MemorySource, ResultSet,
    SerializationRules, SerializerError, SqlValue, query,
};

#[derive(Debug, Default, PartialEq, FromRow)]
struct Document {
    id: i32,
    #[record(serializer = "utf8")]
    body: String,
    archived: bool,
}

fn documents(archived: SqlValue) -> ResultSet {
    ResultSet::new(
        ["Id", "Body", "Archived"],
        vec![vec![
            SqlValue::Int(1),
            SqlValue::Binary(Bytes::from_static(b"hello")),
            archived,
        ]],
    )
}

fn yes_no(value: &SqlValue) -> Result<SqlValue, SerializerError> {
    match value {
        SqlValue::String(s) if s == "Y" => Ok(SqlValue::Bool(true)),
        SqlValue::String(s) if s == "N" => Ok(SqlValue::Bool(false)),
        SqlValue::Bool(_) | SqlValue::Null => Ok(value.clone()),
        other => Err(SerializerError::rejected("yes_no", format!("{other:?}"))),
    }
}

fn private_cache() -> Arc<BindingCache> {
    Arc::new(BindingCache::new())
}

#[test]
fn test_member_serializer_decodes_binary_text() {
    let found: Vec<Document> = query(
        MemorySource::new(vec![documents(SqlValue::Bool(true))]),
        &MapperConfig::default(),
    )
    .unwrap();

    assert_eq!(found[0].body, "hello");
    assert!(found[0].archived);
}

#[test]
fn test_type_rule_applies_to_every_member_of_that_type() {
    let rules =
        SerializationRules::with_builtins().for_type::<bool>(FnSerializer::new("yes_no", yes_no));
    let config = MapperConfig::new().cache(private_cache()).rules(rules);

    let yes = documents(SqlValue::String("Y".into()));
    let found: Vec<Document> = query(MemorySource::new(vec![yes]), &config).unwrap();
    assert!(found[0].archived);

    let err = query::<Document, _>(MemorySource::new(vec![documents(SqlValue::Int(3))]), &config)
        .unwrap_err();
    match err {
        Error::Mapping { member, reason, .. } => {
            assert_eq!(member, "Document.archived");
            assert!(reason.contains("yes_no"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_rules_are_scoped_to_their_pipeline() {
    let plain = MapperConfig::new().cache(private_cache());
    let err = query::<Document, _>(
        MemorySource::new(vec![documents(SqlValue::String("Y".into()))]),
        &plain,
    )
    .unwrap_err();
    assert!(err.is_mapping_error());
}

#[test]
fn test_member_serializer_must_be_registered() {
    let config = MapperConfig::new()
        .cache(private_cache())
        .rules(SerializationRules::new());
    let err = query::<Document, _>(
        MemorySource::new(vec![documents(SqlValue::Bool(false))]),
        &config,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Construction { .. }));
    assert!(err.to_string().contains("utf8"));
}

#[test]
fn test_invalid_utf8_is_a_mapping_error() {
    let bad = ResultSet::new(
        ["Id", "Body", "Archived"],
        vec![vec![
            SqlValue::Int(2),
            SqlValue::Binary(Bytes::from_static(&[0xff, 0xfe])),
            SqlValue::Bool(false),
        ]],
    );
    let err = query::<Document, _>(MemorySource::new(vec![bad]), &MapperConfig::default())
        .unwrap_err();

    assert!(err.is_mapping_error());
    assert!(err.to_string().contains("Document.body"));
}
