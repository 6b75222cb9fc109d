//! Materialization over in-memory sources.

#![allow(clippy::unwrap_used, missing_docs)]

use recordgraph::{
    ChildKey, Error, FromRow, GroupBy, Grouped, KeyPolicy, MapperConfig, MemorySource, Plain,
    RecordsetCursor, ResultSet, ResultShape, Split, SqlValue, correlate, query, query_async,
    query_first, query_first_or_default, query_multiple, query_single,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Debug, Default, Clone, PartialEq, FromRow)]
struct Author {
    id: i32,
    name: String,
    #[record(skip)]
    books: Vec<Book>,
}

#[derive(Debug, Default, Clone, PartialEq, FromRow)]
struct Book {
    #[record(rename = "BookId")]
    id: i32,
    title: String,
    #[record(rename = "AuthorId")]
    author: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, FromRow)]
struct Publisher {
    #[record(rename = "PublisherId")]
    id: i32,
    #[record(rename = "PublisherName")]
    name: String,
}

fn authors() -> ResultSet {
    ResultSet::new(
        ["ID", "NAME", "Country"],
        vec![
            vec![
                SqlValue::Int(1),
                SqlValue::String("Le Guin".into()),
                SqlValue::String("US".into()),
            ],
            vec![
                SqlValue::Int(2),
                SqlValue::String("Lem".into()),
                SqlValue::String("PL".into()),
            ],
        ],
    )
}

fn books() -> ResultSet {
    let book = |id: i32, title: &str, author: SqlValue| {
        vec![SqlValue::Int(id), SqlValue::String(title.into()), author]
    };
    ResultSet::new(
        ["BookId", "Title", "AuthorId"],
        vec![
            book(10, "Solaris", SqlValue::BigInt(2)),
            book(11, "Earthsea", SqlValue::BigInt(1)),
            book(12, "The Dispossessed", SqlValue::BigInt(1)),
            book(13, "Anonymous", SqlValue::Null),
        ],
    )
}

#[test]
fn test_query_binds_case_insensitively_and_ignores_extra_columns() {
    init_tracing();
    let found: Vec<Author> = query(MemorySource::new(vec![authors()]), &MapperConfig::default())
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!((found[0].id, found[0].name.as_str()), (1, "Le Guin"));
    assert_eq!((found[1].id, found[1].name.as_str()), (2, "Lem"));
    assert!(found.iter().all(|a| a.books.is_empty()));
}

#[test]
fn test_single_row_helpers() {
    let config = MapperConfig::default();

    let first: Author = query_first(MemorySource::new(vec![authors()]), &config).unwrap();
    assert_eq!(first.id, 1);

    let none: Option<Author> = query_first_or_default(MemorySource::new(Vec::new()), &config)
        .unwrap();
    assert_eq!(none, None);

    let err = query_first::<Author, _>(MemorySource::new(Vec::new()), &config).unwrap_err();
    assert!(matches!(err, Error::Cardinality { actual: 0, .. }));

    let err = query_single::<Author, _>(MemorySource::new(vec![authors()]), &config).unwrap_err();
    assert!(matches!(err, Error::Cardinality { actual: 2, .. }));
}

#[test]
fn test_children_keyed_by_field_across_integer_widths() {
    init_tracing();
    let shape = ResultShape::new().returns::<Author>().then_children::<Book, _, _, _>(
        |author: &Author| SqlValue::Int(author.id),
        ChildKey::field(|book: &Book| {
            book.author.map(SqlValue::BigInt).unwrap_or_default()
        }),
        |author: &mut Author, books| author.books = books,
    );

    let mut results = query_multiple(
        MemorySource::new(vec![authors(), books()]),
        &shape,
        &MapperConfig::default(),
    )
    .unwrap();
    let found: Vec<Author> = results.take(0).unwrap();

    let titles = |a: &Author| a.books.iter().map(|b| b.title.clone()).collect::<Vec<_>>();
    assert_eq!(titles(&found[0]), ["Earthsea", "The Dispossessed"]);
    assert_eq!(titles(&found[1]), ["Solaris"]);
}

#[test]
fn test_correlate_in_memory_lists() {
    let mut found: Vec<Author> =
        query(MemorySource::new(vec![authors()]), &MapperConfig::default()).unwrap();
    let loose: Vec<Book> = query(MemorySource::new(vec![books()]), &MapperConfig::default())
        .unwrap();

    let dropped = correlate(
        &mut found,
        loose,
        |a: &Author| SqlValue::Int(a.id),
        |b: &Book| b.author.map(SqlValue::BigInt).unwrap_or_default(),
        |a: &mut Author, books| a.books = books,
        KeyPolicy::Strict,
    );

    assert_eq!(dropped, 1);
    assert_eq!(found[0].books.len(), 2);
    assert_eq!(found[1].books[0].id, 10);
}

fn catalogue() -> ResultSet {
    let row = |book: i32, title: &str, publisher: SqlValue, name: SqlValue| {
        vec![
            SqlValue::Int(book),
            SqlValue::String(title.into()),
            SqlValue::Null,
            publisher,
            name,
        ]
    };
    ResultSet::new(
        ["BookId", "Title", "AuthorId", "PublisherId", "PublisherName"],
        vec![
            row(10, "Solaris", SqlValue::Int(7), SqlValue::String("Faber".into())),
            row(11, "Earthsea", SqlValue::Int(8), SqlValue::String("Gollancz".into())),
        ],
    )
}

#[test]
fn test_split_pairs_each_row() {
    let shape = ResultShape::new().returns_with(Split::new(
        "PublisherId",
        Plain::<Book>::new(),
        Plain::<Publisher>::new(),
    ));
    let results = query_multiple(
        MemorySource::new(vec![catalogue()]),
        &shape,
        &MapperConfig::default(),
    )
    .unwrap();
    let pairs = results.set::<(Book, Publisher)>(0).unwrap();

    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].0.title, "Solaris");
    assert_eq!(pairs[0].1.name, "Faber");
    assert_eq!(pairs[1].1.id, 8);
}

#[test]
fn test_split_column_must_exist() {
    let shape = ResultShape::new().returns_with(Split::new(
        "ImprintId",
        Plain::<Book>::new(),
        Plain::<Publisher>::new(),
    ));
    let err = query_multiple(
        MemorySource::new(vec![catalogue()]),
        &shape,
        &MapperConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch(_)));
    assert!(err.to_string().contains("ImprintId"));
}

#[test]
fn test_grouped_by_parent_key() {
    let shape = ResultShape::new().returns_with(Grouped::new(
        "BookId",
        GroupBy::key(|a: &Author| SqlValue::Int(a.id)),
        Plain::<Book>::new(),
        |a: &mut Author, books| a.books = books,
    ));
    let rows = ResultSet::new(
        ["Id", "Name", "BookId", "Title", "AuthorId"],
        vec![
            vec![
                SqlValue::Int(2),
                SqlValue::String("Lem".into()),
                SqlValue::Int(10),
                SqlValue::String("Solaris".into()),
                SqlValue::BigInt(2),
            ],
            vec![
                SqlValue::Int(1),
                SqlValue::String("Le Guin".into()),
                SqlValue::Int(11),
                SqlValue::String("Earthsea".into()),
                SqlValue::BigInt(1),
            ],
            vec![
                SqlValue::Int(2),
                SqlValue::String("Lem".into()),
                SqlValue::Int(14),
                SqlValue::String("Fiasco".into()),
                SqlValue::BigInt(2),
            ],
        ],
    );

    let mut results =
        query_multiple(MemorySource::new(vec![rows]), &shape, &MapperConfig::default()).unwrap();
    let grouped: Vec<Author> = results.take(0).unwrap();

    assert_eq!(grouped.iter().map(|a| a.id).collect::<Vec<_>>(), [2, 1]);
    assert_eq!(
        grouped[0].books.iter().map(|b| b.id).collect::<Vec<_>>(),
        [10, 14]
    );
}

#[test]
fn test_cursor_iterates_rows_by_hand() {
    let mut cursor = RecordsetCursor::new(MemorySource::new(vec![authors(), books()]));

    cursor.expect_result().unwrap();
    assert_eq!(cursor.columns().len(), 3);
    let names: Vec<String> = cursor
        .rows()
        .map(|row| row.unwrap().get_by_name::<String>("name").unwrap())
        .collect();
    assert_eq!(names, ["Le Guin", "Lem"]);

    cursor.expect_result().unwrap();
    let counted = cursor
        .for_each::<Book, _>(&MapperConfig::default(), |_| Ok(()))
        .unwrap();
    assert_eq!(counted, 4);
    assert!(!cursor.next_result().unwrap());
}

#[test]
fn test_async_query_over_memory_source() {
    let found: Vec<Book> = tokio_test::block_on(query_async(
        MemorySource::new(vec![books()]),
        &MapperConfig::default(),
    ))
    .unwrap();

    assert_eq!(found.len(), 4);
    assert_eq!(found[3].author, None);
}
