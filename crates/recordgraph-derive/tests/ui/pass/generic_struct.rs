use recordgraph::{FromRow, FromSql, ToFields, ToSql};

#[derive(Default, FromRow)]
struct Wrapper<T: FromSql + Default + Send + 'static> {
    value: T,
}

#[derive(ToFields)]
#[record(rename_all = "camelCase")]
struct Keyword<T: ToSql> {
    r#type: String,
    sort_order: T,
}

fn main() {
    let descriptor = <Wrapper<i32> as FromRow>::descriptor();
    assert_eq!(descriptor.members()[0].name(), "value");

    let keyword = Keyword {
        r#type: "tag".to_string(),
        sort_order: 1i32,
    };
    let fields = keyword.to_fields().unwrap();
    assert_eq!(fields[0].name, "type");
    assert_eq!(fields[1].name, "sortOrder");
}
