use recordgraph::FromRow;

#[derive(FromRow)]
#[record(constructor = "empty")]
struct Marker {
    hits: i64,
}

impl Marker {
    fn empty() -> Self {
        Self { hits: -1 }
    }
}

fn main() {
    let descriptor = Marker::descriptor();
    assert_eq!(descriptor.constructors().len(), 1);
    assert!(descriptor.constructors()[0].params().is_empty());
}
