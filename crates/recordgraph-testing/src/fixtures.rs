//! Fixture types and recordsets.
//!
//! The family types model a three-level graph that arrives as joined rows:
//!
//! ```text
//! GrandParentID | ParentID | ParentName | ChildID | ChildName
//! ```
//!
//! The customer types model a parent recordset followed by a child recordset
//! correlated by key, with the child key stored as text.

use recordgraph::{
    ChildKey, FromRow, GroupBy, Grouped, OneToOne, Plain, ResultSet, ResultShape, SqlValue,
};

/// Top of the family graph.
#[derive(Debug, Default, Clone, PartialEq, FromRow)]
pub struct Grandparent {
    /// `GrandParentID` column.
    #[record(rename = "GrandParentID")]
    pub id: i32,
    /// Attached after grouping.
    #[record(skip)]
    pub parents: Vec<Parent>,
}

/// Middle of the family graph.
#[derive(Debug, Default, Clone, PartialEq, FromRow)]
pub struct Parent {
    /// `ParentID` column.
    #[record(rename = "ParentID")]
    pub id: i32,
    /// `ParentName` column.
    #[record(rename = "ParentName")]
    pub name: String,
    /// Attached by grouping.
    #[record(skip)]
    pub children: Vec<Child>,
    /// Attached by a one-to-one split.
    #[record(skip)]
    pub favourite: Option<Child>,
}

/// Leaf of the family graph.
#[derive(Debug, Default, Clone, PartialEq, FromRow)]
pub struct Child {
    /// `ChildID` column.
    #[record(rename = "ChildID")]
    pub id: i32,
    /// `ChildName` column.
    #[record(rename = "ChildName")]
    pub name: String,
}

/// Parent recordset of the customer scenario.
#[derive(Debug, Default, Clone, PartialEq, FromRow)]
pub struct Customer {
    /// `Id` column.
    pub id: i32,
    /// `Name` column.
    pub name: String,
    /// Attached from the order recordset.
    #[record(skip)]
    pub orders: Vec<Order>,
}

/// Child recordset of the customer scenario.
#[derive(Debug, Default, Clone, PartialEq, FromRow)]
#[record(rename_all = "PascalCase")]
pub struct Order {
    /// `OrderId` column.
    pub order_id: i32,
    /// `CustomerId` column, stored as text and sometimes NULL.
    pub customer_id: Option<String>,
    /// `Total` column.
    pub total: i64,
}

/// Materializer for the family rows: grandparents grouped by
/// `GrandParentID`, parents grouped by `ParentID`, children in row order.
pub type FamilyMaterializer = Grouped<
    Grandparent,
    Grouped<Parent, Plain<Child>, fn(&mut Parent, Vec<Child>)>,
    fn(&mut Grandparent, Vec<Parent>),
>;

/// Build the family materializer.
#[must_use]
pub fn family_materializer() -> FamilyMaterializer {
    let parents = Grouped::new(
        "ChildID",
        GroupBy::column("ParentID"),
        Plain::<Child>::new(),
        attach_children as fn(&mut Parent, Vec<Child>),
    );
    Grouped::new(
        "ParentID",
        GroupBy::column("GrandParentID"),
        parents,
        attach_parents as fn(&mut Grandparent, Vec<Parent>),
    )
}

fn attach_children(parent: &mut Parent, children: Vec<Child>) {
    parent.children = children;
}

fn attach_parents(grandparent: &mut Grandparent, parents: Vec<Parent>) {
    grandparent.parents = parents;
}

/// Materializer for one parent and one optional child per row, split at
/// `ChildID`.
pub type FavouriteMaterializer = OneToOne<Parent, Plain<Child>, fn(&mut Parent, Option<Child>)>;

/// Build the one-to-one materializer.
#[must_use]
pub fn favourite_materializer() -> FavouriteMaterializer {
    OneToOne::new(
        "ChildID",
        Plain::<Child>::new(),
        attach_favourite as fn(&mut Parent, Option<Child>),
    )
}

fn attach_favourite(parent: &mut Parent, child: Option<Child>) {
    parent.favourite = child;
}

const FAMILY_COLUMNS: [&str; 5] = [
    "GrandParentID",
    "ParentID",
    "ParentName",
    "ChildID",
    "ChildName",
];

fn family_row(
    grandparent: i32,
    parent: i32,
    name: &str,
    child: i32,
    child_name: &str,
) -> Vec<SqlValue> {
    vec![
        SqlValue::Int(grandparent),
        SqlValue::Int(parent),
        SqlValue::String(name.into()),
        SqlValue::Int(child),
        SqlValue::String(child_name.into()),
    ]
}

/// One grandparent, one parent, two children.
#[must_use]
pub fn family_rows() -> ResultSet {
    ResultSet::new(
        FAMILY_COLUMNS,
        vec![
            family_row(0, 1, "Parent", 11, "ChildA"),
            family_row(0, 1, "Parent", 12, "ChildB"),
        ],
    )
}

/// Two grandparents whose rows interleave, including a parent without
/// children (NULL child columns).
#[must_use]
pub fn interleaved_family_rows() -> ResultSet {
    let childless = vec![
        SqlValue::Int(1),
        SqlValue::Int(3),
        SqlValue::String("Solo".into()),
        SqlValue::Null,
        SqlValue::Null,
    ];
    ResultSet::new(
        FAMILY_COLUMNS,
        vec![
            family_row(0, 1, "First", 11, "A"),
            family_row(1, 2, "Second", 21, "B"),
            family_row(0, 1, "First", 12, "C"),
            childless,
            family_row(1, 2, "Second", 22, "D"),
            family_row(0, 1, "First", 13, "E"),
        ],
    )
}

/// `[ParentID, ParentName, ChildID, ChildName]`, one row with a child and
/// one without.
#[must_use]
pub fn favourite_rows() -> ResultSet {
    ResultSet::new(
        ["ParentID", "ParentName", "ChildID", "ChildName"],
        vec![
            vec![
                SqlValue::Int(1),
                SqlValue::String("Parent".into()),
                SqlValue::Int(11),
                SqlValue::String("Child".into()),
            ],
            vec![
                SqlValue::Int(2),
                SqlValue::String("Lonely".into()),
                SqlValue::Null,
                SqlValue::Null,
            ],
        ],
    )
}

/// Three customers.
#[must_use]
pub fn customers() -> ResultSet {
    ResultSet::new(
        ["Id", "Name"],
        vec![
            vec![SqlValue::Int(1), SqlValue::String("Ada".into())],
            vec![SqlValue::Int(2), SqlValue::String("Brian".into())],
            vec![SqlValue::Int(3), SqlValue::String("Cleo".into())],
        ],
    )
}

/// Orders for customers 1 and 3, one orphan, and one with a NULL key.
#[must_use]
pub fn orders() -> ResultSet {
    let order = |id: i32, customer: SqlValue, total: i64| {
        vec![SqlValue::Int(id), customer, SqlValue::BigInt(total)]
    };
    ResultSet::new(
        ["OrderId", "CustomerId", "Total"],
        vec![
            order(100, SqlValue::String("3".into()), 50),
            order(101, SqlValue::String("1".into()), 20),
            order(102, SqlValue::String("3".into()), 75),
            order(103, SqlValue::String("9".into()), 5),
            order(104, SqlValue::Null, 1),
        ],
    )
}

/// Single-row recordset carrying a `TotalCount` column.
#[must_use]
pub fn total_count(count: i32) -> ResultSet {
    ResultSet::new(["TotalCount"], vec![vec![SqlValue::Int(count)]])
}

/// Customers, then their orders attached by `CustomerId`, then a total count.
#[must_use]
pub fn customer_orders_shape() -> ResultShape {
    ResultShape::new()
        .returns::<Customer>()
        .then_children::<Order, _, _, _>(
            |customer: &Customer| SqlValue::Int(customer.id),
            ChildKey::column("CustomerId"),
            |customer: &mut Customer, orders| customer.orders = orders,
        )
        .then_scalar("total", "TotalCount")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layouts() {
        assert_eq!(family_rows().len(), 2);
        assert_eq!(interleaved_family_rows().columns().len(), 5);
        assert_eq!(orders().len(), 5);
        assert_eq!(customer_orders_shape().recordsets(), 3);
        assert_eq!(customer_orders_shape().sets(), 1);
    }

    #[test]
    fn test_descriptors_use_column_names() {
        let descriptor = Parent::descriptor();
        assert_eq!(descriptor.members().len(), 2);
        assert_eq!(descriptor.member(0).unwrap().source_name(), "ParentID");
        assert_eq!(Order::descriptor().member(1).unwrap().source_name(), "CustomerId");
    }
}
