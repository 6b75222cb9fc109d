//! One-call materialization helpers.
//!
//! These wrap a source in a cursor, read what they need and close the cursor
//! before returning. Errors drop the cursor, which still releases the source.

use crate::config::MapperConfig;
use crate::cursor::{AsyncRecordsetCursor, RecordsetCursor};
use crate::error::{Error, Result};
use crate::from_row::FromRow;
use crate::shape::{ResultShape, Results};
use crate::source::{AsyncRecordsetSource, RecordsetSource};

/// Map every row of the first recordset.
pub fn query<T: FromRow, S: RecordsetSource>(source: S, config: &MapperConfig) -> Result<Vec<T>> {
    let mut cursor = RecordsetCursor::new(source);
    let items = if cursor.next_result()? {
        cursor.read::<T>(config)?
    } else {
        Vec::new()
    };
    cursor.close()?;
    Ok(items)
}

/// Map the first row of the first recordset.
///
/// # Errors
///
/// Returns [`Error::Cardinality`] if there is no row.
pub fn query_first<T: FromRow, S: RecordsetSource>(source: S, config: &MapperConfig) -> Result<T> {
    query_first_or_default(source, config)?.ok_or(Error::Cardinality {
        expected: "at least one",
        actual: 0,
    })
}

/// Map the first row of the first recordset, `None` if there is no row.
pub fn query_first_or_default<T: FromRow, S: RecordsetSource>(
    source: S,
    config: &MapperConfig,
) -> Result<Option<T>> {
    let items = query::<T, S>(source, config)?;
    Ok(items.into_iter().next())
}

/// Map the only row of the first recordset.
///
/// # Errors
///
/// Returns [`Error::Cardinality`] unless there is exactly one row.
pub fn query_single<T: FromRow, S: RecordsetSource>(source: S, config: &MapperConfig) -> Result<T> {
    single(query::<T, S>(source, config)?)
}

/// Read a whole result shape.
pub fn query_multiple<S: RecordsetSource>(
    source: S,
    shape: &ResultShape,
    config: &MapperConfig,
) -> Result<Results> {
    let mut cursor = RecordsetCursor::new(source);
    let results = shape.read(&mut cursor, config)?;
    cursor.close()?;
    Ok(results)
}

/// Map every row of the first recordset.
pub async fn query_async<T: FromRow, S: AsyncRecordsetSource>(
    source: S,
    config: &MapperConfig,
) -> Result<Vec<T>> {
    let mut cursor = AsyncRecordsetCursor::new(source);
    let items = if cursor.next_result().await? {
        cursor.read::<T>(config).await?
    } else {
        Vec::new()
    };
    cursor.close()?;
    Ok(items)
}

/// Map the first row of the first recordset.
pub async fn query_first_async<T: FromRow, S: AsyncRecordsetSource>(
    source: S,
    config: &MapperConfig,
) -> Result<T> {
    query_async::<T, S>(source, config)
        .await?
        .into_iter()
        .next()
        .ok_or(Error::Cardinality {
            expected: "at least one",
            actual: 0,
        })
}

/// Map the only row of the first recordset.
pub async fn query_single_async<T: FromRow, S: AsyncRecordsetSource>(
    source: S,
    config: &MapperConfig,
) -> Result<T> {
    single(query_async::<T, S>(source, config).await?)
}

/// Read a whole result shape.
pub async fn query_multiple_async<S: AsyncRecordsetSource>(
    source: S,
    shape: &ResultShape,
    config: &MapperConfig,
) -> Result<Results> {
    let mut cursor = AsyncRecordsetCursor::new(source);
    let results = shape.read_async(&mut cursor, config).await?;
    cursor.close()?;
    Ok(results)
}

fn single<T>(items: Vec<T>) -> Result<T> {
    let actual = items.len();
    let mut items = items.into_iter();
    match (items.next(), items.next()) {
        (Some(item), None) => Ok(item),
        _ => Err(Error::Cardinality {
            expected: "exactly one",
            actual,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dynamic::DynamicRow;
    use crate::source::{MemorySource, ResultSet};
    use recordgraph_types::SqlValue;

    fn ids(values: &[i32]) -> MemorySource {
        MemorySource::new(vec![ResultSet::new(
            ["Id"],
            values.iter().map(|v| vec![SqlValue::Int(*v)]).collect(),
        )])
    }

    #[test]
    fn test_query_variants() {
        let config = MapperConfig::default();
        assert_eq!(query::<DynamicRow, _>(ids(&[1, 2]), &config).unwrap().len(), 2);
        assert!(query::<DynamicRow, _>(MemorySource::new(vec![]), &config).unwrap().is_empty());

        let first: DynamicRow = query_first(ids(&[4, 5]), &config).unwrap();
        assert_eq!(first.get_as::<i32>("id").unwrap(), 4);
        assert!(query_first_or_default::<DynamicRow, _>(ids(&[]), &config).unwrap().is_none());
        assert!(matches!(
            query_first::<DynamicRow, _>(ids(&[]), &config),
            Err(Error::Cardinality { actual: 0, .. })
        ));
    }

    #[test]
    fn test_query_single_cardinality() {
        let config = MapperConfig::default();
        assert!(query_single::<DynamicRow, _>(ids(&[1]), &config).is_ok());
        assert!(matches!(
            query_single::<DynamicRow, _>(ids(&[1, 2]), &config),
            Err(Error::Cardinality { actual: 2, .. })
        ));
        assert!(matches!(
            query_single::<DynamicRow, _>(ids(&[]), &config),
            Err(Error::Cardinality { actual: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_async_query_variants() {
        let config = MapperConfig::default();
        assert_eq!(query_async::<DynamicRow, _>(ids(&[1, 2, 3]), &config).await.unwrap().len(), 3);
        let single: DynamicRow = query_single_async(ids(&[9]), &config).await.unwrap();
        assert_eq!(single.get_as::<i64>("ID").unwrap(), 9);
        assert!(query_first_async::<DynamicRow, _>(ids(&[]), &config).await.is_err());
    }
}
