//! Recordset sources.
//!
//! A source is the forward-only data reader produced by whatever executed
//! the query. The materializer only ever consumes it through these traits.
//!
//! ## Positioning
//!
//! ```text
//! new source ──advance()──► recordset 0 ──advance()──► recordset 1 ── ... ──advance()──► false
//!                              │ has_more_rows()/read_row()
//! ```
//!
//! A source starts *before* its first recordset, so a query that returned
//! nothing simply answers `false` to the first `advance()`.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::row::{ColMetaData, Column, Row};

/// Blocking forward-only recordset reader.
pub trait RecordsetSource {
    /// Columns of the current recordset (empty before the first one).
    fn columns(&self) -> &[Column];

    /// Whether the current recordset has another unread row.
    fn has_more_rows(&mut self) -> Result<bool>;

    /// Read the next row of the current recordset.
    ///
    /// Callers check [`has_more_rows`](Self::has_more_rows) first.
    fn read_row(&mut self) -> Result<Row>;

    /// Move to the next recordset. Returns `false` when there is none.
    fn advance(&mut self) -> Result<bool>;

    /// Release the underlying reader.
    fn close(&mut self) -> Result<()>;
}

/// Suspendable forward-only recordset reader.
///
/// Identical contract to [`RecordsetSource`]; only the fetch operations are
/// asynchronous. `close` stays synchronous so a dropped or cancelled cursor
/// can still release the reader.
#[async_trait]
pub trait AsyncRecordsetSource: Send {
    /// Columns of the current recordset (empty before the first one).
    fn columns(&self) -> &[Column];

    /// Whether the current recordset has another unread row.
    async fn has_more_rows(&mut self) -> Result<bool>;

    /// Read the next row of the current recordset.
    async fn read_row(&mut self) -> Result<Row>;

    /// Move to the next recordset. Returns `false` when there is none.
    async fn advance(&mut self) -> Result<bool>;

    /// Release the underlying reader.
    fn close(&mut self) -> Result<()>;
}

/// A fully buffered recordset.
#[derive(Debug, Clone)]
pub struct ResultSet {
    /// Column metadata.
    metadata: Arc<ColMetaData>,
    /// Rows in source order.
    rows: Vec<Row>,
}

impl ResultSet {
    /// Create a result set from column names and raw row values.
    pub fn new<I, S>(columns: I, rows: Vec<Vec<recordgraph_types::SqlValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let metadata = Arc::new(ColMetaData::from_names(columns));
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&metadata), values))
            .collect();
        Self { metadata, rows }
    }

    /// Create a result set from typed columns and prebuilt rows.
    pub fn from_rows(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            metadata: Arc::new(ColMetaData::new(columns)),
            rows,
        }
    }

    /// Column metadata.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ColMetaData> {
        &self.metadata
    }

    /// Columns of this result set.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.metadata.columns
    }

    /// Rows of this result set.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// In-memory source over buffered result sets.
///
/// Implements both the blocking and the async source traits.
#[derive(Debug, Default)]
pub struct MemorySource {
    pending: VecDeque<ResultSet>,
    current: Option<(Vec<Column>, std::vec::IntoIter<Row>)>,
    closed: bool,
}

impl MemorySource {
    /// Create a source that yields the given result sets in order.
    pub fn new(result_sets: Vec<ResultSet>) -> Self {
        Self {
            pending: result_sets.into(),
            current: None,
            closed: false,
        }
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::from_source("memory source is closed"));
        }
        Ok(())
    }

    fn peek_more(&mut self) -> Result<bool> {
        self.ensure_open()?;
        Ok(self
            .current
            .as_ref()
            .is_some_and(|(_, rows)| !rows.as_slice().is_empty()))
    }

    fn next_row(&mut self) -> Result<Row> {
        self.ensure_open()?;
        self.current
            .as_mut()
            .and_then(|(_, rows)| rows.next())
            .ok_or_else(|| Error::from_source("no row available in the current result set"))
    }

    fn next_set(&mut self) -> Result<bool> {
        self.ensure_open()?;
        match self.pending.pop_front() {
            Some(set) => {
                self.current = Some((set.columns().to_vec(), set.rows.into_iter()));
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn current_columns(&self) -> &[Column] {
        self.current
            .as_ref()
            .map(|(columns, _)| columns.as_slice())
            .unwrap_or_default()
    }
}

impl RecordsetSource for MemorySource {
    fn columns(&self) -> &[Column] {
        self.current_columns()
    }

    fn has_more_rows(&mut self) -> Result<bool> {
        self.peek_more()
    }

    fn read_row(&mut self) -> Result<Row> {
        self.next_row()
    }

    fn advance(&mut self) -> Result<bool> {
        self.next_set()
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.pending.clear();
        self.current = None;
        Ok(())
    }
}

#[async_trait]
impl AsyncRecordsetSource for MemorySource {
    fn columns(&self) -> &[Column] {
        self.current_columns()
    }

    async fn has_more_rows(&mut self) -> Result<bool> {
        self.peek_more()
    }

    async fn read_row(&mut self) -> Result<Row> {
        self.next_row()
    }

    async fn advance(&mut self) -> Result<bool> {
        self.next_set()
    }

    fn close(&mut self) -> Result<()> {
        RecordsetSource::close(self)
    }
}
