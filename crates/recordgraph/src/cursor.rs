//! Forward-only recordset cursors.
//!
//! A cursor walks the recordsets of a [`RecordsetSource`] in order and
//! guarantees the source is released exactly once.
//!
//! ## States
//!
//! ```text
//! BeforeFirstResult ──next_result()──► OnResult(0) ──► OnResult(1) ── ... ──► AfterLastResult
//!         │                                  │                                      │
//!         └────────────── close() / drop ────┴──────────────────────────────────────┴──► Closed
//! ```
//!
//! The source is closed when the cursor reaches `AfterLastResult`, on an
//! explicit [`close`](RecordsetCursor::close), or when the cursor is dropped,
//! whichever happens first. Drop covers errors, panics, early returns and
//! cancelled futures.
//!
//! Rows are fetched from the source and only then mapped, so the async
//! cursor suspends at fetch boundaries and never in the middle of mapping.

use std::fmt;
use std::sync::Arc;

use crate::config::MapperConfig;
use crate::error::{Error, Result};
use crate::from_row::{FromRow, RowIteratorExt};
use crate::mapper::RowMapper;
use crate::row::{ColMetaData, Column, Row};
use crate::source::{AsyncRecordsetSource, RecordsetSource};

/// Position of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorState {
    /// Created; no recordset has been entered yet.
    BeforeFirstResult,
    /// Positioned on the recordset with this index.
    OnResult(usize),
    /// Every recordset has been consumed.
    AfterLastResult,
    /// Closed; every further operation fails.
    Closed,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeFirstResult => f.write_str("before first result"),
            Self::OnResult(i) => write!(f, "on result {i}"),
            Self::AfterLastResult => f.write_str("after last result"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Source-independent cursor bookkeeping shared by both cursors.
#[derive(Debug)]
struct Position {
    state: CursorState,
    metadata: Arc<ColMetaData>,
    exhausted: bool,
}

impl Position {
    fn new() -> Self {
        Self {
            state: CursorState::BeforeFirstResult,
            metadata: Arc::new(ColMetaData::new(Vec::new())),
            exhausted: true,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == CursorState::Closed {
            return Err(Error::CursorState("cursor is closed".into()));
        }
        Ok(())
    }

    fn ensure_on_result(&self) -> Result<()> {
        match self.state {
            CursorState::OnResult(_) => Ok(()),
            CursorState::Closed => Err(Error::CursorState("cursor is closed".into())),
            other => Err(Error::CursorState(format!(
                "no current recordset (cursor is {other})"
            ))),
        }
    }

    fn next_index(&self) -> usize {
        match self.state {
            CursorState::OnResult(i) => i + 1,
            _ => 0,
        }
    }

    /// Record the outcome of advancing the source. Returns whether the
    /// source must now be released.
    fn advanced(&mut self, entered: bool, columns: &[Column]) -> bool {
        if entered {
            let index = self.next_index();
            self.state = CursorState::OnResult(index);
            self.metadata = Arc::new(ColMetaData::new(columns.to_vec()));
            self.exhausted = false;
            tracing::debug!(recordset = index, columns = columns.len(), "entered recordset");
            false
        } else {
            self.state = CursorState::AfterLastResult;
            self.metadata = Arc::new(ColMetaData::new(Vec::new()));
            self.exhausted = true;
            tracing::debug!("no more recordsets");
            true
        }
    }

    fn columns(&self) -> &[Column] {
        &self.metadata.columns
    }

    fn result_index(&self) -> Option<usize> {
        match self.state {
            CursorState::OnResult(i) => Some(i),
            _ => None,
        }
    }
}

fn close_logged(close: Result<()>) -> Result<()> {
    match &close {
        Ok(()) => tracing::debug!("recordset source released"),
        Err(e) => tracing::debug!(error = %e, "recordset source failed to close"),
    }
    close
}

/// Blocking recordset cursor.
pub struct RecordsetCursor<S: RecordsetSource> {
    source: Option<S>,
    position: Position,
}

impl<S: RecordsetSource> RecordsetCursor<S> {
    /// Wrap a source positioned before its first recordset.
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            position: Position::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CursorState {
        self.position.state
    }

    /// Index of the current recordset.
    #[must_use]
    pub fn result_index(&self) -> Option<usize> {
        self.position.result_index()
    }

    /// Columns of the current recordset (empty outside a recordset).
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.position.columns()
    }

    /// Shared metadata of the current recordset.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ColMetaData> {
        &self.position.metadata
    }

    /// Advance to the next recordset.
    ///
    /// Unread rows of the current recordset are discarded first. Returns
    /// `false` once no recordset remains; further calls keep returning
    /// `false`.
    pub fn next_result(&mut self) -> Result<bool> {
        self.position.ensure_open()?;
        if self.position.state == CursorState::AfterLastResult {
            return Ok(false);
        }
        if matches!(self.position.state, CursorState::OnResult(_)) && !self.position.exhausted {
            let skipped = self.drain()?;
            if skipped > 0 {
                tracing::trace!(rows = skipped, "discarded unread rows");
            }
        }

        let source = self.source_mut()?;
        let entered = source.advance()?;
        let columns = if entered { source.columns().to_vec() } else { Vec::new() };
        if self.position.advanced(entered, &columns) {
            self.release()?;
        }
        Ok(entered)
    }

    /// Advance to the next recordset, failing if there is none.
    pub fn expect_result(&mut self) -> Result<()> {
        if self.next_result()? {
            Ok(())
        } else {
            Err(Error::CursorState("no more recordsets".into()))
        }
    }

    /// Read the next row of the current recordset.
    ///
    /// Returns `None` once the recordset is exhausted.
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        self.position.ensure_on_result()?;
        if self.position.exhausted {
            return Ok(None);
        }
        let source = self.source_mut()?;
        if source.has_more_rows()? {
            source.read_row().map(Some)
        } else {
            self.position.exhausted = true;
            Ok(None)
        }
    }

    /// Discard the remaining rows of the current recordset.
    ///
    /// Returns the number of rows discarded.
    pub fn drain(&mut self) -> Result<usize> {
        let mut count = 0;
        while self.next_row()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Read the remaining rows of the current recordset.
    pub fn read_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Read and map the remaining rows of the current recordset.
    pub fn read<T: FromRow>(&mut self, config: &MapperConfig) -> Result<Vec<T>> {
        let rows = self.read_all()?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mapper = RowMapper::<T>::new(&self.position.metadata, config)?;
        mapper.map_all(&rows)
    }

    /// Map the remaining rows one at a time and pass each to `f`.
    ///
    /// An error from `f` stops iteration and is returned as-is. Returns the
    /// number of rows handled. The mapper is prepared on the first row, so an
    /// empty recordset yields `Ok(0)` like [`read`](Self::read).
    pub fn for_each<T, F>(&mut self, config: &MapperConfig, mut f: F) -> Result<usize>
    where
        T: FromRow,
        F: FnMut(T) -> Result<()>,
    {
        let Some(first) = self.next_row()? else {
            return Ok(0);
        };
        let mapper = RowMapper::<T>::new(&self.position.metadata, config)?;
        f(mapper.map(&first)?)?;
        let mut count = 1;
        for item in self.rows().map_rows(&mapper) {
            f(item?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Iterate over the remaining rows of the current recordset.
    pub fn rows(&mut self) -> Rows<'_, S> {
        Rows { cursor: self }
    }

    /// Close the cursor, releasing the source if it is still held.
    ///
    /// Closing an already closed cursor is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let released = self.release();
        self.position.state = CursorState::Closed;
        released
    }

    fn source_mut(&mut self) -> Result<&mut S> {
        self.source
            .as_mut()
            .ok_or_else(|| Error::CursorState("recordset source already released".into()))
    }

    fn release(&mut self) -> Result<()> {
        match self.source.take() {
            Some(mut source) => close_logged(source.close()),
            None => Ok(()),
        }
    }
}

impl<S: RecordsetSource> Drop for RecordsetCursor<S> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl<S: RecordsetSource> fmt::Debug for RecordsetCursor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordsetCursor")
            .field("state", &self.position.state)
            .field("columns", &self.position.metadata.len())
            .field("released", &self.source.is_none())
            .finish()
    }
}

/// Iterator over the remaining rows of a cursor's current recordset.
pub struct Rows<'c, S: RecordsetSource> {
    cursor: &'c mut RecordsetCursor<S>,
}

impl<S: RecordsetSource> Iterator for Rows<'_, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_row().transpose()
    }
}

/// Suspendable recordset cursor.
///
/// Same states and release guarantees as [`RecordsetCursor`].
pub struct AsyncRecordsetCursor<S: AsyncRecordsetSource> {
    source: Option<S>,
    position: Position,
}

impl<S: AsyncRecordsetSource> AsyncRecordsetCursor<S> {
    /// Wrap a source positioned before its first recordset.
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            position: Position::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CursorState {
        self.position.state
    }

    /// Index of the current recordset.
    #[must_use]
    pub fn result_index(&self) -> Option<usize> {
        self.position.result_index()
    }

    /// Columns of the current recordset (empty outside a recordset).
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        self.position.columns()
    }

    /// Shared metadata of the current recordset.
    #[must_use]
    pub fn metadata(&self) -> &Arc<ColMetaData> {
        &self.position.metadata
    }

    /// Advance to the next recordset, discarding unread rows first.
    pub async fn next_result(&mut self) -> Result<bool> {
        self.position.ensure_open()?;
        if self.position.state == CursorState::AfterLastResult {
            return Ok(false);
        }
        if matches!(self.position.state, CursorState::OnResult(_)) && !self.position.exhausted {
            let skipped = self.drain().await?;
            if skipped > 0 {
                tracing::trace!(rows = skipped, "discarded unread rows");
            }
        }

        let source = self.source_mut()?;
        let entered = source.advance().await?;
        let columns = if entered { source.columns().to_vec() } else { Vec::new() };
        if self.position.advanced(entered, &columns) {
            self.release()?;
        }
        Ok(entered)
    }

    /// Advance to the next recordset, failing if there is none.
    pub async fn expect_result(&mut self) -> Result<()> {
        if self.next_result().await? {
            Ok(())
        } else {
            Err(Error::CursorState("no more recordsets".into()))
        }
    }

    /// Read the next row of the current recordset.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        self.position.ensure_on_result()?;
        if self.position.exhausted {
            return Ok(None);
        }
        let source = self.source_mut()?;
        if source.has_more_rows().await? {
            source.read_row().await.map(Some)
        } else {
            self.position.exhausted = true;
            Ok(None)
        }
    }

    /// Discard the remaining rows of the current recordset.
    pub async fn drain(&mut self) -> Result<usize> {
        let mut count = 0;
        while self.next_row().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Read the remaining rows of the current recordset.
    pub async fn read_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Read and map the remaining rows of the current recordset.
    pub async fn read<T: FromRow>(&mut self, config: &MapperConfig) -> Result<Vec<T>> {
        let rows = self.read_all().await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let mapper = RowMapper::<T>::new(&self.position.metadata, config)?;
        mapper.map_all(&rows)
    }

    /// Map the remaining rows one at a time and pass each to `f`.
    pub async fn for_each<T, F>(&mut self, config: &MapperConfig, mut f: F) -> Result<usize>
    where
        T: FromRow,
        F: FnMut(T) -> Result<()> + Send,
    {
        let Some(first) = self.next_row().await? else {
            return Ok(0);
        };
        let mapper = RowMapper::<T>::new(&self.position.metadata, config)?;
        f(mapper.map(&first)?)?;
        let mut count = 1;
        while let Some(row) = self.next_row().await? {
            f(mapper.map(&row)?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Close the cursor, releasing the source if it is still held.
    pub fn close(&mut self) -> Result<()> {
        let released = self.release();
        self.position.state = CursorState::Closed;
        released
    }

    fn source_mut(&mut self) -> Result<&mut S> {
        self.source
            .as_mut()
            .ok_or_else(|| Error::CursorState("recordset source already released".into()))
    }

    fn release(&mut self) -> Result<()> {
        match self.source.take() {
            Some(mut source) => close_logged(source.close()),
            None => Ok(()),
        }
    }
}

impl<S: AsyncRecordsetSource> Drop for AsyncRecordsetCursor<S> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

impl<S: AsyncRecordsetSource> fmt::Debug for AsyncRecordsetCursor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncRecordsetCursor")
            .field("state", &self.position.state)
            .field("columns", &self.position.metadata.len())
            .field("released", &self.source.is_none())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::binding::BindingCache;
    use crate::descriptor::TypeDescriptor;
    use crate::dynamic::DynamicRow;
    use crate::mapper::BoundRow;
    use crate::source::{MemorySource, ResultSet};
    use recordgraph_types::SqlValue;

    fn two_sets() -> MemorySource {
        MemorySource::new(vec![
            ResultSet::new(
                ["Id"],
                vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)], vec![SqlValue::Int(3)]],
            ),
            ResultSet::new(["Name"], vec![vec![SqlValue::String("a".into())]]),
        ])
    }

    #[test]
    fn test_walks_states() {
        let mut cursor = RecordsetCursor::new(two_sets());
        assert_eq!(cursor.state(), CursorState::BeforeFirstResult);
        assert!(cursor.next_row().unwrap_err().is_cursor_error());

        assert!(cursor.next_result().unwrap());
        assert_eq!(cursor.state(), CursorState::OnResult(0));
        assert_eq!(cursor.columns()[0].name, "Id");
        assert_eq!(cursor.read_all().unwrap().len(), 3);
        assert!(cursor.next_row().unwrap().is_none());

        assert!(cursor.next_result().unwrap());
        assert_eq!(cursor.result_index(), Some(1));
        assert!(!cursor.next_result().unwrap());
        assert_eq!(cursor.state(), CursorState::AfterLastResult);
        assert!(!cursor.next_result().unwrap());
        assert!(cursor.expect_result().unwrap_err().is_cursor_error());
    }

    #[test]
    fn test_next_result_discards_unread_rows() {
        let mut cursor = RecordsetCursor::new(two_sets());
        cursor.expect_result().unwrap();
        assert!(cursor.next_row().unwrap().is_some());
        cursor.expect_result().unwrap();
        let names = cursor.read::<DynamicRow>(&MapperConfig::default()).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].get_as::<String>("name").unwrap(), "a");
    }

    #[test]
    fn test_drain() {
        let mut cursor = RecordsetCursor::new(two_sets());
        cursor.expect_result().unwrap();
        cursor.next_row().unwrap();
        assert_eq!(cursor.drain().unwrap(), 2);
        assert_eq!(cursor.drain().unwrap(), 0);
    }

    #[test]
    fn test_closed_cursor_rejects_everything() {
        let mut cursor = RecordsetCursor::new(two_sets());
        cursor.expect_result().unwrap();
        cursor.close().unwrap();
        assert_eq!(cursor.state(), CursorState::Closed);

        for err in [
            cursor.next_result().unwrap_err(),
            cursor.next_row().unwrap_err(),
            cursor.drain().unwrap_err(),
        ] {
            assert_eq!(err.to_string(), "cursor state error: cursor is closed");
        }
        cursor.close().unwrap();
    }

    #[test]
    fn test_for_each_stops_on_callback_error() {
        let mut cursor = RecordsetCursor::new(two_sets());
        cursor.expect_result().unwrap();

        let mut seen = Vec::new();
        let err = cursor
            .for_each::<DynamicRow, _>(&MapperConfig::default(), |row| {
                let id: i32 = row.get_as("id")?;
                if id == 2 {
                    return Err(Error::callback("stop at two"));
                }
                seen.push(id);
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, Error::Callback(_)));
        assert_eq!(seen, [1]);
    }

    #[derive(Debug)]
    struct Pair {
        left: i32,
        right: i32,
    }

    impl FromRow for Pair {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::builder("Pair")
                .member("left")
                .member("right")
                .constructor("new", ["left", "right"])
                .build()
        }

        fn from_row(row: &BoundRow<'_>) -> Result<Self> {
            Ok(Pair {
                left: row.param(0)?,
                right: row.param(1)?,
            })
        }
    }

    fn unrelated(rows: Vec<Vec<SqlValue>>) -> MemorySource {
        MemorySource::new(vec![ResultSet::new(["Unrelated"], rows)])
    }

    #[test]
    fn test_for_each_on_empty_recordset_skips_binding() {
        let config = MapperConfig::new().cache(Arc::new(BindingCache::new()));

        let mut cursor = RecordsetCursor::new(unrelated(vec![]));
        cursor.expect_result().unwrap();
        let handled = cursor
            .for_each::<Pair, _>(&config, |pair| {
                Err(Error::callback(format!("unexpected {}:{}", pair.left, pair.right)))
            })
            .unwrap();
        assert_eq!(handled, 0);

        let mut cursor = RecordsetCursor::new(unrelated(vec![]));
        cursor.expect_result().unwrap();
        assert!(cursor.read::<Pair>(&config).unwrap().is_empty());

        let mut cursor = RecordsetCursor::new(unrelated(vec![vec![SqlValue::Int(1)]]));
        cursor.expect_result().unwrap();
        let err = cursor.for_each::<Pair, _>(&config, |_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));
    }

    #[tokio::test]
    async fn test_async_for_each_on_empty_recordset() {
        let config = MapperConfig::new().cache(Arc::new(BindingCache::new()));
        let mut cursor = AsyncRecordsetCursor::new(unrelated(vec![]));
        cursor.expect_result().await.unwrap();
        let handled = cursor
            .for_each::<Pair, _>(&config, |pair| {
                Err(Error::callback(format!("unexpected {}:{}", pair.left, pair.right)))
            })
            .await
            .unwrap();
        assert_eq!(handled, 0);
    }

    #[test]
    fn test_empty_source() {
        let mut cursor = RecordsetCursor::new(MemorySource::new(vec![]));
        assert!(!cursor.next_result().unwrap());
        assert_eq!(cursor.state(), CursorState::AfterLastResult);
    }

    #[tokio::test]
    async fn test_async_cursor_matches_blocking() {
        let mut cursor = AsyncRecordsetCursor::new(two_sets());
        assert!(cursor.next_result().await.unwrap());
        let ids = cursor.read::<DynamicRow>(&MapperConfig::default()).await.unwrap();
        assert_eq!(ids.len(), 3);

        assert!(cursor.next_result().await.unwrap());
        assert!(!cursor.next_result().await.unwrap());
        assert!(!cursor.next_result().await.unwrap());

        cursor.close().unwrap();
        assert!(cursor.next_row().await.unwrap_err().is_cursor_error());
    }
}
