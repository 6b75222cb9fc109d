//! Scripted recordset sources.
//!
//! A [`ScriptedSource`] plays back buffered result sets like
//! [`MemorySource`](recordgraph::MemorySource), but can also fail on a chosen
//! call, sleep before every async fetch, and report what the materializer did
//! to it through a shared [`SourceProbe`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use recordgraph_testing::{Fault, ScriptedSource};
//!
//! let source = ScriptedSource::builder()
//!     .result_set(set)
//!     .fault(Fault::Advance(1))
//!     .latency(Duration::from_millis(5))
//!     .build();
//! let probe = source.probe();
//! // hand `source` to a cursor, then inspect `probe`
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recordgraph::{AsyncRecordsetSource, Column, RecordsetSource, ResultSet, Row};
use thiserror::Error;

/// A failure to inject into a scripted source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail the n-th `read_row` call (0-based, counted across recordsets).
    ReadRow(usize),
    /// Fail the n-th `advance` call (0-based).
    Advance(usize),
    /// Fail every `close` call. The source still counts as released.
    Close,
}

/// Errors raised by a scripted source.
#[derive(Debug, Error)]
pub enum ScriptedError {
    /// Injected `read_row` failure.
    #[error("injected failure on read #{0}")]
    ReadRow(usize),

    /// Injected `advance` failure.
    #[error("injected failure on advance #{0}")]
    Advance(usize),

    /// Injected `close` failure.
    #[error("injected failure on close")]
    Close,

    /// A fetch after `close`.
    #[error("scripted source used after close")]
    Closed,

    /// `read_row` without a pending row.
    #[error("no row available in the current result set")]
    NoRow,
}

impl From<ScriptedError> for recordgraph::Error {
    fn from(err: ScriptedError) -> Self {
        recordgraph::Error::from_source(err)
    }
}

#[derive(Debug, Default)]
struct Counters {
    rows_read: AtomicUsize,
    advances: AtomicUsize,
    closes: AtomicUsize,
}

/// Shared view of what happened to a scripted source.
///
/// Clones observe the same source, so a probe can be kept after the source
/// itself has been moved into a cursor.
#[derive(Debug, Clone, Default)]
pub struct SourceProbe {
    counters: Arc<Counters>,
}

impl SourceProbe {
    /// Create a probe not yet attached to any source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows handed out by `read_row`.
    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.counters.rows_read.load(Ordering::SeqCst)
    }

    /// Calls to `advance`, including the final one that returns `false`.
    #[must_use]
    pub fn advances(&self) -> usize {
        self.counters.advances.load(Ordering::SeqCst)
    }

    /// Calls to `close`.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }

    /// Whether `close` was called at least once.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closes() > 0
    }
}

/// Recordset source that plays back a script.
///
/// Implements both [`RecordsetSource`] and [`AsyncRecordsetSource`].
#[derive(Debug)]
pub struct ScriptedSource {
    pending: VecDeque<ResultSet>,
    current: Option<(Vec<Column>, VecDeque<Row>)>,
    faults: Vec<Fault>,
    latency: Option<Duration>,
    probe: SourceProbe,
    closed: bool,
}

impl ScriptedSource {
    /// Create a source that yields the given result sets in order.
    pub fn new(result_sets: Vec<ResultSet>) -> Self {
        Self::builder().result_sets(result_sets).build()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> ScriptedSourceBuilder {
        ScriptedSourceBuilder::default()
    }

    /// A probe observing this source.
    #[must_use]
    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }

    fn ensure_open(&self) -> Result<(), ScriptedError> {
        if self.closed {
            return Err(ScriptedError::Closed);
        }
        Ok(())
    }

    fn peek_more(&self) -> Result<bool, ScriptedError> {
        self.ensure_open()?;
        Ok(self
            .current
            .as_ref()
            .is_some_and(|(_, rows)| !rows.is_empty()))
    }

    fn next_row(&mut self) -> Result<Row, ScriptedError> {
        self.ensure_open()?;
        let call = self.probe.counters.rows_read.load(Ordering::SeqCst);
        if self.faults.contains(&Fault::ReadRow(call)) {
            tracing::trace!(call, "injecting read failure");
            return Err(ScriptedError::ReadRow(call));
        }
        let row = self
            .current
            .as_mut()
            .and_then(|(_, rows)| rows.pop_front())
            .ok_or(ScriptedError::NoRow)?;
        self.probe.counters.rows_read.fetch_add(1, Ordering::SeqCst);
        Ok(row)
    }

    fn next_set(&mut self) -> Result<bool, ScriptedError> {
        self.ensure_open()?;
        let call = self.probe.counters.advances.fetch_add(1, Ordering::SeqCst);
        if self.faults.contains(&Fault::Advance(call)) {
            tracing::trace!(call, "injecting advance failure");
            return Err(ScriptedError::Advance(call));
        }
        match self.pending.pop_front() {
            Some(set) => {
                let rows = set.rows().iter().cloned().collect();
                self.current = Some((set.columns().to_vec(), rows));
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn release(&mut self) -> Result<(), ScriptedError> {
        let closes = self.probe.counters.closes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(closes, "scripted source closed");
        self.closed = true;
        self.pending.clear();
        self.current = None;
        if self.faults.contains(&Fault::Close) {
            return Err(ScriptedError::Close);
        }
        Ok(())
    }

    fn current_columns(&self) -> &[Column] {
        self.current
            .as_ref()
            .map(|(columns, _)| columns.as_slice())
            .unwrap_or_default()
    }
}

async fn pause(latency: Option<Duration>) {
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
}

impl RecordsetSource for ScriptedSource {
    fn columns(&self) -> &[Column] {
        self.current_columns()
    }

    fn has_more_rows(&mut self) -> recordgraph::Result<bool> {
        Ok(self.peek_more()?)
    }

    fn read_row(&mut self) -> recordgraph::Result<Row> {
        Ok(self.next_row()?)
    }

    fn advance(&mut self) -> recordgraph::Result<bool> {
        Ok(self.next_set()?)
    }

    fn close(&mut self) -> recordgraph::Result<()> {
        Ok(self.release()?)
    }
}

#[async_trait]
impl AsyncRecordsetSource for ScriptedSource {
    fn columns(&self) -> &[Column] {
        self.current_columns()
    }

    async fn has_more_rows(&mut self) -> recordgraph::Result<bool> {
        pause(self.latency).await;
        Ok(self.peek_more()?)
    }

    async fn read_row(&mut self) -> recordgraph::Result<Row> {
        pause(self.latency).await;
        Ok(self.next_row()?)
    }

    async fn advance(&mut self) -> recordgraph::Result<bool> {
        pause(self.latency).await;
        Ok(self.next_set()?)
    }

    fn close(&mut self) -> recordgraph::Result<()> {
        Ok(self.release()?)
    }
}

/// Builder for [`ScriptedSource`].
#[derive(Debug, Default)]
pub struct ScriptedSourceBuilder {
    result_sets: Vec<ResultSet>,
    faults: Vec<Fault>,
    latency: Option<Duration>,
    probe: Option<SourceProbe>,
}

impl ScriptedSourceBuilder {
    /// Append a result set.
    #[must_use]
    pub fn result_set(mut self, set: ResultSet) -> Self {
        self.result_sets.push(set);
        self
    }

    /// Append several result sets.
    #[must_use]
    pub fn result_sets(mut self, sets: impl IntoIterator<Item = ResultSet>) -> Self {
        self.result_sets.extend(sets);
        self
    }

    /// Inject a failure.
    #[must_use]
    pub fn fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }

    /// Sleep this long before every async fetch.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Report into an existing probe.
    #[must_use]
    pub fn probe(mut self, probe: &SourceProbe) -> Self {
        self.probe = Some(probe.clone());
        self
    }

    /// Build the source.
    #[must_use]
    pub fn build(self) -> ScriptedSource {
        ScriptedSource {
            pending: self.result_sets.into(),
            current: None,
            faults: self.faults,
            latency: self.latency,
            probe: self.probe.unwrap_or_default(),
            closed: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use recordgraph::SqlValue;

    fn ids(values: &[i32]) -> ResultSet {
        ResultSet::new(["Id"], values.iter().map(|v| vec![SqlValue::Int(*v)]).collect())
    }

    #[test]
    fn test_plays_back_sets() {
        let mut source = ScriptedSource::new(vec![ids(&[1, 2]), ids(&[])]);
        let probe = source.probe();

        assert!(RecordsetSource::advance(&mut source).unwrap());
        assert_eq!(RecordsetSource::columns(&source)[0].name, "Id");
        while RecordsetSource::has_more_rows(&mut source).unwrap() {
            RecordsetSource::read_row(&mut source).unwrap();
        }
        assert!(RecordsetSource::advance(&mut source).unwrap());
        assert!(!RecordsetSource::has_more_rows(&mut source).unwrap());
        assert!(!RecordsetSource::advance(&mut source).unwrap());

        assert_eq!(probe.rows_read(), 2);
        assert_eq!(probe.advances(), 3);
        assert!(!probe.is_closed());
    }

    #[test]
    fn test_read_fault_at_position() {
        let mut source = ScriptedSource::builder()
            .result_set(ids(&[1, 2, 3]))
            .fault(Fault::ReadRow(1))
            .build();

        RecordsetSource::advance(&mut source).unwrap();
        assert!(RecordsetSource::read_row(&mut source).is_ok());
        let err = RecordsetSource::read_row(&mut source).unwrap_err();
        assert!(err.is_source_error());
        assert!(err.to_string().contains("read #1"));
    }

    #[test]
    fn test_close_counts_every_call() {
        let mut source = ScriptedSource::builder().fault(Fault::Close).build();
        let probe = source.probe();
        assert!(RecordsetSource::close(&mut source).is_err());
        assert!(RecordsetSource::close(&mut source).is_err());
        assert_eq!(probe.closes(), 2);
        assert!(RecordsetSource::advance(&mut source).is_err());
    }

    #[test]
    fn test_shared_probe() {
        let probe = SourceProbe::new();
        let mut source = ScriptedSource::builder().probe(&probe).build();
        RecordsetSource::close(&mut source).unwrap();
        assert!(probe.is_closed());
    }

    #[tokio::test]
    async fn test_async_latency() {
        let mut source = ScriptedSource::builder()
            .result_set(ids(&[5]))
            .latency(Duration::from_millis(1))
            .build();
        assert!(AsyncRecordsetSource::advance(&mut source).await.unwrap());
        assert!(AsyncRecordsetSource::has_more_rows(&mut source).await.unwrap());
        let row = AsyncRecordsetSource::read_row(&mut source).await.unwrap();
        assert_eq!(row.get::<i32>(0).unwrap(), 5);
    }
}
