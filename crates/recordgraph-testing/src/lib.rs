//! # recordgraph-testing
//!
//! Test infrastructure for recordgraph development.
//!
//! ## Features
//!
//! - Scripted recordset sources with injected failures and simulated latency
//! - Probes that count how often a source was read, advanced and closed
//! - Fixture types and recordsets for graph assembly scenarios
//!
//! ## Example
//!
//! ```rust,ignore
//! use recordgraph::{MapperConfig, query_multiple};
//! use recordgraph_testing::{Fault, ScriptedSource, fixtures};
//!
//! let source = ScriptedSource::builder()
//!     .result_set(fixtures::customers())
//!     .result_set(fixtures::orders())
//!     .fault(Fault::ReadRow(3))
//!     .build();
//! let probe = source.probe();
//!
//! let err = query_multiple(source, &fixtures::customer_orders_shape(), &MapperConfig::default());
//! assert!(err.is_err());
//! assert_eq!(probe.closes(), 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod fixtures;
pub mod scripted;

pub use scripted::{Fault, ScriptedError, ScriptedSource, ScriptedSourceBuilder, SourceProbe};
