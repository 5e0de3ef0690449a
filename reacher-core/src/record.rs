//! Records of reward statistics and diagnostic reports.
//!
//! A [`Record`] is a set of named values produced in one step, e.g. the mean
//! of every weighted reward term or the report of a monitor. Records are
//! handed to a [`Recorder`], which decides where they go.
//!
//! ```rust
//! use reacher_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("reward/approach_progress", RecordValue::Scalar(10.0));
//! record.insert("verdict", RecordValue::String("training".to_string()));
//! assert_eq!(record.get_scalar("reward/approach_progress").unwrap(), 10.0);
//! ```
mod base;
mod buffered_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use recorder::Recorder;
