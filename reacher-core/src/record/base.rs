//! Base implementation of records.
use crate::error::ReacherError;
use chrono::prelude::{DateTime, Local};
use std::collections::HashMap;

/// Represents possible types of values that can be stored in a [`Record`].
///
/// # Variants
///
/// * `Scalar(f32)` - A single floating-point value, typically a mean reward or a rate
/// * `DateTime(DateTime<Local>)` - A timestamp with local timezone
/// * `String(String)` - A text value
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value.
    Scalar(f32),

    /// A timestamp with local timezone, useful for logging events.
    DateTime(DateTime<Local>),

    /// A text value, useful for storing labels or verdicts.
    String(String),
}

/// A container for storing key-value pairs of various data types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record from a slice of key-value pairs.
    ///
    /// # Arguments
    ///
    /// * `s` - A slice of tuples containing keys and values
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key does not exist
    /// - The value is not a scalar
    pub fn get_scalar(&self, k: &str) -> Result<f32, ReacherError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(ReacherError::RecordValueTypeError("Scalar".to_string())),
            None => Err(ReacherError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key does not exist
    /// - The value is not a string
    pub fn get_string(&self, k: &str) -> Result<String, ReacherError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(ReacherError::RecordValueTypeError("String".to_string())),
            None => Err(ReacherError::RecordKeyError(k.to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}
