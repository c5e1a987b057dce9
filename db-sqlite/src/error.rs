//! Error types for database operations and conversions
//!
//! This module provides error types for handling database conversion failures
//! that can occur when mapping between database rows and domain models.

use std::error::Error;
use std::fmt;

/// Error type for database row to domain model conversions
#[derive(Debug)]
pub struct ConversionError {
    field: String,
    details: String,
}

impl ConversionError {
    /// Create a new conversion error
    pub fn new(field: impl Into<String>, details: impl Into<String>) -> Self {
        ConversionError {
            field: field.into(),
            details: details.into(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Conversion error for field '{}': {}",
            self.field, self.details
        )
    }
}

impl Error for ConversionError {}

/// Error type covering a full upsert batch.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying Diesel operation failed; the transaction rolls back.
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    /// A stored row could not be mapped back into a domain model.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
