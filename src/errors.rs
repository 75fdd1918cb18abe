// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Typed failures surfaced to the immediate caller.
//!
//! Library functions return `anyhow::Result`; these variants are raised
//! through `anyhow` so callers that care about the category can
//! `downcast_ref::<LedgerError>()`. Sync failures are not raised here:
//! they are collected into a [`crate::sync::SyncReport`] instead.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A required field is missing or a value is out of range.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The record does not exist for this user.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Another writer changed the row between our read and our write.
    #[error("Concurrent update on {entity} {id}")]
    Conflict { entity: &'static str, id: i64 },
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        LedgerError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        LedgerError::NotFound { entity, id }
    }
}

/// True when `err` wraps a [`LedgerError::NotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::NotFound { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_survives_anyhow_wrapping() {
        let err: anyhow::Error = LedgerError::not_found("record", 7).into();
        let err = err.context("loading record");
        assert!(is_not_found(&err));
        assert_eq!(
            err.root_cause().to_string(),
            "record 7 not found".to_string()
        );
    }

    #[test]
    fn validation_is_not_not_found() {
        let err: anyhow::Error = LedgerError::validation("name is required").into();
        assert!(!is_not_found(&err));
        assert!(err.to_string().contains("name is required"));
    }
}
