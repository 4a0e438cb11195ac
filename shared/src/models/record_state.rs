//! Soft-delete state shared by catalog records

use serde::{Deserialize, Serialize};

/// Whether a record is live or has been soft-deleted.
///
/// Stored as a nullable `deleted_at` column; code only ever sees this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    #[default]
    Active,
    Deleted {
        /// Deletion time (Unix millis)
        at: i64,
    },
}

impl RecordState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_deleted(&self) -> bool {
        !self.is_active()
    }

    /// Column value for persistence
    pub fn deleted_at(&self) -> Option<i64> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(*at),
        }
    }
}

impl From<Option<i64>> for RecordState {
    fn from(deleted_at: Option<i64>) -> Self {
        match deleted_at {
            Some(at) => Self::Deleted { at },
            None => Self::Active,
        }
    }
}
