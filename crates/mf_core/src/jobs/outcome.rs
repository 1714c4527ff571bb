//! How a job ended.

use serde::{Deserialize, Serialize};

/// A finished job. Cancellation still carries whatever was produced before
/// the job stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum JobOutcome<T> {
    Completed(T),
    Cancelled(T),
}

impl<T> JobOutcome<T> {
    pub fn new(value: T, cancelled: bool) -> Self {
        if cancelled {
            Self::Cancelled(value)
        } else {
            Self::Completed(value)
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Completed(v) | Self::Cancelled(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Completed(v) | Self::Cancelled(v) => v,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> JobOutcome<U> {
        match self {
            Self::Completed(v) => JobOutcome::Completed(f(v)),
            Self::Cancelled(v) => JobOutcome::Cancelled(f(v)),
        }
    }
}
