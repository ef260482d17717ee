//! Strongly-typed identifiers for domain entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The reviewable unit: a change identifier plus a revision number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchsetRef {
    pub change: String,
    pub revision: u32,
}

impl PatchsetRef {
    pub fn new(change: impl Into<String>, revision: u32) -> Self {
        Self {
            change: change.into(),
            revision,
        }
    }
}

impl fmt::Display for PatchsetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.change, self.revision)
    }
}

/// Retry counter for a work item. Attempt 0 is the canonical first attempt.
///
/// The store encodes attempt 0 as SQL NULL for historical reasons; that
/// convention is confined to [`Attempt::to_db`] and [`Attempt::from_db`].
/// Everything above the store boundary works with the plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attempt(u32);

impl Attempt {
    pub const FIRST: Attempt = Attempt(0);

    pub fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn next(&self) -> Attempt {
        Attempt(self.0 + 1)
    }

    /// Store-boundary encoding: attempt 0 is NULL.
    pub fn to_db(&self) -> Option<i32> {
        if self.0 == 0 { None } else { Some(self.0 as i32) }
    }

    /// Store-boundary decoding: NULL is attempt 0.
    pub fn from_db(value: Option<i32>) -> Self {
        Self(value.unwrap_or(0).max(0) as u32)
    }

    /// Directory suffix for artifact paths: empty for the first attempt.
    pub fn path_suffix(&self) -> String {
        if self.0 == 0 {
            String::new()
        } else {
            format!("_attempt{}", self.0)
        }
    }
}

impl Default for Attempt {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token stamped onto a queue row by a successful claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimToken(Uuid);

impl ClaimToken {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClaimToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clm_{}", self.0)
    }
}

/// Unique key of one unit of CI work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItemKey {
    pub patchset: PatchsetRef,
    pub job: String,
    pub attempt: Attempt,
}

impl WorkItemKey {
    pub fn new(patchset: PatchsetRef, job: impl Into<String>, attempt: Attempt) -> Self {
        Self {
            patchset,
            job: job.into(),
            attempt,
        }
    }
}

impl fmt::Display for WorkItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}{}",
            self.patchset.change,
            self.patchset.revision,
            self.job,
            self.attempt.path_suffix()
        )
    }
}
