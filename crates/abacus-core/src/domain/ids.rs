//! Task identifiers.
//!
//! ULID ベース: timestamp が先頭にあるため生成順でソートでき、
//! 複数ノードで調整なしに生成できる。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulid::Ulid;

use super::Clock;

/// Opaque unique task identifier.
///
/// The canonical string form (`task-<ULID>`) is what the hash router hashes,
/// so it must be stable across processes; ULID's Crockford encoding is.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Ulid);

impl TaskId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid task id: {0:?}")]
pub struct ParseTaskIdError(String);

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix("task-")
            .ok_or_else(|| ParseTaskIdError(s.to_string()))?;
        let ulid = Ulid::from_string(raw).map_err(|_| ParseTaskIdError(s.to_string()))?;
        Ok(Self(ulid))
    }
}

/// Generates fresh task ids from a clock plus randomness.
///
/// The clock is injected so tests can pin the timestamp half of the ULID.
pub struct TaskIdGenerator<C> {
    clock: C,
}

impl<C: Clock> TaskIdGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn generate(&self) -> TaskId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        TaskId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
