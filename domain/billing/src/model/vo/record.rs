use serde::{Deserialize, Serialize};

use super::CanonicalState;

/// A span of a VM's life spent in one canonical state, `[start, end)` in unix seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub start: i64,
    pub end: i64,
    pub state: CanonicalState,
}

impl Record {
    pub fn new(start: i64, end: i64, state: CanonicalState) -> Self {
        Self { start, end, state }
    }

    pub fn duration(&self) -> i64 {
        self.end - self.start
    }
}
