//! Call sequences replayed by the bundle executor contract

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// Parallel lists of call targets and payloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleCallData {
    pub targets: Vec<Address>,
    pub data: Vec<Bytes>,
}

impl MultipleCallData {
    pub fn single(target: Address, data: Bytes) -> Self {
        Self {
            targets: vec![target],
            data: vec![data],
        }
    }

    pub fn push(&mut self, target: Address, data: Bytes) {
        self.targets.push(target);
        self.data.push(data);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
