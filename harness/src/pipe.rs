// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log::trace;

use crate::transaction::{ContextId, UpdateResponse};

/// Fixed latency line between a command being issued and its response
/// becoming observable on the unit's output pins.
///
/// A value pushed in one cycle is returned by `head()` after exactly `depth`
/// calls to `step()`.
#[derive(Clone, Debug)]
pub struct DelayPipe<T> {
    /// Circular buffer of `depth + 1` slots.
    slots: Vec<T>,

    /// The slot written by `push_back` in the current cycle.
    write_idx: usize,

    /// The slot exposed by `head` in the current cycle.
    read_idx: usize,
}

impl<T: Clone + Default> DelayPipe<T> {
    pub fn new(depth: usize) -> Self {
        Self {
            slots: vec![T::default(); depth + 1],
            write_idx: depth,
            read_idx: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.slots.len() - 1
    }

    /// Stores `value` at the write slot; does not advance.
    pub fn push_back(&mut self, value: T) {
        self.slots[self.write_idx] = value;
    }

    pub fn head(&self) -> &T {
        &self.slots[self.read_idx]
    }

    pub fn step(&mut self) {
        let size = self.slots.len();
        self.write_idx = (self.write_idx + 1) % size;
        self.read_idx = (self.read_idx + 1) % size;
        if cfg!(feature = "trace-pipe-contents") {
            trace!(
                "pipe step write_idx: {}, read_idx: {}",
                self.write_idx,
                self.read_idx
            );
        }
    }

    pub fn clear(&mut self) {
        let depth = self.depth();
        self.slots.iter_mut().for_each(|slot| *slot = T::default());
        self.write_idx = depth;
        self.read_idx = 0;
    }

    /// Values that were pushed but have not yet been retired through `head`,
    /// most recent first: the current write slot and the `depth - 1` slots
    /// written before it.
    pub fn in_flight(&self) -> impl Iterator<Item = &T> + '_ {
        let size = self.slots.len();
        let write_idx = self.write_idx;
        (0..self.depth()).map(move |i| &self.slots[(write_idx + size - i) % size])
    }
}

/// Returns true when an update for context `id` is still travelling through
/// the update-response pipe, i.e. a query to `id` issued now is hazardous.
pub fn has_context_id_in_flight(pipe: &DelayPipe<UpdateResponse>, id: ContextId) -> bool {
    pipe.in_flight().any(|ur| ur.valid && ur.context_id == id)
}
