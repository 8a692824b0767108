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

//! Reference model of the ranking table.
//!
//! The model mirrors the table contents, predicts every response the unit
//! should produce and compares the predictions, once they have travelled
//! through their delay pipes, against what the unit actually drove.

use itertools::Itertools;
use log::{debug, error, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

use crate::config::TableConfig;
use crate::context::SimContext;
use crate::pipe::{has_context_id_in_flight, DelayPipe};
use crate::transaction::{
    ContextId, Key, ListSize, NotifyResponse, Op, QueryCommand, QueryResponse, UpdateCommand,
    UpdateResponse, Volume,
};
use crate::{Cycle, Error};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry {
    pub key: Key,
    pub volume: Volume,
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}:{:#x}", self.key, self.volume)
    }
}

/// Everything observed at the unit's pins on one negative clock edge.
#[derive(Clone, Debug, Default)]
pub struct Sample {
    /// Reset is asserted this cycle.
    pub reset: bool,
    pub update: UpdateCommand,
    pub query: QueryCommand,
    pub notification: NotifyResponse,
    pub query_response: QueryResponse,
}

pub struct Model {
    config: TableConfig,
    contexts: Vec<Vec<Entry>>,
    ur_pipe: DelayPipe<UpdateResponse>,
    nr_pipe: DelayPipe<NotifyResponse>,
    qr_pipe: DelayPipe<QueryResponse>,
}

impl Model {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            config: config.clone(),
            contexts: vec![Vec::with_capacity(config.entries_n + 1); config.context_n],
            ur_pipe: DelayPipe::new(config.update_delay),
            nr_pipe: DelayPipe::new(config.update_delay),
            qr_pipe: DelayPipe::new(config.query_delay),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Empties every context and drops all predictions in flight.
    pub fn reset(&mut self) {
        self.contexts.iter_mut().for_each(|entries| entries.clear());
        self.ur_pipe.clear();
        self.nr_pipe.clear();
        self.qr_pipe.clear();
    }

    /// Advances the model by one cycle.
    ///
    /// Mismatches between predictions and `sample` are counted in `ctx` and
    /// logged; only violated invariants are returned as errors.
    pub fn step(
        &mut self,
        sample: &Sample,
        ctx: &mut SimContext,
        cycle: Cycle,
    ) -> Result<(), Error> {
        if sample.reset {
            trace!("[{}] mdl: in reset", cycle);
            self.reset();
            return Ok(());
        }
        if sample.update.valid || sample.query.valid {
            debug!("[{}] mdl: issue {} {}", cycle, sample.update, sample.query);
        }

        let (ur, nr) = self.apply_update(&sample.update, ctx)?;
        self.ur_pipe.push_back(ur);
        self.nr_pipe.push_back(nr);

        // After the update: a same-cycle update to the queried context is
        // already in flight.
        let qr = self.predict_query(&sample.query)?;
        self.qr_pipe.push_back(qr);

        self.check(
            ctx,
            cycle,
            "Notify",
            self.nr_pipe.head(),
            &sample.notification,
            |nr| nr.valid,
        );
        self.check(
            ctx,
            cycle,
            "Query",
            self.qr_pipe.head(),
            &sample.query_response,
            |qr| qr.valid,
        );

        self.ur_pipe.step();
        self.nr_pipe.step();
        self.qr_pipe.step();
        Ok(())
    }

    /// Applies `uc` to the table and returns the update response and
    /// notification the unit will produce for it.
    pub fn apply_update(
        &mut self,
        uc: &UpdateCommand,
        ctx: &mut SimContext,
    ) -> Result<(UpdateResponse, NotifyResponse), Error> {
        if !uc.valid {
            return Ok((UpdateResponse::default(), NotifyResponse::default()));
        }
        let mode = self.config.mode;
        let entries_n = self.config.entries_n;
        let id = uc.context_id;
        let entries = self.context_mut(id)?;
        let ur = UpdateResponse::new(id);
        let nr = match uc.op {
            Op::Clear => {
                let nr = if entries.is_empty() {
                    NotifyResponse::default()
                } else {
                    NotifyResponse::new(id, 0, 0)
                };
                entries.clear();
                nr
            }
            Op::Add => {
                let nr = match entries.first() {
                    Some(first) if !mode.ranks_ahead(uc.key, first.key) => {
                        NotifyResponse::default()
                    }
                    _ => NotifyResponse::new(id, uc.key, uc.volume),
                };
                entries.push(Entry {
                    key: uc.key,
                    volume: uc.volume,
                });
                entries.sort_by(|lhs, rhs| mode.ordering(lhs.key, rhs.key));
                if entries.len() > entries_n {
                    let dropped = entries.pop();
                    debug!("mdl: ctx {} full, dropped {:?}", id, dropped);
                }
                nr
            }
            Op::Delete | Op::Replace => match entries.iter().position(|e| e.key == uc.key) {
                None => NotifyResponse::default(),
                Some(index) => {
                    let nr = if index == 0 {
                        NotifyResponse::new(id, entries[0].key, entries[0].volume)
                    } else {
                        NotifyResponse::default()
                    };
                    if uc.op == Op::Delete {
                        entries.remove(index);
                    } else {
                        entries[index].volume = uc.volume;
                    }
                    nr
                }
            },
            Op::Invalid => {
                error!("mdl: invalid command code in {}", uc);
                ctx.record_error();
                return Ok((UpdateResponse::default(), NotifyResponse::default()));
            }
        };
        trace!("mdl: ctx {} = [{}]", id, self.entries(id).iter().format(", "));
        Ok((ur, nr))
    }

    /// Predicts the response to `qc` against the current table state.
    pub fn predict_query(&self, qc: &QueryCommand) -> Result<QueryResponse, Error> {
        if !qc.valid {
            return Ok(QueryResponse::default());
        }
        let entries = self.context(qc.context_id)?;
        let level = qc.level as usize;
        if level >= entries.len() || has_context_id_in_flight(&self.ur_pipe, qc.context_id) {
            return Ok(QueryResponse::errored());
        }
        let entry = entries[level];
        Ok(QueryResponse::new(
            entry.key,
            entry.volume,
            entries.len() as ListSize,
        ))
    }

    fn check<T, F>(
        &self,
        ctx: &mut SimContext,
        cycle: Cycle,
        what: &str,
        predicted: &T,
        actual: &T,
        is_valid: F,
    ) where
        T: PartialEq + fmt::Display,
        F: Fn(&T) -> bool,
    {
        if predicted == actual {
            return;
        }
        let reason = match (is_valid(predicted), is_valid(actual)) {
            (true, true) => "Payload mismatch".to_string(),
            (false, _) => format!("Unexpected {} Response", what),
            (true, false) => format!("Missing {} Response", what),
        };
        error!(
            "[{}] mdl: {}: predicted {} actual {}",
            cycle, reason, predicted, actual
        );
        ctx.record_error();
    }

    fn context(&self, id: ContextId) -> Result<&Vec<Entry>, Error> {
        let context_n = self.contexts.len();
        self.contexts
            .get(id as usize)
            .ok_or(Error::ContextOutOfRange(id, context_n))
    }

    fn context_mut(&mut self, id: ContextId) -> Result<&mut Vec<Entry>, Error> {
        let context_n = self.contexts.len();
        self.contexts
            .get_mut(id as usize)
            .ok_or(Error::ContextOutOfRange(id, context_n))
    }

    /// Entries of context `id` in rank order; empty for unknown contexts.
    pub fn entries(&self, id: ContextId) -> &[Entry] {
        self.contexts
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_active_entries(&self, id: ContextId) -> bool {
        !self.entries(id).is_empty()
    }

    /// A key currently present in context `id`, chosen uniformly.
    pub fn pick_active_key<R: Rng + ?Sized>(&self, rng: &mut R, id: ContextId) -> Option<Key> {
        self.entries(id).choose(rng).map(|e| e.key)
    }
}
