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

//! Cycle-level behavioral model of the ranking table unit.
//!
//! Implements the pin contract the harness verifies against: registered
//! outputs updated on the rising clock edge, an asynchronous reset, a
//! `context_n + 2` cycle initialization during which `busy` is raised, and
//! fixed update/query latencies. Faults can be injected to check that the
//! harness notices misbehaving hardware.

use harness::{
    ContextId, Inputs, Key, NotifyResponse, Op, Outputs, QueryCommand, QueryResponse,
    TableConfig, Unit, UnitFactory, UpdateCommand, Volume,
};
use log::{debug, trace};
use std::collections::VecDeque;

/// Deliberate deviations from the contract.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Faults {
    /// Never raise a notification.
    pub drop_notifications: bool,
    /// Deliver query responses one cycle late.
    pub late_query_response: bool,
    /// Finish initialization one cycle early.
    pub short_init: bool,
    /// Acknowledge Replace without changing the volume.
    pub ignore_replace: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    PowerOn,
    Reset,
    /// Rising edges left before `busy` drops.
    Init(usize),
    Ready,
}

/// One slot of the update pipeline.
#[derive(Clone, Copy, Debug, Default)]
struct Stage {
    /// Context being updated, if any.
    context_id: Option<ContextId>,
    notification: NotifyResponse,
}

pub struct RankTable {
    config: TableConfig,
    faults: Faults,
    inputs: Inputs,
    outputs: Outputs,
    prev_clk: bool,
    state: State,
    contexts: Vec<Vec<(Key, Volume)>>,
    /// Newest at the front; the back drives the notification pins.
    update_stages: VecDeque<Stage>,
    /// Newest at the front; the back drives the query response pins.
    query_stages: VecDeque<QueryResponse>,
    cycle: usize,
}

impl RankTable {
    pub fn new(config: &TableConfig) -> Self {
        Self::with_faults(config, Faults::default())
    }

    pub fn with_faults(config: &TableConfig, faults: Faults) -> Self {
        let query_depth = config.query_delay + faults.late_query_response as usize;
        Self {
            config: config.clone(),
            faults,
            inputs: Inputs::default(),
            outputs: Outputs::default(),
            prev_clk: false,
            state: State::PowerOn,
            contexts: vec![Vec::with_capacity(config.entries_n + 1); config.context_n],
            update_stages: VecDeque::from(vec![Stage::default(); config.update_delay]),
            query_stages: VecDeque::from(vec![QueryResponse::default(); query_depth]),
            cycle: 0,
        }
    }

    pub fn factory() -> UnitFactory {
        Box::new(|config: &TableConfig| -> Box<dyn Unit> {
            Box::new(RankTable::new(config))
        })
    }

    pub fn faulty(faults: Faults) -> UnitFactory {
        Box::new(move |config: &TableConfig| -> Box<dyn Unit> {
            Box::new(RankTable::with_faults(config, faults))
        })
    }

    /// Entries of context `id` in rank order.
    pub fn entries(&self, id: ContextId) -> &[(Key, Volume)] {
        self.contexts
            .get(id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn reset_asserted(&self) -> bool {
        self.inputs.rst == self.config.reset_level(true)
    }

    fn init_cycles(&self) -> usize {
        self.config.context_n + 2 - self.faults.short_init as usize
    }

    fn enter_reset(&mut self) {
        if self.state == State::Reset {
            return;
        }
        debug!("unit: [{}] reset", self.cycle);
        self.state = State::Reset;
        self.contexts.iter_mut().for_each(|entries| entries.clear());
        self.update_stages.iter_mut().for_each(|s| *s = Stage::default());
        self.query_stages
            .iter_mut()
            .for_each(|qr| *qr = QueryResponse::default());
        self.outputs = Outputs::default();
    }

    fn on_posedge(&mut self) {
        self.cycle += 1;
        let (stage, qr) = match self.state {
            State::PowerOn => (Stage::default(), QueryResponse::default()),
            State::Reset => {
                self.outputs.busy = true;
                self.state = State::Init(self.init_cycles() - 1);
                (Stage::default(), QueryResponse::default())
            }
            State::Init(0) => {
                debug!("unit: [{}] initialized", self.cycle);
                self.outputs.busy = false;
                self.state = State::Ready;
                (Stage::default(), QueryResponse::default())
            }
            State::Init(remaining) => {
                self.state = State::Init(remaining - 1);
                (Stage::default(), QueryResponse::default())
            }
            State::Ready => {
                let uc = self.inputs.update();
                let qc = self.inputs.query();
                // Look up before the update lands; a same-cycle update to
                // the queried context is a hazard anyway.
                let qr = self.lookup(&qc, &uc);
                (self.apply(&uc), qr)
            }
        };

        self.update_stages.push_front(stage);
        self.update_stages.pop_back();
        self.query_stages.push_front(qr);
        self.query_stages.pop_back();

        if let Some(stage) = self.update_stages.back() {
            self.outputs.drive_notification(&stage.notification);
        }
        if let Some(qr) = self.query_stages.back() {
            self.outputs.drive_query_response(qr);
        }
    }

    /// True while an update to `id` has not yet left the pipeline, counting
    /// one captured on this edge.
    fn in_flight(&self, id: ContextId, uc: &UpdateCommand) -> bool {
        let captured = uc.valid && uc.op != Op::Invalid && uc.context_id == id;
        let depth = self.update_stages.len();
        captured
            || self
                .update_stages
                .iter()
                .take(depth.saturating_sub(1))
                .any(|s| s.context_id == Some(id))
    }

    fn lookup(&self, qc: &QueryCommand, uc: &UpdateCommand) -> QueryResponse {
        if !qc.valid {
            return QueryResponse::default();
        }
        let entries = match self.contexts.get(qc.context_id as usize) {
            Some(entries) => entries,
            None => return QueryResponse::errored(),
        };
        match entries.get(qc.level as usize) {
            Some((key, volume)) if !self.in_flight(qc.context_id, uc) => {
                QueryResponse::new(*key, *volume, entries.len() as u8)
            }
            _ => QueryResponse::errored(),
        }
    }

    fn apply(&mut self, uc: &UpdateCommand) -> Stage {
        if !uc.valid || uc.op == Op::Invalid {
            return Stage::default();
        }
        let id = uc.context_id;
        let mode = self.config.mode;
        let entries_n = self.config.entries_n;
        let entries = match self.contexts.get_mut(id as usize) {
            Some(entries) => entries,
            None => return Stage::default(),
        };
        let notification = match uc.op {
            Op::Clear => {
                let was_empty = entries.is_empty();
                entries.clear();
                if was_empty {
                    NotifyResponse::default()
                } else {
                    NotifyResponse::new(id, 0, 0)
                }
            }
            Op::Add => {
                // Behind every entry of equal or higher rank.
                let pos = entries
                    .iter()
                    .position(|(key, _)| mode.ranks_ahead(uc.key, *key))
                    .unwrap_or_else(|| entries.len());
                if pos < entries_n {
                    entries.insert(pos, (uc.key, uc.volume));
                    entries.truncate(entries_n);
                }
                if pos == 0 {
                    NotifyResponse::new(id, uc.key, uc.volume)
                } else {
                    NotifyResponse::default()
                }
            }
            Op::Delete | Op::Replace => match entries.iter().position(|(key, _)| *key == uc.key) {
                Some(pos) => {
                    let (key, volume) = entries[pos];
                    if uc.op == Op::Delete {
                        entries.remove(pos);
                    } else if !self.faults.ignore_replace {
                        entries[pos].1 = uc.volume;
                    }
                    if pos == 0 {
                        NotifyResponse::new(id, key, volume)
                    } else {
                        NotifyResponse::default()
                    }
                }
                None => NotifyResponse::default(),
            },
            Op::Invalid => NotifyResponse::default(),
        };
        trace!("unit: [{}] ctx {} {:?}", self.cycle, id, entries);
        Stage {
            context_id: Some(id),
            notification: if self.faults.drop_notifications {
                NotifyResponse::default()
            } else {
                notification
            },
        }
    }
}

impl Unit for RankTable {
    fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }

    fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    fn eval(&mut self) {
        let clk = self.inputs.clk;
        let posedge = clk && !self.prev_clk;
        self.prev_clk = clk;
        if self.reset_asserted() {
            self.enter_reset();
            return;
        }
        if posedge {
            self.on_posedge();
        }
    }

    fn finalize(&mut self) {
        debug!("unit: finalized after {} cycles", self.cycle);
    }
}
