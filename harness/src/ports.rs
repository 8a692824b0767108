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

//! Pin interface of the ranking table unit.
//!
//! The unit itself is opaque to the harness: it is driven through `Inputs`,
//! observed through `Outputs` and advanced with `Unit::eval`.

use crate::config::TableConfig;
use crate::transaction::{
    ContextId, Key, Level, ListSize, NotifyResponse, Op, QueryCommand, QueryResponse,
    UpdateCommand, Volume,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inputs {
    pub clk: bool,
    /// Raw reset pin level; polarity is given by `TableConfig::reset_active_low`.
    pub rst: bool,

    pub upd_vld: bool,
    pub upd_ctx: ContextId,
    pub upd_op: u8,
    pub upd_key: Key,
    pub upd_volume: Volume,

    pub qry_vld: bool,
    pub qry_ctx: ContextId,
    pub qry_level: Level,
}

impl Inputs {
    pub fn drive_update(&mut self, uc: &UpdateCommand) {
        self.upd_vld = uc.valid;
        self.upd_ctx = uc.context_id;
        self.upd_op = uc.op.code();
        self.upd_key = uc.key;
        self.upd_volume = uc.volume;
    }

    pub fn drive_query(&mut self, qc: &QueryCommand) {
        self.qry_vld = qc.valid;
        self.qry_ctx = qc.context_id;
        self.qry_level = qc.level;
    }

    /// The update command currently applied to the pins.
    pub fn update(&self) -> UpdateCommand {
        if !self.upd_vld {
            return UpdateCommand::invalid();
        }
        UpdateCommand::new(
            self.upd_ctx,
            Op::from(self.upd_op),
            self.upd_key,
            self.upd_volume,
        )
    }

    /// The query command currently applied to the pins.
    pub fn query(&self) -> QueryCommand {
        if !self.qry_vld {
            return QueryCommand::invalid();
        }
        QueryCommand::new(self.qry_ctx, self.qry_level)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outputs {
    pub busy: bool,

    pub qr_vld: bool,
    pub qr_key: Key,
    pub qr_volume: Volume,
    pub qr_error: bool,
    pub qr_listsize: ListSize,

    pub ntf_vld: bool,
    pub ntf_ctx: ContextId,
    pub ntf_key: Key,
    pub ntf_volume: Volume,
}

impl Outputs {
    pub fn query_response(&self) -> QueryResponse {
        QueryResponse {
            valid: self.qr_vld,
            key: self.qr_key,
            volume: self.qr_volume,
            error: self.qr_error,
            listsize: self.qr_listsize,
        }
    }

    pub fn notification(&self) -> NotifyResponse {
        NotifyResponse {
            valid: self.ntf_vld,
            context_id: self.ntf_ctx,
            key: self.ntf_key,
            volume: self.ntf_volume,
        }
    }

    pub fn drive_query_response(&mut self, qr: &QueryResponse) {
        self.qr_vld = qr.valid;
        self.qr_key = qr.key;
        self.qr_volume = qr.volume;
        self.qr_error = qr.error;
        self.qr_listsize = qr.listsize;
    }

    pub fn drive_notification(&mut self, nr: &NotifyResponse) {
        self.ntf_vld = nr.valid;
        self.ntf_ctx = nr.context_id;
        self.ntf_key = nr.key;
        self.ntf_volume = nr.volume;
    }
}

/// A cycle-stepped unit under test.
pub trait Unit {
    fn inputs(&self) -> &Inputs;
    fn inputs_mut(&mut self) -> &mut Inputs;
    fn outputs(&self) -> &Outputs;

    /// Settles the unit for the current pin state. Called once per kernel
    /// tick, after any input changes.
    fn eval(&mut self);

    /// Called once when the simulation is torn down.
    fn finalize(&mut self) {}
}

/// Builds the unit under test for a given table configuration.
pub type UnitFactory = Box<dyn Fn(&TableConfig) -> Box<dyn Unit>>;
