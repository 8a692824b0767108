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

//! Wire-level transactions exchanged with the ranking table unit.
//!
//! Every transaction carries an explicit `valid` flag. An invalid
//! transaction stands for "nothing on the wire this cycle" and its remaining
//! fields are don't-care, which is why the response types implement
//! `PartialEq` by hand instead of deriving it.

use std::fmt;

pub type ContextId = u8;
pub type Key = i64;
pub type Volume = u32;
pub type Level = u8;
pub type ListSize = u8;

/// Update operation, encoded on the `upd_op` pins.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Clear,
    Add,
    Delete,
    Replace,
    Invalid,
}

impl Op {
    pub fn code(&self) -> u8 {
        match self {
            Op::Clear => 0,
            Op::Add => 1,
            Op::Delete => 2,
            Op::Replace => 3,
            Op::Invalid => 0xff,
        }
    }
}

impl From<u8> for Op {
    fn from(code: u8) -> Self {
        match code {
            0 => Op::Clear,
            1 => Op::Add,
            2 => Op::Delete,
            3 => Op::Replace,
            _ => Op::Invalid,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Op::Clear => "Clr",
            Op::Add => "Add",
            Op::Delete => "Del",
            Op::Replace => "Rep",
            Op::Invalid => "Inv",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct UpdateCommand {
    pub valid: bool,
    pub context_id: ContextId,
    pub op: Op,
    pub key: Key,
    pub volume: Volume,
}

impl UpdateCommand {
    pub fn new(context_id: ContextId, op: Op, key: Key, volume: Volume) -> Self {
        Self {
            valid: true,
            context_id,
            op,
            key,
            volume,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }
}

impl Default for UpdateCommand {
    fn default() -> Self {
        Self {
            valid: false,
            context_id: 0,
            op: Op::Invalid,
            key: 0,
            volume: 0,
        }
    }
}

impl fmt::Display for UpdateCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.valid {
            return write!(f, "uc{{vld:0}}");
        }
        write!(
            f,
            "uc{{vld:1, ctx:{}, op:{}, key:{:#x}, volume:{:#x}}}",
            self.context_id, self.op, self.key, self.volume
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateResponse {
    pub valid: bool,
    pub context_id: ContextId,
}

impl UpdateResponse {
    pub fn new(context_id: ContextId) -> Self {
        Self {
            valid: true,
            context_id,
        }
    }
}

impl PartialEq for UpdateResponse {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => self.context_id == other.context_id,
            _ => false,
        }
    }
}

impl fmt::Display for UpdateResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.valid {
            return write!(f, "ur{{vld:0}}");
        }
        write!(f, "ur{{vld:1, ctx:{}}}", self.context_id)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryCommand {
    pub valid: bool,
    pub context_id: ContextId,
    pub level: Level,
}

impl QueryCommand {
    pub fn new(context_id: ContextId, level: Level) -> Self {
        Self {
            valid: true,
            context_id,
            level,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }
}

impl fmt::Display for QueryCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.valid {
            return write!(f, "qc{{vld:0}}");
        }
        write!(f, "qc{{vld:1, ctx:{}, level:{}}}", self.context_id, self.level)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryResponse {
    pub valid: bool,
    pub key: Key,
    pub volume: Volume,
    pub error: bool,
    pub listsize: ListSize,
}

impl QueryResponse {
    pub fn new(key: Key, volume: Volume, listsize: ListSize) -> Self {
        Self {
            valid: true,
            key,
            volume,
            error: false,
            listsize,
        }
    }

    /// A valid response with the error flag raised; payload fields are zero.
    pub fn errored() -> Self {
        Self {
            valid: true,
            error: true,
            ..Default::default()
        }
    }
}

impl PartialEq for QueryResponse {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => {
                if self.error || other.error {
                    // Payload is unreliable once errored.
                    return self.error == other.error;
                }
                self.key == other.key
                    && self.volume == other.volume
                    && self.listsize == other.listsize
            }
            _ => false,
        }
    }
}

impl fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.valid {
            return write!(f, "qr{{vld:0}}");
        }
        if self.error {
            return write!(f, "qr{{vld:1, error:1}}");
        }
        write!(
            f,
            "qr{{vld:1, key:{:#x}, volume:{:#x}, error:0, listsize:{}}}",
            self.key, self.volume, self.listsize
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NotifyResponse {
    pub valid: bool,
    pub context_id: ContextId,
    pub key: Key,
    pub volume: Volume,
}

impl NotifyResponse {
    pub fn new(context_id: ContextId, key: Key, volume: Volume) -> Self {
        Self {
            valid: true,
            context_id,
            key,
            volume,
        }
    }
}

impl PartialEq for NotifyResponse {
    fn eq(&self, other: &Self) -> bool {
        match (self.valid, other.valid) {
            (false, false) => true,
            (true, true) => {
                self.context_id == other.context_id
                    && self.key == other.key
                    && self.volume == other.volume
            }
            _ => false,
        }
    }
}

impl fmt::Display for NotifyResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.valid {
            return write!(f, "nr{{vld:0}}");
        }
        write!(
            f,
            "nr{{vld:1, ctx:{}, key:{:#x}, volume:{:#x}}}",
            self.context_id, self.key, self.volume
        )
    }
}
