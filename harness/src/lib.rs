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

mod config;
mod context;
pub mod directed;
mod error;
mod kernel;
mod model;
mod pipe;
mod ports;
mod registry;
mod reset;
mod stimulus;
mod transaction;
#[cfg(feature = "vcd-trace")]
mod vcd;

// Public types
// type to use for cycles
pub type Cycle = usize;

pub use crate::config::{HarnessConfig, KernelOptions, TableConfig, TableMode};
pub use crate::context::{Report, SimContext, DEFAULT_SEED};
pub use crate::directed::{Directed, DirectedTest, Instruction, ProgramBuilder, ProgramFn};
pub use crate::error::Error;
pub use crate::kernel::{Bench, Callbacks, Kernel, TICKS_PER_HALF_PERIOD};
pub use crate::model::{Entry, Model, Sample};
pub use crate::pipe::{has_context_id_in_flight, DelayPipe};
pub use crate::ports::{Inputs, Outputs, Unit, UnitFactory};
pub use crate::registry::{Registry, Test, TestArgs, TestBuilder, TestInfo};
pub use crate::reset::{ResetState, ResetTracker};
pub use crate::stimulus::{Randomized, Stimulus, StimulusOptions};
pub use crate::transaction::{
    ContextId, Key, Level, ListSize, NotifyResponse, Op, QueryCommand, QueryResponse,
    UpdateCommand, UpdateResponse, Volume,
};
#[cfg(feature = "vcd-trace")]
pub use crate::vcd::VcdWriter;
