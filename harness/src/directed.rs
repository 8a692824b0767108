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

//! Scripted, cycle-exact stimulus.
//!
//! A directed test is a linear program of `Instruction`s interpreted on the
//! falling clock edge. The engine wraps every program in a reset prologue
//! and an end-of-simulation epilogue.

use log::info;
use std::collections::VecDeque;

use crate::config::TableConfig;
use crate::context::SimContext;
use crate::kernel::{Bench, Callbacks, Kernel};
use crate::registry::Test;
use crate::transaction::{QueryCommand, UpdateCommand};
use crate::Error;

/// Falling edges for which `ApplyReset` holds reset asserted.
pub const RESET_PULSE_CYCLES: usize = 2;

#[derive(Clone, Debug)]
pub enum Instruction {
    /// Assert reset for the given number of cycles, then release it.
    ApplyReset(usize),
    WaitUntilNotBusy,
    Emit(UpdateCommand, QueryCommand),
    WaitCycles(usize),
    LogMessage(String),
    EndSimulation,
}

impl Instruction {
    pub fn consumes_cycle(&self) -> bool {
        !matches!(self, Instruction::LogMessage(_) | Instruction::WaitCycles(0))
    }
}

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    body: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, uc: UpdateCommand, qc: QueryCommand) -> &mut Self {
        self.body.push(Instruction::Emit(uc, qc));
        self
    }

    pub fn update(&mut self, uc: UpdateCommand) -> &mut Self {
        self.emit(uc, QueryCommand::invalid())
    }

    pub fn query(&mut self, qc: QueryCommand) -> &mut Self {
        self.emit(UpdateCommand::invalid(), qc)
    }

    pub fn wait_cycles(&mut self, cycles: usize) -> &mut Self {
        self.body.push(Instruction::WaitCycles(cycles));
        self
    }

    pub fn wait_until_not_busy(&mut self) -> &mut Self {
        self.body.push(Instruction::WaitUntilNotBusy);
        self
    }

    pub fn note<S: Into<String>>(&mut self, msg: S) -> &mut Self {
        self.body.push(Instruction::LogMessage(msg.into()));
        self
    }

    pub fn build(self) -> Directed {
        Directed::new(self.body)
    }
}

/// Instruction queue interpreter.
#[derive(Debug)]
pub struct Directed {
    queue: VecDeque<Instruction>,
}

impl Directed {
    pub fn new(body: Vec<Instruction>) -> Self {
        let mut queue = VecDeque::with_capacity(body.len() + 3);
        queue.push_back(Instruction::ApplyReset(RESET_PULSE_CYCLES));
        queue.push_back(Instruction::WaitUntilNotBusy);
        queue.extend(body);
        queue.push_back(Instruction::EndSimulation);
        Self { queue }
    }

    pub fn pending(&self) -> impl Iterator<Item = &Instruction> {
        self.queue.iter()
    }
}

impl Callbacks for Directed {
    fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
        loop {
            let instruction = match self.queue.front_mut() {
                Some(instruction) => instruction,
                None => return Ok(false),
            };
            let consumes_cycle = instruction.consumes_cycle();
            let retire = match instruction {
                Instruction::LogMessage(msg) => {
                    info!("[{}] {}", bench.cycle(), msg);
                    true
                }
                Instruction::WaitCycles(0) => true,
                Instruction::WaitCycles(cycles) => {
                    *cycles -= 1;
                    *cycles == 0
                }
                Instruction::ApplyReset(0) => {
                    bench.drive_reset(false);
                    true
                }
                Instruction::ApplyReset(cycles) => {
                    bench.drive_reset(true);
                    *cycles -= 1;
                    false
                }
                Instruction::WaitUntilNotBusy => !bench.is_busy(),
                Instruction::Emit(uc, qc) => {
                    bench.issue_update(uc);
                    bench.issue_query(qc);
                    true
                }
                Instruction::EndSimulation => {
                    info!("[{}] directed: end of program", bench.cycle());
                    return Ok(false);
                }
            };
            if retire {
                self.queue.pop_front();
            }
            if consumes_cycle {
                return Ok(true);
            }
        }
    }
}

pub type ProgramFn = fn(&mut ProgramBuilder, &TableConfig);

/// A registered test running a directed program from reset to completion.
pub struct DirectedTest {
    program: ProgramFn,
}

impl DirectedTest {
    pub fn new(program: ProgramFn) -> Self {
        Self { program }
    }
}

impl Test for DirectedTest {
    fn run(&mut self, ctx: &mut SimContext) -> Result<(), Error> {
        let mut builder = ProgramBuilder::new();
        (self.program)(&mut builder, ctx.table());
        let mut directed = builder.build();
        let mut kernel = Kernel::new(ctx)?;
        let result = kernel.run(&mut directed);
        kernel.end();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::context::tests::idle_context;
    use crate::transaction::Op;

    #[test]
    fn prologue_and_epilogue() {
        let mut builder = ProgramBuilder::new();
        builder.note("hello").wait_cycles(3);
        let directed = builder.build();
        let program: Vec<_> = directed.pending().cloned().collect();
        assert_eq!(program.len(), 5);
        assert!(matches!(program[0], Instruction::ApplyReset(RESET_PULSE_CYCLES)));
        assert!(matches!(program[1], Instruction::WaitUntilNotBusy));
        assert!(matches!(program[2], Instruction::LogMessage(_)));
        assert!(matches!(program[3], Instruction::WaitCycles(3)));
        assert!(matches!(program[4], Instruction::EndSimulation));
        assert!(!program[2].consumes_cycle());
        assert!(program[3].consumes_cycle());
    }

    #[test]
    fn cycle_accounting() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut ctx = idle_context(HarnessConfig::default());
        let mut builder = ProgramBuilder::new();
        builder
            .note("begin")
            .note("still zero cycles")
            .wait_cycles(3)
            .wait_cycles(0)
            .note("end");
        let mut directed = builder.build();
        let mut kernel = Kernel::new(&mut ctx).unwrap();
        kernel.run(&mut directed).unwrap();
        // Reset pulse, release, not-busy, wait and end.
        assert_eq!(kernel.cycle(), RESET_PULSE_CYCLES + 1 + 1 + 3 + 1);
        assert!(matches!(
            directed.pending().next(),
            Some(Instruction::EndSimulation)
        ));
    }

    /// Records, on every falling edge, whether the model already holds an
    /// entry in context 0 when the engine runs.
    struct Probe {
        directed: Directed,
        populated: Vec<bool>,
    }

    impl Callbacks for Probe {
        fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
            self.populated.push(bench.model().has_active_entries(0));
            self.directed.on_negedge_clk(bench)
        }
    }

    #[test]
    fn emit_reaches_the_model() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut config = HarnessConfig::default();
        config.kernel.max_errors = 0;
        let mut ctx = idle_context(config);
        let mut builder = ProgramBuilder::new();
        builder
            .update(UpdateCommand::new(0, Op::Add, 5, 5))
            .wait_cycles(10);
        let mut probe = Probe {
            directed: builder.build(),
            populated: vec![],
        };
        {
            let mut kernel = Kernel::new(&mut ctx).unwrap();
            kernel.run(&mut probe).unwrap();
            assert_eq!(kernel.model().entries(0).len(), 1);
        }
        // Emitted on the fifth falling edge, seen by the model from the sixth.
        let first = probe.populated.iter().position(|p| *p).unwrap();
        assert_eq!(first, RESET_PULSE_CYCLES + 1 + 1 + 1);
        // The idle unit never drives the notification the add predicts.
        assert_eq!(ctx.errors(), 1);
    }
}
