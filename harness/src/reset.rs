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

use log::{error, info};

use crate::config::TableConfig;
use crate::kernel::Bench;

/// Cycles spent in `Done` before the tracker reports completion.
pub const WIND_DOWN_CYCLES: usize = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResetState {
    PreReset,
    AssertReset,
    InReset,
    PostReset,
    PostInit,
    Done,
}

/// Pulses reset for one cycle and checks the busy handshake that follows:
/// busy must be visible on the first falling edge after release and stay
/// up for exactly `context_n + 2` cycles while the unit initializes its
/// contexts.
#[derive(Debug)]
pub struct ResetTracker {
    state: ResetState,
    init_cycles: usize,
    cnt: usize,
    is_done: bool,
    is_failed: bool,
}

impl ResetTracker {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            state: ResetState::PreReset,
            init_cycles: config.context_n + 2,
            cnt: 0,
            is_done: false,
            is_failed: false,
        }
    }

    pub fn state(&self) -> ResetState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.is_done
    }

    pub fn is_failed(&self) -> bool {
        self.is_failed
    }

    pub fn on_negedge_clk(&mut self, bench: &mut Bench) {
        match self.state {
            ResetState::PreReset => self.state = ResetState::AssertReset,
            ResetState::AssertReset => {
                info!("[{}] reset: assert", bench.cycle());
                bench.drive_reset(true);
                self.state = ResetState::InReset;
            }
            ResetState::InReset => {
                info!("[{}] reset: release", bench.cycle());
                bench.drive_reset(false);
                self.state = ResetState::PostReset;
            }
            ResetState::PostReset => {
                if bench.is_busy() {
                    self.cnt = self.init_cycles;
                    self.state = ResetState::PostInit;
                } else {
                    error!(
                        "[{}] reset: busy not asserted after reset release",
                        bench.cycle()
                    );
                    self.fail(bench);
                }
            }
            ResetState::PostInit => {
                self.cnt -= 1;
                let busy = bench.is_busy();
                if self.cnt == 0 {
                    if busy {
                        error!(
                            "[{}] reset: still busy after {} cycles",
                            bench.cycle(),
                            self.init_cycles
                        );
                        self.fail(bench);
                    } else {
                        info!("[{}] reset: initialization complete", bench.cycle());
                        self.cnt = WIND_DOWN_CYCLES;
                        self.state = ResetState::Done;
                    }
                } else if !busy {
                    error!(
                        "[{}] reset: busy deasserted after {} of {} cycles",
                        bench.cycle(),
                        self.init_cycles - self.cnt,
                        self.init_cycles
                    );
                    self.fail(bench);
                }
            }
            ResetState::Done => {
                self.cnt = self.cnt.saturating_sub(1);
                self.is_done = self.cnt == 0;
            }
        }
    }

    fn fail(&mut self, bench: &mut Bench) {
        bench.ctx().record_error();
        self.is_failed = true;
        self.cnt = 0;
        self.state = ResetState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::context::SimContext;
    use crate::kernel::{Callbacks, Kernel};
    use crate::ports::{Inputs, Outputs, Unit};
    use crate::Error;

    /// Raises busy for `busy_cycles` rising edges once reset is released.
    struct BusyUnit {
        inputs: Inputs,
        outputs: Outputs,
        prev_clk: bool,
        in_reset: bool,
        busy_cycles: usize,
        remaining: usize,
    }

    impl Unit for BusyUnit {
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
            let posedge = self.inputs.clk && !self.prev_clk;
            self.prev_clk = self.inputs.clk;
            // Active-low reset.
            if !self.inputs.rst {
                self.in_reset = true;
                self.outputs.busy = false;
                return;
            }
            if !posedge {
                return;
            }
            if self.in_reset {
                self.in_reset = false;
                self.remaining = self.busy_cycles;
            }
            self.outputs.busy = self.remaining > 0;
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    struct CheckReset(ResetTracker);

    impl Callbacks for CheckReset {
        fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
            self.0.on_negedge_clk(bench);
            Ok(!self.0.is_done())
        }
    }

    fn run_with_busy_cycles(busy_cycles: usize) -> (ResetTracker, u64) {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut config = HarnessConfig::default();
        config.kernel.max_errors = 0;
        let mut ctx = SimContext::init(
            config.clone(),
            0,
            Box::new(move |_: &TableConfig| -> Box<dyn Unit> {
                Box::new(BusyUnit {
                    inputs: Inputs::default(),
                    outputs: Outputs::default(),
                    prev_clk: false,
                    in_reset: false,
                    busy_cycles,
                    remaining: 0,
                })
            }),
        )
        .unwrap();
        let mut callbacks = CheckReset(ResetTracker::new(&config.table));
        Kernel::new(&mut ctx).unwrap().run(&mut callbacks).unwrap();
        (callbacks.0, ctx.errors())
    }

    #[test]
    fn handshake_with_exact_init_time() {
        // context_n + 2
        let (tracker, errors) = run_with_busy_cycles(6);
        assert!(tracker.is_done());
        assert!(!tracker.is_failed());
        assert_eq!(errors, 0);
    }

    #[test]
    fn busy_drops_early() {
        let (tracker, errors) = run_with_busy_cycles(5);
        assert!(tracker.is_done());
        assert!(tracker.is_failed());
        assert_eq!(errors, 1);
    }

    #[test]
    fn busy_drops_late() {
        let (tracker, errors) = run_with_busy_cycles(7);
        assert!(tracker.is_failed());
        assert_eq!(errors, 1);
    }

    #[test]
    fn never_busy() {
        let (tracker, errors) = run_with_busy_cycles(0);
        assert!(tracker.is_failed());
        assert_eq!(tracker.state(), ResetState::Done);
        assert_eq!(errors, 1);
    }
}
