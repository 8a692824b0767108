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

//! Cycle-driven simulation kernel.
//!
//! Time advances in ticks; every `TICKS_PER_HALF_PERIOD` ticks the clock
//! toggles. On the falling edge the kernel idles the command pins, lets the
//! test drive new stimulus and then steps the reference model with the
//! driven commands and the outputs the unit currently shows. On the rising
//! edge only the test's posedge callback runs. The unit is evaluated on
//! every tick, after any pin change.

use log::{error, info};

use crate::context::SimContext;
use crate::model::{Model, Sample};
use crate::ports::{Outputs, Unit};
use crate::transaction::{QueryCommand, UpdateCommand};
#[cfg(feature = "vcd-trace")]
use crate::vcd::VcdWriter;
use crate::{Cycle, Error};

pub const TICKS_PER_HALF_PERIOD: u64 = 5;

/// Per-edge hooks of a running test. Returning `Ok(false)` stops requesting
/// stimulus; an `Err` aborts the run.
pub trait Callbacks {
    fn on_negedge_clk(&mut self, _bench: &mut Bench) -> Result<bool, Error> {
        Ok(true)
    }

    fn on_posedge_clk(&mut self, _bench: &mut Bench) -> Result<bool, Error> {
        Ok(true)
    }
}

/// The view of the bench handed to callbacks on every clock edge.
pub struct Bench<'a> {
    unit: &'a mut dyn Unit,
    model: &'a Model,
    ctx: &'a mut SimContext,
    cycle: Cycle,
}

impl<'a> Bench<'a> {
    /// Falling edges seen so far, including the current one.
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn issue_update(&mut self, uc: &UpdateCommand) {
        self.unit.inputs_mut().drive_update(uc);
    }

    pub fn issue_query(&mut self, qc: &QueryCommand) {
        self.unit.inputs_mut().drive_query(qc);
    }

    pub fn is_busy(&self) -> bool {
        self.unit.outputs().busy
    }

    /// Output pins as the unit currently drives them.
    pub fn outputs(&self) -> &Outputs {
        self.unit.outputs()
    }

    /// Drives the reset pin, honoring the configured polarity.
    pub fn drive_reset(&mut self, asserted: bool) {
        let level = self.ctx.table().reset_level(asserted);
        self.unit.inputs_mut().rst = level;
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn ctx(&mut self) -> &mut SimContext {
        self.ctx
    }

    pub fn split(&mut self) -> (&Model, &mut SimContext) {
        (self.model, self.ctx)
    }
}

pub struct Kernel<'c> {
    ctx: &'c mut SimContext,
    unit: Box<dyn Unit>,
    model: Model,
    ticks: u64,
    cycle: Cycle,
    #[cfg(feature = "vcd-trace")]
    vcd: Option<VcdWriter>,
    ended: bool,
}

impl<'c> Kernel<'c> {
    pub fn new(ctx: &'c mut SimContext) -> Result<Self, Error> {
        #[cfg(feature = "vcd-trace")]
        let vcd = match &ctx.kernel_options().vcd {
            Some(path) => Some(VcdWriter::create(path)?),
            None => None,
        };
        if !cfg!(feature = "vcd-trace") && ctx.kernel_options().vcd.is_some() {
            return Err(Error::Waveform(
                "waveform tracing has not been enabled in this build".to_string(),
            ));
        }
        let unit = ctx.build_unit();
        let model = Model::new(ctx.table());
        Ok(Self {
            ctx,
            unit,
            model,
            ticks: 0,
            cycle: 0,
            #[cfg(feature = "vcd-trace")]
            vcd,
            ended: false,
        })
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn unit(&self) -> &dyn Unit {
        self.unit.as_ref()
    }

    pub fn ctx(&mut self) -> &mut SimContext {
        self.ctx
    }

    /// Runs until `callbacks` stop requesting stimulus or the error limit is
    /// reached. A fatal error marks the run failed and is returned without
    /// the run-down.
    pub fn run(&mut self, callbacks: &mut dyn Callbacks) -> Result<(), Error> {
        info!("kernel: simulation starts");
        match self.run_loop(callbacks) {
            Ok(()) => {
                info!(
                    "kernel: simulation stopped after {} cycles ({} ticks)",
                    self.cycle, self.ticks
                );
                Ok(())
            }
            Err(e) => {
                error!("kernel: [{}] fatal: {}", self.cycle, e);
                self.ctx.mark_failed();
                Err(e)
            }
        }
    }

    fn run_loop(&mut self, callbacks: &mut dyn Callbacks) -> Result<(), Error> {
        self.quiesce();
        self.unit.eval();
        self.dump();

        let mut do_stepping = true;
        let mut rundown = self.ctx.kernel_options().rundown_ticks;
        while do_stepping || rundown > 0 {
            if !do_stepping {
                rundown -= 1;
            }
            self.ticks += 1;
            if self.ticks % TICKS_PER_HALF_PERIOD == 0 {
                let edge = self.unit.inputs().clk;
                if do_stepping {
                    do_stepping = self.eval_clock_edge(callbacks, edge)?;
                }
                self.unit.inputs_mut().clk = !edge;
            }
            self.unit.eval();
            self.dump();
        }
        Ok(())
    }

    fn quiesce(&mut self) {
        let rst = self.ctx.table().reset_level(false);
        let inputs = self.unit.inputs_mut();
        inputs.clk = false;
        inputs.rst = rst;
        inputs.drive_update(&UpdateCommand::invalid());
        inputs.drive_query(&QueryCommand::invalid());
    }

    /// `edge` is the clock level before the toggle: high means the clock is
    /// about to fall.
    fn eval_clock_edge(&mut self, callbacks: &mut dyn Callbacks, edge: bool) -> Result<bool, Error> {
        if !edge {
            let mut bench = Bench {
                unit: self.unit.as_mut(),
                model: &self.model,
                ctx: &mut *self.ctx,
                cycle: self.cycle,
            };
            return callbacks.on_posedge_clk(&mut bench);
        }

        self.cycle += 1;
        {
            let inputs = self.unit.inputs_mut();
            inputs.drive_update(&UpdateCommand::invalid());
            inputs.drive_query(&QueryCommand::invalid());
        }
        let more = {
            let mut bench = Bench {
                unit: self.unit.as_mut(),
                model: &self.model,
                ctx: &mut *self.ctx,
                cycle: self.cycle,
            };
            callbacks.on_negedge_clk(&mut bench)?
        };

        let sample = self.sample();
        self.model.step(&sample, self.ctx, self.cycle)?;

        if self.ctx.error_limit_reached() {
            error!(
                "kernel: [{}] error limit of {} reached, stopping",
                self.cycle,
                self.ctx.kernel_options().max_errors
            );
            return Ok(false);
        }
        Ok(more)
    }

    fn sample(&self) -> Sample {
        let inputs = self.unit.inputs();
        let outputs = self.unit.outputs();
        Sample {
            reset: inputs.rst == self.ctx.table().reset_level(true),
            update: inputs.update(),
            query: inputs.query(),
            notification: outputs.notification(),
            query_response: outputs.query_response(),
        }
    }

    #[cfg(feature = "vcd-trace")]
    fn dump(&mut self) {
        if let Some(vcd) = self.vcd.as_mut() {
            vcd.dump(self.ticks, self.unit.inputs(), self.unit.outputs());
        }
    }

    #[cfg(not(feature = "vcd-trace"))]
    fn dump(&mut self) {}

    #[cfg(feature = "vcd-trace")]
    fn close_waveform(&mut self) {
        if let Some(mut vcd) = self.vcd.take() {
            vcd.close();
            if vcd.is_error_state() {
                self.ctx.record_warning();
            }
        }
    }

    #[cfg(not(feature = "vcd-trace"))]
    fn close_waveform(&mut self) {}

    /// Finalizes the unit and closes the waveform. Idempotent.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.unit.finalize();
        self.close_waveform();
    }
}

impl<'c> Drop for Kernel<'c> {
    fn drop(&mut self) {
        self.end();
    }
}
