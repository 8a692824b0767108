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

//! Checks the reset and initialization handshake of the unit.

use harness::{
    Bench, Callbacks, Error, Kernel, Registry, ResetTracker, SimContext, Test, TestArgs,
    TestBuilder,
};

struct CheckResetCallbacks {
    tracker: ResetTracker,
}

impl Callbacks for CheckResetCallbacks {
    fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
        self.tracker.on_negedge_clk(bench);
        Ok(!self.tracker.is_done())
    }
}

pub struct CheckReset;

impl Test for CheckReset {
    fn run(&mut self, ctx: &mut SimContext) -> Result<(), Error> {
        let mut callbacks = CheckResetCallbacks {
            tracker: ResetTracker::new(ctx.table()),
        };
        let result = {
            let mut kernel = Kernel::new(ctx)?;
            let result = kernel.run(&mut callbacks);
            kernel.end();
            result
        };
        if callbacks.tracker.is_failed() {
            ctx.mark_failed();
        }
        result
    }
}

fn construct(_args: &TestArgs) -> Result<Box<dyn Test>, Error> {
    Ok(Box::new(CheckReset))
}

pub fn init(registry: &mut Registry) {
    registry.add(TestBuilder {
        name: "CheckReset",
        about: "reset pulse followed by the busy handshake of initialization",
        args: &[],
        construct,
    });
}
