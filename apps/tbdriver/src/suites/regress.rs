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

//! Constrained-random regression.

use log::info;

use harness::{
    Error, Kernel, Randomized, Registry, SimContext, StimulusOptions, Test, TestArgs, TestBuilder,
};

pub struct Regress {
    opts: StimulusOptions,
}

impl Regress {
    pub fn new(args: &TestArgs) -> Result<Self, Error> {
        let defaults = StimulusOptions::default();
        let opts = StimulusOptions {
            n: args.get("n", defaults.n)?,
            clr_weight: args.get("clr", defaults.clr_weight)?,
            add_weight: args.get("add", defaults.add_weight)?,
            del_weight: args.get("del", defaults.del_weight)?,
            rep_weight: args.get("rep", defaults.rep_weight)?,
            inv_weight: args.get("inv", defaults.inv_weight)?,
            keys: args.get_opt("keys")?,
            ..defaults
        };
        Ok(Self { opts })
    }
}

impl Test for Regress {
    fn run(&mut self, ctx: &mut SimContext) -> Result<(), Error> {
        info!("regress: {:?}", self.opts);
        let mut randomized = Randomized::new(self.opts.clone(), ctx.table())?;
        let result = {
            let mut kernel = Kernel::new(ctx)?;
            let result = kernel.run(&mut randomized);
            kernel.end();
            result
        };
        if randomized.reset_tracker().is_failed() {
            ctx.mark_failed();
        }
        result
    }
}

fn construct(args: &TestArgs) -> Result<Box<dyn Test>, Error> {
    Ok(Box::new(Regress::new(args)?))
}

pub fn init(registry: &mut Registry) {
    registry.add(TestBuilder {
        name: "Regress",
        about: "weighted random updates and queries, then a check of every level",
        args: &[
            ("n", "10000"),
            ("clr", "0.01"),
            ("add", "1"),
            ("del", "1"),
            ("rep", "1"),
            ("inv", "1"),
            ("keys", "unbounded"),
        ],
        construct,
    });
}
