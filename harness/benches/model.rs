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

use bencher::Bencher;
use bencher::{benchmark_group, benchmark_main};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use harness::*;

const TRANSACTIONS: usize = 10000;

/// A unit that leaves every output idle.
#[derive(Default)]
struct Quiet {
    inputs: Inputs,
    outputs: Outputs,
}

impl Unit for Quiet {
    fn inputs(&self) -> &Inputs {
        &self.inputs
    }
    fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }
    fn outputs(&self) -> &Outputs {
        &self.outputs
    }
    fn eval(&mut self) {}
}

fn quiet_context() -> SimContext {
    let mut config = HarnessConfig::default();
    config.kernel.max_errors = 0;
    SimContext::init(config, DEFAULT_SEED, Box::new(|_: &TableConfig| -> Box<dyn Unit> { Box::new(Quiet::default()) }))
        .expect("default configuration is valid")
}

fn model_updates(bench: &mut Bencher) {
    let mut ctx = quiet_context();
    let config = ctx.table().clone();
    let opts = StimulusOptions {
        n: TRANSACTIONS,
        keys: Some(64),
        ..StimulusOptions::default()
    };
    bench.iter(|| {
        let mut model = Model::new(&config);
        let mut stimulus = Stimulus::new(opts.clone(), &config).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(0);
        while let Some((uc, qc)) = stimulus.next(&model, &mut rng) {
            model.apply_update(&uc, &mut ctx).unwrap();
            let _ = model.predict_query(&qc).unwrap();
        }
    });
}

struct Idle(usize);

impl Callbacks for Idle {
    fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
        Ok(bench.cycle() < self.0)
    }
}

fn kernel_cycles(bench: &mut Bencher) {
    let mut ctx = quiet_context();
    bench.iter(|| {
        let mut kernel = Kernel::new(&mut ctx).unwrap();
        kernel.run(&mut Idle(TRANSACTIONS)).unwrap();
    });
}

benchmark_group!(benches, model_updates, kernel_cycles);
benchmark_main!(benches);
