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

use log::{error, info, warn};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use std::fmt;

use crate::config::{HarnessConfig, KernelOptions, TableConfig};
use crate::ports::{Unit, UnitFactory};
use crate::Error;

pub const DEFAULT_SEED: u64 = 1;

/// Simulation-wide state shared by the kernel, the reference model and the
/// tests: error/warning tallies, the random stream and the configuration.
///
/// Created once per run with `init` and consumed by `teardown`, which
/// produces the final `Report`.
pub struct SimContext {
    config: HarnessConfig,
    unit_factory: UnitFactory,
    test_name: String,
    seed: u64,
    rng: Xoshiro256StarStar,
    errors: u64,
    warnings: u64,
    failed: bool,
}

impl SimContext {
    pub fn init(config: HarnessConfig, seed: u64, unit_factory: UnitFactory) -> Result<Self, Error> {
        config.table.validate()?;
        info!(
            "sim init: seed {}, contexts {}, entries {}, mode {:?}",
            seed, config.table.context_n, config.table.entries_n, config.table.mode
        );
        Ok(Self {
            config,
            unit_factory,
            test_name: "sim".to_string(),
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            errors: 0,
            warnings: 0,
            failed: false,
        })
    }

    pub fn set_test_name(&mut self, name: &str) {
        self.test_name = name.to_string();
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn table(&self) -> &TableConfig {
        &self.config.table
    }

    pub fn kernel_options(&self) -> &KernelOptions {
        &self.config.kernel
    }

    pub fn build_unit(&self) -> Box<dyn Unit> {
        (self.unit_factory)(&self.config.table)
    }

    pub fn rng(&mut self) -> &mut Xoshiro256StarStar {
        &mut self.rng
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_warning(&mut self) {
        self.warnings += 1;
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn warnings(&self) -> u64 {
        self.warnings
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Returns true once the configured error limit has been reached.
    pub fn error_limit_reached(&self) -> bool {
        let max_errors = self.config.kernel.max_errors;
        max_errors != 0 && self.errors >= max_errors
    }

    pub fn teardown(self) -> Report {
        let report = Report {
            test_name: self.test_name,
            errors: self.errors,
            warnings: self.warnings,
            failed: self.failed,
        };
        if report.passed() {
            info!("{}", report);
        } else if report.failed || report.errors != 0 {
            error!("{}", report);
        } else {
            warn!("{}", report);
        }
        report
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub test_name: String,
    pub errors: u64,
    pub warnings: u64,
    pub failed: bool,
}

impl Report {
    pub fn passed(&self) -> bool {
        !self.failed && self.errors == 0 && self.warnings == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} (errors: {}, warnings: {})",
            if self.passed() { "PASS" } else { "FAIL" },
            self.test_name,
            self.errors,
            self.warnings
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::{Inputs, Outputs};
    use rand::Rng;

    /// A unit that never drives anything.
    #[derive(Default)]
    pub(crate) struct IdleUnit {
        pub inputs: Inputs,
        pub outputs: Outputs,
        pub evals: usize,
    }

    impl Unit for IdleUnit {
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
            self.evals += 1;
        }
    }

    pub(crate) fn idle_context(config: HarnessConfig) -> SimContext {
        SimContext::init(config, DEFAULT_SEED, Box::new(|_: &TableConfig| -> Box<dyn Unit> { Box::new(IdleUnit::default()) }))
            .expect("valid config")
    }

    #[test]
    fn tallies_and_report() {
        let mut ctx = idle_context(HarnessConfig::default());
        ctx.set_test_name("tally");
        assert!(!ctx.error_limit_reached());
        ctx.record_warning();
        ctx.record_error();
        assert!(ctx.error_limit_reached());
        let report = ctx.teardown();
        assert!(!report.passed());
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.to_string(), "FAIL tally (errors: 1, warnings: 1)");
    }

    #[test]
    fn unlimited_errors() {
        let mut config = HarnessConfig::default();
        config.kernel.max_errors = 0;
        let mut ctx = idle_context(config);
        for _ in 0..100 {
            ctx.record_error();
        }
        assert!(!ctx.error_limit_reached());
    }

    #[test]
    fn seeded_stream_is_reproducible() {
        let mut a = idle_context(HarnessConfig::default());
        let mut b = idle_context(HarnessConfig::default());
        let xs: Vec<u64> = (0..8).map(|_| a.rng().gen()).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.rng().gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn reject_invalid_config() {
        let mut config = HarnessConfig::default();
        config.table.context_n = 0;
        assert!(SimContext::init(config, 0, Box::new(|_: &TableConfig| -> Box<dyn Unit> { Box::new(IdleUnit::default()) })).is_err());
    }
}
