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

//! Test suites for the ranking table and the plumbing to run them against
//! the behavioral unit.

use log::error;

use harness::{HarnessConfig, Registry, Report, SimContext, TestArgs};
use table_unit::RankTable;

pub mod suites;

/// Registers every suite with `registry`.
pub fn init(registry: &mut Registry) {
    suites::reset::init(registry);
    suites::smoke::init(registry);
    suites::regress::init(registry);
}

/// Runs test `name` once against a fresh `RankTable`.
///
/// Errors building the context or the test are returned; a test that fails
/// while running is reported through the returned `Report`.
pub fn run_test<S: AsRef<str>>(
    registry: &Registry,
    name: &str,
    args: &[S],
    config: HarnessConfig,
    seed: u64,
) -> anyhow::Result<Report> {
    let mut ctx = SimContext::init(config, seed, RankTable::factory())?;
    let args = TestArgs::parse(args)?;
    let mut test = registry.construct(name, &args, &mut ctx)?;
    if let Err(e) = test.run(&mut ctx) {
        error!("{}: {}", name, e);
        ctx.mark_failed();
    }
    Ok(ctx.teardown())
}
