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

use harness::*;
use table_unit::{Faults, RankTable};

/// Runs a directed program and records every valid response the unit drove.
struct Recorder {
    directed: Directed,
    responses: Vec<QueryResponse>,
    notifications: Vec<NotifyResponse>,
}

impl Callbacks for Recorder {
    fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
        let outputs = bench.outputs();
        if outputs.qr_vld {
            self.responses.push(outputs.query_response());
        }
        if outputs.ntf_vld {
            self.notifications.push(outputs.notification());
        }
        self.directed.on_negedge_clk(bench)
    }
}

fn context(table: TableConfig, unit: UnitFactory) -> SimContext {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = HarnessConfig {
        table,
        kernel: KernelOptions {
            max_errors: 0,
            ..Default::default()
        },
    };
    SimContext::init(config, DEFAULT_SEED, unit).unwrap()
}

fn run_program<F>(table: TableConfig, program: F) -> (Recorder, Report)
where
    F: FnOnce(&mut ProgramBuilder, &TableConfig),
{
    let mut ctx = context(table.clone(), RankTable::factory());
    let mut builder = ProgramBuilder::new();
    program(&mut builder, &table);
    // Let every response drain before the program ends.
    builder.wait_cycles(table.update_delay + 1);
    let mut recorder = Recorder {
        directed: builder.build(),
        responses: vec![],
        notifications: vec![],
    };
    Kernel::new(&mut ctx).unwrap().run(&mut recorder).unwrap();
    (recorder, ctx.teardown())
}

fn add(key: Key, volume: Volume) -> UpdateCommand {
    UpdateCommand::new(0, Op::Add, key, volume)
}

#[test]
fn capacity_overflow_drops_last_key() {
    let (recorder, report) = run_program(TableConfig::default(), |p, table| {
        for key in 1..=(table.entries_n as Key + 1) {
            p.update(add(key, key as Volume)).wait_cycles(1);
        }
        p.wait_cycles(10);
        for level in 0..table.entries_n as Level {
            p.query(QueryCommand::new(0, level));
        }
    });
    assert!(report.passed(), "{}", report);
    let expected: Vec<_> = (1..=8)
        .map(|key| QueryResponse::new(key, key as Volume, 8))
        .collect();
    assert_eq!(recorder.responses, expected);
    // Only the first add becomes the first-ranked entry.
    assert_eq!(recorder.notifications, vec![NotifyResponse::new(0, 1, 1)]);
}

#[test]
fn duplicate_keys_coexist() {
    let (recorder, report) = run_program(TableConfig::default(), |p, _| {
        p.update(add(0, 1)).wait_cycles(1);
        p.update(add(0, 2)).wait_cycles(10);
        p.query(QueryCommand::new(0, 0));
        p.query(QueryCommand::new(0, 1));
        p.query(QueryCommand::new(0, 2));
    });
    assert!(report.passed(), "{}", report);
    assert_eq!(
        recorder.responses,
        vec![
            QueryResponse::new(0, 1, 2),
            QueryResponse::new(0, 2, 2),
            QueryResponse::errored(),
        ]
    );
}

#[test]
fn delete_all_then_query_errors() {
    let (recorder, report) = run_program(TableConfig::default(), |p, table| {
        for key in 0..table.entries_n as Key {
            p.update(add(key, 0)).wait_cycles(1);
        }
        for key in 0..table.entries_n as Key {
            p.update(UpdateCommand::new(0, Op::Delete, key, 0));
        }
        p.wait_cycles(10);
        p.query(QueryCommand::new(0, 0));
    });
    assert!(report.passed(), "{}", report);
    assert_eq!(recorder.responses, vec![QueryResponse::errored()]);
    // Add of key 0, then one notification per delete of the first entry.
    assert_eq!(recorder.notifications.len(), 1 + 8);
}

#[test]
fn query_hazard() {
    let (recorder, report) = run_program(TableConfig::default(), |p, table| {
        p.update(add(3, 3)).wait_cycles(10);
        p.query(QueryCommand::new(0, 0));
        p.emit(add(4, 4), QueryCommand::new(0, 0));
        for _ in 1..table.update_delay {
            p.query(QueryCommand::new(0, 0));
        }
        p.query(QueryCommand::new(0, 0));
    });
    assert!(report.passed(), "{}", report);
    let mut expected = vec![QueryResponse::new(3, 3, 1)];
    expected.extend(std::iter::repeat(QueryResponse::errored()).take(5));
    expected.push(QueryResponse::new(3, 3, 2));
    assert_eq!(recorder.responses, expected);
}

#[test]
fn clear_is_idempotent() {
    let (recorder, report) = run_program(TableConfig::default(), |p, _| {
        p.update(UpdateCommand::new(1, Op::Clear, 0, 0)).wait_cycles(1);
        p.update(UpdateCommand::new(1, Op::Add, 9, 9)).wait_cycles(1);
        p.update(UpdateCommand::new(1, Op::Clear, 0, 0)).wait_cycles(1);
        p.update(UpdateCommand::new(1, Op::Clear, 0, 0)).wait_cycles(10);
    });
    assert!(report.passed(), "{}", report);
    assert_eq!(
        recorder.notifications,
        vec![NotifyResponse::new(1, 9, 9), NotifyResponse::new(1, 0, 0)]
    );
}

fn regress(table: TableConfig, unit: UnitFactory, opts: StimulusOptions) -> Report {
    let mut ctx = context(table.clone(), unit);
    let mut randomized = Randomized::new(opts, &table).unwrap();
    Kernel::new(&mut ctx).unwrap().run(&mut randomized).unwrap();
    assert!(randomized.reset_tracker().is_done());
    ctx.teardown()
}

fn short_run() -> StimulusOptions {
    StimulusOptions {
        n: 2000,
        keys: Some(16),
        clr_weight: 0.05,
        ..Default::default()
    }
}

#[test]
fn randomized_ask_table() {
    let report = regress(TableConfig::default(), RankTable::factory(), short_run());
    assert!(report.passed(), "{}", report);
}

#[test]
fn randomized_bid_table() {
    let table = TableConfig {
        mode: TableMode::Bid,
        context_n: 2,
        entries_n: 4,
        update_delay: 3,
        query_delay: 2,
        reset_active_low: false,
    };
    let report = regress(table, RankTable::factory(), short_run());
    assert!(report.passed(), "{}", report);
}

#[test]
fn faults_are_detected() {
    let faults = [
        Faults {
            drop_notifications: true,
            ..Default::default()
        },
        Faults {
            late_query_response: true,
            ..Default::default()
        },
        Faults {
            short_init: true,
            ..Default::default()
        },
        Faults {
            ignore_replace: true,
            ..Default::default()
        },
    ];
    for fault in faults.iter() {
        let report = regress(
            TableConfig::default(),
            RankTable::faulty(*fault),
            short_run(),
        );
        assert!(report.errors > 0, "{:?} went unnoticed", fault);
    }
}
