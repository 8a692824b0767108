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

//! Short directed programs, one per command.

use harness::{
    DirectedTest, Error, Key, Level, Op, ProgramBuilder, QueryCommand, Registry, TableConfig,
    Test, TestArgs, TestBuilder, UpdateCommand, Volume,
};

macro_rules! directed_test {
    ($name:expr, $about:expr, $program:ident) => {
        TestBuilder {
            name: $name,
            about: $about,
            args: &[],
            construct: {
                fn construct(_args: &TestArgs) -> Result<Box<dyn Test>, Error> {
                    Ok(Box::new(DirectedTest::new($program)))
                }
                construct
            },
        }
    };
}

fn update(op: Op, key: Key, volume: Volume) -> UpdateCommand {
    UpdateCommand::new(0, op, key, volume)
}

fn query(level: usize) -> QueryCommand {
    QueryCommand::new(0, level.min(Level::MAX as usize) as Level)
}

/// Fills context 0 one entry past capacity, then reads back every level.
fn add_cmd(p: &mut ProgramBuilder, table: &TableConfig) {
    p.note("CheckAddCmd begins");
    for i in 0..=table.entries_n {
        // One idle cycle between updates to the same context.
        p.update(update(Op::Add, i as Key + 1, i as Volume)).wait_cycles(1);
    }
    p.wait_cycles(10);
    for level in 0..table.entries_n {
        p.query(query(level));
    }
    p.note("CheckAddCmd ends");
}

/// Fills context 0, deletes every entry, then checks the empty table.
fn del_cmd(p: &mut ProgramBuilder, table: &TableConfig) {
    p.note("CheckDelCmd begins");
    for key in 0..table.entries_n as Key {
        p.update(update(Op::Add, key, key as Volume)).wait_cycles(1);
    }
    for key in 0..table.entries_n as Key {
        p.update(update(Op::Delete, key, 0)).wait_cycles(1);
    }
    p.wait_cycles(10);
    p.query(query(0));
    p.note("CheckDelCmd ends");
}

/// Empty table, out-of-range levels and the in-flight hazard.
fn list_size(p: &mut ProgramBuilder, table: &TableConfig) {
    p.note("CheckListSize begins");
    p.query(query(0)).wait_cycles(10);

    p.update(update(Op::Add, 0, 0)).wait_cycles(10);
    for level in 0..table.entries_n + 10 {
        p.query(query(level));
    }
    p.wait_cycles(10);

    p.update(update(Op::Add, 0, 0)).wait_cycles(10);
    p.emit(update(Op::Add, 0, 0), query(0)).wait_cycles(10);
    p.note("CheckListSize ends");
}

/// Clears a full context, then clears it again while empty.
fn clr_cmd(p: &mut ProgramBuilder, table: &TableConfig) {
    p.note("CheckClrCmd begins");
    for i in 0..table.entries_n {
        p.update(update(Op::Add, i as Key + 1, i as Volume)).wait_cycles(1);
    }
    p.update(update(Op::Clear, 0, 0)).wait_cycles(10);
    for level in 0..table.entries_n {
        p.query(query(level));
    }
    p.update(update(Op::Clear, 0, 0)).wait_cycles(10);
    for level in 0..table.entries_n {
        p.query(query(level));
    }
    p.note("CheckClrCmd ends");
}

/// Replace on an empty context, of an absent key and of a present one.
fn rpl_cmd(p: &mut ProgramBuilder, table: &TableConfig) {
    p.note("CheckRplCmd begins");
    p.update(update(Op::Replace, 0, 0)).wait_cycles(1);
    for key in 0..table.entries_n as Key {
        p.update(update(Op::Add, key, key as Volume)).wait_cycles(1);
    }
    p.update(update(Op::Replace, table.entries_n as Key, 1)).wait_cycles(1);
    p.update(update(Op::Replace, 0, 1)).wait_cycles(10);
    for level in 0..table.entries_n {
        p.query(query(level));
    }
    p.note("CheckRplCmd ends");
}

/// Two entries with the same key coexist in insertion order.
fn duplicate_add(p: &mut ProgramBuilder, _table: &TableConfig) {
    p.update(update(Op::Add, 0, 1)).wait_cycles(1);
    p.update(update(Op::Add, 0, 2)).wait_cycles(10);
    for level in 0..3 {
        p.query(query(level));
    }
    p.update(update(Op::Delete, 0, 0)).wait_cycles(10);
    p.query(query(0)).query(query(1));
}

pub fn init(registry: &mut Registry) {
    registry.add(directed_test!(
        "CheckAddCmd",
        "fill a context past capacity and read back every level",
        add_cmd
    ));
    registry.add(directed_test!(
        "CheckDelCmd",
        "fill a context then delete every entry",
        del_cmd
    ));
    registry.add(directed_test!(
        "CheckListSize",
        "empty context, out-of-range levels and the update hazard",
        list_size
    ));
    registry.add(directed_test!(
        "CheckClrCmd",
        "clear a full context and an empty one",
        clr_cmd
    ));
    registry.add(directed_test!(
        "CheckRplCmd",
        "replace on empty, absent and present keys",
        rpl_cmd
    ));
    registry.add(directed_test!(
        "CheckDuplicateAdd",
        "add the same key twice",
        duplicate_add
    ));
}
