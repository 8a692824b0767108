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

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::transaction::Key;
use crate::Error;

/// Key ordering of a table.
///
/// A bid table ranks the highest key first, an ask table the lowest.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum TableMode {
    Bid,
    Ask,
}

impl TableMode {
    /// Ordering used by the stable sort of a context's entries.
    pub fn ordering(&self, lhs: Key, rhs: Key) -> Ordering {
        match self {
            TableMode::Bid => rhs.cmp(&lhs),
            TableMode::Ask => lhs.cmp(&rhs),
        }
    }

    /// Returns true when `lhs` strictly ranks ahead of `rhs`.
    pub fn ranks_ahead(&self, lhs: Key, rhs: Key) -> bool {
        self.ordering(lhs, rhs) == Ordering::Less
    }
}

impl std::str::FromStr for TableMode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bid" | "bid" => Ok(TableMode::Bid),
            "Ask" | "ask" => Ok(TableMode::Ask),
            _ => Err(Error::InvalidConfig(format!("unknown table mode '{}'", s))),
        }
    }
}

/// Parameters of the ranking table unit. The reference model and the unit
/// under test must be built from the same values.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    /// Number of independent contexts.
    pub context_n: usize,
    /// Capacity of each context.
    pub entries_n: usize,
    /// Cycles between an update being issued and its notification.
    pub update_delay: usize,
    /// Cycles between a query being issued and its response.
    pub query_delay: usize,
    pub mode: TableMode,
    pub reset_active_low: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            context_n: 4,
            entries_n: 8,
            update_delay: 5,
            query_delay: 1,
            mode: TableMode::Ask,
            reset_active_low: true,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), Error> {
        // Context ids, levels and list sizes are 8-bit wide on the wire.
        if self.context_n == 0 || self.context_n > 256 {
            return Err(Error::InvalidConfig(format!(
                "context_n must be in 1..=256, got {}",
                self.context_n
            )));
        }
        if self.entries_n == 0 || self.entries_n > 255 {
            return Err(Error::InvalidConfig(format!(
                "entries_n must be in 1..=255, got {}",
                self.entries_n
            )));
        }
        if self.update_delay == 0 || self.query_delay == 0 {
            return Err(Error::InvalidConfig(
                "update_delay and query_delay must be at least one cycle".to_string(),
            ));
        }
        Ok(())
    }

    /// Pin level that asserts reset.
    pub fn reset_level(&self, asserted: bool) -> bool {
        asserted != self.reset_active_low
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KernelOptions {
    /// Stop stepping once this many errors were recorded; 0 never stops.
    pub max_errors: u64,
    /// Ticks evaluated after the test stops requesting stimulus.
    pub rundown_ticks: usize,
    /// Dump a waveform to this file.
    pub vcd: Option<PathBuf>,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            max_errors: 1,
            rundown_ticks: 5,
            vcd: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub table: TableConfig,
    pub kernel: KernelOptions,
}

impl HarnessConfig {
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Self, Error> {
        let path = file_name.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::InvalidConfig(format!("file {} not found: {}", path.display(), e))
        })?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.table.validate()?;
        Ok(config)
    }

    pub fn from_str(config: &str) -> Result<Self, Error> {
        let config: Self =
            serde_yaml::from_str(config).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.table.validate()?;
        Ok(config)
    }
}
