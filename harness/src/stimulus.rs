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

//! Constrained random stimulus.
//!
//! Updates and queries are issued on alternate cycles until the transaction
//! budget is spent. Delete and Replace target keys the reference model knows
//! to be live. The generator then queries every `(context, level)` pair once
//! and idles for a short wind-down before reporting exhaustion.

use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::TableConfig;
use crate::kernel::{Bench, Callbacks};
use crate::model::Model;
use crate::reset::ResetTracker;
use crate::transaction::{ContextId, Key, Level, Op, QueryCommand, UpdateCommand};
use crate::Error;

const OPS: [Op; 5] = [Op::Clear, Op::Add, Op::Delete, Op::Replace, Op::Invalid];

#[derive(Clone, Debug, PartialEq)]
pub struct StimulusOptions {
    /// Transaction budget of the random phase.
    pub n: usize,
    pub clr_weight: f64,
    pub add_weight: f64,
    pub del_weight: f64,
    pub rep_weight: f64,
    /// Weight of bubbles, i.e. cycles without an update.
    pub inv_weight: f64,
    /// Draw keys from `0..keys` instead of the full key space.
    pub keys: Option<Key>,
    pub wind_down: usize,
}

impl Default for StimulusOptions {
    fn default() -> Self {
        Self {
            n: 10000,
            clr_weight: 0.01,
            add_weight: 1.0,
            del_weight: 1.0,
            rep_weight: 1.0,
            inv_weight: 1.0,
            keys: None,
            wind_down: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Random,
    FinalCheck(ContextId, Level),
    WindDown(usize),
    Exhausted,
}

pub struct Stimulus {
    opts: StimulusOptions,
    bag: WeightedIndex<f64>,
    phase: Phase,
    update_cycle: bool,
    remaining: usize,
    context_n: usize,
    entries_n: usize,
}

impl Stimulus {
    pub fn new(opts: StimulusOptions, config: &TableConfig) -> Result<Self, Error> {
        let weights = [
            opts.clr_weight,
            opts.add_weight,
            opts.del_weight,
            opts.rep_weight,
            opts.inv_weight,
        ];
        let bag = WeightedIndex::new(&weights)
            .map_err(|e| Error::InvalidArgument(format!("op weights {:?}: {}", weights, e)))?;
        if let Some(keys) = opts.keys {
            if keys <= 0 {
                return Err(Error::InvalidArgument(format!(
                    "key range must be positive, got {}",
                    keys
                )));
            }
        }
        Ok(Self {
            remaining: opts.n,
            opts,
            bag,
            phase: Phase::Random,
            update_cycle: false,
            context_n: config.context_n,
            entries_n: config.entries_n,
        })
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    /// Stimulus for the next cycle, or `None` once exhausted.
    pub fn next<R: Rng + ?Sized>(
        &mut self,
        model: &Model,
        rng: &mut R,
    ) -> Option<(UpdateCommand, QueryCommand)> {
        if self.phase == Phase::Random && self.remaining == 0 {
            info!("stimulus: random phase done, checking final state");
            self.phase = Phase::FinalCheck(0, 0);
        }
        match self.phase {
            Phase::Random => {
                self.remaining -= 1;
                self.update_cycle = !self.update_cycle;
                if self.update_cycle {
                    Some((self.random_update(model, rng), QueryCommand::invalid()))
                } else {
                    Some((UpdateCommand::invalid(), self.random_query(rng)))
                }
            }
            Phase::FinalCheck(context_id, level) => {
                self.phase = if (level as usize) + 1 < self.entries_n {
                    Phase::FinalCheck(context_id, level + 1)
                } else if (context_id as usize) + 1 < self.context_n {
                    Phase::FinalCheck(context_id + 1, 0)
                } else {
                    Phase::WindDown(self.opts.wind_down)
                };
                Some((
                    UpdateCommand::invalid(),
                    QueryCommand::new(context_id, level),
                ))
            }
            Phase::WindDown(0) => {
                self.phase = Phase::Exhausted;
                None
            }
            Phase::WindDown(cycles) => {
                self.phase = Phase::WindDown(cycles - 1);
                Some((UpdateCommand::invalid(), QueryCommand::invalid()))
            }
            Phase::Exhausted => None,
        }
    }

    fn random_key<R: Rng + ?Sized>(&self, rng: &mut R) -> Key {
        match self.opts.keys {
            Some(keys) => rng.gen_range(0..keys),
            None => rng.gen(),
        }
    }

    fn random_update<R: Rng + ?Sized>(&self, model: &Model, rng: &mut R) -> UpdateCommand {
        let op = OPS[self.bag.sample(rng)];
        let id = rng.gen_range(0..self.context_n) as ContextId;
        let uc = match op {
            Op::Clear => UpdateCommand::new(id, Op::Clear, 0, 0),
            Op::Add => UpdateCommand::new(id, Op::Add, self.random_key(rng), rng.gen()),
            Op::Delete | Op::Replace => match model.pick_active_key(rng, id) {
                Some(key) if op == Op::Replace => {
                    UpdateCommand::new(id, Op::Replace, key, rng.gen())
                }
                Some(key) => UpdateCommand::new(id, Op::Delete, key, 0),
                // Nothing live: the delete of an absent key is a no-op.
                None => UpdateCommand::new(id, Op::Delete, self.random_key(rng), 0),
            },
            Op::Invalid => UpdateCommand::invalid(),
        };
        debug!("stimulus: {}", uc);
        uc
    }

    fn random_query<R: Rng + ?Sized>(&self, rng: &mut R) -> QueryCommand {
        QueryCommand::new(
            rng.gen_range(0..self.context_n) as ContextId,
            rng.gen_range(0..self.entries_n) as Level,
        )
    }
}

/// Resets the unit, then drives random stimulus until it is exhausted.
pub struct Randomized {
    reset: ResetTracker,
    stimulus: Stimulus,
}

impl Randomized {
    pub fn new(opts: StimulusOptions, config: &TableConfig) -> Result<Self, Error> {
        Ok(Self {
            reset: ResetTracker::new(config),
            stimulus: Stimulus::new(opts, config)?,
        })
    }

    pub fn reset_tracker(&self) -> &ResetTracker {
        &self.reset
    }

    pub fn stimulus(&self) -> &Stimulus {
        &self.stimulus
    }
}

impl Callbacks for Randomized {
    fn on_negedge_clk(&mut self, bench: &mut Bench) -> Result<bool, Error> {
        if !self.reset.is_done() {
            self.reset.on_negedge_clk(bench);
            return Ok(true);
        }
        if self.reset.is_failed() {
            return Ok(false);
        }
        let (model, ctx) = bench.split();
        match self.stimulus.next(model, ctx.rng()) {
            Some((uc, qc)) => {
                bench.issue_update(&uc);
                bench.issue_query(&qc);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::idle_context;
    use crate::config::HarnessConfig;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;

    fn options(n: usize) -> StimulusOptions {
        StimulusOptions {
            n,
            ..Default::default()
        }
    }

    #[test]
    fn alternates_then_checks_every_pair() {
        let config = TableConfig::default();
        let model = Model::new(&config);
        let mut rng = Xoshiro256StarStar::seed_from_u64(5);
        let mut stimulus = Stimulus::new(options(100), &config).unwrap();
        for i in 0..100 {
            let (uc, qc) = stimulus.next(&model, &mut rng).unwrap();
            if i % 2 == 1 {
                assert!(!uc.valid);
                assert!(qc.valid);
                assert!((qc.context_id as usize) < config.context_n);
                assert!((qc.level as usize) < config.entries_n);
            } else {
                assert!(!qc.valid);
            }
        }
        let mut checked = vec![];
        for _ in 0..config.context_n * config.entries_n {
            let (uc, qc) = stimulus.next(&model, &mut rng).unwrap();
            assert!(!uc.valid);
            checked.push((qc.context_id, qc.level));
        }
        let expected: Vec<_> = (0..config.context_n as ContextId)
            .flat_map(|c| (0..config.entries_n as Level).map(move |l| (c, l)))
            .collect();
        assert_eq!(checked, expected);
        for _ in 0..10 {
            let (uc, qc) = stimulus.next(&model, &mut rng).unwrap();
            assert!(!uc.valid && !qc.valid);
        }
        assert!(stimulus.next(&model, &mut rng).is_none());
        assert!(stimulus.is_exhausted());
        assert!(stimulus.next(&model, &mut rng).is_none());
    }

    #[test]
    fn delete_and_replace_target_live_keys() {
        let config = TableConfig {
            context_n: 1,
            ..Default::default()
        };
        let mut model = Model::new(&config);
        let mut ctx = idle_context(HarnessConfig::default());
        for key in [11, 22, 33] {
            model
                .apply_update(&UpdateCommand::new(0, Op::Add, key, 0), &mut ctx)
                .unwrap();
        }
        let opts = StimulusOptions {
            n: 200,
            clr_weight: 0.0,
            add_weight: 0.0,
            inv_weight: 0.0,
            ..Default::default()
        };
        let mut stimulus = Stimulus::new(opts, &config).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(9);
        let mut ops = vec![];
        for _ in 0..200 {
            let (uc, _) = stimulus.next(&model, &mut rng).unwrap();
            if uc.valid {
                assert!([11, 22, 33].contains(&uc.key));
                ops.push(uc.op);
            }
        }
        assert!(ops.contains(&Op::Delete));
        assert!(ops.contains(&Op::Replace));
    }

    #[test]
    fn empty_context_degenerates_to_delete() {
        let config = TableConfig::default();
        let model = Model::new(&config);
        let opts = StimulusOptions {
            n: 50,
            clr_weight: 0.0,
            add_weight: 0.0,
            del_weight: 0.0,
            inv_weight: 0.0,
            ..Default::default()
        };
        let mut stimulus = Stimulus::new(opts, &config).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(1);
        for _ in 0..50 {
            let (uc, _) = stimulus.next(&model, &mut rng).unwrap();
            assert!(!uc.valid || uc.op == Op::Delete);
        }
    }

    #[test]
    fn bounded_keys() {
        let config = TableConfig::default();
        let model = Model::new(&config);
        let opts = StimulusOptions {
            n: 100,
            keys: Some(4),
            clr_weight: 0.0,
            del_weight: 0.0,
            rep_weight: 0.0,
            inv_weight: 0.0,
            ..Default::default()
        };
        let mut stimulus = Stimulus::new(opts, &config).unwrap();
        let mut rng = Xoshiro256StarStar::seed_from_u64(2);
        for _ in 0..100 {
            let (uc, _) = stimulus.next(&model, &mut rng).unwrap();
            assert!(!uc.valid || (0..4).contains(&uc.key));
        }
    }

    #[test]
    fn reject_bad_options() {
        let config = TableConfig::default();
        let zero = StimulusOptions {
            clr_weight: 0.0,
            add_weight: 0.0,
            del_weight: 0.0,
            rep_weight: 0.0,
            inv_weight: 0.0,
            ..Default::default()
        };
        assert!(Stimulus::new(zero, &config).is_err());
        let keys = StimulusOptions {
            keys: Some(0),
            ..Default::default()
        };
        assert!(Stimulus::new(keys, &config).is_err());
    }
}
