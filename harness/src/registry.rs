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

use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::context::SimContext;
use crate::Error;

/// A runnable test program.
pub trait Test {
    fn run(&mut self, ctx: &mut SimContext) -> Result<(), Error>;
}

/// `key=value` arguments forwarded to a test, e.g. `n=100;clr=0.5`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestArgs {
    values: BTreeMap<String, String>,
}

impl TestArgs {
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, Error> {
        let mut values = BTreeMap::new();
        for arg in args {
            for pair in arg.as_ref().split(';').map(str::trim).filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    Error::InvalidArgument(format!("expected key=value, got '{}'", pair))
                })?;
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Ok(Self { values })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn get_opt<T: FromStr>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => value.parse::<T>().map(Some).map_err(|_| {
                Error::InvalidArgument(format!("cannot parse {}={}", key, value))
            }),
        }
    }

    pub fn get<T: FromStr>(&self, key: &str, default: T) -> Result<T, Error> {
        Ok(self.get_opt(key)?.unwrap_or(default))
    }
}

pub type Constructor = fn(&TestArgs) -> Result<Box<dyn Test>, Error>;

#[derive(Clone)]
pub struct TestBuilder {
    pub name: &'static str,
    pub about: &'static str,
    /// Accepted arguments and their defaults.
    pub args: &'static [(&'static str, &'static str)],
    pub construct: Constructor,
}

/// What `--list` reports about a test.
#[derive(Debug, Serialize)]
pub struct TestInfo {
    pub name: &'static str,
    pub about: &'static str,
    pub args: BTreeMap<&'static str, &'static str>,
}

#[derive(Default)]
pub struct Registry {
    builders: BTreeMap<&'static str, TestBuilder>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, builder: TestBuilder) {
        if self.builders.insert(builder.name, builder.clone()).is_some() {
            warn!("registry: test {} registered twice", builder.name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TestBuilder> {
        self.builders.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builders.keys().copied()
    }

    pub fn info(&self) -> Vec<TestInfo> {
        self.builders
            .values()
            .map(|b| TestInfo {
                name: b.name,
                about: b.about,
                args: b.args.iter().copied().collect(),
            })
            .collect()
    }

    /// Builds test `name`. Arguments the test does not declare are reported
    /// as warnings.
    pub fn construct(
        &self,
        name: &str,
        args: &TestArgs,
        ctx: &mut SimContext,
    ) -> Result<Box<dyn Test>, Error> {
        let builder = self
            .get(name)
            .ok_or_else(|| Error::UnknownTest(name.to_string()))?;
        for key in args.keys() {
            if !builder.args.iter().any(|(declared, _)| *declared == key) {
                warn!("registry: test {} ignores argument '{}'", name, key);
                ctx.record_warning();
            }
        }
        ctx.set_test_name(name);
        (builder.construct)(args)
    }
}
