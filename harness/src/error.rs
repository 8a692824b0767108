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

use std::fmt;

use crate::transaction::ContextId;

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// A valid command addressed a context the table does not have.
    ContextOutOfRange(ContextId, usize),
    /// An internal invariant of the bench does not hold.
    Assertion(String),
    InvalidConfig(String),
    InvalidArgument(String),
    UnknownTest(String),
    Waveform(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ContextOutOfRange(id, context_n) => write!(
                f,
                "ERROR: Context id {} out of range (contexts: {})",
                id, context_n
            ),
            Self::Assertion(msg) => write!(f, "ERROR: Assertion failed: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "ERROR: Invalid configuration: {}", msg),
            Self::InvalidArgument(msg) => write!(f, "ERROR: Invalid test argument: {}", msg),
            Self::UnknownTest(name) => write!(f, "ERROR: Unknown test: {}", name),
            Self::Waveform(msg) => write!(f, "ERROR: Waveform capture: {}", msg),
        }
    }
}

// Lets `anyhow::Result` carry our errors in the driver.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
