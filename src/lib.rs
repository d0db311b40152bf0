// Copyright 2024 The stackwalk-diff Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

use serde_json::Value;
use std::io;

mod json_diff;
mod report;
mod stackwalk;

pub use json_diff::compare::{compare_default, compare_hex, Comparator};
pub use json_diff::config::Config;
pub use json_diff::path::{normalize, Key, Path};
pub use json_diff::{Depth, Differ, Divergence, Sink};
pub use report::LineWriter;
pub use stackwalk::{extract_dump, load_dump, module_sort_key, sorted_modules, ENVELOPE_KEY};

/// Builder for a crash report comparison.
///
/// The left document is the candidate (minidump-stackwalk output) and the
/// right document is the reference (breakpad stackwalker output).
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use stackwalk_diff::DumpDiff;
///
/// let left = json!({ "crash_info": { "address": "0x10" } });
/// let right = json!({ "crash_info": { "address": "10" } });
///
/// let mut divergences = Vec::new();
/// let count = DumpDiff::new().compare(&left, &right, &mut divergences).unwrap();
///
/// assert_eq!(count, 1);
/// assert_eq!(divergences[0].path, "crash_info.address");
/// ```
pub struct DumpDiff {
    config: Config,
}

impl DumpDiff {
    /// Constructs a `DumpDiff` using [`Config::stackwalker`].
    pub fn new() -> Self {
        Self {
            config: Config::stackwalker(),
        }
    }

    /// Replaces the exception tables and comparators.
    ///
    /// # Examples
    ///
    /// ```
    /// use stackwalk_diff::{compare_hex, Config, DumpDiff};
    ///
    /// let config = Config::stackwalker()
    ///     .ignore_path("threads.N.frames.N.trust")
    ///     .comparator("address", compare_hex);
    /// let diff = DumpDiff::new().with_config(config);
    /// ```
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the comparison, handing every divergence to `sink` as it is found.
    ///
    /// The root and the `crash_info`, `system_info` and `sensitive` sections
    /// are compared one level deep. `crashing_thread` and `threads` are
    /// compared fully. `modules` and `unloaded_modules` are compared fully
    /// after ordering both sides by [`module_sort_key`].
    ///
    /// Returns the number of divergences emitted.
    pub fn compare<'a, S>(&self, left: &'a Value, right: &'a Value, sink: S) -> Result<usize, Error>
    where
        S: Sink<'a>,
    {
        let mut differ = Differ::new(&self.config, sink);
        stackwalk::diff_reports(&mut differ, left, right)?;
        Ok(differ.emitted())
    }
}

impl Default for DumpDiff {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for a stackwalk-diff run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input file could not be read
    #[error("unable to read {path}: {source}")]
    Read { path: String, source: io::Error },
    /// The input file is not valid JSON
    #[error("unable to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    /// A divergence could not be written out
    #[error("unable to write report: {0}")]
    Output(#[from] io::Error),
}
