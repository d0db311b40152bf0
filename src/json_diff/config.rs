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

use super::compare::{compare_default, compare_hex, Comparator};
use super::path::{normalize, Key, Path};
use std::collections::{BTreeMap, BTreeSet};

/// Fields that always differ between the two stackwalkers.
const IGNORE_KEYS: &[&str] = &[
    // each stackwalker reports its own version
    "stackwalk_version",
    // breakpad only
    "tiny_block_size",
    "largest_free_vm_block",
    "write_combine_size",
    // renamed to frame_count in minidump-stackwalk
    "crashing_thread.total_frames",
    // differ from run to run
    "modules.N.symbol_disk_cache_hit",
    "modules.N.symbol_fetch_time",
    "modules.N.missing_symbols",
    "threads.N.frames.N.missing_symbols",
    "crashing_thread.frames.N.missing_symbols",
];

/// Fields minidump-stackwalk writes as `null` where breakpad leaves them out.
const NULL_OK_KEYS: &[&str] = &[
    "mac_crash_info",
    "lsb_release",
    "crash_info.assertion",
    "system_info.cpu_microcode_version",
    "crashing_thread.last_error_value",
    "crashing_thread.thread_name",
    "crashing_thread.frames.N.line",
    "crashing_thread.frames.N.file",
    "crashing_thread.frames.N.module",
    "crashing_thread.frames.N.module_offset",
    "crashing_thread.frames.N.function_offset",
    "crashing_thread.frames.N.function",
    "threads.N.last_error_value",
    "threads.N.thread_name",
    "threads.N.frames.N.file",
    "threads.N.frames.N.function",
    "threads.N.frames.N.function_offset",
    "threads.N.frames.N.line",
    "threads.N.frames.N.module",
    "threads.N.frames.N.module_offset",
    "modules.N.cert_subject",
    "modules.N.symbol_url",
    "unloaded_modules.N.cert_subject",
];

/// Fields minidump-stackwalk writes as `false` where breakpad leaves them out.
const FALSE_OK_KEYS: &[&str] = &["modules.N.loaded_symbols", "modules.N.corrupt_symbols"];

/// Keys holding hex renderings of byte offsets.
const HEX_KEYS: &[&str] = &["offset", "module_offset", "function_offset"];

/// Which divergences get reported, and how leaves are compared.
///
/// All table entries are stored normalized, so `threads.0.thread_name` and
/// `threads.N.thread_name` describe the same field.
#[derive(Debug, Clone)]
pub struct Config {
    ignore_paths: BTreeSet<String>,
    null_ok_paths: BTreeSet<String>,
    false_ok_paths: BTreeSet<String>,
    comparators: BTreeMap<String, Comparator>,
}

impl Config {
    /// Create a [`Config`] that reports every divergence and compares all
    /// leaves with [`compare_default`].
    pub fn new() -> Self {
        Self {
            ignore_paths: BTreeSet::new(),
            null_ok_paths: BTreeSet::new(),
            false_ok_paths: BTreeSet::new(),
            comparators: BTreeMap::new(),
        }
    }

    /// The policy for comparing minidump-stackwalk output (left) with breakpad
    /// stackwalker output (right).
    pub fn stackwalker() -> Self {
        let mut config = Self::new();
        for path in IGNORE_KEYS {
            config = config.ignore_path(path);
        }
        for path in NULL_OK_KEYS {
            config = config.null_ok_path(path);
        }
        for path in FALSE_OK_KEYS {
            config = config.false_ok_path(path);
        }
        for key in HEX_KEYS {
            config = config.comparator(key, compare_hex);
        }
        config
    }

    /// Never report a divergence at `path`.
    pub fn ignore_path(mut self, path: &str) -> Self {
        self.ignore_paths.insert(normalize(path));
        self
    }

    /// Accept a left-side `null` at `path` when the right side lacks the key.
    pub fn null_ok_path(mut self, path: &str) -> Self {
        self.null_ok_paths.insert(normalize(path));
        self
    }

    /// Accept a left-side `false` at `path` when the right side lacks the key.
    pub fn false_ok_path(mut self, path: &str) -> Self {
        self.false_ok_paths.insert(normalize(path));
        self
    }

    /// Compare leaves stored under `key`, at any depth, with `comparator`.
    pub fn comparator(mut self, key: &str, comparator: Comparator) -> Self {
        self.comparators.insert(key.to_string(), comparator);
        self
    }

    pub fn is_ignore_key(&self, namespace: &Path, key: &str) -> bool {
        self.ignore_paths.contains(&joined(namespace, key))
    }

    pub fn is_null_ok(&self, namespace: &Path, key: &str) -> bool {
        self.null_ok_paths.contains(&joined(namespace, key))
    }

    pub fn is_false_ok(&self, namespace: &Path, key: &str) -> bool {
        self.false_ok_paths.contains(&joined(namespace, key))
    }

    pub fn comparator_for(&self, key: &str) -> Comparator {
        self.comparators
            .get(key)
            .copied()
            .unwrap_or(compare_default as Comparator)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::stackwalker()
    }
}

fn joined(namespace: &Path, key: &str) -> String {
    namespace.append(Key::Field(key)).normalized()
}
