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

pub mod compare;
pub mod config;
mod misc;
pub mod path;

use config::Config;
use itertools::EitherOrBoth::{Both, Left, Right};
use itertools::Itertools;
use misc::Truncate;
use path::{Key, Path};
use serde_json::Value;
use std::collections::BTreeSet;
use std::{fmt, io};
use tracing::trace;

/// Column width of the path in a report line.
pub const PATH_WIDTH: usize = 50;
/// Maximum number of characters of a rendered value in a report line.
pub const VALUE_WIDTH: usize = 80;

/// How far a diff call descends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    /// Compare the leaves of this node only. Nested mappings and sequences
    /// present on both sides are skipped without being reported.
    Shallow,
    /// Descend into every nested mapping and sequence.
    Recursive,
}

/// A difference between the left and the right document at one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Divergence<'a> {
    pub path: String,
    pub left: Option<&'a Value>,
    pub right: Option<&'a Value>,
}

impl<'a> Divergence<'a> {
    /// `>` when only the left side has a value, `<` when only the right side
    /// has one and `|` when both have different values.
    pub fn indicator(&self) -> char {
        match (self.left, self.right) {
            (Some(_), None) => '>',
            (None, Some(_)) => '<',
            _ => '|',
        }
    }
}

impl<'a> fmt::Display for Divergence<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let render = |value: Option<&Value>| {
            value
                .map(|v| v.to_string().truncate_chars(VALUE_WIDTH))
                .unwrap_or_default()
        };

        write!(
            f,
            "{:path_width$}  {:value_width$}  {}  {}",
            self.path,
            render(self.left),
            self.indicator(),
            render(self.right),
            path_width = PATH_WIDTH,
            value_width = VALUE_WIDTH,
        )
    }
}

/// Receives divergences as soon as the differ finds them.
pub trait Sink<'a> {
    fn emit(&mut self, divergence: Divergence<'a>) -> io::Result<()>;
}

impl<'a> Sink<'a> for Vec<Divergence<'a>> {
    fn emit(&mut self, divergence: Divergence<'a>) -> io::Result<()> {
        self.push(divergence);
        Ok(())
    }
}

impl<'a, S> Sink<'a> for &mut S
where
    S: Sink<'a> + ?Sized,
{
    fn emit(&mut self, divergence: Divergence<'a>) -> io::Result<()> {
        (**self).emit(divergence)
    }
}

/// Walks two documents side by side and reports what [`Config`] does not
/// excuse.
pub struct Differ<'c, S> {
    config: &'c Config,
    sink: S,
    emitted: usize,
}

impl<'a, 'c, S> Differ<'c, S>
where
    S: Sink<'a>,
{
    pub fn new(config: &'c Config, sink: S) -> Self {
        Self {
            config,
            sink,
            emitted: 0,
        }
    }

    /// Number of divergences handed to the sink so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Diffs two mappings key by key, in lexicographic key order.
    ///
    /// A side that is not a mapping is treated as an empty one. A key only
    /// the left side has may be excused by the null-ok and false-ok tables;
    /// a key only the right side has is always reported.
    pub fn diff_dicts(
        &mut self,
        path: &Path<'a>,
        left: &'a Value,
        right: &'a Value,
        depth: Depth,
    ) -> io::Result<()> {
        let left = left.as_object();
        let right = right.as_object();

        let all_keys = left
            .into_iter()
            .chain(right)
            .flat_map(|map| map.keys().map(String::as_str))
            .collect::<BTreeSet<_>>();

        for key in all_keys {
            if self.config.is_ignore_key(path, key) {
                continue;
            }

            let key_path = path.append(Key::Field(key));

            match (
                left.and_then(|map| map.get(key)),
                right.and_then(|map| map.get(key)),
            ) {
                (Some(left), Some(right)) => {
                    self.diff_values(&key_path, key, left, right, depth)?;
                }
                (Some(left), None) => {
                    if self.is_excused(path, key, left) {
                        trace!(path = %key_path, "left-only key excused");
                        continue;
                    }
                    self.emit(&key_path, Some(left), None)?;
                }
                (None, Some(right)) => {
                    self.emit(&key_path, None, Some(right))?;
                }
                (None, None) => unreachable!("at least one of the maps should have the key"),
            }
        }

        Ok(())
    }

    /// Diffs two sequences position by position.
    ///
    /// Elements are never matched by content, so callers wanting an
    /// order-insensitive comparison sort both sides first. Leaves are compared
    /// with the comparator of the sequence's own key.
    ///
    /// Only the end of a sequence counts as padding. A `null` element is a
    /// value like any other, so `[1]` against `[null]` is a `|` divergence.
    pub fn diff_lists<L, R>(
        &mut self,
        path: &Path<'a>,
        left: L,
        right: R,
        depth: Depth,
    ) -> io::Result<()>
    where
        L: IntoIterator<Item = &'a Value>,
        R: IntoIterator<Item = &'a Value>,
    {
        let key = path.last_segment();

        for (idx, pair) in left.into_iter().zip_longest(right).enumerate() {
            let idx_path = path.append(Key::Idx(idx));

            match pair {
                Both(left, right) => self.diff_values(&idx_path, &key, left, right, depth)?,
                Left(left) => self.emit(&idx_path, Some(left), None)?,
                Right(right) => self.emit(&idx_path, None, Some(right))?,
            }
        }

        Ok(())
    }

    fn diff_values(
        &mut self,
        path: &Path<'a>,
        key: &str,
        left: &'a Value,
        right: &'a Value,
        depth: Depth,
    ) -> io::Result<()> {
        if left.is_object() || right.is_object() {
            match depth {
                Depth::Recursive => self.diff_dicts(path, left, right, depth)?,
                Depth::Shallow => trace!(path = %path, "nested mapping skipped"),
            }
            return Ok(());
        }

        if left.is_array() || right.is_array() {
            match depth {
                Depth::Recursive => {
                    self.diff_lists(path, elements(left), elements(right), depth)?
                }
                Depth::Shallow => trace!(path = %path, "nested sequence skipped"),
            }
            return Ok(());
        }

        let comparator = self.config.comparator_for(key);
        if !comparator(key, left, right) {
            self.emit(path, Some(left), Some(right))?;
        }

        Ok(())
    }

    fn is_excused(&self, namespace: &Path, key: &str, left: &Value) -> bool {
        match left {
            Value::Null => self.config.is_null_ok(namespace, key),
            Value::Bool(false) => self.config.is_false_ok(namespace, key),
            _ => false,
        }
    }

    fn emit(
        &mut self,
        path: &Path<'a>,
        left: Option<&'a Value>,
        right: Option<&'a Value>,
    ) -> io::Result<()> {
        self.sink.emit(Divergence {
            path: path.to_string(),
            left,
            right,
        })?;
        self.emitted += 1;

        Ok(())
    }
}

/// Elements of a sequence, or nothing when `value` is not one.
fn elements(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}
