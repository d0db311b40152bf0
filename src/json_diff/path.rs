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

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Placeholder every run of digits collapses to in a normalized path.
pub const INDEX_WILDCARD: &str = "N";

/// Location of a value inside a crash report, rendered as `threads.0.frames.3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path<'a> {
    Root,
    Keys(Vec<Key<'a>>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key<'a> {
    Idx(usize),
    Field(&'a str),
}

impl<'a> fmt::Display for Key<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Key::Idx(idx) => write!(f, "{}", idx),
            Key::Field(key) => write!(f, "{}", key),
        }
    }
}

impl<'a> Path<'a> {
    pub fn append(&self, next: Key<'a>) -> Path<'a> {
        match self {
            Path::Root => Path::Keys(vec![next]),
            Path::Keys(list) => {
                let mut copy = list.clone();
                copy.push(next);
                Path::Keys(copy)
            }
        }
    }

    /// Builds a path from its dotted rendering. The empty string is the root and
    /// all-digit segments become indexes.
    pub fn from_dotted(dotted: &'a str) -> Path<'a> {
        if dotted.is_empty() {
            return Path::Root;
        }

        let keys = dotted
            .split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(idx) => Key::Idx(idx),
                Err(_) => Key::Field(segment),
            })
            .collect();

        Path::Keys(keys)
    }

    /// The final segment, used to pick a comparator for list elements.
    pub fn last_segment(&self) -> String {
        match self {
            Path::Root => String::new(),
            Path::Keys(keys) => keys.last().map(|k| k.to_string()).unwrap_or_default(),
        }
    }

    /// Rendering with every digit run replaced by [`INDEX_WILDCARD`], so that
    /// all positions of a repeating field share one table entry.
    pub fn normalized(&self) -> String {
        normalize(&self.to_string())
    }
}

/// Collapses every maximal run of ASCII digits in `dotted` to [`INDEX_WILDCARD`].
///
/// This is a plain rewrite of the rendered string, so digits inside field
/// names collapse as well.
pub fn normalize(dotted: &str) -> String {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"));

    digits.replace_all(dotted, INDEX_WILDCARD).into_owned()
}

impl<'a> fmt::Display for Path<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Path::Root => Ok(()),
            Path::Keys(keys) => {
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Ok(())
            }
        }
    }
}
