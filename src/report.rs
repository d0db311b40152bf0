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

use std::io::{self, Write};

use crate::json_diff::{Divergence, Sink};

/// Writes each divergence as one report line the moment it is found.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use stackwalk_diff::{Divergence, LineWriter, Sink};
///
/// let left = json!(1);
/// let mut writer = LineWriter::new(Vec::new());
/// writer
///     .emit(Divergence { path: "pid".to_string(), left: Some(&left), right: None })
///     .unwrap();
/// let out = String::from_utf8(writer.into_inner()).unwrap();
/// assert!(out.starts_with("pid "));
/// assert!(out.ends_with("  >  \n"));
/// ```
pub struct LineWriter<W> {
    out: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Writes the line announcing which two files are compared.
    pub fn header(&mut self, left: &str, right: &str) -> io::Result<()> {
        writeln!(self.out, "diffing {} and {}", left, right)
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<'a, W: Write> Sink<'a> for LineWriter<W> {
    fn emit(&mut self, divergence: Divergence<'a>) -> io::Result<()> {
        writeln!(self.out, "{}", divergence)
    }
}
