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

use std::fs;
use std::io;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::json_diff::path::Path;
use crate::json_diff::{Depth, Differ, Sink};
use crate::Error;

/// Field of a processed crash record holding the stackwalker output.
pub const ENVELOPE_KEY: &str = "json_dump";

/// Sub-documents diffed one level deep.
const SHALLOW_SECTIONS: &[&str] = &["crash_info", "system_info", "sensitive"];

/// Module lists, which the two stackwalkers may enumerate in different orders.
const MODULE_LISTS: &[&str] = &["modules", "unloaded_modules"];

static EMPTY: Value = Value::Null;

/// Reads and parses `path`, then unwraps it with [`extract_dump`].
pub fn load_dump(path: &str) -> Result<Value, Error> {
    let content = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_string(),
        source,
    })?;
    let document = serde_json::from_str(&content).map_err(|source| Error::Parse {
        path: path.to_string(),
        source,
    })?;

    Ok(extract_dump(document))
}

/// Returns the stackwalker output held by `document`.
///
/// A processed crash record carries it under [`ENVELOPE_KEY`]; raw stackwalker
/// output is returned as is. Anything that does not end up as a mapping
/// becomes an empty mapping, so the other side reports all of its keys.
pub fn extract_dump(document: Value) -> Value {
    let dump = match document {
        Value::Object(mut record) if record.contains_key(ENVELOPE_KEY) => {
            debug!("unwrapping {} from processed crash", ENVELOPE_KEY);
            record.remove(ENVELOPE_KEY).unwrap_or_default()
        }
        document => document,
    };

    if dump.is_object() {
        dump
    } else {
        debug!("document is not a mapping, diffing it as empty");
        Value::Object(Map::new())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModuleIdentity<'a> {
    #[serde(borrow, default)]
    filename: Option<&'a str>,
    #[serde(borrow, default)]
    code_id: Option<&'a str>,
}

/// Sort key pairing a module's `filename` with its `code_id`. Missing fields
/// count as empty, and a module whose identity fields are not strings sorts
/// as `("", "")`.
pub fn module_sort_key(module: &Value) -> (String, String) {
    let identity = ModuleIdentity::deserialize(module).unwrap_or_default();

    (
        identity.filename.unwrap_or_default().to_string(),
        identity.code_id.unwrap_or_default().to_string(),
    )
}

/// `list` ordered by [`module_sort_key`]. The input is left untouched.
pub fn sorted_modules(list: &Value) -> Vec<&Value> {
    let mut modules: Vec<&Value> = list.as_array().into_iter().flatten().collect();
    modules.sort_by_cached_key(|module| module_sort_key(module));
    modules
}

/// Runs the fixed sequence of diffs over two crash reports.
pub(crate) fn diff_reports<'a, S>(
    differ: &mut Differ<'_, S>,
    left: &'a Value,
    right: &'a Value,
) -> io::Result<()>
where
    S: Sink<'a>,
{
    let section = |document: &'a Value, key: &str| document.get(key).unwrap_or(&EMPTY);

    differ.diff_dicts(&Path::Root, left, right, Depth::Shallow)?;

    for &key in SHALLOW_SECTIONS {
        differ.diff_dicts(
            &Path::from_dotted(key),
            section(left, key),
            section(right, key),
            Depth::Shallow,
        )?;
    }

    differ.diff_dicts(
        &Path::from_dotted("crashing_thread"),
        section(left, "crashing_thread"),
        section(right, "crashing_thread"),
        Depth::Recursive,
    )?;

    differ.diff_lists(
        &Path::from_dotted("threads"),
        elements(section(left, "threads")),
        elements(section(right, "threads")),
        Depth::Recursive,
    )?;

    for &key in MODULE_LISTS {
        let left_modules = sorted_modules(section(left, key));
        let right_modules = sorted_modules(section(right, key));
        differ.diff_lists(
            &Path::from_dotted(key),
            left_modules,
            right_modules,
            Depth::Recursive,
        )?;
    }

    debug!(divergences = differ.emitted(), "diff finished");
    Ok(())
}

fn elements(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_diff::config::Config;
    use crate::json_diff::Divergence;
    use serde_json::json;

    fn run<'a>(left: &'a Value, right: &'a Value) -> Vec<Divergence<'a>> {
        let config = Config::stackwalker();
        let mut differ = Differ::new(&config, Vec::new());
        diff_reports(&mut differ, left, right).unwrap();
        differ.into_sink()
    }

    #[test]
    fn test_extract_dump() {
        let record = json!({ "uuid": "abc", "json_dump": { "pid": 1 } });
        assert_eq!(extract_dump(record), json!({ "pid": 1 }));

        let raw = json!({ "pid": 1, "threads": [] });
        assert_eq!(extract_dump(raw.clone()), raw);

        assert_eq!(extract_dump(json!({ "json_dump": null })), json!({}));
        assert_eq!(extract_dump(json!([1, 2])), json!({}));
        assert_eq!(extract_dump(json!("json_dump")), json!({}));
    }

    #[test]
    fn test_module_sort_key() {
        let module = json!({ "filename": "libc.so", "code_id": "ABCD", "base_addr": "0x1" });
        assert_eq!(
            module_sort_key(&module),
            ("libc.so".to_string(), "ABCD".to_string())
        );

        assert_eq!(
            module_sort_key(&json!({ "filename": "a.dll" })),
            ("a.dll".to_string(), String::new())
        );
        assert_eq!(
            module_sort_key(&json!({ "filename": 3, "code_id": null })),
            (String::new(), String::new())
        );
        assert_eq!(module_sort_key(&json!(null)), (String::new(), String::new()));
    }

    #[test]
    fn test_sorting_aligns_modules() {
        let config = Config::new();
        let path = Path::from_dotted("modules");
        let left = json!([{ "filename": "b" }, { "filename": "a", "code_id": "2" }]);
        let right = json!([{ "filename": "a", "code_id": "2" }, { "filename": "b" }]);

        let mut differ = Differ::new(&config, Vec::new());
        differ
            .diff_lists(&path, elements(&left), elements(&right), Depth::Recursive)
            .unwrap();
        let diffs = differ.into_sink();
        let paths: Vec<&str> = diffs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "modules.0.code_id",
                "modules.0.filename",
                "modules.1.code_id",
                "modules.1.filename",
            ]
        );

        let mut differ = Differ::new(&config, Vec::new());
        differ
            .diff_lists(
                &path,
                sorted_modules(&left),
                sorted_modules(&right),
                Depth::Recursive,
            )
            .unwrap();
        assert!(differ.into_sink().is_empty());
    }

    #[test]
    fn test_sorted_lists_stay_positional() {
        let config = Config::new();
        let left = json!([{ "filename": "b" }]);
        let right = json!([{ "filename": "b" }, { "filename": "a" }]);

        let mut differ = Differ::new(&config, Vec::new());
        differ
            .diff_lists(
                &Path::from_dotted("modules"),
                sorted_modules(&left),
                sorted_modules(&right),
                Depth::Recursive,
            )
            .unwrap();
        let diffs = differ.into_sink();
        // "a" sorts first on the right, so every later position is shifted
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].path, "modules.0.filename");
        assert_eq!(diffs[1].path, "modules.1");
        assert_eq!(diffs[1].indicator(), '<');
    }

    #[test]
    fn test_identical_reports() {
        let text = r#"{
            "crash_info": { "address": "0x0", "type": "SIGSEGV" },
            "crashing_thread": { "frames": [{ "offset": "0x1" }], "threads_index": 0 },
            "threads": [{ "frames": [{ "offset": "0x1", "trust": "context" }] }],
            "modules": [{ "filename": "b" }, { "filename": "a" }]
        }"#;
        let left: Value = serde_json::from_str(text).unwrap();
        let right: Value = serde_json::from_str(text).unwrap();
        assert!(run(&left, &right).is_empty());
    }

    #[test]
    fn test_sequence_depths() {
        let left = json!({
            "crash_info": { "address": "0x10", "nested": { "x": 1 } },
            "system_info": { "os": "Linux" },
            "sensitive": { "exploitability": "none" },
            "crashing_thread": { "frames": [{ "function": "main", "module_offset": "0x10" }] },
            "threads": [{ "frames": [{ "function": "a" }] }],
            "mac_crash_info": null,
        });
        let right = json!({
            "crash_info": { "address": "10", "nested": { "x": 2 } },
            "system_info": { "os": "Windows NT" },
            "crashing_thread": { "frames": [{ "function": "start", "module_offset": "10" }] },
            "threads": [{ "frames": [{ "function": "b" }] }],
        });

        let diffs = run(&left, &right);
        let paths: Vec<&str> = diffs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "sensitive",
                "crash_info.address",
                "system_info.os",
                "sensitive.exploitability",
                "crashing_thread.frames.0.function",
                "threads.0.frames.0.function",
            ]
        );
    }

    #[test]
    fn test_unloaded_modules_sorted() {
        let left = json!({
            "unloaded_modules": [
                { "filename": "z.dll", "cert_subject": null },
                { "filename": "a.dll", "cert_subject": null },
            ],
        });
        let right = json!({
            "unloaded_modules": [{ "filename": "a.dll" }, { "filename": "z.dll" }],
        });
        assert!(run(&left, &right).is_empty());
    }
}
