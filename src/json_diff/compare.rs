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

use serde_json::Value;

/// Decides whether two leaf values stored under `key` are equal.
///
/// Comparators only ever see leaves. Mappings and sequences are walked by the
/// differ instead.
pub type Comparator = fn(key: &str, left: &Value, right: &Value) -> bool;

/// Exact equality. Numbers keep their JSON representation, so `1` and `1.0`
/// are different.
pub fn compare_default(_key: &str, left: &Value, right: &Value) -> bool {
    left == right
}

/// Numeric equality of base-16 strings.
///
/// The two stackwalkers render offsets differently (`0x1a`, `1A`, `0001a`),
/// so both sides are parsed before comparing, sign included. `null` only equals `null`, and
/// anything that is not a parseable hex string is unequal to everything.
pub fn compare_hex(_key: &str, left: &Value, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return left == right;
    }

    match (parse_hex(left), parse_hex(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Accepts surrounding whitespace, a sign, a `0x` prefix and single `_`
/// separators between digits or right after the prefix.
fn parse_hex(value: &Value) -> Option<i128> {
    let text = value.as_str()?.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let digits = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(rest) => rest.strip_prefix('_').unwrap_or(rest),
        None => text,
    };

    let well_formed = digits
        .split('_')
        .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_hexdigit()));
    if !well_formed {
        return None;
    }

    let magnitude = i128::from_str_radix(&digits.replace('_', ""), 16).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compare_default() {
        assert!(compare_default("address", &json!("0x10"), &json!("0x10")));
        assert!(!compare_default("address", &json!("0x10"), &json!("10")));
        assert!(compare_default("x", &json!(null), &json!(null)));
        assert!(!compare_default("x", &json!(false), &json!(null)));
        assert!(!compare_default("x", &json!(1), &json!(1.0)));
        assert!(compare_default("x", &json!(3), &json!(3)));
    }

    #[test]
    fn test_compare_hex_formatting() {
        assert!(compare_hex("offset", &json!("0x1A"), &json!("1a")));
        assert!(compare_hex("offset", &json!("0x0000001a"), &json!("0X1A")));
        assert!(compare_hex("module_offset", &json!("10"), &json!("0x10")));
        assert!(!compare_hex("offset", &json!("0x10"), &json!("0x11")));
    }

    #[test]
    fn test_compare_hex_nulls() {
        assert!(compare_hex("offset", &json!(null), &json!(null)));
        assert!(!compare_hex("offset", &json!(null), &json!("5")));
        assert!(!compare_hex("offset", &json!("5"), &json!(null)));
    }

    #[test]
    fn test_compare_hex_unparseable() {
        assert!(!compare_hex("offset", &json!("not-hex"), &json!("5")));
        assert!(!compare_hex("offset", &json!("5"), &json!("not-hex")));
        assert!(!compare_hex("offset", &json!(""), &json!("")));
        assert!(!compare_hex("offset", &json!("0x"), &json!("0")));
        assert!(!compare_hex("offset", &json!("-5"), &json!("5")));
        // only strings are hex renderings
        assert!(!compare_hex("offset", &json!(5), &json!(5)));
        assert!(!compare_hex("offset", &json!(5), &json!("5")));
        assert!(!compare_hex("offset", &json!("_1a"), &json!("1a")));
        assert!(!compare_hex("offset", &json!("1a_"), &json!("1a")));
        assert!(!compare_hex("offset", &json!("1__a"), &json!("1a")));
        assert!(!compare_hex("offset", &json!("- 1a"), &json!("-1a")));
        assert!(!compare_hex("offset", &json!("0x-1a"), &json!("-1a")));
    }

    #[test]
    fn test_compare_hex_signs_and_separators() {
        assert!(compare_hex("offset", &json!("-1a"), &json!("-0x1a")));
        assert!(compare_hex("offset", &json!("+0x1A"), &json!("1a")));
        assert!(compare_hex("offset", &json!("-0"), &json!("0x0")));
        assert!(!compare_hex("offset", &json!("-1a"), &json!("1a")));
        assert!(compare_hex("offset", &json!("0x_ff_ff"), &json!("FFFF")));
        assert!(compare_hex("offset", &json!("1_a"), &json!("0x1a")));
    }
}
