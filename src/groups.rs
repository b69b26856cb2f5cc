//! Group-set codec: the set of group names a user belongs to, serialized into
//! a single session-store field. The wire form is a JSON object mapping each
//! name to `true`, which keeps stored records directly inspectable.

use std::collections::HashSet;

use serde_json::{Map, Value};

/// Names the expression evaluator answers synthetically; they are never
/// accepted as real group names at signup.
pub const RESERVED_NAMES: [&str; 3] = ["true", "false", "logged"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// A group name must be shaped like an expression identifier, otherwise a
/// membership could never be referenced from a group expression.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn encode(groups: &HashSet<String>) -> String {
    let mut map = Map::new();
    for name in groups {
        map.insert(name.clone(), Value::Bool(true));
    }
    Value::Object(map).to_string()
}

/// Decode an encoded group set. Malformed or absent input degrades to the
/// empty set so a bad stored field reads as "no memberships" instead of
/// failing the request.
pub fn decode(text: &str) -> HashSet<String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter(|(_, v)| v.as_bool().unwrap_or(false))
            .map(|(k, _)| k)
            .collect(),
        _ => HashSet::new(),
    }
}
