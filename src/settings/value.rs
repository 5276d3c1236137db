//! Coercion of loosely typed TOML values.
//!
//! The settings file is hand-edited and ids are often written as strings,
//! so every scalar goes through these helpers once at load time.

use std::collections::HashSet;
use std::hash::Hash;

use toml::Value;

/// Parse a snowflake id from an integer or a numeric string.
pub fn to_id(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(i) if *i > 0 => Some(*i as u64),
        Value::String(s) => s.trim().parse::<u64>().ok().filter(|id| *id > 0),
        _ => None,
    }
}

/// Parse an integer, accepting numeric strings and truncating floats.
pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn to_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Boolean(b)) => *b,
        Some(Value::Integer(i)) => *i != 0,
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => true,
            "false" | "no" | "off" | "0" => false,
            _ => default,
        },
        _ => default,
    }
}

pub fn to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Collect the valid ids of an array, dropping anything unparseable.
pub fn to_id_set<T, F>(value: Option<&Value>, wrap: F) -> HashSet<T>
where
    T: Eq + Hash,
    F: Fn(u64) -> T,
{
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(to_id).map(wrap).collect(),
        Some(single) => to_id(single).map(&wrap).into_iter().collect(),
        None => HashSet::new(),
    }
}

/// Collect the string entries of an array (numbers are stringified).
pub fn to_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| to_string(Some(v))).collect(),
        _ => Vec::new(),
    }
}

/// Canonical string form of a list entry, used when editing arrays in place.
pub fn entry_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_id_accepts_strings_and_ints() {
        assert_eq!(to_id(&Value::Integer(42)), Some(42));
        assert_eq!(to_id(&Value::String(" 42 ".into())), Some(42));
        assert_eq!(to_id(&Value::String("abc".into())), None);
        assert_eq!(to_id(&Value::Integer(-5)), None);
        assert_eq!(to_id(&Value::Boolean(true)), None);
    }

    #[test]
    fn test_to_int_coercion() {
        assert_eq!(to_int(&Value::String("7".into())), Some(7));
        assert_eq!(to_int(&Value::Float(3.9)), Some(3));
        assert_eq!(to_int(&Value::String("seven".into())), None);
    }

    #[test]
    fn test_id_set_drops_invalid_entries() {
        let value = Value::Array(vec![
            Value::Integer(1),
            Value::String("2".into()),
            Value::String("nope".into()),
            Value::Integer(1),
        ]);
        let set = to_id_set(Some(&value), |id| id);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1) && set.contains(&2));
    }

    #[test]
    fn test_to_bool_defaults() {
        assert!(to_bool(None, true));
        assert!(!to_bool(Some(&Value::String("off".into())), true));
        assert!(to_bool(Some(&Value::Integer(1)), false));
    }
}
