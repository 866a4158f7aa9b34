//! Converts database records into plain JSON-representable mappings.
//!
//! Normalized records cross the process boundary (into session storage
//! and template contexts), so the conversion must be total: every
//! value either passes through as a JSON scalar or is replaced by its
//! canonical string rendering. It never fails.

use serde::Serialize;
use serde_json::{Map, Value};

/// Converts a record into a mapping from column name to a
/// JSON-representable value. Non-scalar values are coerced to their
/// string rendering; records that don't serialize to an object yield
/// an empty mapping.
pub fn row_to_map<T: Serialize>(row: &T) -> Map<String, Value> {
    match serde_json::to_value(row) {
        Ok(Value::Object(map)) => map.into_iter().map(|(key, value)| (key, scalar(value))).collect(),
        _ => Map::new(),
    }
}

fn scalar(value: Value) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value,
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::Value;

    use super::row_to_map;

    #[derive(Serialize)]
    struct Record {
        id: i32,
        #[serde(with = "crate::date_format")]
        date_created: chrono::NaiveDateTime,
        tags: Vec<String>,
        note: Option<String>,
    }

    fn record() -> Record {
        Record {
            id: 7,
            date_created: NaiveDate::from_ymd(2020, 1, 1).and_hms(12, 0, 0),
            tags: vec![String::from("a"), String::from("b")],
            note: None,
        }
    }

    #[test]
    fn timestamps_become_strings() {
        let map = row_to_map(&record());
        assert_eq!(
            map["date_created"],
            Value::String(String::from("2020-01-01 12:00:00"))
        );
    }

    #[test]
    fn non_scalars_are_coerced_to_strings() {
        let map = row_to_map(&record());
        assert!(map["tags"].is_string());
        assert_eq!(map["id"], Value::from(7));
        assert_eq!(map["note"], Value::Null);
    }

    #[test]
    fn output_always_json_encodes() {
        let map = row_to_map(&record());
        serde_json::to_string(&map).unwrap();
    }

    #[test]
    fn non_object_records_yield_empty_map() {
        assert!(row_to_map(&5).is_empty());
    }
}
