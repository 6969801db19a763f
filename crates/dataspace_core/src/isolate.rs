//! Boundary copies between the engine and its callers.
//!
//! Every record that enters or leaves a space goes through one of these
//! functions. They produce owned, structurally independent values: nested
//! objects and arrays are rebuilt, never shared, so a caller can never reach
//! stored state through a returned value (and the engine never keeps a
//! value the caller still holds).

use crate::space::Record;
use serde_json::Value;

/// Copies a single value.
#[must_use]
pub fn copy_value(value: &Value) -> Value {
    value.clone()
}

/// Copies a record.
#[must_use]
pub fn copy_record(record: &Record) -> Record {
    record.clone()
}

/// Copies an optional record; `None` stays `None`.
#[must_use]
pub fn copy_optional(record: Option<&Record>) -> Option<Record> {
    record.map(copy_record)
}

/// Copies every record of a table, keeping order.
#[must_use]
pub fn copy_table(records: &[Record]) -> Vec<Record> {
    records.iter().map(copy_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested() -> Record {
        match json!({"name": "a", "tags": ["x", {"deep": [1, 2]}], "meta": {"n": null}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn copies_are_equal_but_independent() {
        let original = nested();
        let mut copy = copy_record(&original);
        assert_eq!(copy, original);

        copy["tags"][1]["deep"][0] = json!(99);
        copy["meta"]["n"] = json!("set");
        assert_eq!(original["tags"][1]["deep"][0], json!(1));
        assert_eq!(original["meta"]["n"], Value::Null);
    }

    #[test]
    fn null_and_absent_are_fine() {
        assert_eq!(copy_value(&Value::Null), Value::Null);
        assert!(copy_optional(None).is_none());
        assert_eq!(copy_optional(Some(&nested())), Some(nested()));
    }

    #[test]
    fn table_copy_keeps_order() {
        let first = nested();
        let mut second = nested();
        second["name"] = json!("b");

        let table = vec![first, second];
        let mut copy = copy_table(&table);
        assert_eq!(copy, table);

        copy[0]["name"] = json!("changed");
        assert_eq!(table[0]["name"], json!("a"));
    }
}
