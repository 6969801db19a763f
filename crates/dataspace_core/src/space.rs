//! The persisted space document and its table store.
//!
//! On disk a space is one JSON document:
//!
//! ```text
//! {
//!   "tables": { "<table>": [ <record>, ... ], ... },
//!   "config": { "<table>": { "idMethod"?: "<strategy> <options>", "lastIndex"?: <int> }, ... }
//! }
//! ```
//!
//! There is no version field.

use crate::error::DataSpaceResult;
use crate::matcher::Criteria;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single stored entry: field name to JSON value.
pub type Record = Map<String, Value>;

/// Name of the identifier field.
pub const ID_FIELD: &str = "id";

/// Per-table settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Identifier strategy descriptor, e.g. `"increment"` or `"time 4"`.
    #[serde(rename = "idMethod", default, skip_serializing_if = "Option::is_none")]
    pub id_method: Option<String>,
    /// Last id handed out by the increment strategy.
    #[serde(rename = "lastIndex", default, skip_serializing_if = "Option::is_none")]
    pub last_index: Option<u64>,
}

impl TableConfig {
    /// Creates an empty table configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the identifier strategy descriptor.
    #[must_use]
    pub fn id_method(mut self, method: impl Into<String>) -> Self {
        self.id_method = Some(method.into());
        self
    }
}

/// The whole persisted document: tables plus their configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Table name to ordered records.
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Record>>,
    /// Table name to configuration.
    #[serde(default)]
    pub config: BTreeMap<String, TableConfig>,
}

impl Space {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns a codec error if serialization fails.
    pub fn encode(&self) -> DataSpaceResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a document from JSON.
    ///
    /// A missing `config` section loads as empty.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are not a space document.
    pub fn decode(data: &[u8]) -> DataSpaceResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Whether `table` exists.
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Records of `table`, if it exists.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&[Record]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Creates `table` if missing. Returns `true` if it was created.
    pub fn ensure_table(&mut self, table: &str) -> bool {
        if self.tables.contains_key(table) {
            return false;
        }
        self.tables.insert(table.to_string(), Vec::new());
        true
    }

    /// Deletes a table and its configuration. Returns `true` if either existed.
    pub fn remove_table(&mut self, table: &str) -> bool {
        let had_records = self.tables.remove(table).is_some();
        let had_config = self.config.remove(table).is_some();
        had_records || had_config
    }

    /// Index of the first record in `table` satisfying `criteria`.
    #[must_use]
    pub fn position(&self, table: &str, criteria: &Criteria) -> Option<usize> {
        self.tables
            .get(table)?
            .iter()
            .position(|record| criteria.matches(record))
    }

    /// Indices of every record in `table` satisfying `criteria`.
    #[must_use]
    pub fn positions(&self, table: &str, criteria: &Criteria) -> Vec<usize> {
        self.tables
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .enumerate()
                    .filter(|(_, record)| criteria.matches(record))
                    .map(|(index, _)| index)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes the first matching record. Returns `true` if one was removed.
    pub fn remove_first(&mut self, table: &str, criteria: &Criteria) -> bool {
        match self.position(table, criteria) {
            Some(index) => {
                if let Some(records) = self.tables.get_mut(table) {
                    records.remove(index);
                }
                true
            }
            None => false,
        }
    }

    /// Removes every matching record, keeping the rest in order.
    ///
    /// Returns the number removed.
    pub fn remove_matching(&mut self, table: &str, criteria: &Criteria) -> usize {
        let Some(records) = self.tables.get_mut(table) else {
            return 0;
        };
        let before = records.len();
        records.retain(|record| !criteria.matches(record));
        before - records.len()
    }

    /// Total number of records across all tables.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn tagged(tags: &[&str]) -> Space {
        let mut space = Space::new();
        space.ensure_table("items");
        let records = space.tables.get_mut("items").unwrap();
        for (n, tag) in tags.iter().enumerate() {
            records.push(record(json!({"n": n, "tag": tag})));
        }
        space
    }

    #[test]
    fn default_document_shape() {
        let encoded = Space::new().encode().unwrap();
        assert_eq!(encoded, br#"{"tables":{},"config":{}}"#);
    }

    #[test]
    fn decode_without_config_section() {
        let space = Space::decode(br#"{"tables":{"a":[{"x":1}]}}"#).unwrap();
        assert_eq!(space.table("a").unwrap().len(), 1);
        assert!(space.config.is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(Space::decode(b"not json").is_err());
        assert!(Space::decode(br#"{"tables":{"a":[1,2]}}"#).is_err());
    }

    #[test]
    fn table_config_wire_names() {
        let mut space = Space::new();
        space.config.insert(
            "users".into(),
            TableConfig {
                id_method: Some("increment".into()),
                last_index: Some(3),
            },
        );
        space.config.insert("plain".into(), TableConfig::new());

        let value: Value = serde_json::from_slice(&space.encode().unwrap()).unwrap();
        assert_eq!(
            value["config"],
            json!({"plain": {}, "users": {"idMethod": "increment", "lastIndex": 3}})
        );
    }

    #[test]
    fn record_field_order_survives_roundtrip() {
        let space = Space::decode(br#"{"tables":{"t":[{"z":1,"a":2,"m":3}]},"config":{}}"#)
            .unwrap();
        let fields: Vec<&String> = space.table("t").unwrap()[0].keys().collect();
        assert_eq!(fields, ["z", "a", "m"]);

        let encoded = String::from_utf8(space.encode().unwrap()).unwrap();
        assert!(encoded.contains(r#"{"z":1,"a":2,"m":3}"#));
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let mut space = tagged(&["x"]);
        assert!(!space.ensure_table("items"));
        assert_eq!(space.table("items").unwrap().len(), 1);
        assert!(space.ensure_table("other"));
    }

    #[test]
    fn remove_first_only_takes_first() {
        let mut space = tagged(&["y", "x", "x"]);
        let criteria = Criteria::new().eq("tag", "x");

        assert!(space.remove_first("items", &criteria));
        let left: Vec<&Value> = space.table("items").unwrap().iter().map(|r| &r["n"]).collect();
        assert_eq!(left, [&json!(0), &json!(2)]);
    }

    #[test]
    fn remove_matching_keeps_order() {
        let mut space = tagged(&["x", "y", "x", "x", "y"]);
        let removed = space.remove_matching("items", &Criteria::new().eq("tag", "x"));

        assert_eq!(removed, 3);
        let left: Vec<&Value> = space.table("items").unwrap().iter().map(|r| &r["n"]).collect();
        assert_eq!(left, [&json!(1), &json!(4)]);
    }

    #[test]
    fn lookups_on_missing_table() {
        let mut space = Space::new();
        let criteria = Criteria::new();
        assert!(space.position("nope", &criteria).is_none());
        assert!(space.positions("nope", &criteria).is_empty());
        assert!(!space.remove_first("nope", &criteria));
        assert_eq!(space.remove_matching("nope", &criteria), 0);
        assert!(!space.remove_table("nope"));
    }

    #[test]
    fn remove_table_drops_config() {
        let mut space = tagged(&["x"]);
        space.config.insert("items".into(), TableConfig::new().id_method("increment"));

        assert!(space.remove_table("items"));
        assert!(!space.has_table("items"));
        assert!(!space.config.contains_key("items"));
        assert_eq!(space.record_count(), 0);
    }
}
