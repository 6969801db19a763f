//! Property-based test generators using proptest.
//!
//! Records produced here never carry the `id` field or the reserved
//! [`TAG_FIELD`], so tests can add both themselves.

use dataspace_core::Record;
use proptest::prelude::*;
use serde_json::Value;

/// Field every generated operation selects on.
pub const TAG_FIELD: &str = "tag";

/// Small tag alphabet, so operations collide often.
pub const TAGS: [&str; 3] = ["a", "b", "c"];

/// Strategy for generating valid table names.
pub fn table_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating record field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,6}")
        .expect("Invalid regex")
        .prop_filter("Reserved field", |name| name != "id" && name != TAG_FIELD)
}

/// Strategy for generating scalar JSON values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        prop::string::string_regex("[a-z0-9 ]{0,8}")
            .expect("Invalid regex")
            .prop_map(Value::from),
    ]
}

/// Strategy for generating JSON values nested up to a few levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::vec((field_name_strategy(), inner), 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for generating records without `id` or `tag`.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    prop::collection::vec((field_name_strategy(), value_strategy()), 0..5)
        .prop_map(|fields| fields.into_iter().collect::<Record>())
}

/// Strategy for generating a tag from [`TAGS`].
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(TAGS.to_vec()).prop_map(str::to_string)
}

/// A single mutation applied to a table.
#[derive(Debug, Clone)]
pub enum SpaceOperation {
    /// Add a record with the given tag
    Add {
        /// Tag stored on the record
        tag: String,
        /// Remaining fields
        record: Record,
    },
    /// Remove the first record with a tag
    RemoveOne {
        /// Tag to match
        tag: String,
    },
    /// Remove every record with a tag
    RemoveItems {
        /// Tag to match
        tag: String,
    },
    /// Merge values into the single record with a tag
    Change {
        /// Tag to match
        tag: String,
        /// Values to merge
        values: Record,
    },
    /// Replace the single record with a tag
    Replace {
        /// Tag to match
        tag: String,
        /// New field set
        values: Record,
    },
}

/// Strategy for generating space operations.
pub fn space_operation_strategy() -> impl Strategy<Value = SpaceOperation> {
    prop_oneof![
        4 => (tag_strategy(), record_strategy())
            .prop_map(|(tag, record)| SpaceOperation::Add { tag, record }),
        1 => tag_strategy().prop_map(|tag| SpaceOperation::RemoveOne { tag }),
        1 => tag_strategy().prop_map(|tag| SpaceOperation::RemoveItems { tag }),
        2 => (tag_strategy(), record_strategy())
            .prop_map(|(tag, values)| SpaceOperation::Change { tag, values }),
        1 => (tag_strategy(), record_strategy())
            .prop_map(|(tag, values)| SpaceOperation::Replace { tag, values }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<SpaceOperation>> {
    prop::collection::vec(space_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn table_name_is_valid(name in table_name_strategy()) {
            let first = name.chars().next();
            prop_assert!(first.map_or(false, |c| c.is_ascii_alphabetic()));
        }

        #[test]
        fn records_avoid_reserved_fields(record in record_strategy()) {
            prop_assert!(!record.contains_key("id"));
            prop_assert!(!record.contains_key(TAG_FIELD));
        }

        #[test]
        fn tags_come_from_alphabet(tag in tag_strategy()) {
            prop_assert!(TAGS.contains(&tag.as_str()));
        }
    }
}
