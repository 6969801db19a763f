//! Model-checking harness.
//!
//! [`SpaceHarness`] applies [`SpaceOperation`]s to a real table and to a
//! plain `Vec<Record>` model side by side, then checks they agree.

use crate::fixtures::TestSpace;
use crate::generators::{SpaceOperation, TAG_FIELD};
use dataspace_core::{Criteria, DataSpaceResult, Record, TableConfig, ID_FIELD};
use serde_json::Value;

/// Table every harness operation targets.
pub const HARNESS_TABLE: &str = "model";

/// A test harness pairing a space with an in-memory model of one table.
pub struct SpaceHarness {
    /// The space under test.
    pub space: TestSpace,
    model: Vec<Record>,
    next_id: u64,
}

impl SpaceHarness {
    /// Creates a harness on an in-memory space.
    pub fn memory() -> Self {
        Self::on(TestSpace::memory())
    }

    /// Creates a harness on a file-based space.
    pub fn file() -> Self {
        Self::on(TestSpace::file())
    }

    fn on(space: TestSpace) -> Self {
        space
            .create_table(
                HARNESS_TABLE,
                Some(TableConfig::new().id_method("increment")),
            )
            .expect("Failed to create harness table");
        Self {
            space,
            model: Vec::new(),
            next_id: 0,
        }
    }

    /// The expected table contents.
    pub fn model(&self) -> &[Record] {
        &self.model
    }

    /// Applies `op` to both the space and the model.
    ///
    /// # Errors
    ///
    /// Returns whatever the space reports.
    pub fn apply(&mut self, op: &SpaceOperation) -> DataSpaceResult<()> {
        match op {
            SpaceOperation::Add { tag, record } => {
                let mut record = record.clone();
                record.insert(TAG_FIELD.to_string(), Value::from(tag.as_str()));
                let stored = self.space.add(HARNESS_TABLE, &record)?;

                record.insert(ID_FIELD.to_string(), Value::from(self.next_id));
                self.next_id += 1;
                assert_eq!(stored, record, "add returned unexpected record");
                self.model.push(record);
            }
            SpaceOperation::RemoveOne { tag } => {
                let removed = self.space.remove_one(HARNESS_TABLE, &by_tag(tag))?;
                let expected = self.model.iter().position(|record| has_tag(record, tag));
                assert_eq!(removed, expected.is_some(), "remove_one disagreed");
                if let Some(index) = expected {
                    self.model.remove(index);
                }
            }
            SpaceOperation::RemoveItems { tag } => {
                let removed = self.space.remove_items(HARNESS_TABLE, &by_tag(tag))?;
                let before = self.model.len();
                self.model.retain(|record| !has_tag(record, tag));
                assert_eq!(removed, before - self.model.len(), "remove_items disagreed");
            }
            SpaceOperation::Change { tag, values } => {
                let status = self.space.change(HARNESS_TABLE, &by_tag(tag), values)?;
                let applied = self.update_model(tag, values, false);
                assert_eq!(status.success(), applied, "change disagreed: {status}");
            }
            SpaceOperation::Replace { tag, values } => {
                let status = self.space.replace(HARNESS_TABLE, &by_tag(tag), values)?;
                let applied = self.update_model(tag, values, true);
                assert_eq!(status.success(), applied, "replace disagreed: {status}");
            }
        }
        Ok(())
    }

    fn update_model(&mut self, tag: &str, values: &Record, full: bool) -> bool {
        let mut matching = self
            .model
            .iter_mut()
            .filter(|record| has_tag(record, tag));
        let (Some(target), None) = (matching.next(), matching.next()) else {
            return false;
        };

        for (field, value) in values {
            target.insert(field.clone(), value.clone());
        }
        if full {
            target.retain(|field, _| field == ID_FIELD || values.contains_key(field));
        }
        true
    }

    /// Asserts the space table equals the model.
    pub fn verify(&self) {
        let actual = self
            .space
            .get_table(HARNESS_TABLE)
            .expect("Harness table disappeared");
        assert_eq!(actual, self.model, "space diverged from model");
    }

    /// Reopens a file-based space and checks the model survived.
    ///
    /// # Errors
    ///
    /// Returns an error if the space cannot be reopened.
    pub fn reopen(self) -> DataSpaceResult<Self> {
        let Self {
            space,
            model,
            next_id,
        } = self;
        let harness = Self {
            space: space.reopen()?,
            model,
            next_id,
        };
        harness.verify();
        Ok(harness)
    }
}

fn by_tag(tag: &str) -> Criteria {
    Criteria::new().eq(TAG_FIELD, tag)
}

fn has_tag(record: &Record, tag: &str) -> bool {
    record.get(TAG_FIELD).and_then(Value::as_str) == Some(tag)
}
