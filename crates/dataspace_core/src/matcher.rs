//! Record matching.
//!
//! A [`Criteria`] set maps field names to [`Criterion`] values. A record
//! satisfies the set when every listed field passes its criterion; there is
//! no OR between fields and no nested field paths.
//!
//! ```rust
//! use dataspace_core::Criteria;
//! use serde_json::json;
//!
//! let criteria = Criteria::new().eq("kind", "user").pattern("name", "^a").unwrap();
//! let record = json!({"kind": "user", "name": "alice"});
//! assert!(criteria.matches(record.as_object().unwrap()));
//! ```

use crate::error::{DataSpaceError, DataSpaceResult};
use crate::space::Record;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// A test applied to one field of a record.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// The field must be present and equal to this value.
    Exact(Value),
    /// The field must be a scalar whose text matches this pattern.
    Pattern(Regex),
}

impl Criterion {
    /// Compiles a pattern criterion.
    ///
    /// # Errors
    ///
    /// Returns the regex compile error if `pattern` is invalid.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Tests a field value; `None` means the field is absent.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Exact(expected) => value.is_some_and(|actual| strict_eq(actual, expected)),
            Self::Pattern(regex) => match value {
                Some(Value::String(text)) => regex.is_match(text),
                Some(Value::Number(number)) => regex.is_match(&number.to_string()),
                Some(Value::Bool(flag)) => regex.is_match(if *flag { "true" } else { "false" }),
                _ => false,
            },
        }
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for Criterion {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

/// Tests a field value against a criterion.
#[must_use]
pub fn matches(value: Option<&Value>, criterion: &Criterion) -> bool {
    criterion.matches(value)
}

// Numbers compare by value so that `1` and `1.0` are the same id.
fn strict_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a == b
            } else if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                a == b
            } else {
                a.as_f64() == b.as_f64()
            }
        }
        _ => actual == expected,
    }
}

/// An ordered, conjunctive set of field criteria.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    fields: Vec<(String, Criterion)>,
}

impl Criteria {
    /// Creates an empty criteria set, which matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a criterion for `field`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        let field = field.into();
        let criterion = criterion.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = criterion,
            None => self.fields.push((field, criterion)),
        }
        self
    }

    /// Adds an exact-match criterion.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Criterion::Exact(value.into()))
    }

    /// Adds a pattern criterion.
    ///
    /// # Errors
    ///
    /// Returns [`DataSpaceError::InvalidPattern`] if the pattern does not
    /// compile.
    pub fn pattern(self, field: impl Into<String>, pattern: &str) -> DataSpaceResult<Self> {
        let field = field.into();
        match Criterion::pattern(pattern) {
            Ok(criterion) => Ok(self.with(field, criterion)),
            Err(source) => Err(DataSpaceError::InvalidPattern { field, source }),
        }
    }

    /// Whether every criterion passes for `record`.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .all(|(field, criterion)| criterion.matches(record.get(field)))
    }

    /// Whether at least one criterion passes for `record`.
    #[must_use]
    pub fn matches_any(&self, record: &Record) -> bool {
        self.fields
            .iter()
            .any(|(field, criterion)| criterion.matches(record.get(field)))
    }

    /// Whether a criterion is set for `field`.
    #[must_use]
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    /// Number of fields constrained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(field, criterion)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.fields
            .iter()
            .map(|(field, criterion)| (field.as_str(), criterion))
    }
}

impl From<Record> for Criteria {
    /// Every field of the record becomes an exact-match criterion.
    fn from(record: Record) -> Self {
        Self {
            fields: record
                .into_iter()
                .map(|(field, value)| (field, Criterion::Exact(value)))
                .collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Criterion)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, Criterion)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |criteria, (field, criterion)| {
                criteria.with(field, criterion)
            })
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, (field, criterion)) in self.fields.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:", Value::String(field.clone()))?;
            match criterion {
                Criterion::Exact(value) => write!(f, "{value}")?,
                Criterion::Pattern(regex) => write!(f, "/{}/", regex.as_str())?,
            }
        }
        write!(f, "}}")
    }
}
