//! Identifier generation for tables that auto-assign `id`.
//!
//! A table's `idMethod` descriptor is stored as text (`"increment"`,
//! `"time 4"`, ...). The first whitespace-delimited token names the
//! strategy; the trimmed remainder is its options string. Descriptors are
//! parsed into [`IdMethod`] before use, so unknown strategies are rejected
//! up front.
//!
//! Built-in strategies:
//!
//! | Token       | Produces |
//! |-------------|----------|
//! | `increment` | `0, 1, 2, ...` per table, never reused |
//! | `time <n>`  | Unix millis as a string plus `n` random digits (at most 32) |
//! | `uuid`      | A random v4 UUID string |
//!
//! Further strategies can be registered by name through [`IdRegistry`].

use crate::error::{DataSpaceError, DataSpaceResult};
use crate::space::TableConfig;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

const INCREMENT: &str = "increment";
// Spelling written by older space files.
const INCREMENT_LEGACY: &str = "increament";
const TIME: &str = "time";
const UUID: &str = "uuid";

/// Largest random suffix accepted by the `time` strategy.
pub const MAX_TIME_DIGITS: usize = 32;

/// A pluggable identifier strategy.
///
/// Closures `Fn(&str, &str) -> DataSpaceResult<Value>` taking the table
/// name and options string implement this trait.
pub trait IdGenerator: Send + Sync {
    /// Produces a new id for `table`.
    ///
    /// # Errors
    ///
    /// Implementations may reject malformed options.
    fn generate(&self, table: &str, options: &str) -> DataSpaceResult<Value>;
}

impl<F> IdGenerator for F
where
    F: Fn(&str, &str) -> DataSpaceResult<Value> + Send + Sync,
{
    fn generate(&self, table: &str, options: &str) -> DataSpaceResult<Value> {
        self(table, options)
    }
}

/// A parsed identifier strategy descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdMethod {
    /// Per-table counter kept in [`TableConfig::last_index`].
    Increment,
    /// Current time in milliseconds followed by `digits` random digits.
    Time {
        /// Number of random digits appended.
        digits: usize,
    },
    /// Random v4 UUID.
    Uuid,
    /// A strategy registered on the [`IdRegistry`].
    Custom {
        /// Registered token.
        name: String,
        /// Options passed through to the generator.
        options: String,
    },
}

impl IdMethod {
    /// Renders the descriptor stored in the space document.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            Self::Increment => INCREMENT.to_string(),
            Self::Time { digits } => format!("{TIME} {digits}"),
            Self::Uuid => UUID.to_string(),
            Self::Custom { name, options } if options.is_empty() => name.clone(),
            Self::Custom { name, options } => format!("{name} {options}"),
        }
    }
}

impl fmt::Display for IdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

/// Splits a descriptor into its strategy token and trimmed options.
fn split_descriptor(descriptor: &str) -> (&str, &str) {
    let descriptor = descriptor.trim();
    match descriptor.find(char::is_whitespace) {
        Some(at) => (&descriptor[..at], descriptor[at..].trim()),
        None => (descriptor, ""),
    }
}

fn is_builtin(token: &str) -> bool {
    matches!(token, INCREMENT | INCREMENT_LEGACY | TIME | UUID)
}

/// Strategy lookup plus the custom strategies registered for a space.
#[derive(Clone, Default)]
pub struct IdRegistry {
    custom: HashMap<String, Arc<dyn IdGenerator>>,
}

impl IdRegistry {
    /// Creates a registry with only the built-in strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom strategy under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DataSpaceError::InvalidIdMethod`] if `name` is empty,
    /// contains whitespace, or shadows a built-in strategy.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        generator: Arc<dyn IdGenerator>,
    ) -> DataSpaceResult<()> {
        let name = name.into();
        if name.is_empty() || name.contains(char::is_whitespace) || is_builtin(&name) {
            return Err(DataSpaceError::invalid_id_method(name));
        }
        self.custom.insert(name, generator);
        Ok(())
    }

    /// Whether a custom strategy named `name` is registered.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Parses a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DataSpaceError::InvalidIdMethod`] carrying the descriptor if
    /// the strategy is unknown or its options are malformed.
    pub fn parse(&self, descriptor: &str) -> DataSpaceResult<IdMethod> {
        let (token, options) = split_descriptor(descriptor);
        match token {
            INCREMENT | INCREMENT_LEGACY => Ok(IdMethod::Increment),
            TIME => {
                let digits = if options.is_empty() {
                    0
                } else {
                    options
                        .parse()
                        .map_err(|_| DataSpaceError::invalid_id_method(descriptor))?
                };
                if digits > MAX_TIME_DIGITS {
                    return Err(DataSpaceError::invalid_id_method(descriptor));
                }
                Ok(IdMethod::Time { digits })
            }
            UUID => Ok(IdMethod::Uuid),
            name if self.custom.contains_key(name) => Ok(IdMethod::Custom {
                name: name.to_string(),
                options: options.to_string(),
            }),
            _ => Err(DataSpaceError::invalid_id_method(descriptor)),
        }
    }

    /// Produces the next id for `table`, updating counter state in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DataSpaceError::InvalidIdMethod`] for a custom strategy that
    /// is no longer registered, or whatever a custom generator reports.
    pub fn generate(
        &self,
        method: &IdMethod,
        table: &str,
        config: &mut TableConfig,
    ) -> DataSpaceResult<Value> {
        match method {
            IdMethod::Increment => {
                let next = config.last_index.map_or(0, |last| last + 1);
                config.last_index = Some(next);
                Ok(Value::from(next))
            }
            IdMethod::Time { digits } if *digits > MAX_TIME_DIGITS => {
                Err(DataSpaceError::invalid_id_method(method.descriptor()))
            }
            IdMethod::Time { digits } => {
                let mut id = chrono::Utc::now().timestamp_millis().to_string();
                let mut rng = rand::thread_rng();
                for _ in 0..*digits {
                    id.push(char::from(b'0' + rng.gen_range(0..10u8)));
                }
                Ok(Value::String(id))
            }
            IdMethod::Uuid => Ok(Value::String(Uuid::new_v4().to_string())),
            IdMethod::Custom { name, options } => match self.custom.get(name) {
                Some(generator) => generator.generate(table, options),
                None => Err(DataSpaceError::invalid_id_method(method.descriptor())),
            },
        }
    }
}

impl fmt::Debug for IdRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("IdRegistry").field("custom", &names).finish()
    }
}
