//! Schema-backed configuration units.
//!
//! A [`ConfigUnit`] pairs a [`Schema`] with a data value. Units are immutable: every composition
//! operation ([`ConfigUnit::merge`], [`ConfigUnit::override_with`],
//! [`ConfigUnit::override_async`]) returns a new unit. Validation is deferred until the unit is
//! consumed through [`ConfigUnit::resolve`].

mod error;
mod merge;
mod path;
mod schema;
mod unit;

pub use error::{Issue, SchemaConflict, ValidationError};
pub use merge::deep_merge;
pub use path::{FieldPath, Segment};
pub use schema::{Field, Schema, SchemaKind};
pub use unit::{ConfigUnit, ResolveError};

/// Re-exported so callers can build data values without depending on `serde_json` directly.
pub use serde_json::{Map, Value, json};
