use crate::error::{SchemaConflict, ValidationError};
use crate::merge::{deep_merge, merge_optional};
use crate::schema::Schema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// An immutable pairing of a schema and its (not yet validated) data.
///
/// A unit owns its data and only hands out shared references to it, so nothing can change it
/// after construction. Composition always produces a new unit. Cloning is cheap, as schema and
/// data are reference counted.
#[derive(Clone, Debug)]
pub struct ConfigUnit {
    schema: Arc<Schema>,
    data: Option<Arc<Value>>,
}

impl ConfigUnit {
    /// Create a new unit. Data is not validated until [`ConfigUnit::resolve`] is called.
    pub fn new(schema: Schema, data: impl Into<Option<Value>>) -> Self {
        Self {
            schema: Arc::new(schema),
            data: data.into().map(Arc::new),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_deref()
    }

    /// Combine two units.
    ///
    /// The schema of the result is the structural union of both schemas, the data is the deep
    /// merge of both data values, with `other` winning on terminal values. Fails if the schemas
    /// declare different kinds of values for the same path.
    pub fn merge(&self, other: &ConfigUnit) -> Result<ConfigUnit, SchemaConflict> {
        let schema = self.schema.union(&other.schema)?;
        let data = merge_optional(self.data(), other.data());
        Ok(Self::new(schema, data))
    }

    /// Apply a partial value on top of the data, keeping the schema.
    ///
    /// The partial value is not checked; mismatches surface when the unit is resolved.
    pub fn override_with(&self, partial: Value) -> ConfigUnit {
        let data = match self.data() {
            Some(data) => deep_merge(data, &partial),
            None => partial,
        };
        Self {
            schema: self.schema.clone(),
            data: Some(Arc::new(data)),
        }
    }

    /// Like [`ConfigUnit::override_with`], but reject partial values which don't conform to the
    /// partial variant of the schema.
    pub fn override_checked(&self, partial: Value) -> Result<ConfigUnit, ValidationError> {
        self.schema.partial().validate(Some(&partial))?;
        Ok(self.override_with(partial))
    }

    /// Compute a partial value from the current data, and apply it.
    ///
    /// The overrider receives a read-only view of the current data (an empty mapping if there is
    /// none) and runs to completion before this resolves. Its error is returned as-is, in which
    /// case no new unit is created.
    pub async fn override_async<F, Fut, E>(&self, overrider: F) -> Result<ConfigUnit, E>
    where
        F: FnOnce(Arc<Value>) -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let current = self
            .data
            .clone()
            .unwrap_or_else(|| Arc::new(Value::Object(Map::new())));
        let partial = overrider(current).await?;
        Ok(self.override_with(partial))
    }

    /// Validate the data against the schema, returning the normalized value.
    pub fn resolve(&self) -> Result<Value, ValidationError> {
        self.schema.validate(self.data())
    }

    /// Resolve the unit and deserialize it into a typed value.
    pub fn resolve_as<T: DeserializeOwned>(&self) -> Result<T, ResolveError> {
        let value = self.resolve()?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Errors of [`ConfigUnit::resolve_as`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("validated value does not match the target type: {0}")]
    Deserialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    fn unit(data: Value) -> ConfigUnit {
        ConfigUnit::new(Schema::any(), data)
    }

    #[test]
    fn construction_takes_a_copy() {
        let mut data = json!({"db": {"host": "h1", "tags": ["a"]}});
        let unit = unit(data.clone());

        data["db"]["host"] = json!("changed");
        if let Some(tags) = data["db"]["tags"].as_array_mut() {
            tags.push(json!("b"));
        }

        assert_eq!(
            unit.data(),
            Some(&json!({"db": {"host": "h1", "tags": ["a"]}}))
        );
    }

    #[test]
    fn composition_leaves_inputs_untouched() {
        let a = unit(json!({"x": 1, "y": {"z": 2}}));
        let b = unit(json!({"y": {"z": 3}}));

        let merged = a.merge(&b).expect("must merge");
        let overridden = a.override_with(json!({"x": 5}));

        assert_eq!(merged.data(), Some(&json!({"x": 1, "y": {"z": 3}})));
        assert_eq!(overridden.data(), Some(&json!({"x": 5, "y": {"z": 2}})));
        assert_eq!(a.data(), Some(&json!({"x": 1, "y": {"z": 2}})));
        assert_eq!(b.data(), Some(&json!({"y": {"z": 3}})));
    }

    #[test]
    fn merge_structured() {
        let a = unit(json!({"db": {"host": "h1", "port": 1}}));
        let b = unit(json!({"db": {"port": 2}}));
        assert_eq!(
            a.merge(&b).expect("must merge").data(),
            Some(&json!({"db": {"host": "h1", "port": 2}}))
        );
    }

    #[test]
    fn merge_is_associative_for_disjoint_fields() {
        let a = unit(json!({"a": {"x": 1}, "nested": {"a": true}}));
        let b = unit(json!({"b": [1, 2], "nested": {"b": true}}));
        let c = unit(json!({"c": "c", "nested": {"c": true}}));

        let left = a
            .merge(&b)
            .and_then(|ab| ab.merge(&c))
            .expect("must merge");
        let right = b
            .merge(&c)
            .and_then(|bc| a.merge(&bc))
            .expect("must merge");

        assert_eq!(left.data(), right.data());
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let schema = Schema::object([("name", Schema::string())]);
        let a = ConfigUnit::new(schema.clone(), json!({"name": "app", "extra": [1]}));

        let with_absent = a.merge(&ConfigUnit::new(schema.clone(), None));
        let with_empty = a.merge(&ConfigUnit::new(schema, json!({})));

        assert_eq!(with_absent.expect("must merge").data(), a.data());
        assert_eq!(with_empty.expect("must merge").data(), a.data());
    }

    #[test]
    fn merge_absent_data() {
        let merged = ConfigUnit::new(Schema::any(), None)
            .merge(&ConfigUnit::new(Schema::any(), None))
            .expect("must merge");
        assert_eq!(merged.data(), None);
    }

    #[test]
    fn merge_unites_schemas() {
        let a = ConfigUnit::new(Schema::object([("a", Schema::string())]), json!({"a": "x"}));
        let b = ConfigUnit::new(Schema::object([("b", Schema::integer())]), json!({"b": 1}));

        let merged = a.merge(&b).expect("must merge");
        assert_eq!(
            merged.schema(),
            &Schema::object([("a", Schema::string()), ("b", Schema::integer())])
        );
        assert_eq!(merged.resolve(), Ok(json!({"a": "x", "b": 1})));
    }

    #[test]
    fn merge_rejects_conflicting_schemas() {
        let a = ConfigUnit::new(Schema::object([("port", Schema::integer())]), None);
        let b = ConfigUnit::new(Schema::object([("port", Schema::string())]), None);

        let err = a.merge(&b).expect_err("must conflict");
        assert_eq!(err.path.to_string(), "port");
    }

    #[test]
    fn override_terminal() {
        let a = unit(json!({"x": 1, "y": 2}));
        assert_eq!(
            a.override_with(json!({"x": 5})).data(),
            Some(&json!({"x": 5, "y": 2}))
        );
    }

    #[test]
    fn override_replaces_sequences() {
        let a = unit(json!({"tags": ["a", "b"]}));
        assert_eq!(
            a.override_with(json!({"tags": ["x"]})).data(),
            Some(&json!({"tags": ["x"]}))
        );
    }

    #[test]
    fn override_empty_is_identity() {
        let a = unit(json!({"x": 1, "nested": {"y": [1, 2]}}));
        assert_eq!(a.override_with(json!({})).data(), a.data());
    }

    #[test]
    fn override_keeps_schema() {
        let schema = Schema::object([("x", Schema::integer())]);
        let a = ConfigUnit::new(schema.clone(), json!({"x": 1}));
        let b = a.override_with(json!({"x": "not a number"}));

        assert_eq!(b.schema(), &schema);
        assert!(b.resolve().is_err());
    }

    #[test]
    fn override_checked_uses_partial_schema() {
        let schema = Schema::object([
            ("name", Field::required(Schema::string())),
            (
                "db",
                Field::required(Schema::object([
                    ("host", Schema::string()),
                    ("port", Schema::integer()),
                ])),
            ),
        ]);
        let a = ConfigUnit::new(schema, json!({"name": "app", "db": {"host": "h", "port": 1}}));

        let b = a
            .override_checked(json!({"db": {"port": 2}}))
            .expect("partial value must be accepted");
        assert_eq!(
            b.data(),
            Some(&json!({"name": "app", "db": {"host": "h", "port": 2}}))
        );

        let err = a
            .override_checked(json!({"db": {"port": "2"}}))
            .expect_err("must reject");
        assert_eq!(err.issues()[0].path.to_string(), "db.port");
    }

    #[tokio::test]
    async fn override_async_sees_current_data() {
        let a = unit(json!({"port": 1}));
        let b = a
            .override_async(|current| async move {
                let port = current["port"].as_i64().unwrap_or_default();
                Ok::<_, std::convert::Infallible>(json!({"port": port + 1}))
            })
            .await
            .expect("must override");

        assert_eq!(b.data(), Some(&json!({"port": 2})));
        assert_eq!(a.data(), Some(&json!({"port": 1})));
    }

    #[tokio::test]
    async fn override_async_on_absent_data() {
        let a = ConfigUnit::new(Schema::any(), None);
        let b = a
            .override_async(|current| async move {
                assert_eq!(*current, json!({}));
                Ok::<_, std::convert::Infallible>(json!({"x": 1}))
            })
            .await
            .expect("must override");
        assert_eq!(b.data(), Some(&json!({"x": 1})));
    }

    #[tokio::test]
    async fn override_async_propagates_failure() {
        #[derive(Debug, PartialEq)]
        struct Boom;

        let a = unit(json!({"x": 1}));
        let err = a
            .override_async(|_| async { Err::<Value, _>(Boom) })
            .await
            .expect_err("must fail");

        assert_eq!(err, Boom);
        assert_eq!(a.data(), Some(&json!({"x": 1})));
    }

    #[test]
    fn resolve_as_typed() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Server {
            host: String,
            port: u16,
        }

        let schema = Schema::object([
            ("host", Field::required(Schema::string())),
            ("port", Field::required(Schema::integer()).with_default(80)),
        ]);
        let server: Server = ConfigUnit::new(schema, json!({"host": "h"}))
            .resolve_as()
            .expect("must resolve");

        assert_eq!(
            server,
            Server {
                host: "h".into(),
                port: 80
            }
        );
    }
}
