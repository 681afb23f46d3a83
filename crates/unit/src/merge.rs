use serde_json::{Map, Value};

/// Deep-merge `patch` on top of `base`, returning a new value.
///
/// Mappings present on both sides are merged key by key. Everything else, sequences included, is
/// terminal: the value from `patch` replaces the one from `base`.
pub fn deep_merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => Value::Object(merge_maps(base, patch)),
        (_, patch) => patch.clone(),
    }
}

fn merge_maps(base: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut result = base.clone();
    for (key, value) in patch {
        let merged = match result.get(key) {
            Some(existing) => deep_merge(existing, value),
            None => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

/// Merge two optional data values, treating an absent side as an empty mapping.
pub(crate) fn merge_optional(base: Option<&Value>, patch: Option<&Value>) -> Option<Value> {
    match (base, patch) {
        (Some(base), Some(patch)) => Some(deep_merge(base, patch)),
        // merging with an empty mapping is the identity
        (Some(value), None) | (None, Some(value)) => Some(value.clone()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_mappings_merge() {
        let base = json!({"db": {"host": "h1", "port": 1}});
        let patch = json!({"db": {"port": 2}});
        assert_eq!(
            deep_merge(&base, &patch),
            json!({"db": {"host": "h1", "port": 2}})
        );
    }

    #[test]
    fn sequences_replace() {
        let base = json!({"tags": ["a", "b"]});
        let patch = json!({"tags": ["x"]});
        assert_eq!(deep_merge(&base, &patch), json!({"tags": ["x"]}));
    }

    #[test]
    fn terminal_replaces_mapping() {
        let base = json!({"db": {"host": "h1"}});
        let patch = json!({"db": "sqlite://memory"});
        assert_eq!(deep_merge(&base, &patch), json!({"db": "sqlite://memory"}));

        // and the other way around
        assert_eq!(deep_merge(&patch, &base), base);
    }

    #[test]
    fn null_is_terminal() {
        let base = json!({"a": {"b": 1}});
        let patch = json!({"a": null});
        assert_eq!(deep_merge(&base, &patch), json!({"a": null}));
    }

    #[test]
    fn key_order_follows_base_then_patch() {
        let base = json!({"b": 1, "a": 2});
        let patch = json!({"c": 3, "b": 4});
        let merged = deep_merge(&base, &patch);
        let keys: Vec<_> = merged.as_object().into_iter().flat_map(|m| m.keys()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn absent_sides() {
        assert_eq!(merge_optional(None, None), None);
        assert_eq!(
            merge_optional(None, Some(&json!({"a": 1}))),
            Some(json!({"a": 1}))
        );
        assert_eq!(
            merge_optional(Some(&json!({"a": 1})), None),
            Some(json!({"a": 1}))
        );
    }
}
