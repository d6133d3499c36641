//! Merge schema defaults with values read from a URL.
//!
//! The result always has exactly the schema's key set: defaults supply
//! every key, and anything the URL carries outside the schema is dropped.

use crate::codec::QueryCodec;
use crate::schema::Schema;
use crate::value::State;

/// Compute a state from the schema defaults and a raw query string.
///
/// Foreign keys are removed from the parsed mapping before the merge, so
/// they never reach the state whatever the codec returns. Coercion is
/// schema-directed, so foreign keys are never coerced either. URL values
/// win per key.
pub fn reconcile(schema: &Schema, query: &str, codec: &dyn QueryCodec) -> State {
    let mut parsed = codec.parse(query, schema);
    parsed.retain(|key| schema.contains(key));
    schema.defaults().overlay(&parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StandardCodec;
    use crate::value::{QueryMap, QueryValue};
    use crate::query_map;

    fn schema() -> Schema {
        Schema::new(query_map! { "page" => 1, "q" => "" })
    }

    // ========================================================================
    // reconcile
    // ========================================================================

    #[test]
    fn url_values_override_defaults() {
        let state = reconcile(&schema(), "?page=2&q=hello", &StandardCodec);
        assert_eq!(state, query_map! { "page" => 2, "q" => "hello" });
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let state = reconcile(&schema(), "q=x", &StandardCodec);
        assert_eq!(state, query_map! { "page" => 1, "q" => "x" });
    }

    #[test]
    fn foreign_keys_are_dropped() {
        let state = reconcile(&Schema::new(query_map! { "page" => 1 }), "page=2&extra=x", &StandardCodec);
        assert_eq!(state, query_map! { "page" => 2 });
    }

    #[test]
    fn result_keeps_schema_order() {
        let state = reconcile(&schema(), "q=x&page=9", &StandardCodec);
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["page", "q"]);
    }

    #[test]
    fn repeated_key_becomes_array() {
        let schema = Schema::new(query_map! { "tags" => Vec::<String>::new() });
        let state = reconcile(&schema, "tags=a&tags=b", &StandardCodec);
        assert_eq!(state.get("tags"), Some(&QueryValue::from(vec!["a", "b"])));
    }

    struct InventingCodec;

    impl QueryCodec for InventingCodec {
        fn parse(&self, _query: &str, _schema: &Schema) -> QueryMap {
            query_map! { "page" => 7, "injected" => "x" }
        }

        fn stringify(&self, _map: &QueryMap) -> String {
            String::new()
        }
    }

    #[test]
    fn custom_codec_cannot_add_keys() {
        let state = reconcile(&schema(), "", &InventingCodec);
        assert_eq!(state, query_map! { "page" => 7, "q" => "" });
    }
}
