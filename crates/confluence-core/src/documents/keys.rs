//! Cache keys for document queries.
//!
//! Keys nest so that invalidating `lists()` drops every filtered listing and
//! `all()` drops everything document related.

pub mod document_keys {
    use std::collections::BTreeMap;

    use crate::cache::QueryKey;

    pub fn all() -> QueryKey {
        QueryKey::new(["documents"])
    }

    pub fn lists() -> QueryKey {
        all().child("list")
    }

    /// Filters are serialized in key order so equal filter sets share a key.
    pub fn list(filters: &BTreeMap<String, String>) -> QueryKey {
        lists().child(encode(filters))
    }

    /// Paginated listing. Sits under `lists()` so list invalidation restarts it.
    pub fn pages(filters: &BTreeMap<String, String>) -> QueryKey {
        lists().child("pages").child(encode(filters))
    }

    fn encode(filters: &BTreeMap<String, String>) -> String {
        serde_json::to_string(filters).unwrap_or_default()
    }

    pub fn details() -> QueryKey {
        all().child("detail")
    }

    pub fn detail(id: &str) -> QueryKey {
        details().child(id)
    }

}
