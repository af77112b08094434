//! Response shapes built by the collection service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cms::collections::CollectionName;
use crate::cms::schema::ContentItem;

/// Items of one collection as rendered in the aggregate response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollectionPayload {
    /// List collections.
    Many(Vec<ContentItem>),
    /// Singleton collections: first item, or `null` when empty.
    Single(Option<ContentItem>),
}

impl CollectionPayload {
    /// Shape `items` for `collection`.
    #[must_use]
    pub fn for_collection(collection: CollectionName, items: Vec<ContentItem>) -> Self {
        if collection.is_singleton() {
            Self::Single(items.into_iter().next())
        } else {
            Self::Many(items)
        }
    }

    /// Number of items carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Many(items) => items.len(),
            Self::Single(item) => usize::from(item.is_some()),
        }
    }

    /// Whether no item is carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Metadata attached to the aggregate response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetadata {
    /// When the aggregate was assembled.
    pub fetched_at: DateTime<Utc>,
    /// Number of collections in the response.
    pub total_collections: usize,
}

/// Every known collection, fetched in one logical response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AggregateResponse {
    /// Items keyed by CMS collection id.
    #[serde(flatten)]
    pub collections: BTreeMap<String, CollectionPayload>,
    /// Fetch metadata.
    #[serde(rename = "_metadata")]
    pub metadata: AggregateMetadata,
}

impl AggregateResponse {
    /// Assemble a response; the collection count is derived from the entries.
    #[must_use]
    pub fn new(
        entries: impl IntoIterator<Item = (CollectionName, Vec<ContentItem>)>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let collections: BTreeMap<String, CollectionPayload> = entries
            .into_iter()
            .map(|(name, items)| {
                (
                    name.as_str().to_string(),
                    CollectionPayload::for_collection(name, items),
                )
            })
            .collect();

        let metadata = AggregateMetadata {
            fetched_at,
            total_collections: collections.len(),
        };

        Self {
            collections,
            metadata,
        }
    }

    /// Payload of one collection.
    #[must_use]
    pub fn get(&self, collection: CollectionName) -> Option<&CollectionPayload> {
        self.collections.get(collection.as_str())
    }
}

/// A window over a collection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Items of the window.
    pub items: Vec<ContentItem>,
    /// True iff the following window is non-empty.
    pub has_next: bool,
    /// Collection size, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_counts_collections() {
        let now = Utc::now();
        let response = AggregateResponse::new(
            vec![
                (CollectionName::Hero, Vec::new()),
                (CollectionName::Services, Vec::new()),
                (CollectionName::Products, Vec::new()),
            ],
            now,
        );
        let json = serde_json::to_value(&response).unwrap_or_default();
        let object = json.as_object().cloned().unwrap_or_default();

        let keys = object.keys().filter(|key| *key != "_metadata").count();
        assert_eq!(keys, 3);
        assert_eq!(json["_metadata"]["totalCollections"], 3);
        assert_eq!(json["Hero"], serde_json::Value::Null);
        assert_eq!(json["Import2"], serde_json::json!([]));
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(CollectionPayload::Single(None).len(), 0);
        assert!(CollectionPayload::Many(Vec::new()).is_empty());
    }

    #[test]
    fn test_page_omits_unknown_total() {
        let page = ProductPage {
            items: Vec::new(),
            has_next: false,
            total_count: None,
        };
        let json = serde_json::to_value(&page).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "items": [], "hasNext": false }));
    }
}
