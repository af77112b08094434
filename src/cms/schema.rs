//! Typed content schema for CMS collections.
//!
//! Every item shares a [`ContentBase`] (identity, owner, timestamps, active
//! flag), which is the only part that is enforced. Each collection adds its
//! own fields on top as [`Field`]s: they are typed when the CMS sends the
//! expected JSON type and kept verbatim otherwise. Fields the schema does not
//! know about are kept in `extra` so responses pass through unchanged.

use chrono::{DateTime, Utc};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::cms::collections::CollectionName;
use crate::cms::error::CmsError;

/// Fields shared by every CMS item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBase {
    /// Identifier, unique within its collection.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owner (CMS member id).
    #[serde(rename = "_owner")]
    pub owner: String,
    /// Creation timestamp.
    #[serde(rename = "_createdDate", deserialize_with = "cms_date::deserialize")]
    pub created_date: DateTime<Utc>,
    /// Last update timestamp.
    #[serde(rename = "_updatedDate", deserialize_with = "cms_date::deserialize")]
    pub updated_date: DateTime<Utc>,
    /// Whether the item should be displayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ContentBase {
    /// Check identity and timestamp invariants.
    ///
    /// # Errors
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("_id is empty".to_string());
        }
        if self.updated_date < self.created_date {
            return Err(format!(
                "_updatedDate {} precedes _createdDate {}",
                self.updated_date.to_rfc3339(),
                self.created_date.to_rfc3339()
            ));
        }
        Ok(())
    }

    /// Items without an explicit flag count as active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active.unwrap_or(true)
    }
}

/// A collection-specific field.
///
/// Editors can leave any field blank or store it with another JSON type than
/// the one the site expects, so a mismatch is carried through instead of
/// failing the whole collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field<T> {
    /// Value of the expected type.
    Typed(T),
    /// Any other JSON value, serialized back as received.
    Other(Value),
}

impl<T> Field<T> {
    /// The value if it has the expected type.
    #[must_use]
    pub const fn typed(&self) -> Option<&T> {
        match self {
            Self::Typed(value) => Some(value),
            Self::Other(_) => None,
        }
    }
}

impl Field<String> {
    /// Text value, if the field holds a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.typed().map(String::as_str)
    }
}

/// Landing page hero banner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Field<String>>,
    /// Secondary headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<Field<String>>,
    /// Background image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Field<String>>,
    /// Call-to-action label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<Field<String>>,
    /// Call-to-action target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_link: Option<Field<String>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Company presentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Section title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Field<String>>,
    /// Body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Illustration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Field<String>>,
    /// Mission statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<Field<String>>,
    /// Vision statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<Field<String>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A service offered by the company.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Service name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Field<String>>,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Icon identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Field<String>>,
    /// Illustration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Field<String>>,
    /// Display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Field<i64>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A traded product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Field<String>>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Field<String>>,
    /// Product photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Field<String>>,
    /// Category (cereals, oilseeds, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Field<String>>,
    /// Country or region of origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Field<String>>,
    /// URL slug of the detail page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<Field<String>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contact details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Section title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Field<String>>,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Field<String>>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Field<String>>,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Field<String>>,
    /// Embeddable map URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_url: Option<Field<String>>,
    /// Opening hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<Field<String>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Carousel slide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Slide image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Field<String>>,
    /// Slide title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Field<String>>,
    /// Caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Field<String>>,
    /// Link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Field<String>>,
    /// Display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Field<i64>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Customer testimonial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Author name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Field<String>>,
    /// Testimonial text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Field<String>>,
    /// Author company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Field<String>>,
    /// Author photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Field<String>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Key figure ("25 years of trading").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatItem {
    /// Shared fields.
    #[serde(flatten)]
    pub base: ContentBase,
    /// Label shown under the figure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Field<String>>,
    /// Figure, either text ("25+", "1.2M t") or a bare number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Field<String>>,
    /// Icon identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Field<String>>,
    /// Fields not covered by the schema.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An item of any collection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentItem {
    /// Hero banner.
    Hero(HeroItem),
    /// About block.
    About(AboutItem),
    /// Service.
    Service(ServiceItem),
    /// Product.
    Product(ProductItem),
    /// Contact details.
    Contact(ContactItem),
    /// Carousel slide.
    Carousel(CarouselItem),
    /// Testimonial.
    Testimonial(TestimonialItem),
    /// Key figure.
    Stat(StatItem),
}

impl ContentItem {
    /// Shared fields of the item.
    #[must_use]
    pub const fn base(&self) -> &ContentBase {
        match self {
            Self::Hero(item) => &item.base,
            Self::About(item) => &item.base,
            Self::Service(item) => &item.base,
            Self::Product(item) => &item.base,
            Self::Contact(item) => &item.base,
            Self::Carousel(item) => &item.base,
            Self::Testimonial(item) => &item.base,
            Self::Stat(item) => &item.base,
        }
    }

    /// Collection this item variant belongs to.
    #[must_use]
    pub const fn collection(&self) -> CollectionName {
        match self {
            Self::Hero(_) => CollectionName::Hero,
            Self::About(_) => CollectionName::About,
            Self::Service(_) => CollectionName::Services,
            Self::Product(_) => CollectionName::Products,
            Self::Contact(_) => CollectionName::Contact,
            Self::Carousel(_) => CollectionName::Carousel,
            Self::Testimonial(_) => CollectionName::Testimonials,
            Self::Stat(_) => CollectionName::Stats,
        }
    }
}

/// Decode a raw CMS payload into the schema variant of `collection`.
///
/// The payload may be bare or wrapped in `{ "data": ... }`. The result is
/// checked against [`ContentBase::validate`].
///
/// # Errors
/// Returns [`CmsError::InvalidItem`] if the payload matches neither envelope
/// shape or its [`ContentBase`] is missing or invalid.
pub fn decode_item(collection: CollectionName, value: Value) -> Result<ContentItem, CmsError> {
    let invalid = |reason: String| CmsError::InvalidItem { collection, reason };

    let inner = Envelope::<Value>::classify(value)
        .map_err(|err| invalid(err.to_string()))?
        .into_inner();

    let item = match collection {
        CollectionName::Hero => serde_json::from_value(inner).map(ContentItem::Hero),
        CollectionName::About => serde_json::from_value(inner).map(ContentItem::About),
        CollectionName::Services => serde_json::from_value(inner).map(ContentItem::Service),
        CollectionName::Products => serde_json::from_value(inner).map(ContentItem::Product),
        CollectionName::Contact => serde_json::from_value(inner).map(ContentItem::Contact),
        CollectionName::Carousel => serde_json::from_value(inner).map(ContentItem::Carousel),
        CollectionName::Testimonials => {
            serde_json::from_value(inner).map(ContentItem::Testimonial)
        }
        CollectionName::Stats => serde_json::from_value(inner).map(ContentItem::Stat),
    }
    .map_err(|err| invalid(err.to_string()))?;

    item.base().validate().map_err(invalid)?;
    Ok(item)
}

/// Payload that did not match either envelope shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// Payload is not a JSON object.
    #[error("item payload is not a JSON object")]
    NotAnObject,
    /// Object carries neither `_id` nor an object under `data`.
    #[error("item payload is neither a bare record nor a {{data}} envelope")]
    Unrecognized,
}

/// An item as delivered on the wire: bare, or wrapped in `{ "data": item }`.
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope<T> {
    /// The record itself.
    Bare(T),
    /// The record was found under `data`.
    Wrapped(T),
}

impl<T> Envelope<T> {
    /// Unwrapped record.
    pub fn into_inner(self) -> T {
        match self {
            Self::Bare(item) | Self::Wrapped(item) => item,
        }
    }

    /// Whether the record arrived inside a `data` envelope.
    #[must_use]
    pub const fn is_wrapped(&self) -> bool {
        matches!(self, Self::Wrapped(_))
    }

    /// Convert the record, keeping the envelope shape.
    ///
    /// # Errors
    /// Propagates the error returned by `f`.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Envelope<U>, E> {
        Ok(match self {
            Self::Bare(item) => Envelope::Bare(f(item)?),
            Self::Wrapped(item) => Envelope::Wrapped(f(item)?),
        })
    }
}

impl Envelope<Value> {
    /// Classify a raw payload.
    ///
    /// An object with an `_id` is a bare record. Otherwise an object whose
    /// `data` member is itself an object is an envelope; sibling keys such as
    /// the CMS's own `id` or `dataCollectionId` are dropped.
    ///
    /// # Errors
    /// Returns an [`EnvelopeError`] for anything else.
    pub fn classify(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut map) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        if map.contains_key("_id") {
            return Ok(Self::Bare(Value::Object(map)));
        }

        match map.remove("data") {
            Some(inner @ Value::Object(_)) => Ok(Self::Wrapped(inner)),
            _ => Err(EnvelopeError::Unrecognized),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Envelope::<Value>::classify(value)
            .map_err(de::Error::custom)?
            .try_map(serde_json::from_value)
            .map_err(de::Error::custom)
    }
}

/// CMS dates arrive either as ISO-8601 strings or as `{ "$date": "..." }`.
mod cms_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Plain(DateTime<Utc>),
        Wrapped {
            #[serde(rename = "$date")]
            date: DateTime<Utc>,
        },
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawDate::deserialize(deserializer)? {
            RawDate::Plain(date) | RawDate::Wrapped { date } => date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_json(id: &str) -> Value {
        json!({
            "_id": id,
            "_owner": "owner-1",
            "_createdDate": "2024-03-01T10:00:00Z",
            "_updatedDate": { "$date": "2024-03-02T10:00:00Z" },
            "title": "Yellow corn",
            "origin": "Ukraine",
            "grade": "No. 2"
        })
    }

    #[test]
    fn test_classify_bare_and_wrapped() {
        let bare = Envelope::<Value>::classify(product_json("p1")).ok();
        assert!(matches!(bare, Some(Envelope::Bare(_))));

        let wrapped = Envelope::<Value>::classify(json!({
            "id": "p1",
            "dataCollectionId": "Import2",
            "data": product_json("p1")
        }))
        .ok();
        assert!(wrapped.as_ref().is_some_and(Envelope::is_wrapped));
        assert_eq!(wrapped.map(Envelope::into_inner), Some(product_json("p1")));
    }

    #[test]
    fn test_classify_rejects_other_shapes() {
        assert_eq!(
            Envelope::<Value>::classify(json!("p1")),
            Err(EnvelopeError::NotAnObject)
        );
        assert_eq!(
            Envelope::<Value>::classify(json!({ "title": "no id" })),
            Err(EnvelopeError::Unrecognized)
        );
        assert_eq!(
            Envelope::<Value>::classify(json!({ "data": [1, 2] })),
            Err(EnvelopeError::Unrecognized)
        );
    }

    #[test]
    fn test_decode_product_keeps_unknown_fields() {
        let product = match decode_item(CollectionName::Products, product_json("p1")) {
            Ok(ContentItem::Product(product)) => product,
            other => panic!("expected product, got {other:?}"),
        };
        assert_eq!(product.title.as_ref().and_then(Field::as_str), Some("Yellow corn"));
        assert_eq!(product.origin.as_ref().and_then(Field::as_str), Some("Ukraine"));
        assert_eq!(product.extra.get("grade"), Some(&json!("No. 2")));
        assert!(product.base.is_active());

        let out = serde_json::to_value(ContentItem::Product(product)).unwrap_or_default();
        assert_eq!(out["_id"], json!("p1"));
        assert_eq!(out["grade"], json!("No. 2"));
        assert_eq!(out["_updatedDate"], json!("2024-03-02T10:00:00Z"));
    }

    #[test]
    fn test_decode_rejects_update_before_create() {
        let mut raw = product_json("p1");
        raw["_updatedDate"] = json!("2024-02-01T00:00:00Z");
        let err = decode_item(CollectionName::Products, raw);
        assert!(matches!(err, Err(CmsError::InvalidItem { .. })));
    }

    #[test]
    fn test_decode_passes_mismatched_fields_through() {
        let mut raw = product_json("s1");
        raw["label"] = json!("Years of trading");
        raw["value"] = json!(25);
        let stat = match decode_item(CollectionName::Stats, raw) {
            Ok(ContentItem::Stat(stat)) => stat,
            other => panic!("expected stat, got {other:?}"),
        };
        assert_eq!(stat.value, Some(Field::Other(json!(25))));
        assert_eq!(stat.label.as_ref().and_then(Field::as_str), Some("Years of trading"));

        let out = serde_json::to_value(ContentItem::Stat(stat)).unwrap_or_default();
        assert_eq!(out["value"], json!(25));
        assert_eq!(out["label"], json!("Years of trading"));
    }

    #[test]
    fn test_decode_accepts_missing_collection_fields() {
        let mut raw = product_json("p1");
        if let Some(map) = raw.as_object_mut() {
            map.remove("title");
        }
        let product = match decode_item(CollectionName::Products, raw) {
            Ok(ContentItem::Product(product)) => product,
            other => panic!("expected product, got {other:?}"),
        };
        assert_eq!(product.title, None);
        assert_eq!(product.base.id, "p1");
    }

    #[test]
    fn test_decode_requires_base_fields() {
        let mut raw = product_json("p1");
        if let Some(map) = raw.as_object_mut() {
            map.remove("_createdDate");
        }
        let err = decode_item(CollectionName::Products, raw);
        assert!(matches!(
            err,
            Err(CmsError::InvalidItem { collection: CollectionName::Products, .. })
        ));
    }

    #[test]
    fn test_envelope_deserialize_typed() {
        let items: Vec<Envelope<ProductItem>> = serde_json::from_value(json!([
            product_json("p1"),
            { "data": product_json("p2") }
        ]))
        .unwrap_or_default();
        let ids: Vec<String> = items
            .into_iter()
            .map(|item| item.into_inner().base.id)
            .collect();
        assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn test_envelope_deserialize_rejects_unrecognized() {
        let parsed: Result<Vec<Envelope<ProductItem>>, _> =
            serde_json::from_value(json!([{ "title": "orphan" }]));
        assert!(parsed.is_err());
    }
}
