//! Closed set of CMS collections known to the site.
//!
//! The CMS identifies collections by their data collection id. Those ids are
//! the canonical string form here; `Products` is stored as `Import2` on the
//! CMS side because that is how the catalogue was first imported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cms::error::CmsError;

/// A recognized CMS collection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CollectionName {
    /// Landing page hero banner.
    Hero,
    /// Company presentation block.
    About,
    /// Services offered (logistics, sourcing, ...).
    Services,
    /// Product catalogue.
    #[serde(rename = "Import2")]
    Products,
    /// Contact details.
    Contact,
    /// Home page carousel slides.
    Carousel,
    /// Customer testimonials.
    Testimonials,
    /// Key figures shown on the home page.
    Stats,
}

impl CollectionName {
    /// Every recognized collection, in aggregate order.
    pub const ALL: [Self; 8] = [
        Self::Hero,
        Self::About,
        Self::Services,
        Self::Products,
        Self::Contact,
        Self::Carousel,
        Self::Testimonials,
        Self::Stats,
    ];

    /// CMS data collection id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hero => "Hero",
            Self::About => "About",
            Self::Services => "Services",
            Self::Products => "Import2",
            Self::Contact => "Contact",
            Self::Carousel => "Carousel",
            Self::Testimonials => "Testimonials",
            Self::Stats => "Stats",
        }
    }

    /// Singleton collections are rendered as one item rather than a list.
    #[must_use]
    pub const fn is_singleton(self) -> bool {
        matches!(self, Self::Hero | Self::About | Self::Contact)
    }

    /// Wire ids of all recognized collections.
    #[must_use]
    pub fn expected_names() -> Vec<String> {
        Self::ALL.iter().map(|name| name.as_str().to_string()).collect()
    }

    /// Parse a CMS collection id.
    ///
    /// Matching is exact; `import2` or `hero` are not accepted.
    ///
    /// # Errors
    /// Returns [`CmsError::InvalidCollection`] carrying the full list of
    /// expected names when `value` is not recognized.
    pub fn parse(value: &str) -> Result<Self, CmsError> {
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == value)
            .ok_or_else(|| CmsError::InvalidCollection {
                received: value.to_string(),
                expected: Self::expected_names(),
            })
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = CmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_name() {
        for name in CollectionName::ALL {
            assert_eq!(CollectionName::parse(name.as_str()).ok(), Some(name));
        }
    }

    #[test]
    fn test_products_use_import_id() {
        assert_eq!(CollectionName::Products.as_str(), "Import2");
        assert!(CollectionName::parse("Products").is_err());
        let json = serde_json::to_string(&CollectionName::Products).unwrap_or_default();
        assert_eq!(json, "\"Import2\"");
    }

    #[test]
    fn test_unknown_name_reports_expected_list() {
        match CollectionName::parse("Blog") {
            Err(CmsError::InvalidCollection { received, expected }) => {
                assert_eq!(received, "Blog");
                assert_eq!(expected, CollectionName::expected_names());
                assert_eq!(expected.len(), 8);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("hero".parse::<CollectionName>().is_err());
        assert!("Hero".parse::<CollectionName>().is_ok());
    }

    #[test]
    fn test_singletons() {
        let singles: Vec<_> = CollectionName::ALL
            .into_iter()
            .filter(|name| name.is_singleton())
            .collect();
        assert_eq!(
            singles,
            vec![CollectionName::Hero, CollectionName::About, CollectionName::Contact]
        );
    }
}
