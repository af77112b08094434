//! `sitemap.xml` generation.


use chrono::{DateTime, SecondsFormat, Utc};

/// How often a page is expected to change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeFrequency {
    /// Changes every day.
    Daily,
    /// Changes every week.
    Weekly,
    /// Changes every month.
    Monthly,
}

impl ChangeFrequency {
    /// Sitemap protocol value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Static pages: path, change frequency, priority.
pub const STATIC_PAGES: [(&str, ChangeFrequency, f32); 4] = [
    ("/", ChangeFrequency::Daily, 1.0),
    ("/products", ChangeFrequency::Weekly, 0.8),
    ("/about", ChangeFrequency::Monthly, 0.8),
    ("/contact", ChangeFrequency::Monthly, 0.8),
];

/// Product detail pages listed in the sitemap.
pub const PRODUCT_SLUGS: [&str; 4] = [
    "yellow-corn",
    "milling-wheat",
    "soybean-meal",
    "sunflower-oil",
];

/// Priority of product detail pages.
pub const PRODUCT_PRIORITY: f32 = 0.7;

/// One `<url>` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct SitemapEntry {
    /// Path relative to the site URL.
    pub path: String,
    /// Last modification time.
    pub lastmod: DateTime<Utc>,
    /// Expected change frequency.
    pub changefreq: ChangeFrequency,
    /// Relative priority in `0.0..=1.0`.
    pub priority: f32,
}

/// Entries for every static page followed by the product pages.
#[must_use]
pub fn sitemap_entries(lastmod: DateTime<Utc>) -> Vec<SitemapEntry> {
    let pages = STATIC_PAGES
        .iter()
        .map(|&(path, changefreq, priority)| SitemapEntry {
            path: path.to_string(),
            lastmod,
            changefreq,
            priority,
        });

    let products = PRODUCT_SLUGS.iter().map(|slug| SitemapEntry {
        path: format!("/products/{slug}"),
        lastmod,
        changefreq: ChangeFrequency::Weekly,
        priority: PRODUCT_PRIORITY,
    });

    pages.chain(products).collect()
}

/// Render entries as a sitemap document rooted at `site_url`.
#[must_use]
pub fn render_sitemap(site_url: &str, entries: &[SitemapEntry]) -> String {
    let base = site_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for entry in entries {
        let loc = if entry.path == "/" {
            base.to_string()
        } else {
            format!("{base}{}", entry.path)
        };
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&loc)));
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            entry.lastmod.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
        xml.push_str(&format!(
            "    <changefreq>{}</changefreq>\n",
            entry.changefreq.as_str()
        ));
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
