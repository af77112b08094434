//! SEO assets served alongside the API.

pub mod robots;
pub mod sitemap;

pub use robots::render_robots;
pub use sitemap::{render_sitemap, sitemap_entries, ChangeFrequency, SitemapEntry};
