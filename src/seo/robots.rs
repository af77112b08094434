//! `robots.txt` generation.

/// Render `robots.txt` for the canonical site URL.
#[must_use]
pub fn render_robots(site_url: &str) -> String {
    let base = site_url.trim_end_matches('/');
    format!("User-agent: *\nAllow: /\n\nHost: {base}\nSitemap: {base}/sitemap.xml\n")
}
