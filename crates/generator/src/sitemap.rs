//! sitemaps.org XML for the prerendered routes and every blog post.

use crate::escape_xml;
use anyhow::{Context, Result};
use folio_core::{Document, StaticRoute};
use std::fs;
use std::path::{Path, PathBuf};

pub const SITEMAP_FILE: &str = "sitemap.xml";

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

const POST_CHANGEFREQ: &str = "monthly";
const POST_PRIORITY: f32 = 0.7;

struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
    changefreq: String,
    priority: f32,
}

/// Render the sitemap: static routes in configured order, then posts.
pub fn build_sitemap(site_url: &str, static_routes: &[StaticRoute], documents: &[Document]) -> String {
    let base_url = site_url.trim_end_matches('/');

    let statics = static_routes.iter().map(|route| UrlEntry {
        loc: format!("{}{}", base_url, with_trailing_slash(&route.path)),
        lastmod: None,
        changefreq: route
            .changefreq
            .clone()
            .unwrap_or_else(|| "weekly".to_string()),
        priority: route
            .priority
            .unwrap_or(if route.path == "/" { 1.0 } else { 0.8 }),
    });

    let posts = documents.iter().map(|doc| UrlEntry {
        loc: format!("{}/blog/{}/", base_url, doc.meta.slug),
        lastmod: doc.meta.date.map(|d| d.format("%Y-%m-%d").to_string()),
        changefreq: POST_CHANGEFREQ.to_string(),
        priority: POST_PRIORITY,
    });

    into_xml(statics.chain(posts))
}

fn into_xml(entries: impl Iterator<Item = UrlEntry>) -> String {
    let mut xml = String::with_capacity(4096);

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"");
    xml.push_str(SITEMAP_NS);
    xml.push_str("\">\n");

    for entry in entries {
        xml.push_str("  <url>\n    <loc>");
        xml.push_str(&escape_xml(&entry.loc));
        xml.push_str("</loc>\n");
        if let Some(lastmod) = entry.lastmod {
            xml.push_str("    <lastmod>");
            xml.push_str(&lastmod);
            xml.push_str("</lastmod>\n");
        }
        xml.push_str("    <changefreq>");
        xml.push_str(&escape_xml(&entry.changefreq));
        xml.push_str("</changefreq>\n");
        xml.push_str(&format!("    <priority>{:.1}</priority>\n", entry.priority));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Write `xml` to `<dist>/sitemap.xml`, creating `dist` if needed.
pub fn write_sitemap(dist: &Path, xml: &str) -> Result<PathBuf> {
    fs::create_dir_all(dist)
        .with_context(|| format!("Failed to create {}", dist.display()))?;
    let path = dist.join(SITEMAP_FILE);
    fs::write(&path, xml)
        .with_context(|| format!("Failed to write sitemap to {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = xml.len(), "sitemap written");
    Ok(path)
}
