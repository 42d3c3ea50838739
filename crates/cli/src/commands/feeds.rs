use super::load_site;
use anyhow::{Context, Result};
use folio_generator::{
    build_blog_feed, build_news_feed, build_sitemap, write_feed, write_news_feed, write_sitemap,
};
use std::path::PathBuf;

/// Write `sitemap.xml`, `blog-rss.xml` and `news-rss.xml` into the output directory.
pub fn run(config_path: PathBuf) -> Result<()> {
    let site = load_site(&config_path)?;
    let config = &site.config;

    let site_url = config
        .site
        .base_url()
        .context("site.url must be set in folio.toml to generate feeds")?;

    println!("📰 Generating feeds...");

    let sitemap = build_sitemap(site_url, &config.routes, &site.documents);
    write_sitemap(&config.paths.dist, &sitemap)?;
    println!(
        "✓ Generated sitemap.xml with {} URLs",
        config.routes.len() + site.documents.len()
    );

    let now = chrono::Utc::now();
    let feed = build_blog_feed(&config.site, &site.documents, now)?;
    write_feed(&config.paths.dist, &feed)?;
    let dated = site
        .documents
        .iter()
        .filter(|d| d.meta.date.is_some())
        .count();
    println!("✓ Generated blog-rss.xml with {} posts", dated);
    if dated < site.documents.len() {
        eprintln!(
            "   ⚠ Warning: {} undated posts left out of the feed",
            site.documents.len() - dated
        );
    }

    let news = build_news_feed(&config.site, &config.news, now)?;
    write_news_feed(&config.paths.dist, &news)?;
    println!(
        "✓ Generated news-rss.xml with {} updates",
        config.news.items.len()
    );

    Ok(())
}
