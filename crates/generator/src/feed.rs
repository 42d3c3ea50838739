//! RSS 2.0 feeds of the blog and the news page.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveTime, Utc};
use folio_core::content::sorted_by_date_desc;
use folio_core::{Document, NewsItem, NewsSettings, SiteInfo};
use rss::extension::atom::{AtomExtensionBuilder, Link};
use rss::validation::Validate;
use rss::{CategoryBuilder, ChannelBuilder, GuidBuilder, ItemBuilder};
use std::fs;
use std::path::{Path, PathBuf};

pub const FEED_FILE: &str = "blog-rss.xml";
pub const NEWS_FEED_FILE: &str = "news-rss.xml";

/// Build the blog feed, newest post first.
///
/// Posts without a date cannot carry a `pubDate` and are left out.
pub fn build_blog_feed(site: &SiteInfo, documents: &[Document], now: DateTime<Utc>) -> Result<String> {
    let Some(base_url) = site.base_url() else {
        bail!("site.url must be set to generate feeds");
    };

    let items: Vec<rss::Item> = sorted_by_date_desc(documents)
        .into_iter()
        .filter_map(|doc| {
            let item = document_to_item(doc, site, base_url);
            if item.is_none() {
                tracing::debug!(slug = %doc.meta.slug, "skipping undated post in feed");
            }
            item
        })
        .collect();

    let channel = Channel {
        title: &site.title,
        description: &site.description,
        link: format!("{}/blog", base_url),
        self_href: format!("{}/{}", base_url, FEED_FILE),
    };
    channel.render(site, items, now)
}

/// Build the news feed, newest update first.
///
/// Items without a link point at the news page; relative links are
/// resolved against the site URL.
pub fn build_news_feed(site: &SiteInfo, news: &NewsSettings, now: DateTime<Utc>) -> Result<String> {
    let Some(base_url) = site.base_url() else {
        bail!("site.url must be set to generate feeds");
    };

    let mut updates: Vec<&NewsItem> = news.items.iter().collect();
    updates.sort_by(|a, b| b.date.cmp(&a.date));

    let items = updates
        .into_iter()
        .map(|item| news_to_item(item, site, base_url))
        .collect();

    let channel = Channel {
        title: non_empty(&news.title).unwrap_or(&site.title),
        description: non_empty(&news.description).unwrap_or(&site.description),
        link: format!("{}/news", base_url),
        self_href: format!("{}/{}", base_url, NEWS_FEED_FILE),
    };
    channel.render(site, items, now)
}

struct Channel<'a> {
    title: &'a str,
    description: &'a str,
    link: String,
    self_href: String,
}

impl Channel<'_> {
    fn render(self, site: &SiteInfo, items: Vec<rss::Item>, now: DateTime<Utc>) -> Result<String> {
        let mut self_link = Link::default();
        self_link.set_href(self.self_href);
        self_link.set_rel("self");
        self_link.set_mime_type(Some("application/rss+xml".to_string()));

        let channel = ChannelBuilder::default()
            .title(self.title.to_string())
            .link(self.link)
            .description(self.description.to_string())
            .language(Some(site.language.clone()))
            .last_build_date(Some(now.to_rfc2822()))
            .atom_ext(Some(
                AtomExtensionBuilder::default()
                    .links(vec![self_link])
                    .build(),
            ))
            .items(items)
            .build();

        channel
            .validate()
            .map_err(|e| anyhow!("RSS validation failed: {e}"))?;
        Ok(channel.to_string())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.trim().is_empty())
}

fn document_to_item(doc: &Document, site: &SiteInfo, base_url: &str) -> Option<rss::Item> {
    let date = doc.meta.date?;
    let pub_date = date.and_time(NaiveTime::MIN).and_utc().to_rfc2822();
    let link = format!("{}/blog/{}", base_url, doc.meta.slug);

    let categories: Vec<rss::Category> = doc
        .meta
        .topics
        .iter()
        .map(|topic| CategoryBuilder::default().name(topic.clone()).build())
        .collect();

    Some(
        ItemBuilder::default()
            .title(Some(doc.meta.title.clone()))
            .link(Some(link.clone()))
            .guid(Some(GuidBuilder::default().permalink(true).value(link).build()))
            .description(Some(doc.description().to_string()))
            .pub_date(Some(pub_date))
            .author(rss_author(doc.meta.author.as_deref(), site))
            .categories(categories)
            .build(),
    )
}

fn news_to_item(item: &NewsItem, site: &SiteInfo, base_url: &str) -> rss::Item {
    let link = match item.link.as_deref() {
        Some(link) if link.starts_with("http://") || link.starts_with("https://") => link.to_string(),
        Some(path) => format!("{}/{}", base_url, path.trim_start_matches('/')),
        None => format!("{}/news", base_url),
    };
    // Links repeat across updates; the guid is keyed by id
    let guid = GuidBuilder::default()
        .permalink(false)
        .value(format!("{}/news#{}", base_url, item.id))
        .build();

    ItemBuilder::default()
        .title(Some(item.title.clone()))
        .link(Some(link))
        .guid(Some(guid))
        .description(Some(item.description.clone()))
        .pub_date(Some(item.date.and_time(NaiveTime::MIN).and_utc().to_rfc2822()))
        .author(rss_author(None, site))
        .build()
}

/// RSS wants `email (Name)`; without a site email there is nothing valid to emit.
fn rss_author(author: Option<&str>, site: &SiteInfo) -> Option<String> {
    if site.email.trim().is_empty() {
        return None;
    }
    let name = author
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(site.author.as_str());
    if name.is_empty() {
        Some(site.email.clone())
    } else {
        Some(format!("{} ({})", site.email, name))
    }
}

/// Write the blog feed to `<dist>/blog-rss.xml`.
pub fn write_feed(dist: &Path, xml: &str) -> Result<PathBuf> {
    write_named(dist, FEED_FILE, xml)
}

/// Write the news feed to `<dist>/news-rss.xml`.
pub fn write_news_feed(dist: &Path, xml: &str) -> Result<PathBuf> {
    write_named(dist, NEWS_FEED_FILE, xml)
}

fn write_named(dist: &Path, name: &str, xml: &str) -> Result<PathBuf> {
    fs::create_dir_all(dist)
        .with_context(|| format!("Failed to create {}", dist.display()))?;
    let path = dist.join(name);
    fs::write(&path, xml).with_context(|| format!("Failed to write feed to {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = xml.len(), "feed written");
    Ok(path)
}
