//! Search-engine and feed outputs generated from the content directory.

pub mod feed;
pub mod sitemap;

pub use feed::{
    FEED_FILE, NEWS_FEED_FILE, build_blog_feed, build_news_feed, write_feed, write_news_feed,
};
pub use sitemap::{SITEMAP_FILE, build_sitemap, write_sitemap};

use std::borrow::Cow;

/// Escape special XML characters.
pub(crate) fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}
