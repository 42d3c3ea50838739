//! Meta tag extraction from prerendered HTML.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::{fs, io};

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>([^<]+)</title>").expect("valid regex"));
static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<meta\s[^>]*>").expect("valid regex"));
static LINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<link\s[^>]*>").expect("valid regex"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Social and search metadata found in one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCheck {
    pub title: Option<String>,
    pub description: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_url: Option<String>,
    pub og_image: Option<String>,
    pub twitter_card: Option<String>,
    pub twitter_image: Option<String>,
    pub canonical: Option<String>,
}

impl PageCheck {
    pub fn from_html(html: &str) -> Self {
        let mut check = PageCheck {
            title: TITLE
                .captures(html)
                .map(|c| c[1].trim().to_string())
                .filter(|t| !t.is_empty()),
            ..Default::default()
        };

        for tag in META_TAG.find_iter(html) {
            let attrs = attributes(tag.as_str());
            let key = lookup(&attrs, "property").or_else(|| lookup(&attrs, "name"));
            let (Some(key), Some(content)) = (key, lookup(&attrs, "content")) else {
                continue;
            };

            let slot = match key.to_ascii_lowercase().as_str() {
                "description" => &mut check.description,
                "og:title" => &mut check.og_title,
                "og:description" => &mut check.og_description,
                "og:url" => &mut check.og_url,
                "og:image" => &mut check.og_image,
                "twitter:card" => &mut check.twitter_card,
                "twitter:image" => &mut check.twitter_image,
                _ => continue,
            };
            // Client-side head managers can leave duplicates; the first wins
            if slot.is_none() {
                *slot = Some(content.to_string());
            }
        }

        check.canonical = LINK_TAG.find_iter(html).find_map(|tag| {
            let attrs = attributes(tag.as_str());
            lookup(&attrs, "rel")
                .filter(|rel| rel.eq_ignore_ascii_case("canonical"))
                .and(lookup(&attrs, "href"))
                .map(str::to_string)
        });

        check
    }

    /// Tags every page needs, plus the sharing tags posts need
    pub fn missing_required(&self, is_post: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("og:title", &self.og_title),
            ("og:description", &self.og_description),
        ] {
            if value.is_none() {
                missing.push(name);
            }
        }
        if is_post {
            for (name, value) in [("og:image", &self.og_image), ("twitter:card", &self.twitter_card)] {
                if value.is_none() {
                    missing.push(name);
                }
            }
        }
        missing
    }

    pub fn missing_recommended(&self, is_post: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.og_url.is_none() {
            missing.push("og:url");
        }
        if self.canonical.is_none() {
            missing.push("canonical");
        }
        if is_post && self.twitter_image.is_none() {
            missing.push("twitter:image");
        }
        missing
    }
}

/// Read a prerendered file and extract its metadata.
pub fn check_artifact(path: &Path) -> io::Result<PageCheck> {
    let html = fs::read_to_string(path)?;
    Ok(PageCheck::from_html(&html))
}

fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|c| {
            let value = c.get(2).or_else(|| c.get(3)).map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

fn lookup<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
