//! Catalog-specific data and URL handling for dubbindo.site.

mod extract;
mod sort;
mod title;

use std::fmt;

use serde::{Deserialize, Serialize};

pub(crate) use extract::{extract_result_list, extract_stream_options};
pub(crate) use sort::sort_titles;

pub(crate) const CATALOG_ORIGIN: &str = "https://www.dubbindo.site";
const INSECURE_CATALOG_ORIGIN: &str = "http://www.dubbindo.site";

/// One result tile scraped from a search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TitleRecord {
    pub(crate) title: String,
    pub(crate) link: String,
    pub(crate) poster: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResultPage {
    pub(crate) tiles: Vec<TitleRecord>,
    /// Best-effort signal only; the site never exposes a page count.
    pub(crate) has_more_pages: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) enum Quality {
    P1080,
    P720,
    P480,
    P360,
    Unknown,
}

impl Quality {
    /// Probed in this order, so a URL mentioning both 1080p and 720p is 1080p.
    const PROBES: [(Quality, &'static str); 4] = [
        (Quality::P1080, "1080p"),
        (Quality::P720, "720p"),
        (Quality::P480, "480p"),
        (Quality::P360, "360p"),
    ];

    pub(crate) fn classify(url: &str) -> Self {
        Self::PROBES
            .iter()
            .find(|(_, label)| url.contains(label))
            .map(|(quality, _)| *quality)
            .unwrap_or(Quality::Unknown)
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StreamOption {
    pub(crate) quality: Quality,
    pub(crate) url: String,
}

/// Rewrites a scraped tile link so it points at the secure catalog origin.
/// Links on other hosts and bare relative paths are left alone.
pub(crate) fn normalize_link(link: &str) -> String {
    if let Some(rest) = link.strip_prefix(INSECURE_CATALOG_ORIGIN) {
        return format!("{CATALOG_ORIGIN}{rest}");
    }
    if link.starts_with('/') {
        return format!("{CATALOG_ORIGIN}{link}");
    }
    link.to_string()
}

/// Detail pages are always fetched from the secure origin, even when the
/// stored link is relative without a leading slash.
pub(crate) fn detail_url(link: &str) -> String {
    if let Some(rest) = link.strip_prefix(INSECURE_CATALOG_ORIGIN) {
        return format!("{CATALOG_ORIGIN}{rest}");
    }
    if link.starts_with(CATALOG_ORIGIN) {
        return link.to_string();
    }
    format!("{CATALOG_ORIGIN}{link}")
}

pub(crate) fn search_url(query: &str, page: u32) -> String {
    format!(
        "{CATALOG_ORIGIN}/search?keyword={}&page_id={}",
        urlencoding::encode(query),
        page.max(1)
    )
}
