use once_cell::sync::Lazy;
use regex::Regex;

/// Series identity derived from a title, used only for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeriesKey {
    pub(crate) series_name: String,
    pub(crate) season: u32,
    pub(crate) episode: u32,
}

// Priority order matters: "x season 1 episode 2" must not fall through to the
// bare "episode 2" form, and the trailing-number form catches everything else.
static EPISODIC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(.+?)\s+season\s+(\d+)\s+episode\s+(\d+)",
        r"(?i)(.+?)\s+s(\d+)\s*e\s*(\d+)",
        r"(?i)(.+?)\s+(\d+)x(\d+)",
        r"(?i)(.+?)\s+episode\s+(\d+)",
        r"(?i)(.+?)\s+eps?\s*(\d+)",
        r"(?i)(.+?)\s+part\s+(\d+)",
        r"(.+?)\s+(\d+)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

pub(crate) fn parse_series_key(title: &str) -> SeriesKey {
    for pattern in EPISODIC_PATTERNS.iter() {
        let Some(caps) = pattern.captures(title) else {
            continue;
        };
        let series_name = caps[1].trim().to_string();
        return match (caps.get(2), caps.get(3)) {
            (Some(season), Some(episode)) => SeriesKey {
                series_name,
                season: parse_ordinal(season.as_str()),
                episode: parse_ordinal(episode.as_str()),
            },
            (Some(episode), None) => SeriesKey {
                series_name,
                season: 0,
                episode: parse_ordinal(episode.as_str()),
            },
            _ => SeriesKey {
                series_name,
                season: 0,
                episode: 0,
            },
        };
    }

    SeriesKey {
        series_name: title.trim().to_string(),
        season: 0,
        episode: 0,
    }
}

fn parse_ordinal(raw: &str) -> u32 {
    raw.parse::<u32>().unwrap_or(0)
}
