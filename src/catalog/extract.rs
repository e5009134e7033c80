use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Quality, ResultPage, StreamOption, TitleRecord, normalize_link};
use crate::error::{Error, Result};

static TILE: Lazy<Selector> = Lazy::new(|| Selector::parse(".video-latest-list").unwrap());
static TILE_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h4").unwrap());
static TILE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static TILE_POSTER: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static MORE_PAGES: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pagination a, .load-more").unwrap());

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());
static VIDEO_SOURCE: Lazy<Selector> = Lazy::new(|| Selector::parse("video source").unwrap());
static ANY_SRC: Lazy<Selector> = Lazy::new(|| Selector::parse("[src]").unwrap());
static SCRIPT_MP4: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https://[^"'\s]+\.mp4"#).unwrap());

pub(crate) fn extract_result_list(html: &str, requested_page: u32) -> Result<ResultPage> {
    let document = Html::parse_document(html);

    let mut tiles = Vec::new();
    let mut skipped = 0usize;
    for node in document.select(&TILE) {
        match tile_record(node) {
            Some(record) => tiles.push(record),
            None => skipped += 1,
        }
    }
    let has_more_pages = document.select(&MORE_PAGES).next().is_some();

    debug!(
        page = requested_page,
        tiles = tiles.len(),
        skipped,
        has_more_pages,
        "parsed result page"
    );

    if tiles.is_empty() {
        return Err(Error::EmptyResult);
    }
    Ok(ResultPage {
        tiles,
        has_more_pages,
    })
}

fn tile_record(node: ElementRef<'_>) -> Option<TitleRecord> {
    let title = node
        .select(&TILE_TITLE)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    let link = node.select(&TILE_LINK).next()?.value().attr("href")?;
    let poster = node.select(&TILE_POSTER).next()?.value().attr("src")?;

    Some(TitleRecord {
        title,
        link: normalize_link(link),
        poster: poster.to_string(),
    })
}

pub(crate) fn extract_stream_options(html: &str) -> Vec<StreamOption> {
    let document = Html::parse_document(html);

    let script_urls: Vec<String> = document
        .select(&SCRIPT)
        .flat_map(|script| {
            let text = script.text().collect::<String>();
            SCRIPT_MP4
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    if !script_urls.is_empty() {
        debug!(count = script_urls.len(), "stream urls found in scripts");
        return dedupe_by_quality(script_urls);
    }

    let source_urls = mp4_sources(&document, &VIDEO_SOURCE);
    if !source_urls.is_empty() {
        debug!(count = source_urls.len(), "stream urls found in video sources");
        return dedupe_by_quality(source_urls);
    }

    let loose_urls = mp4_sources(&document, &ANY_SRC);
    debug!(count = loose_urls.len(), "stream urls found in src attributes");
    dedupe_by_quality(loose_urls)
}

fn mp4_sources(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .filter_map(|node| node.value().attr("src"))
        .filter(|src| src.contains(".mp4"))
        .map(str::to_string)
        .collect()
}

fn dedupe_by_quality(urls: Vec<String>) -> Vec<StreamOption> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter_map(|url| {
            let quality = Quality::classify(&url);
            seen.insert(quality).then_some(StreamOption { quality, url })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(title: &str, href: &str, poster: &str) -> String {
        format!(
            r#"<div class="video-latest-list">
                 <a href="{href}"><img src="{poster}"></a>
                 <h4> {title} </h4>
               </div>"#
        )
    }

    #[test]
    fn result_list_reads_tiles_and_normalizes_links() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            tile("Show 1", "http://www.dubbindo.site/x", "https://img/1.jpg"),
            tile("Show 2", "/y", "https://img/2.jpg"),
        );
        let page = extract_result_list(&html, 1).expect("tiles should parse");
        assert_eq!(page.tiles.len(), 2);
        assert_eq!(page.tiles[0].title, "Show 1");
        assert_eq!(page.tiles[0].link, "https://www.dubbindo.site/x");
        assert_eq!(page.tiles[0].poster, "https://img/1.jpg");
        assert_eq!(page.tiles[1].link, "https://www.dubbindo.site/y");
        assert!(!page.has_more_pages);
    }

    #[test]
    fn result_list_without_tiles_is_empty_result() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert_eq!(extract_result_list(html, 1), Err(Error::EmptyResult));
    }

    #[test]
    fn incomplete_tiles_are_skipped() {
        let html = format!(
            r#"<div class="video-latest-list"><h4>No link</h4><img src="p.jpg"></div>
               <div class="video-latest-list"><a href="/z">x</a><h4>No poster</h4></div>
               {}"#,
            tile("Kept", "/kept", "k.jpg")
        );
        let page = extract_result_list(&html, 3).expect("one tile survives");
        assert_eq!(page.tiles.len(), 1);
        assert_eq!(page.tiles[0].title, "Kept");
    }

    #[test]
    fn only_incomplete_tiles_is_empty_result() {
        let html = r#"<div class="video-latest-list"><h4>No link</h4></div>"#;
        assert_eq!(extract_result_list(html, 1), Err(Error::EmptyResult));
    }

    #[test]
    fn pagination_or_load_more_signals_more_pages() {
        let with_pagination = format!(
            r#"{}<div class="pagination"><a href="?page_id=2">2</a></div>"#,
            tile("A", "/a", "a.jpg")
        );
        let with_load_more = format!(
            r#"{}<button class="load-more">More</button>"#,
            tile("A", "/a", "a.jpg")
        );
        let empty_pagination = format!(
            r#"{}<div class="pagination"></div>"#,
            tile("A", "/a", "a.jpg")
        );
        assert!(extract_result_list(&with_pagination, 1).unwrap().has_more_pages);
        assert!(extract_result_list(&with_load_more, 1).unwrap().has_more_pages);
        assert!(!extract_result_list(&empty_pagination, 1).unwrap().has_more_pages);
    }

    #[test]
    fn duplicate_quality_keeps_first_url() {
        let html = r#"<script>
            var a = "https://cdn.example.com/first_720p.mp4";
            var b = "https://cdn.example.com/second_720p.mp4";
        </script>"#;
        let options = extract_stream_options(html);
        assert_eq!(
            options,
            vec![StreamOption {
                quality: Quality::P720,
                url: "https://cdn.example.com/first_720p.mp4".to_string(),
            }]
        );
    }

    #[test]
    fn script_urls_keep_discovery_order_across_qualities() {
        let html = r#"<script>
            sources = ['https://cdn.example.com/v_480p.mp4', 'https://cdn.example.com/v_1080p.mp4'];
            other = 'https://cdn.example.com/v.mp4';
        </script>"#;
        let qualities: Vec<Quality> = extract_stream_options(html)
            .into_iter()
            .map(|option| option.quality)
            .collect();
        assert_eq!(
            qualities,
            vec![Quality::P480, Quality::P1080, Quality::Unknown]
        );
    }

    #[test]
    fn script_urls_take_precedence_over_video_sources() {
        let html = r#"
            <video><source src="https://cdn.example.com/tag_360p.mp4"></video>
            <script>load("https://cdn.example.com/script_720p.mp4")</script>"#;
        let options = extract_stream_options(html);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].url, "https://cdn.example.com/script_720p.mp4");
    }

    #[test]
    fn video_sources_are_used_when_scripts_have_none() {
        let html = r#"
            <script>console.log("no streams")</script>
            <video>
              <source src="https://cdn.example.com/a_720p.mp4">
              <source src="https://cdn.example.com/a.webm">
            </video>
            <img src="https://cdn.example.com/poster_480p.mp4">"#;
        let options = extract_stream_options(html);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].quality, Quality::P720);
    }

    #[test]
    fn generic_src_attributes_are_the_last_resort() {
        let html = r#"<iframe src="https://cdn.example.com/embed_360p.mp4"></iframe>
                      <img src="https://cdn.example.com/poster.jpg">"#;
        let options = extract_stream_options(html);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].quality, Quality::P360);
    }

    #[test]
    fn no_candidates_is_an_empty_list() {
        assert!(extract_stream_options("<html><body>nothing</body></html>").is_empty());
    }
}
