use std::cmp::Ordering;

use super::TitleRecord;
use super::title::parse_series_key;

/// Field order is the comparison order; the derived `Ord` is the comparator.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    /// Accent-folded, so "élan" files under e rather than after z.
    series_collation: String,
    series_name: String,
    season: u32,
    episode: u32,
    folded_title: String,
    raw_title: String,
}

impl SortKey {
    fn of(record: &TitleRecord) -> Self {
        let folded_title = record.title.to_lowercase();
        let series = parse_series_key(&folded_title);
        Self {
            series_collation: fold_accents(&series.series_name),
            series_name: series.series_name,
            season: series.season,
            episode: series.episode,
            folded_title,
            raw_title: record.title.clone(),
        }
    }
}

/// Folds the Latin letters the catalog uses onto their base letter. Input is
/// already lowercase.
fn fold_accents(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => folded.push('a'),
            'ç' | 'ć' | 'č' => folded.push('c'),
            'ď' | 'đ' => folded.push('d'),
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => folded.push('e'),
            'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' => folded.push('i'),
            'ł' => folded.push('l'),
            'ñ' | 'ń' | 'ň' => folded.push('n'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => folded.push('o'),
            'ř' => folded.push('r'),
            'ś' | 'š' | 'ş' => folded.push('s'),
            'ť' | 'ţ' => folded.push('t'),
            'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => folded.push('u'),
            'ý' | 'ÿ' => folded.push('y'),
            'ź' | 'ż' | 'ž' => folded.push('z'),
            'ß' => folded.push_str("ss"),
            'æ' => folded.push_str("ae"),
            'œ' => folded.push_str("oe"),
            other => folded.push(other),
        }
    }
    folded
}

pub(crate) fn compare_titles(a: &TitleRecord, b: &TitleRecord) -> Ordering {
    SortKey::of(a).cmp(&SortKey::of(b))
}

pub(crate) fn sort_titles(records: &mut [TitleRecord]) {
    records.sort_by_cached_key(SortKey::of);
    debug_assert!(records.is_sorted_by(|a, b| compare_titles(a, b) != Ordering::Greater));
}
