//! Address canonicalization.
//!
//! A raw address goes through [`PIPELINE`], an ordered list of named text
//! steps. Later steps rely on earlier ones (the hyphen-pair rewrite only
//! sees hyphens after dash unification, unit words only become hyphens
//! after the numerals in front of them were read), so the order is fixed.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::numeral::{kanji_to_number, KANJI_NUMERALS};

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One named canonicalization step.
#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

pub const PIPELINE: &[Step] = &[
    Step { name: "fold_width", apply: fold_width },
    Step { name: "strip_noise", apply: strip_noise },
    Step { name: "collapse_whitespace", apply: collapse_whitespace },
    Step { name: "unify_dashes", apply: unify_dashes },
    Step { name: "unify_block_counter", apply: unify_block_counter },
    Step { name: "arabicize_units", apply: arabicize_units },
    Step { name: "expand_hyphen_pairs", apply: expand_hyphen_pairs },
    Step { name: "strip_trailing_qualifier", apply: strip_trailing_qualifier },
    Step { name: "units_to_hyphens", apply: units_to_hyphens },
    Step { name: "tidy_hyphens", apply: tidy_hyphens },
    Step { name: "ascii_digits", apply: ascii_digits },
];

/// Upper bound on full pipeline passes in [`canonicalize`].
const MAX_PASSES: usize = 4;

/// Run every step once, in order.
pub fn run_pipeline(raw: &str) -> String {
    PIPELINE
        .iter()
        .fold(raw.to_string(), |text, step| (step.apply)(&text))
}

/// Canonical, comparable form of an address.
///
/// The pipeline is re-run until its output is stable, so
/// `canonicalize(canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(raw: &str) -> String {
    let mut current = run_pipeline(raw);
    for _ in 1..MAX_PASSES {
        let next = run_pipeline(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Trim ASCII whitespace and full-width spaces from both ends.
pub fn trim_cell(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\u{3000}')
}

// ---------------------------------------------------------------------------
// Search address
// ---------------------------------------------------------------------------

/// Remove a leading jurisdiction the caller is about to prepend again.
///
/// Checked in priority order: prefecture + city, city alone, prefecture
/// alone. Empty prefixes never match.
pub fn strip_jurisdiction<'a>(address: &'a str, prefecture: &str, city: &str) -> &'a str {
    let combined = format!("{prefecture}{city}");
    for prefix in [combined.as_str(), city, prefecture] {
        if prefix.is_empty() {
            continue;
        }
        if let Some(rest) = address.strip_prefix(prefix) {
            return rest;
        }
    }
    address
}

/// The exact string sent to geocoding providers for one row.
pub fn build_search_address(address: &str, prefecture: &str, city: &str) -> String {
    let core = strip_jurisdiction(address, prefecture, city);
    format!("{prefecture}{city}{core}")
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static address pattern"))
}

const COUNTRY_MARKERS: &[&str] = &["日本国", "日本", "JAPAN", "Japan"];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '、' | ',' | '。' | '.' | '・' | '\u{3000}')
}

/// Step 1: NFKC folds full-width letters, digits and spaces.
pub fn fold_width(s: &str) -> String {
    s.nfkc().collect()
}

/// Step 2: postal codes anywhere, then leading country markers and
/// punctuation.
///
/// A country marker only counts when a separator or postal mark follows
/// it, so 日本橋 survives.
pub fn strip_noise(s: &str) -> String {
    static POSTAL: OnceLock<Regex> = OnceLock::new();
    let without_postal = regex(&POSTAL, r"〒\s*[0-9]{3}[-‐－―ー−]?[0-9]{4}").replace_all(s, "");

    let mut rest: &str = without_postal.trim_start_matches(is_separator);
    'outer: loop {
        for marker in COUNTRY_MARKERS {
            if let Some(after) = rest.strip_prefix(marker) {
                let trimmed = after.trim_start_matches(is_separator);
                if trimmed.len() != after.len() || after.is_empty() {
                    rest = trimmed;
                    continue 'outer;
                }
            }
        }
        break;
    }
    rest.to_string()
}

/// Step 3: drop whitespace. Whitespace right after a digit separates the
/// number from what follows (`1-2-3 渋谷タワー`), so it becomes a hyphen.
pub fn collapse_whitespace(s: &str) -> String {
    static AFTER_DIGIT: OnceLock<Regex> = OnceLock::new();
    static ANY: OnceLock<Regex> = OnceLock::new();
    let marked = regex(&AFTER_DIGIT, r"([0-9])\s+").replace_all(s, "${1}-");
    regex(&ANY, r"\s+").replace_all(&marked, "").into_owned()
}

/// Step 4: every dash glyph becomes `-`. The prolonged sound mark ー only
/// counts as a dash directly after a digit.
pub fn unify_dashes(s: &str) -> String {
    static PROLONGED: OnceLock<Regex> = OnceLock::new();
    let dashed: String = s
        .chars()
        .map(|c| match c {
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
            | '\u{2043}' | '\u{2212}' | '\u{2500}' | '\u{2501}' | '\u{FE63}' | '\u{FF0D}' => '-',
            other => other,
        })
        .collect();
    regex(&PROLONGED, r"([0-9])ー").replace_all(&dashed, "${1}-").into_owned()
}

/// Step 5: 番地 is written as 番.
pub fn unify_block_counter(s: &str) -> String {
    s.replace("番地", "番")
}

/// Step 6: `二十三番` → `23番` for 丁目, 番 and 号.
pub fn arabicize_units(s: &str) -> String {
    static KANJI_UNIT: OnceLock<Regex> = OnceLock::new();
    let re = KANJI_UNIT.get_or_init(|| {
        Regex::new(&format!("([{KANJI_NUMERALS}]+)(丁目|番|号)")).expect("static address pattern")
    });
    re.replace_all(s, |caps: &regex::Captures<'_>| {
        format!("{}{}", kanji_to_number(&caps[1]), &caps[2])
    })
    .into_owned()
}

/// Step 7: `1-2` shorthand means block 1, lot 2.
pub fn expand_hyphen_pairs(s: &str) -> String {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    regex(&PAIR, r"([0-9]+)-([0-9]+)")
        .replace_all(s, "${1}丁目${2}番")
        .into_owned()
}

/// Step 8: drop trailing vicinity, floor, room and Latin-letter
/// qualifiers, repeatedly, with any unit words or hyphens after them.
/// A Latin run only counts when the whole run is at most 10 letters.
pub fn strip_trailing_qualifier(s: &str) -> String {
    static QUALIFIER: OnceLock<Regex> = OnceLock::new();
    static LATIN: OnceLock<Regex> = OnceLock::new();
    let qualifier = regex(
        &QUALIFIER,
        r"(?:付近|先|[0-9]*階|[0-9]+[Ff]|[0-9]*号室|#[0-9]+)(?:-|丁目|番|号)*$",
    );
    let latin = regex(&LATIN, r"(^|[^A-Za-z])[A-Za-z]{1,10}(?:-|丁目|番|号)*$");
    let mut current = s.to_string();
    loop {
        let mut next = qualifier.replace(&current, "").into_owned();
        if next == current {
            next = latin.replace(&current, "${1}").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Step 9: 丁目, 番 and 号 all become `-`.
pub fn units_to_hyphens(s: &str) -> String {
    static UNIT: OnceLock<Regex> = OnceLock::new();
    regex(&UNIT, "丁目|番|号").replace_all(s, "-").into_owned()
}

/// Step 10: one hyphen between parts, none at the end.
pub fn tidy_hyphens(s: &str) -> String {
    static REPEATED: OnceLock<Regex> = OnceLock::new();
    let collapsed = regex(&REPEATED, "-{2,}").replace_all(s, "-");
    collapsed.trim_end_matches('-').to_string()
}

/// Step 11: full-width digits to ASCII.
pub fn ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jinnan_example_ends_with_block_lot_number() {
        let canonical = canonicalize("東京都渋谷区神南一丁目二番三号 ３F");
        assert_eq!(canonical, "東京都渋谷区神南1-2-3");
        let core = strip_jurisdiction(&canonical, "東京都", "渋谷区");
        assert_eq!(core, "神南1-2-3");
        assert!(core.ends_with("1-2-3"));
    }

    #[test]
    fn pipeline_order_is_fixed() {
        let names: Vec<&str> = PIPELINE.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "fold_width",
                "strip_noise",
                "collapse_whitespace",
                "unify_dashes",
                "unify_block_counter",
                "arabicize_units",
                "expand_hyphen_pairs",
                "strip_trailing_qualifier",
                "units_to_hyphens",
                "tidy_hyphens",
                "ascii_digits",
            ]
        );
    }

    #[test]
    fn fold_width_handles_fullwidth_forms() {
        assert_eq!(fold_width("１２３ＡＢ　"), "123AB ");
    }

    #[test]
    fn strip_noise_removes_country_and_postal_code() {
        assert_eq!(strip_noise("日本、〒150-0041 東京都渋谷区"), "東京都渋谷区");
        assert_eq!(strip_noise("〒1500041東京都"), "東京都");
        assert_eq!(strip_noise("Japan, 東京都"), "東京都");
        assert_eq!(strip_noise("、 東京都"), "東京都");
    }

    #[test]
    fn strip_noise_keeps_nihonbashi() {
        assert_eq!(strip_noise("日本橋1-1"), "日本橋1-1");
    }

    #[test]
    fn collapse_whitespace_marks_digit_boundaries() {
        assert_eq!(collapse_whitespace("神南 1-2-3 渋谷タワー"), "神南1-2-3-渋谷タワー");
        assert_eq!(collapse_whitespace("一丁目 二番"), "一丁目二番");
    }

    #[test]
    fn unify_dashes_covers_glyph_variants() {
        assert_eq!(unify_dashes("1‐2―3−4－5"), "1-2-3-4-5");
        assert_eq!(unify_dashes("1ー2"), "1-2");
        assert_eq!(unify_dashes("タワー"), "タワー");
    }

    #[test]
    fn arabicize_units_reads_kanji_before_units() {
        assert_eq!(arabicize_units("一丁目二十三番四号"), "1丁目23番4号");
        assert_eq!(arabicize_units("三田"), "三田");
    }

    #[test]
    fn hyphen_pairs_become_block_and_lot() {
        assert_eq!(expand_hyphen_pairs("12-3"), "12丁目3番");
        assert_eq!(expand_hyphen_pairs("1-2-3"), "1丁目2番-3");
    }

    #[test]
    fn trailing_qualifiers_are_stripped() {
        assert_eq!(strip_trailing_qualifier("1番2号3F"), "1番2号");
        assert_eq!(strip_trailing_qualifier("1番2号10階"), "1番2号");
        assert_eq!(strip_trailing_qualifier("1番2号101号室"), "1番2号");
        assert_eq!(strip_trailing_qualifier("1番2号付近"), "1番2号");
        assert_eq!(strip_trailing_qualifier("1番2号ABC"), "1番2号");
        assert_eq!(strip_trailing_qualifier("1番2号3F付近"), "1番2号");
        assert_eq!(strip_trailing_qualifier("1番2号ABCDEFGHIJ"), "1番2号");
    }

    #[test]
    fn long_latin_runs_are_kept() {
        assert_eq!(strip_trailing_qualifier("1番2号ABCDEFGHIJK"), "1番2号ABCDEFGHIJK");
        assert_eq!(canonicalize("神南1-2-3ABCDEFGHIJKLMNOP"), "神南1-2-3ABCDEFGHIJKLMNOP");
    }

    #[test]
    fn tidy_hyphens_collapses_and_trims() {
        assert_eq!(tidy_hyphens("1--2---3-"), "1-2-3");
    }

    #[test]
    fn hyphenated_input_is_canonical() {
        assert_eq!(canonicalize("神南1-2-3"), "神南1-2-3");
        assert_eq!(canonicalize("神南１－２－３"), "神南1-2-3");
        assert_eq!(canonicalize("神南1丁目2番地3"), "神南1-2-3");
    }

    #[test]
    fn canonicalize_is_idempotent_on_samples() {
        for raw in [
            "東京都渋谷区神南一丁目二番三号 ３F",
            "日本、〒150-0041 東京都渋谷区神南１丁目２−３ 渋谷タワー",
            "大阪府大阪市北区梅田三丁目1番3号 101号室",
            "  京都市中京区 十番地 先",
            "",
        ] {
            let once = canonicalize(raw);
            assert_eq!(canonicalize(&once), once, "input: {raw}");
        }
    }

    #[test]
    fn search_address_avoids_duplicate_jurisdiction() {
        assert_eq!(build_search_address("東京都渋谷区神南1-2-3", "東京都", "渋谷区"), "東京都渋谷区神南1-2-3");
        assert_eq!(build_search_address("渋谷区神南1-2-3", "東京都", "渋谷区"), "東京都渋谷区神南1-2-3");
        assert_eq!(build_search_address("東京都神南1-2-3", "東京都", "渋谷区"), "東京都渋谷区神南1-2-3");
        assert_eq!(build_search_address("神南1-2-3", "東京都", "渋谷区"), "東京都渋谷区神南1-2-3");
    }

    #[test]
    fn trim_cell_handles_fullwidth_space() {
        assert_eq!(trim_cell("\u{3000} 渋谷 \u{3000}"), "渋谷");
    }
}
