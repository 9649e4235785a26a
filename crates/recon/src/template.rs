//! Output column templates.
//!
//! A template is literal text with `{token}` placeholders:
//! `{N}` is the N-th input column (1-based), `{lat}` / `{long}` are the
//! row's reconciled coordinate. Anything else renders as an empty string.

use std::sync::OnceLock;

use regex::Regex;

use geonorm_core::canonical::fold_width;
use geonorm_core::trim_cell;

use crate::model::CoordinateResult;

pub const LAT_TOKEN: &str = "lat";
pub const LONG_TOKEN: &str = "long";

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    /// 0-based input column; `None` for `{0}`, which never resolves.
    Column(Option<usize>),
    Lat,
    Long,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    parts: Vec<Part>,
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("static placeholder pattern"))
}

fn parse_token(token: &str) -> Part {
    // Full-width `{１}` counts as a column reference too.
    let folded = fold_width(token);
    if !folded.is_empty() && folded.chars().all(|c| c.is_ascii_digit()) {
        let index = folded.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
        return Part::Column(index);
    }
    match token {
        LAT_TOKEN => Part::Lat,
        LONG_TOKEN => Part::Long,
        _ => Part::Unknown,
    }
}

/// Stringify a degree value the way the output files have always shown it:
/// shortest round-trip form, with at least one decimal place.
pub fn format_degrees(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in placeholder().captures_iter(source) {
            let whole = caps.get(0).expect("capture 0 always exists");
            if whole.start() > last {
                parts.push(Part::Literal(source[last..whole.start()].to_string()));
            }
            parts.push(parse_token(&caps[1]));
            last = whole.end();
        }
        if last < source.len() {
            parts.push(Part::Literal(source[last..].to_string()));
        }
        Self { parts }
    }

    pub fn uses_coordinates(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Lat | Part::Long))
    }

    /// First `{N}` column reference, 0-based.
    pub fn first_column(&self) -> Option<usize> {
        self.parts.iter().find_map(|p| match p {
            Part::Column(index) => Some(*index),
            _ => None,
        })?
    }

    /// Render against one input row and the row's coordinate decision.
    pub fn render(&self, row: &[String], coordinates: &CoordinateResult) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Column(index) => {
                    if let Some(value) = index.and_then(|i| row.get(i)) {
                        out.push_str(trim_cell(value));
                    }
                }
                Part::Lat => {
                    if let Some(lat) = coordinates.lat() {
                        out.push_str(trim_cell(&format_degrees(lat)));
                    }
                }
                Part::Long => {
                    if let Some(lon) = coordinates.lon() {
                        out.push_str(trim_cell(&format_degrees(lon)));
                    }
                }
                Part::Unknown => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, Source};

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn column_references_are_one_based_and_trimmed() {
        let t = Template::parse("{2}/{1}");
        let out = t.render(&row(&["\u{3000}a ", " b"]), &CoordinateResult::empty());
        assert_eq!(out, "b/a");
    }

    #[test]
    fn fullwidth_column_reference_resolves() {
        let t = Template::parse("{２}-{１}");
        assert_eq!(t.first_column(), Some(1));
        assert_eq!(t.render(&row(&["a", "b"]), &CoordinateResult::empty()), "b-a");
    }

    #[test]
    fn out_of_range_column_is_empty() {
        let t = Template::parse("[{5}]");
        assert_eq!(t.render(&row(&["a"]), &CoordinateResult::empty()), "[]");
        let zero = Template::parse("[{0}]");
        assert_eq!(zero.render(&row(&["a"]), &CoordinateResult::empty()), "[]");
    }

    #[test]
    fn coordinate_tokens_resolve() {
        let t = Template::parse("{lat},{long}");
        let result = CoordinateResult::accepted(Coordinate::new(35.6581, 139.7017), Source::Google);
        assert!(t.uses_coordinates());
        assert_eq!(t.render(&[], &result), "35.6581,139.7017");
    }

    #[test]
    fn missing_coordinate_renders_empty() {
        let t = Template::parse("{lat}");
        assert_eq!(t.render(&[], &CoordinateResult::empty()), "");
    }

    #[test]
    fn unknown_tokens_render_empty() {
        let t = Template::parse("x{name}y{}z");
        // `{}` is not a placeholder and stays literal.
        assert_eq!(t.render(&row(&["a"]), &CoordinateResult::empty()), "xy{}z");
    }

    #[test]
    fn literal_template_passes_through() {
        let t = Template::parse("東京都");
        assert!(!t.uses_coordinates());
        assert_eq!(t.first_column(), None);
        assert_eq!(t.render(&[], &CoordinateResult::empty()), "東京都");
    }

    #[test]
    fn first_column_reference() {
        assert_eq!(Template::parse("{lat} {3} {1}").first_column(), Some(2));
    }

    #[test]
    fn whole_degrees_keep_a_decimal() {
        assert_eq!(format_degrees(35.0), "35.0");
        assert_eq!(format_degrees(139.01), "139.01");
    }
}
