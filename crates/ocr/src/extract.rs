use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use tillscan_core::{LineGroup, LineItemRecord};
use tracing::{debug, warn};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// ASCII digits with at most one '.', at least one digit.
re!(re_numeric, r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)$");

/// Longest token accepted as a quantity or a line total.
const MAX_AMOUNT_LEN: usize = 5;
/// More numeric tokens than this marks the line as a barcode or code line.
const MAX_NUMERIC_TOKENS: usize = 2;
const MIN_TOKENS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Could not parse {field} from '{token}'")]
    NumericParse { field: &'static str, token: String },
}

/// Whether `token` is digits with at most one decimal point, e.g. `12`,
/// `3.50`, `.5`.
pub fn is_numeric(token: &str) -> bool {
    re_numeric().is_match(token)
}

// ── Public extraction API ─────────────────────────────────────────────────────

/// Reads `item … quantity total` lines.
///
/// This is a heuristic. A line qualifies when it has at least three tokens,
/// its last two tokens are short numbers, and it holds no more than two
/// numbers overall. Oddly formatted items are missed, and a description that
/// happens to end in two short numbers is read as an item.
pub struct FieldExtractor;

impl FieldExtractor {
    /// Extract a record from one line's tokens, or `None` if the line does
    /// not look like an item. A line that qualifies but fails to parse is
    /// logged and skipped.
    pub fn extract<S: AsRef<str>>(tokens: &[S]) -> Option<LineItemRecord> {
        match Self::try_extract(tokens) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping receipt line: {e}");
                None
            }
        }
    }

    /// Like [`extract`](Self::extract) but surfaces parse failures.
    pub fn try_extract<S: AsRef<str>>(tokens: &[S]) -> Result<Option<LineItemRecord>, ExtractError> {
        if !Self::qualifies(tokens) {
            return Ok(None);
        }

        let n = tokens.len();
        let qty_token = tokens[n - 2].as_ref();
        let total_token = tokens[n - 1].as_ref();

        let quantity = qty_token.parse::<u32>().map_err(|_| ExtractError::NumericParse {
            field: "quantity",
            token: qty_token.to_string(),
        })?;
        let total = parse_total(total_token).ok_or_else(|| ExtractError::NumericParse {
            field: "total",
            token: total_token.to_string(),
        })?;
        let item_name = tokens[..n - 2]
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<&str>>()
            .join(" ");

        Ok(Some(LineItemRecord { item_name, quantity, total }))
    }

    /// The qualification rule on its own.
    pub fn qualifies<S: AsRef<str>>(tokens: &[S]) -> bool {
        let n = tokens.len();
        if n < MIN_TOKENS {
            return false;
        }
        let total = tokens[n - 1].as_ref();
        let qty = tokens[n - 2].as_ref();
        if !is_numeric(total) || !is_numeric(qty) {
            return false;
        }

        let numeric_count = tokens.iter().filter(|t| is_numeric(t.as_ref())).count();
        if numeric_count > MAX_NUMERIC_TOKENS {
            return false;
        }

        total.chars().count() <= MAX_AMOUNT_LEN && qty.chars().count() <= MAX_AMOUNT_LEN
    }

    /// Run [`extract`](Self::extract) over each line, keeping the hits in order.
    pub fn extract_all(lines: &[LineGroup]) -> Vec<LineItemRecord> {
        let records: Vec<LineItemRecord> =
            lines.iter().filter_map(|line| Self::extract(&line.tokens())).collect();
        debug!(lines = lines.len(), items = records.len(), "Extracted line items");
        records
    }
}

// ── Amount parsing ────────────────────────────────────────────────────────────

/// Decimal value of a numeric token, keeping its printed scale. Bare leading
/// or trailing points (`.99`, `5.`) are accepted.
fn parse_total(s: &str) -> Option<Decimal> {
    let s = s.strip_suffix('.').unwrap_or(s);
    if let Some(frac) = s.strip_prefix('.') {
        return Decimal::from_str(&format!("0.{frac}")).ok();
    }
    Decimal::from_str(s).ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ── Numeric tokens ────────────────────────────────────────────────────────

    #[test]
    fn numeric_tokens() {
        for t in ["0", "12", "3.50", ".5", "5.", "00012"] {
            assert!(is_numeric(t), "{t}");
        }
        for t in ["", ".", "1.2.3", "-1", "1,50", "$3", "x2", "3.50€", "١٢"] {
            assert!(!is_numeric(t), "{t}");
        }
    }

    // ── Qualifying lines ──────────────────────────────────────────────────────

    #[test]
    fn simple_item_line() {
        let r = FieldExtractor::extract(&["Milk", "2", "3.50"]).unwrap();
        assert_eq!(r.item_name, "Milk");
        assert_eq!(r.quantity, 2);
        assert_eq!(r.total, dec("3.50"));
        assert_eq!(r.total.to_string(), "3.50");
    }

    #[test]
    fn multi_word_item_name_is_space_joined() {
        let r = FieldExtractor::extract(&["Whole", "Milk", "1L", "1", "1.99"]).unwrap();
        assert_eq!(r.item_name, "Whole Milk 1L");
        assert_eq!(r.quantity, 1);
    }

    #[test]
    fn quantity_at_length_limit_accepted() {
        let r = FieldExtractor::extract(&["Widget", "12345", "9.99"]).unwrap();
        assert_eq!(r.quantity, 12345);
        assert_eq!(r.total, dec("9.99"));
    }

    #[test]
    fn bare_point_totals() {
        assert_eq!(FieldExtractor::extract(&["Gum", "1", ".99"]).unwrap().total, dec("0.99"));
        assert_eq!(FieldExtractor::extract(&["Gum", "1", "5."]).unwrap().total, dec("5"));
    }

    #[test]
    fn extraction_is_idempotent() {
        let tokens = ["Bread", "1", "2.25"];
        assert_eq!(FieldExtractor::extract(&tokens), FieldExtractor::extract(&tokens));
    }

    // ── Rejected lines ────────────────────────────────────────────────────────

    #[test]
    fn too_many_numbers_is_a_code_line() {
        assert!(FieldExtractor::extract(&["4", "5", "6", "7"]).is_none());
        assert!(FieldExtractor::extract(&["Item", "7", "2", "3.50"]).is_none());
    }

    #[test]
    fn quantity_over_length_limit_rejected() {
        assert!(FieldExtractor::extract(&["Widget", "123456", "9.99"]).is_none());
    }

    #[test]
    fn total_over_length_limit_rejected() {
        assert!(FieldExtractor::extract(&["Call", "1", "555123"]).is_none());
        assert!(FieldExtractor::extract(&["Total", "1", "123.45"]).is_none());
    }

    #[test]
    fn two_tokens_never_qualify() {
        assert!(FieldExtractor::extract(&["2", "3.50"]).is_none());
        assert!(FieldExtractor::extract(&["Milk", "3.50"]).is_none());
        assert!(FieldExtractor::extract::<&str>(&[]).is_none());
    }

    #[test]
    fn trailing_tokens_must_both_be_numeric() {
        assert!(FieldExtractor::extract(&["Milk", "two", "3.50"]).is_none());
        assert!(FieldExtractor::extract(&["Milk", "2", "3.50A"]).is_none());
    }

    // ── Known heuristic misses, kept as documented behavior ───────────────────

    #[test]
    fn currency_symbols_and_comma_decimals_are_missed() {
        assert!(FieldExtractor::extract(&["Milk", "2", "$3.50"]).is_none());
        assert!(FieldExtractor::extract(&["Milk", "2", "3,50"]).is_none());
        assert!(FieldExtractor::extract(&["Milk", "x2", "3.50"]).is_none());
    }

    #[test]
    fn descriptions_ending_in_two_numbers_read_as_items() {
        let r = FieldExtractor::extract(&["Aisle", "4", "10"]).unwrap();
        assert_eq!(r.item_name, "Aisle");
        assert_eq!(r.quantity, 4);
        assert_eq!(r.total, dec("10"));
    }

    #[test]
    fn fractional_quantity_is_skipped_not_fatal() {
        let tokens = ["Apples", "1.5", "3.00"];
        assert!(FieldExtractor::qualifies(&tokens));
        assert_eq!(
            FieldExtractor::try_extract(&tokens),
            Err(ExtractError::NumericParse { field: "quantity", token: "1.5".into() })
        );
        assert!(FieldExtractor::extract(&tokens).is_none());
    }

    // ── Batch ─────────────────────────────────────────────────────────────────

    #[test]
    fn extract_all_keeps_only_item_lines_in_order() {
        let line = |y: i32, words: &[&str]| {
            let mut g = LineGroup::new(y);
            for (i, w) in words.iter().enumerate() {
                g.push(i as i32 * 50, *w);
            }
            g
        };
        let lines = vec![
            line(10, &["CORNER", "SHOP"]),
            line(40, &["Milk", "2", "3.50"]),
            line(70, &["Apples", "1.5", "3.00"]),
            line(100, &["Bread", "1", "2.25"]),
            line(130, &["4006381", "333931", "12", "7"]),
            line(160, &["TOTAL", "5.75"]),
        ];
        let records = FieldExtractor::extract_all(&lines);
        let names: Vec<&str> = records.iter().map(|r| r.item_name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Bread"]);
    }
}
