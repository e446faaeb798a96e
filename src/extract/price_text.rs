use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// Currency-shaped amount: optional `$`, digits with optional thousands
/// separators, optional two-digit fraction.
static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{2}))?").unwrap());

static DOLLAR_AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[\d,]+(?:\.\d{2})?").unwrap());

static DECIMAL_AMOUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d{2}").unwrap());

static CLEAN_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{2})?$").unwrap());

/// True when `text` carries something that reads as a price: a `$` amount or
/// a number with a two-digit fraction. Bare integers ("Qty 3") do not count.
pub fn contains_price(text: &str) -> bool {
    DOLLAR_AMOUNT.is_match(text) || DECIMAL_AMOUNT.is_match(text)
}

/// True when the trimmed text is a currency amount and nothing else.
pub fn is_clean_price(text: &str) -> bool {
    CLEAN_AMOUNT.is_match(text.trim())
}

/// Parses the first currency-shaped amount in `text`.
///
/// Amounts preceded by a minus sign are skipped, so a negative figure never
/// yields a price.
pub fn parse_price(text: &str) -> Option<Decimal> {
    for captures in AMOUNT.captures_iter(text) {
        let whole = captures.get(0)?;
        if is_negated(text, whole.start()) {
            continue;
        }

        let digits = captures.get(1)?.as_str().replace(',', "");
        let amount = match captures.get(2) {
            Some(fraction) => format!("{}.{}", digits, fraction.as_str()),
            None => digits,
        };
        return Decimal::from_str(&amount).ok();
    }
    None
}

fn is_negated(text: &str, start: usize) -> bool {
    let preceding = text[..start].chars().next_back();
    matches!(preceding, Some('-') | Some('\u{2212}'))
}

/// True when `price` is strictly positive and no greater than `ceiling`.
pub fn within_bounds(price: Decimal, ceiling: Decimal) -> bool {
    price > Decimal::ZERO && price <= ceiling
}
