use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

// Matches the first price-looking token: grouped thousands with optional cents,
// or a plain integer/decimal. Currency symbols and labels around it are ignored.
static PRICE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").unwrap()
});

/// Converts a raw price string into a canonical decimal value.
///
/// Returns `Decimal::ZERO` when the input is absent, empty, or contains no
/// parseable number. Callers treat zero as "price not found"; this function
/// never fails.
pub fn normalize(raw: Option<&str>) -> Decimal {
    let Some(text) = raw else {
        return Decimal::ZERO;
    };

    let Some(captures) = PRICE_TOKEN.captures(text) else {
        return Decimal::ZERO;
    };

    let token = captures[1].replace(',', "");
    Decimal::from_str(&token).unwrap_or(Decimal::ZERO)
}
