//! Cell parsers for amounts and dates.
//!
//! Both are lenient: they accept the formatting drift seen in bank and
//! ledger exports and return `None` instead of failing. Callers decide what
//! an unparseable cell means (amounts fall back to 0, dates stay invalid).

use chrono::{Duration, NaiveDate};

/// Parse a money cell: currency symbols/codes, thousands separators,
/// decimal commas, `(12.50)` and `12.50-` negatives.
pub fn parse_amount(input: &str) -> Option<f64> {
    let mut body = input.trim();
    if body.is_empty() {
        return None;
    }

    let mut negative = false;
    if body.starts_with('(') && body.ends_with(')') && body.len() >= 2 {
        negative = true;
        body = &body[1..body.len() - 1];
    }
    if let Some(stripped) = body.strip_suffix('-') {
        negative = !negative;
        body = stripped;
    }

    let mut cleaned = String::with_capacity(body.len());
    for c in body.chars() {
        match c {
            '0'..='9' | '.' | ',' => cleaned.push(c),
            // A sign is only meaningful before the first digit ("-$5", "$-5").
            '-' | '\u{2212}' if cleaned.is_empty() => negative = !negative,
            _ => {}
        }
    }

    if !cleaned.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let normalized = normalize_separators(&cleaned);
    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Amount used for scoring and grouping: unparseable cells count as 0.
pub fn amount_or_zero(input: &str) -> f64 {
    parse_amount(input).unwrap_or(0.0)
}

/// Resolve `,` / `.` into a plain `1234.56` form.
fn normalize_separators(s: &str) -> String {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            // Whichever separator comes last is the decimal point.
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            s.chars()
                .filter(|&c| c != thousands)
                .map(|c| if c == decimal { '.' } else { c })
                .collect()
        }
        (None, Some(comma)) => {
            let commas = s.matches(',').count();
            let decimals = s.len() - comma - 1;
            if commas == 1 && decimals != 3 {
                s.replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (Some(_), None) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s.to_string(),
    }
}

/// Formats containing month names, tried against the whole cell.
const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

/// Spreadsheet serial day numbers accepted as dates (1954-10-03 ..= 2119-01-10).
const SERIAL_RANGE: std::ops::RangeInclusive<i64> = 20_000..=80_000;

/// Parse a date cell. Returns `None` for anything unrecognized.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'T') {
        if let Some(date) = NAMED_MONTH_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        {
            return Some(date);
        }
    }

    // Drop a time-of-day suffix ("2024-01-15T10:30:00Z", "01/15/2024 09:00").
    let token = s.split(['T', ' ']).next().unwrap_or(s);

    if token.bytes().all(|b| b.is_ascii_digit()) {
        return parse_digits_only(token);
    }

    parse_numeric_date(token)
}

fn parse_digits_only(token: &str) -> Option<NaiveDate> {
    if token.len() == 8 {
        return NaiveDate::parse_from_str(token, "%Y%m%d").ok();
    }
    let serial: i64 = token.parse().ok()?;
    if !SERIAL_RANGE.contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial))
}

/// `Y-M-D`, `M/D/Y` (day-first when the month field exceeds 12), `D.M.Y`.
fn parse_numeric_date(token: &str) -> Option<NaiveDate> {
    let sep = token.chars().find(|c| !c.is_ascii_digit())?;
    if !matches!(sep, '-' | '/' | '.') {
        return None;
    }
    let parts: Vec<&str> = token.split(sep).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    if parts[0].len() == 4 {
        let y: i32 = parts[0].parse().ok()?;
        let m: u32 = parts[1].parse().ok()?;
        let d: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    let year = match parts[2].len() {
        4 => parts[2].parse::<i32>().ok()?,
        2 => {
            let yy: i32 = parts[2].parse().ok()?;
            if yy < 70 {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        _ => return None,
    };
    let first: u32 = parts[0].parse().ok()?;
    let second: u32 = parts[1].parse().ok()?;

    let day_first = sep == '.' || first > 12;
    let (month, day) = if day_first { (second, first) } else { (first, second) };
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn plain_amounts() {
        assert_eq!(parse_amount("1000"), Some(1000.0));
        assert_eq!(parse_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_amount("-7.25"), Some(-7.25));
    }

    #[test]
    fn currency_and_separators() {
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("EUR 1.234,56"), Some(1234.56));
        assert_eq!(parse_amount("1 234,5 €"), Some(1234.5));
        assert_eq!(parse_amount("1,234"), Some(1234.0));
        assert_eq!(parse_amount("1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_amount("£-40"), Some(-40.0));
    }

    #[test]
    fn accounting_negatives() {
        assert_eq!(parse_amount("(12.50)"), Some(-12.5));
        assert_eq!(parse_amount("12.50-"), Some(-12.5));
        assert_eq!(parse_amount("-$5.00"), Some(-5.0));
    }

    #[test]
    fn unparseable_amounts() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(amount_or_zero("pending"), 0.0);
    }

    #[test]
    fn iso_dates() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024/01/15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("2024-01-15T10:30:00Z"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("20240115"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn slash_dates_month_first_with_fallback() {
        assert_eq!(parse_date("01/02/2024"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date("15/01/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("1/2/24"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_date("01/15/2024 09:00"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn dotted_dates_are_day_first() {
        assert_eq!(parse_date("03.04.2024"), Some(ymd(2024, 4, 3)));
    }

    #[test]
    fn named_month_dates() {
        assert_eq!(parse_date("15-Jan-2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("Jan 15, 2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("15 January 2024"), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn spreadsheet_serial() {
        assert_eq!(parse_date("45306"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_date("12"), None);
    }

    #[test]
    fn invalid_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("13/13/2024"), None);
    }
}
