// Utility helpers for lenient parsing and display formatting.
//
// User-supplied CSVs are expected to be imperfect, so nothing in here
// returns an error: bad input becomes `None` or zero and the caller decides.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Text cell to option: empty means absent.
pub fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Keep a value only if it reads as a decimal number.
pub fn numeric_or_none(s: &str) -> Option<String> {
    parse_f64_safe(Some(s)).map(|_| s.to_string())
}

pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?;
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?;
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Strip a leading `£` and surrounding whitespace; anything unreadable is 0.
pub fn parse_price(price: &str) -> f64 {
    let trimmed = price.trim();
    let trimmed = trimmed.strip_prefix('£').unwrap_or(trimmed).trim();
    parse_f64_safe(Some(trimmed)).unwrap_or(0.0)
}

/// Canonical currency form: always `£`-prefixed.
pub fn normalize_price(price: &str) -> String {
    if price.starts_with('£') {
        price.to_string()
    } else {
        format!("£{}", price)
    }
}

/// `Yes` in any case, ignoring surrounding whitespace.
pub fn parse_yes(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case("yes")
}

pub fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

pub fn parse_date_safe(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Combine `dd/MM/yyyy` and `HH:mm` into one comparable instant.
pub fn parse_date_time_safe(date: &str, time: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{} {}", date.trim(), time.trim()), DATE_TIME_FORMAT).ok()
}

pub fn format_money(n: f64) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.2}", n.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let body = format!("£{}.{}", int_val.to_formatted_string(&Locale::en), frac_part);
    if neg {
        format!("-{}", body)
    } else {
        body
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_parsing_is_lenient() {
        assert_eq!(parse_price("£12.85"), 12.85);
        assert_eq!(parse_price(" £ 3.50 "), 3.5);
        assert_eq!(parse_price("7"), 7.0);
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("free"), 0.0);
        assert_eq!(parse_price("NaN"), 0.0);
    }

    #[test]
    fn normalize_price_prefixes_once() {
        assert_eq!(normalize_price("12.85"), "£12.85");
        assert_eq!(normalize_price("£12.85"), "£12.85");
    }

    #[test]
    fn numeric_values_survive_only_when_parseable() {
        assert_eq!(numeric_or_none("120"), Some("120".to_string()));
        assert_eq!(numeric_or_none("4.50"), Some("4.50".to_string()));
        assert_eq!(numeric_or_none(""), None);
        assert_eq!(numeric_or_none("lots"), None);
    }

    #[test]
    fn yes_is_case_insensitive_and_trimmed() {
        assert!(parse_yes("yes"));
        assert!(parse_yes(" YES "));
        assert!(!parse_yes("Y"));
        assert!(!parse_yes(""));
    }

    #[test]
    fn date_time_combines_both_parts() {
        let a = parse_date_time_safe("17/06/2025", "15:40").unwrap();
        let b = parse_date_time_safe("17/06/2025", "09:00").unwrap();
        assert!(a > b);
        assert!(parse_date_time_safe("Unknown", "00:00").is_none());
    }

    #[test]
    fn money_formatting_groups_thousands() {
        assert_eq!(format_money(1234.5), "£1,234.50");
        assert_eq!(format_money(-3.0), "-£3.00");
        assert_eq!(format_money(0.0), "£0.00");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
