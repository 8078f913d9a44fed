use chrono::{Datelike, NaiveDate};

const DMY: &str = "%d-%m-%Y";
const FLEXIBLE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y-%m-%d", "%d-%m-%y"];

/// Parses day-month-year, year-month-day and two-digit-year day-month-year dates.
///
/// `/` is accepted as a separator and a trailing time component (`2025-09-08 00:00:00`,
/// `2025-09-08T00:00:00`) is ignored. Two-digit years below 20 land in the 2000s,
/// everything else in the 1900s.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let token = date_token(raw)?;

    let date = FLEXIBLE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&token, fmt).ok())?;
    if has_two_digit_year(&token) {
        expand_short_year(date)
    } else {
        Some(date)
    }
}

/// Strict `DD-MM-YYYY` parsing used for appointment dates.
pub fn parse_dmy(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, DMY)
        .ok()
        .filter(|date| date.year() >= 1000)
}

pub fn format_dmy(date: NaiveDate) -> String {
    date.format(DMY).to_string()
}

fn date_token(raw: &str) -> Option<String> {
    let first = raw.trim().split(['T', ' ']).next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.replace('/', "-"))
}

/// The year is the leading field when it is wider than a day, else the trailing one.
fn has_two_digit_year(token: &str) -> bool {
    let mut fields = token.split('-');
    let first = fields.next().unwrap_or_default();
    let year = if first.len() > 2 {
        first
    } else {
        fields.last().unwrap_or_default()
    };
    year.len() == 2
}

fn expand_short_year(date: NaiveDate) -> Option<NaiveDate> {
    let year = date.year();
    let century = if year >= 20 { 1900 } else { 2000 };
    date.with_year(year + century)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_flexible_accepts_all_layouts() {
        assert_eq!(parse_flexible_date("12-03-1990"), Some(ymd(1990, 3, 12)));
        assert_eq!(parse_flexible_date("1990-03-12"), Some(ymd(1990, 3, 12)));
        assert_eq!(parse_flexible_date("12/03/1990"), Some(ymd(1990, 3, 12)));
        assert_eq!(parse_flexible_date("2025-09-08 00:00:00"), Some(ymd(2025, 9, 8)));
        assert_eq!(parse_flexible_date("2025-09-08T00:00:00"), Some(ymd(2025, 9, 8)));
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse_flexible_date("12-03-90"), Some(ymd(1990, 3, 12)));
        assert_eq!(parse_flexible_date("12-03-20"), Some(ymd(1920, 3, 12)));
        assert_eq!(parse_flexible_date("12-03-19"), Some(ymd(2019, 3, 12)));
        assert_eq!(parse_flexible_date("01-01-05"), Some(ymd(2005, 1, 1)));
    }

    #[test]
    fn test_padded_four_digit_year_is_not_shifted() {
        assert_eq!(parse_flexible_date("12-03-0090"), Some(ymd(90, 3, 12)));
        assert_eq!(parse_flexible_date("0090-03-12"), Some(ymd(90, 3, 12)));
        assert_eq!(parse_flexible_date("12/03/0019"), Some(ymd(19, 3, 12)));
    }

    #[test]
    fn test_flexible_rejects_garbage() {
        assert_eq!(parse_flexible_date(""), None);
        assert_eq!(parse_flexible_date("   "), None);
        assert_eq!(parse_flexible_date("next tuesday"), None);
        assert_eq!(parse_flexible_date("31-02-1990"), None);
    }

    #[test]
    fn test_dmy_is_strict() {
        assert_eq!(parse_dmy(" 08-09-2025 "), Some(ymd(2025, 9, 8)));
        assert_eq!(parse_dmy("2025-09-08"), None);
        assert_eq!(parse_dmy("08/09/2025"), None);
        assert_eq!(parse_dmy("08-09-25"), None);
        assert_eq!(format_dmy(ymd(2025, 9, 8)), "08-09-2025");
    }
}
