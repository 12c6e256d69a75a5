use chrono::{DateTime, Datelike, TimeZone};

/// Human readable posting time relative to `now`.
///
/// Same calendar day gives `Today, HH:mm`, the previous calendar day
/// `Yesterday, HH:mm`, earlier this year `{day} {Month}, HH:mm` and anything
/// older `{year} {Month} {day}`.
pub fn relative_date<Tz: TimeZone>(date: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let time = date.format("%H:%M");
    let month = date.format("%B");
    let day = date.date_naive();
    let today = now.date_naive();

    if day == today {
        return format!("Today, {time}");
    }
    if today.pred_opt() == Some(day) {
        return format!("Yesterday, {time}");
    }
    if day.year() == today.year() {
        return format!("{} {month}, {time}", day.day());
    }
    format!("{} {month} {}", day.year(), day.day())
}

/// Keeps the first `max_words` space separated words, appending ` ...` when
/// anything was cut. Blank input yields an empty string.
pub fn truncate_words(text: &str, max_words: usize) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let words = text.split(' ').collect::<Vec<_>>();
    let mut out = words
        .iter()
        .take(max_words)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > max_words {
        out.push_str(" ...");
    }
    out
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Counter used by the feed header: `1234 -> "1.2k"`, `1000 -> "1.0k"`,
/// `42 -> "42"`.
pub fn format_comment_count(count: u64) -> String {
    if count < 1000 {
        return count.to_string();
    }
    let tenths = (count + 50) / 100;
    format!("{}.{}k", tenths / 10, tenths % 10)
}

/// Counter used next to reaction buttons. Whole thousands drop the decimal
/// (`2000 -> "2k"`), otherwise it behaves like [`format_comment_count`].
pub fn format_compact(count: u64) -> String {
    if count >= 1000 && count % 1000 == 0 {
        return format!("{}k", count / 1000);
    }
    format_comment_count(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn now_is_today() {
        let now = at("2026-10-14T09:05:00Z");
        assert_eq!(relative_date(&now, &now), "Today, 09:05");
    }

    #[test]
    fn previous_calendar_day_is_yesterday() {
        let now = at("2026-10-14T00:10:00Z");
        let date = now - (Duration::hours(24) - Duration::minutes(1));
        assert_eq!(relative_date(&date, &now), "Yesterday, 00:11");
    }

    #[test]
    fn yesterday_across_month_boundary() {
        let now = at("2026-03-01T08:00:00Z");
        let date = at("2026-02-28T23:59:00Z");
        assert_eq!(relative_date(&date, &now), "Yesterday, 23:59");
    }

    #[test]
    fn earlier_this_year_shows_day_and_month() {
        let now = at("2026-10-14T09:05:00Z");
        let date = at("2026-02-03T17:30:00Z");
        assert_eq!(relative_date(&date, &now), "3 February, 17:30");
    }

    #[test]
    fn prior_year_shows_year_month_day() {
        let now = at("2026-01-01T09:05:00Z");
        let date = at("2025-12-30T17:30:00Z");
        assert_eq!(relative_date(&date, &now), "2025 December 30");
    }

    #[test]
    fn truncation_appends_ellipsis_only_when_cut() {
        assert_eq!(truncate_words("one two three", 8), "one two three");
        assert_eq!(
            truncate_words("a b c d e f g h i j", 8),
            "a b c d e f g h ..."
        );
        assert_eq!(truncate_words("   ", 8), "");
    }

    #[test]
    fn word_count_ignores_repeated_whitespace() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("  hello   world \n again "), 3);
    }

    #[test]
    fn comment_counter_switches_to_thousands() {
        assert_eq!(format_comment_count(42), "42");
        assert_eq!(format_comment_count(999), "999");
        assert_eq!(format_comment_count(1000), "1.0k");
        assert_eq!(format_comment_count(1234), "1.2k");
        assert_eq!(format_comment_count(1250), "1.3k");
        assert_eq!(format_comment_count(12_960), "13.0k");
    }

    #[test]
    fn compact_counter_drops_decimal_on_whole_thousands() {
        assert_eq!(format_compact(7), "7");
        assert_eq!(format_compact(2000), "2k");
        assert_eq!(format_compact(2500), "2.5k");
    }
}
