use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;

pub fn suffix(num: u32) -> &'static str {
    let s = num.to_string();
    if s.ends_with('1') && !s.ends_with("11") {
        "st"
    } else if s.ends_with('2') && !s.ends_with("12") {
        "nd"
    } else if s.ends_with('3') && !s.ends_with("13") {
        "rd"
    } else {
        "th"
    }
}

pub fn format_rank(rank: u32) -> String {
    format!("{}{}", rank, suffix(rank))
}

/// Countdown as shown to users, e.g. `3h 12m` or `45m`.
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
    match hours > 0 {
        true => format!("{}h {}m", hours, minutes),
        false => format!("{}m", minutes),
    }
}

pub fn format_last_update(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match last {
        None => "Never updated".to_string(),
        Some(last) => {
            let hours = (now - last).num_hours();
            if hours < 1 {
                "Just now".to_string()
            } else if hours < 24 {
                format!("{} hours ago", hours)
            } else {
                format!("{} days ago", hours / 24)
            }
        }
    }
}

/// 1234567 => "1,234,567"
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let chunks = digits
        .chars()
        .rev()
        .chunks(3)
        .into_iter()
        .map(|chunk| chunk.collect::<String>())
        .collect::<Vec<String>>();
    chunks.join(",").chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ordinal_suffixes() {
        let formatted = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101, 111, 112]
            .into_iter()
            .map(format_rank)
            .collect::<Vec<String>>();
        assert_eq!(
            formatted,
            vec!["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st", "111th", "112th"]
        );
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_duration(Duration::minutes(45)), "45m");
        assert_eq!(format_duration(Duration::minutes(192)), "3h 12m");
        assert_eq!(format_duration(Duration::hours(24)), "24h 0m");
        assert_eq!(format_duration(Duration::seconds(-5)), "0m");
    }

    #[test]
    fn last_update_formatting() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(format_last_update(None, now), "Never updated");
        assert_eq!(format_last_update(Some(now - Duration::minutes(20)), now), "Just now");
        assert_eq!(format_last_update(Some(now - Duration::hours(5)), now), "5 hours ago");
        assert_eq!(format_last_update(Some(now - Duration::hours(50)), now), "2 days ago");
    }

    #[test]
    fn thousands_separator() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }
}
