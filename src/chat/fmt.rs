use time::OffsetDateTime;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Message date as shown in chat history: "Aug. 08, 2026".
pub fn date(ts: OffsetDateTime) -> String {
    format!("{}. {:02}, {}", MONTHS[ts.month() as usize - 1], ts.day(), ts.year())
}

/// 12-hour clock with minutes left off on the hour: "4 p.m.", "10:30 a.m.",
/// "midnight", "noon".
pub fn clock(ts: OffsetDateTime) -> String {
    let (hour, minute) = (ts.hour(), ts.minute());
    match (hour, minute) {
        (0, 0) => "midnight".to_owned(),
        (12, 0) => "noon".to_owned(),
        _ => {
            let meridiem = if hour < 12 { "a.m." } else { "p.m." };
            let half = match hour % 12 {
                0 => 12,
                h => h,
            };
            if minute == 0 {
                format!("{half} {meridiem}")
            } else {
                format!("{half}:{minute:02} {meridiem}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn date_is_abbreviated_with_padded_day() {
        assert_eq!(date(datetime!(2026-08-08 16:00 UTC)), "Aug. 08, 2026");
        assert_eq!(date(datetime!(2025-12-31 00:00 UTC)), "Dec. 31, 2025");
        assert_eq!(date(datetime!(2026-01-01 09:05 UTC)), "Jan. 01, 2026");
    }

    #[test]
    fn clock_drops_minutes_on_the_hour() {
        assert_eq!(clock(datetime!(2026-08-08 16:00 UTC)), "4 p.m.");
        assert_eq!(clock(datetime!(2026-08-08 01:00 UTC)), "1 a.m.");
    }

    #[test]
    fn clock_keeps_minutes_otherwise() {
        assert_eq!(clock(datetime!(2026-08-08 10:30 UTC)), "10:30 a.m.");
        assert_eq!(clock(datetime!(2026-08-08 13:05 UTC)), "1:05 p.m.");
        assert_eq!(clock(datetime!(2026-08-08 00:45 UTC)), "12:45 a.m.");
        assert_eq!(clock(datetime!(2026-08-08 12:01 UTC)), "12:01 p.m.");
    }

    #[test]
    fn clock_special_cases() {
        assert_eq!(clock(datetime!(2026-08-08 00:00 UTC)), "midnight");
        assert_eq!(clock(datetime!(2026-08-08 12:00 UTC)), "noon");
    }
}
