use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

/// Largest serial the spreadsheet can represent (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

/// Parses a spreadsheet cell holding a date or timestamp.
///
/// Accepted spellings: serial numbers (days since 1899-12-30, the fraction is
/// the time of day), RFC 3339 timestamps, `YYYY-MM-DD[THH:MM[:SS]]`,
/// `YYYY/MM/DD` and Brazilian `dd/mm/yyyy [HH:MM[:SS]]`. A four-digit first
/// component means year-first, anything else is read day-first.
pub fn parse_sheet_date(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(serial) = text.parse::<f64>() {
        return from_serial(serial);
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.with_timezone(&Local).naive_local());
    }

    parse_calendar(text)
}

/// Date of a cell, or `today` when the cell is blank or unreadable.
pub fn normalize_date_at(raw: &str, today: NaiveDate) -> NaiveDate {
    match parse_sheet_date(raw) {
        Some(value) => value.date(),
        None => {
            if !raw.trim().is_empty() {
                warn!("unreadable date cell {raw:?}, using {today}");
            }
            today
        }
    }
}

pub fn to_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn to_iso_timestamp(value: NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Timestamp in the layout the sales team types into the sheet.
pub fn to_sheet_timestamp(value: NaiveDateTime) -> String {
    value.format("%d/%m/%Y %H:%M:%S").to_string()
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc();
    let seconds = ((serial - days) * 86_400.0).round();
    Some(epoch + Duration::days(days as i64) + Duration::seconds(seconds as i64))
}

fn parse_calendar(text: &str) -> Option<NaiveDateTime> {
    let (date_part, time_part) = match text.find(['T', ' ']) {
        Some(idx) => (&text[..idx], Some(text[idx + 1..].trim())),
        None => (text, None),
    };

    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    if parts.len() != 3 {
        return None;
    }

    let (year, month, day) = if parts[0].len() == 4 {
        (parts[0], parts[1], parts[2])
    } else {
        (parts[2], parts[1], parts[0])
    };

    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let date = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?;

    let time = match time_part {
        Some(clock) if !clock.is_empty() => parse_clock(clock)?,
        _ => NaiveTime::from_hms_opt(0, 0, 0)?,
    };

    Some(date.and_time(time))
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let text = text.trim_end_matches('Z');
    let whole = text.split('.').next()?;
    let mut fields = whole.split(':');
    let hour = fields.next()?.trim().parse().ok()?;
    let minute = fields.next().unwrap_or("0").trim().parse().ok()?;
    let second = fields.next().unwrap_or("0").trim().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, second)
}
