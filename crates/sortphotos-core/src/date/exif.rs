use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Timezone offsets beyond this many hours are treated as garbage.
const MAX_OFFSET_HOURS: i64 = 99;

fn is_zone_splitter(c: char) -> bool {
    matches!(c, '+' | '-' | 'Z')
}

/// Parse an EXIF-style timestamp: `YYYY:MM:DD[ HH:MM[:SS[.frac]]][zone]`.
///
/// A missing time of day means noon. A `+HH:MM` / `-HH:MM` suffix is
/// folded into the result so values with different offsets compare on
/// the same scale. Anything malformed, including impossible calendar
/// values, yields `None`.
pub fn parse_exif_date(s: &str) -> Option<NaiveDateTime> {
    let mut elements = s.split_whitespace();
    let date_part = elements.next()?;

    let fields: Vec<&str> = date_part.split(':').collect();
    if fields.len() != 3 || fields[0] <= "0000" || fields.iter().any(|f| f.contains('.')) {
        return None;
    }
    let year: i32 = fields[0].parse().ok()?;
    let month: u32 = fields[1].parse().ok()?;
    let day: u32 = fields[2].parse().ok()?;

    let (mut hour, mut minute, mut second) = (12u32, 0u32, 0u32);
    let mut adjust_minutes: Option<i64> = None;

    if let Some(time_part) = elements.next() {
        let (clock, zone) = match time_part.find(is_zone_splitter) {
            Some(pos) => {
                let sign = time_part[pos..].chars().next()?;
                (&time_part[..pos], Some((sign, &time_part[pos + 1..])))
            }
            None => (time_part, None),
        };

        let clock_fields: Vec<&str> = clock.split(':').collect();
        match clock_fields.as_slice() {
            [h, m, s] => {
                hour = h.parse().ok()?;
                minute = m.parse().ok()?;
                second = s.split('.').next()?.parse().ok()?;
            }
            [h, m] => {
                hour = h.parse().ok()?;
                minute = m.parse().ok()?;
            }
            _ => {}
        }

        if let Some((sign, rest)) = zone {
            let segment = rest.split(is_zone_splitter).next().unwrap_or("");
            if let [h, m] = segment.split(':').collect::<Vec<_>>().as_slice() {
                let zone_hours: i64 = h.parse().ok()?;
                let zone_minutes: i64 = m.parse().ok()?;
                if zone_hours.abs() > MAX_OFFSET_HOURS || zone_minutes.abs() > 59 {
                    return None;
                }
                let offset = zone_hours * 60 + zone_minutes;
                // Local time east of UTC is ahead, so subtract to normalize.
                adjust_minutes = Some(if sign == '+' { -offset } else { offset });
            }
        }
    }

    if !(1..=9999).contains(&year) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    match adjust_minutes {
        Some(minutes) => date.checked_add_signed(Duration::minutes(minutes)),
        None => Some(date),
    }
}
