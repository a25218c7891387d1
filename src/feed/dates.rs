use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// RFC 1123 with a numeric zone, after the `Mon, ` prefix: `02 Jan 2006 15:04:05 -0700`
const RFC1123Z_NO_WEEKDAY: &str = "%d %b %Y %H:%M:%S %z";
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
/// RFC 822 without the zone, which is matched separately: `02 Jan 06 15:04`
const RFC822_NO_ZONE: &str = "%d %b %y %H:%M";
/// ISO 8601 in UTC with no offset: `2006-01-02T15:04:05Z`
const ISO8601_UTC: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse an RSS `<pubDate>` into epoch milliseconds.
///
/// Three layouts are tried in order and the first match wins: RFC 1123 with
/// a numeric zone, RFC 822 with a zone abbreviation, then ISO 8601 in UTC.
/// Returns `None` when nothing matches; callers keep the item and store it
/// without a publication date.
pub fn parse_pub_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    parse_rfc1123z(raw)
        .or_else(|| parse_rfc822(raw))
        .or_else(|| parse_iso8601_utc(raw))
        .map(|dt| dt.timestamp_millis())
}

/// The weekday must be a valid name but is not checked against the date.
fn parse_rfc1123z(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw.split_once(", ")?;
    if !WEEKDAYS.contains(&weekday) {
        return None;
    }
    DateTime::parse_from_str(rest, RFC1123Z_NO_WEEKDAY)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_rfc822(raw: &str) -> Option<DateTime<Utc>> {
    let (rest, zone) = raw.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(rest.trim_end(), RFC822_NO_ZONE).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_iso8601_utc(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, ISO8601_UTC)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Offset for an RFC 822 zone abbreviation.
///
/// The North American zones from RFC 822 are mapped to their offsets; any
/// other alphabetic abbreviation is read as UTC. Anything else is not a zone.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours = match zone {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        other
            if (1..=5).contains(&other.len()) && other.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            0
        }
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}
