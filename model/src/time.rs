use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

/// Interpret a naive timestamp as UTC.
pub fn as_utc(value: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&value)
}

/// Render an instant as ISO-8601 with microsecond precision and a `Z` suffix.
pub fn iso_utc(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Parse the gateway's timestamp variants.
///
/// Accepts ISO-8601 with variable fractional precision, a trailing `Z`,
/// offsets without a colon (`+0000`), bare naive datetimes (assumed UTC)
/// and bare dates (midnight UTC). Unparseable input is `None`, never an
/// error: upstream rows with broken timestamps are skipped, not fatal.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let candidate = normalize_iso(text);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&candidate) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(&candidate, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(as_utc(parsed));
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(&candidate, "%Y-%m-%d") {
        return parsed.and_hms_opt(0, 0, 0).map(as_utc);
    }
    None
}

/// Parse a timestamp from a loosely-typed JSON value.
///
/// Numbers are epoch seconds, or epoch milliseconds when larger than 1e12.
pub fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp(text),
        Value::Number(number) => {
            let raw = number
                .as_i64()
                .and_then(Decimal::from_i64)
                .or_else(|| number.as_f64().and_then(Decimal::from_f64))?;
            let millis = if raw > dec!(1_000_000_000_000) {
                raw
            } else {
                raw.checked_mul(dec!(1000))?
            };
            DateTime::<Utc>::from_timestamp_millis(millis.to_i64()?)
        }
        _ => None,
    }
}

/// Normalize gateway timestamp variants into a form chrono accepts.
///
/// Handles the trailing `Z` and `+HHMM` offsets without a colon; variable
/// fractional precision is already accepted by the RFC 3339 parser.
fn normalize_iso(raw: &str) -> String {
    let text = match raw.strip_suffix('Z') {
        Some(stripped) => format!("{stripped}+00:00"),
        None => raw.to_string(),
    };

    if text.len() > 10 {
        let split = text.len().saturating_sub(5);
        if let (Some(head), Some(offset)) = (text.get(..split), text.get(split..)) {
            let mut tail = offset.chars();
            let sign = tail.next();
            if matches!(sign, Some('+') | Some('-')) && tail.all(|c| c.is_ascii_digit()) {
                let minute_split = offset.len().saturating_sub(2);
                if let (Some(hours), Some(minutes)) =
                    (offset.get(..minute_split), offset.get(minute_split..))
                {
                    return format!("{head}{hours}:{minutes}");
                }
            }
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn expected_instant() -> DateTime<Utc> {
        as_utc(
            NaiveDate::from_ymd_opt(2026, 2, 5)
                .unwrap()
                .and_hms_micro_opt(19, 49, 57, 221_850)
                .unwrap(),
        )
    }

    #[test]
    fn parse_timestamp_supports_variable_fraction_precision() {
        let parsed = parse_timestamp("2026-02-05T19:49:57.22185+00:00").unwrap();
        assert_eq!(parsed, expected_instant());
    }

    #[test]
    fn parse_timestamp_supports_utc_z_suffix() {
        let parsed = parse_timestamp("2026-02-05T19:49:57.22185Z").unwrap();
        assert_eq!(parsed, expected_instant());
    }

    #[test]
    fn parse_timestamp_supports_offsets_without_colon() {
        let parsed = parse_timestamp("2026-02-05T19:49:57.22185+0000").unwrap();
        assert_eq!(parsed, expected_instant());
    }

    #[test]
    fn parse_timestamp_assumes_utc_for_naive_input() {
        let parsed = parse_timestamp("2026-02-05T19:49:57").unwrap();
        assert_eq!(iso_utc(parsed), "2026-02-05T19:49:57.000000Z");
    }

    #[test]
    fn parse_timestamp_accepts_bare_dates_at_midnight() {
        let parsed = parse_timestamp("2026-02-05").unwrap();
        assert_eq!(iso_utc(parsed), "2026-02-05T00:00:00.000000Z");
    }

    #[test]
    fn parse_timestamp_fails_soft_on_garbage() {
        assert_eq!(parse_timestamp("not a timestamp"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
    }

    #[test]
    fn parse_timestamp_value_accepts_epoch_seconds_and_millis() {
        let seconds = parse_timestamp_value(&json!(1_760_000_000_i64)).unwrap();
        let millis = parse_timestamp_value(&json!(1_760_000_000_000_i64)).unwrap();
        assert_eq!(seconds, millis);
    }

    #[test]
    fn parse_timestamp_value_rejects_non_temporal_shapes() {
        assert_eq!(parse_timestamp_value(&json!(null)), None);
        assert_eq!(parse_timestamp_value(&json!({"at": 1})), None);
    }

    #[test]
    fn iso_round_trip_is_identity_for_accepted_variants() {
        for raw in [
            "2026-02-05T19:49:57.22185+00:00",
            "2026-02-05T19:49:57.22185Z",
            "2026-02-05T19:49:57.22185+0000",
            "2026-02-05T19:49:57Z",
        ] {
            let parsed = parse_timestamp(raw).unwrap();
            let reparsed = parse_timestamp(&iso_utc(parsed)).unwrap();
            assert_eq!(parsed, reparsed, "round trip drifted for {raw}");
        }
    }
}
