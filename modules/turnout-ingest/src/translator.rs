//! Raw BSD event → CanonicalEventRecord.
//!
//! All tolerance for the API's loose typing lives here. Missing or malformed
//! fields fall back to sentinels. A record is rejected only when it has no
//! identifier to reconcile on, or when its start time or timezone is present
//! but unusable.

use chrono::{LocalResult, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, warn};

use turnout_common::{CanonicalEventRecord, RawEventRecord, StartTime, TranslationError};

use crate::markup::strip_markup;
use crate::timeparse::parse_start_time;

pub const SITE: &str = "berniesanders.com";
pub const LANG: &str = "en";
pub const EVENT_URL_BASE: &str =
    "https://go.berniesanders.com/page/event/detail/volunteeractivityormeetings/";

/// Upstream key → canonical key. Everything else keeps its name.
const KEY_RENAMES: &[(&str, &str)] = &[("event_id", "original_id"), ("start_dt", "start_time")];

/// `venue_address{n}` ← `venue_addr{n}`.
const ADDRESS_FIELDS: [(&str, &str); 3] = [
    ("venue_address1", "venue_addr1"),
    ("venue_address2", "venue_addr2"),
    ("venue_address3", "venue_addr3"),
];

/// Date the timezone abbreviation is resolved at, so every event from a zone
/// reports the same name regardless of when it happens.
const ZONE_REFERENCE_DATE: (i32, u32, u32) = (2009, 9, 1);

pub fn translate(raw: &RawEventRecord) -> Result<CanonicalEventRecord, TranslationError> {
    let fields = remap_keys(raw);
    let event_id = string_field(&fields, "original_id");
    if event_id.trim().is_empty() {
        return Err(TranslationError::MissingEventId);
    }

    let start_time = start_time_field(&fields)?;
    let event_date = start_time
        .map(|start| start.date().format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let event_id_obfuscated = string_field(&fields, "event_id_obfuscated");
    let url = format!("{EVENT_URL_BASE}{event_id_obfuscated}");

    let description = match fields.get("description") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(html)) => strip_markup(html),
        Some(other) => strip_markup(&other.to_string()),
    };

    let timezone = if is_truthy(fields.get("start_tz")) {
        zone_abbreviation(&string_field(&fields, "start_tz"))?
    } else {
        String::new()
    };

    let [venue_address1, venue_address2, venue_address3] =
        ADDRESS_FIELDS.map(|(_, source)| string_field(&fields, source));

    let record = CanonicalEventRecord {
        capacity: count_field(&fields, "capacity", &event_id),
        attendee_count: count_field(&fields, "attendee_count", &event_id),
        event_id,
        event_id_obfuscated,
        url,
        name: string_field(&fields, "name"),
        // Mirrors event_date so consumers reading either key see the local date.
        date: event_date.clone(),
        event_date,
        start_time,
        timezone,
        description,
        event_type_name: string_field(&fields, "event_type_name"),
        latitude: float_field(&fields, "latitude"),
        longitude: float_field(&fields, "longitude"),
        is_official: matches!(fields.get("is_official"), Some(Value::String(s)) if s == "1"),
        site: SITE.to_string(),
        lang: LANG.to_string(),
        venue_name: string_field(&fields, "venue_name"),
        venue_address1,
        venue_address2,
        venue_address3,
        venue_city: string_field(&fields, "venue_city"),
        venue_state: string_field(&fields, "venue_state_cd"),
        venue_zip: string_field(&fields, "venue_zip"),
        uuid: None,
        timestamp_creation: None,
    };

    debug!(event_id = record.event_id.as_str(), "Translated event");
    Ok(record)
}

/// Apply [`KEY_RENAMES`]. When a record carries both the alternate and the
/// canonical key, the canonical one wins.
fn remap_keys(raw: &RawEventRecord) -> RawEventRecord {
    let mut out = RawEventRecord::new();
    for (key, value) in raw {
        let target = KEY_RENAMES
            .iter()
            .find(|(from, _)| *from == key.as_str())
            .map(|(_, to)| *to)
            .unwrap_or(key.as_str());

        if target != key && raw.contains_key(target) {
            continue;
        }
        out.insert(target.to_string(), value.clone());
    }
    out
}

fn string_field(fields: &RawEventRecord, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Non-negative integer from a number or numeric string. Anything else is 0.
fn count_field(fields: &RawEventRecord, key: &str, event_id: &str) -> u32 {
    let parsed = match fields.get(key) {
        None | Some(Value::Null) => return 0,
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().and_then(whole_number)),
        Some(Value::String(s)) if s.trim().is_empty() => return 0,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
        }
        Some(_) => None,
    };

    match parsed.and_then(|n| u32::try_from(n).ok()) {
        Some(n) => n,
        None => {
            warn!(event_id, field = key, value = ?fields.get(key), "Unusable count, defaulting to 0");
            0
        }
    }
}

fn whole_number(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
}

fn float_field(fields: &RawEventRecord, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn start_time_field(fields: &RawEventRecord) -> Result<Option<StartTime>, TranslationError> {
    match fields.get("start_time") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_start_time(s)
            .map(Some)
            .ok_or_else(|| TranslationError::InvalidStartTime(s.clone())),
        Some(other) => Err(TranslationError::InvalidStartTime(other.to_string())),
    }
}

/// Abbreviation (e.g. `EDT`) of `zone` at the reference date. The local
/// reference time must map to exactly one instant.
fn zone_abbreviation(zone: &str) -> Result<String, TranslationError> {
    let unknown = || TranslationError::UnknownTimezone(zone.to_string());

    let tz: Tz = zone.trim().parse().map_err(|_| unknown())?;
    let (y, m, d) = ZONE_REFERENCE_DATE;
    let reference = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(unknown)?;

    match tz.from_local_datetime(&reference) {
        LocalResult::Single(local) => Ok(local.format("%Z").to_string()),
        _ => Err(unknown()),
    }
}
