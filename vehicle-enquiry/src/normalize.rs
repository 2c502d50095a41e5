use chrono::NaiveDate;
use log::debug;
use shared::data::{FieldValue, VehicleRecord};

/// Key suffixes, compared case-insensitively, that mark a field as a date.
const DATE_KEY_SUFFIXES: [&str; 3] = ["date", "expirydate", "duedate"];
const ISO_DATE: &str = "%Y-%m-%d";
const DISPLAY_DATE: &str = "%d/%m/%Y";

/// Rewrites ISO dates in date-like fields to `DD/MM/YYYY`.
///
/// Values that are not strings, or strings that are not ISO dates, are left as
/// they are. The key set and order never change.
#[must_use]
pub fn normalize(mut record: VehicleRecord) -> VehicleRecord {
    for (key, value) in record.values_mut() {
        if !is_date_key(key) {
            continue;
        }
        let FieldValue::Text(text) = value else {
            continue;
        };
        if let Some(display) = reformat_date(text) {
            debug!("Reformatted {key}: {text} -> {display}");
            *text = display;
        }
    }
    record
}

fn is_date_key(key: &str) -> bool {
    let key = key.to_lowercase();
    DATE_KEY_SUFFIXES
        .iter()
        .any(|suffix| key.ends_with(suffix))
}

fn reformat_date(text: &str) -> Option<String> {
    NaiveDate::parse_from_str(text, ISO_DATE)
        .ok()
        .map(|date| date.format(DISPLAY_DATE).to_string())
}
