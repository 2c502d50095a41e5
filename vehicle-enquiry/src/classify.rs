use serde_json::Value;

use crate::error::RegistryError;

/// Maps an unsuccessful response to a [`RegistryError`].
///
/// Never fails: bodies that are not JSON, or not the expected shape, fall back
/// to the raw text.
#[must_use]
pub fn classify(status: u16, body: &[u8]) -> RegistryError {
    match status {
        400 => classify_bad_request(body),
        401 => RegistryError::Authentication,
        429 => RegistryError::RateLimit,
        _ => RegistryError::Http {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

/// Error bodies are not guaranteed to follow the documented
/// `{"errors": [{"title", "code", "detail"}]}` shape, so each part is picked out
/// on its own and anything of an unexpected type is ignored.
fn classify_bad_request(body: &[u8]) -> RegistryError {
    let raw = || String::from_utf8_lossy(body).into_owned();
    let Ok(parsed) = serde_json::from_slice::<Value>(body) else {
        return RegistryError::validation(raw());
    };

    let first = parsed
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first());
    if let Some(first) = first {
        let title = text_field(first, "title");
        let message = text_field(first, "detail")
            .or_else(|| title.clone())
            .unwrap_or_else(raw);
        return RegistryError::Validation {
            message,
            code: code_field(first),
            title,
        };
    }

    let message = text_field(&parsed, "message").unwrap_or_else(raw);
    RegistryError::validation(message)
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Codes are documented as strings but numeric ones are accepted too.
fn code_field(entry: &Value) -> Option<String> {
    match entry.get("code")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}
