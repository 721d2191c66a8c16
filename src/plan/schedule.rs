//! Schedule-day values from change logs
//!
//! Clients send `SCHEDULE_DAYS` either as a JSON array (inline or encoded in a
//! string) or as a loose string such as `"135"`. Structured parsing is tried
//! first; otherwise every ASCII digit is taken in order as a day.
//!
//! The parsed list is applied as given. An empty array clears the schedule,
//! and day numbering (0-based or 1-based) is the client's convention.

use serde_json::Value;

/// Why a schedule value was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedule value is not a list of days: {0}")]
    Unparsable(String),
}

/// Parse a schedule-days value into the new day list
pub fn parse_schedule_days(value: &Value) -> Result<Vec<u8>, ScheduleError> {
    match value {
        Value::Array(items) => structured_days(items),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => {
                structured_days(&items).or_else(|_| Ok(digit_days(text)))
            }
            _ => Ok(digit_days(text)),
        },
        Value::Number(n) => Ok(digit_days(&n.to_string())),
        other => Err(ScheduleError::Unparsable(other.to_string())),
    }
}

fn structured_days(items: &[Value]) -> Result<Vec<u8>, ScheduleError> {
    items
        .iter()
        .map(|item| {
            let day = match item {
                Value::Number(n) => n.as_u64().and_then(|d| u8::try_from(d).ok()),
                Value::String(s) => s.trim().parse::<u8>().ok(),
                _ => None,
            };
            day.ok_or_else(|| ScheduleError::Unparsable(item.to_string()))
        })
        .collect()
}

// TODO: drop the digit fallback once product confirms no client still sends "135"-style values
fn digit_days(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| d as u8)
        .collect()
}
