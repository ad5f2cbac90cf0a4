//! Serde helpers for the relay's flat string-valued request bodies.
//!
//! Device clients send every value as a JSON string (`"35.7314"`), while
//! other callers send plain numbers. These helpers accept both.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
    Float(f64),
}

/// Deserializes an `f64` from either a JSON number or a numeric string.
pub fn f64_from_str_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("invalid number: {:?}", s))),
        StringOrNumber::Float(f) => Ok(f),
        StringOrNumber::Int(i) => Ok(i as f64),
    }
}

/// Deserializes an optional `i32`; `null`, missing or blank strings are `None`.
pub fn opt_i32_from_str_or_number<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<StringOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(StringOrNumber::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(StringOrNumber::Str(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid integer: {:?}", s))),
        Some(StringOrNumber::Int(i)) => i32::try_from(i)
            .map(Some)
            .map_err(|_| de::Error::custom("integer out of range")),
        Some(StringOrNumber::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i32)),
        Some(StringOrNumber::Float(f)) => {
            Err(de::Error::custom(format!("expected integer, got {}", f)))
        }
    }
}

/// Deserializes an optional string, mapping blank strings to `None`.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
