/// Common utility functions.
use crate::cron_field::FieldValue;
use chrono::{DateTime, FixedOffset};

/// Converts string into unsigned number with bounds validation.
///
/// Returns `Err(())` if input isn't a number at all, `Ok(None)` if it's out of bounds.
pub(crate) fn parse_digital_value(input: &str, min: FieldValue, max: FieldValue) -> Result<Option<FieldValue>, ()> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(());
    }

    match input.parse::<u32>() {
        Ok(value) if value >= min as u32 && value <= max as u32 => Ok(Some(value as FieldValue)),
        // Too long to fit, but still a number.
        _ => Ok(None),
    }
}

/// Converts string with mnemonic value representation into its index in `values`.
pub(crate) fn parse_string_value(input: &str, values: &[&str]) -> Option<FieldValue> {
    if input.is_empty() {
        None
    } else {
        values
            .iter()
            .position(|&x| x.eq_ignore_ascii_case(input))
            .map(|i| i as FieldValue)
    }
}

/// Number of days from `first` weekday forward to `day`, both numbered from Sunday = 0.
#[inline]
pub(crate) fn weekday_offset(day: u32, first: u32) -> i64 {
    (day as i64 - first as i64).rem_euclid(7)
}

/// Parses timestamp in RFC 3339 or RFC 2822 (RFC 1123) format.
pub(crate) fn parse_timestamp(input: &str) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_rfc2822(input))
        .ok()
}

/// Serde helpers for optional timestamps bound from configuration.
pub(crate) mod timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, FixedOffset};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse_timestamp(&value)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {value}"))),
        }
    }
}

/// Implements case-insensitive `FromStr`, `Display` and string based serde for unit-only enums.
macro_rules! string_enum {
    ($type_:ty, $expecting:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl std::str::FromStr for $type_ {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($name) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {}: {s}", $expecting))
            }
        }

        impl std::fmt::Display for $type_ {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let name = match self {
                    $(Self::$variant => $name,)+
                };
                write!(f, "{name}")
            }
        }

        impl serde::Serialize for $type_ {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $type_ {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use string_enum;
