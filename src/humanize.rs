//! Human-readable duration formatting and parsing utilities

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid duration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    #[error("Duration too large: {0}")]
    Overflow(String),
}

const UNITS: &[(&str, u64)] = &[
    ("w", 7 * 24 * 60 * 60),
    ("d", 24 * 60 * 60),
    ("h", 60 * 60),
    ("m", 60),
    ("s", 1),
];

/// Whole-second duration with human-readable parsing ("90s", "15m", "7d")
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub u64);

impl HumanDuration {
    pub fn from_days(days: u64) -> Self {
        HumanDuration(days * 24 * 60 * 60)
    }

    pub fn from_hours(hours: u64) -> Self {
        HumanDuration(hours * 60 * 60)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_std(&self) -> Duration {
        Duration::from_secs(self.0)
    }

    pub fn as_time_delta(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_seconds(self.0.min(i64::MAX as u64) as i64)
            .unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Largest unit that divides the value evenly
    pub fn to_human_readable(&self) -> String {
        if self.0 == 0 {
            return "0s".to_string();
        }
        for &(unit, secs) in UNITS {
            if self.0 % secs == 0 {
                return format!("{}{}", self.0 / secs, unit);
            }
        }
        format!("{}s", self.0)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct HumanDurationVisitor;

        impl<'de> serde::de::Visitor<'de> for HumanDurationVisitor {
            type Value = HumanDuration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as string (e.g., \"15m\", \"7d\") or seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(HumanDuration(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(HumanDuration)
                    .map_err(|_| E::custom(format!("negative duration: {v}")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<HumanDuration>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(HumanDurationVisitor)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_human_readable())
    }
}

impl FromStr for HumanDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();

        // Plain number means seconds
        if let Ok(num) = s.parse::<u64>() {
            return Ok(HumanDuration(num));
        }

        let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
            Some(pos) if pos > 0 => (&s[..pos], &s[pos..]),
            _ => return Err(ParseError::InvalidFormat(s.to_string())),
        };

        let num: u64 = num_str.parse()?;

        let multiplier = match unit.trim() {
            "s" | "sec" | "secs" | "second" | "seconds" => 1,
            "m" | "min" | "mins" | "minute" | "minutes" => 60,
            "h" | "hr" | "hrs" | "hour" | "hours" => 60 * 60,
            "d" | "day" | "days" => 24 * 60 * 60,
            "w" | "week" | "weeks" => 7 * 24 * 60 * 60,
            _ => return Err(ParseError::InvalidUnit(unit.to_string())),
        };

        num.checked_mul(multiplier)
            .map(HumanDuration)
            .ok_or_else(|| ParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!("90".parse::<HumanDuration>().unwrap().as_secs(), 90);
        assert_eq!("90s".parse::<HumanDuration>().unwrap().as_secs(), 90);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("15m".parse::<HumanDuration>().unwrap().as_secs(), 15 * 60);
        assert_eq!("1h".parse::<HumanDuration>().unwrap().as_secs(), 3600);
        assert_eq!("7d".parse::<HumanDuration>().unwrap(), HumanDuration::from_days(7));
        assert_eq!("2 weeks".parse::<HumanDuration>().unwrap(), HumanDuration::from_days(14));
        assert_eq!("1H".parse::<HumanDuration>().unwrap(), HumanDuration::from_hours(1));
    }

    #[test]
    fn test_parse_singular_and_plural_unit_names() {
        for (raw, secs) in [
            ("1 second", 1),
            ("30 seconds", 30),
            ("1 minute", 60),
            ("5 minutes", 300),
            ("1 hour", 3600),
            ("2 hours", 7200),
            ("1 day", 86_400),
            ("1 week", 604_800),
        ] {
            assert_eq!(raw.parse::<HumanDuration>().unwrap().as_secs(), secs, "{raw}");
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("".parse::<HumanDuration>(), Err(ParseError::InvalidFormat(_))));
        assert!(matches!("d".parse::<HumanDuration>(), Err(ParseError::InvalidFormat(_))));
        assert!(matches!("5y".parse::<HumanDuration>(), Err(ParseError::InvalidUnit(_))));
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(HumanDuration::from_days(7).to_human_readable(), "1w");
        assert_eq!(HumanDuration::from_days(3).to_human_readable(), "3d");
        assert_eq!(HumanDuration(90).to_human_readable(), "90s");
        assert_eq!(HumanDuration(0).to_human_readable(), "0s");
    }

    #[test]
    fn test_deserialize_string_and_number() {
        #[derive(Deserialize)]
        struct TestStruct {
            ttl: HumanDuration,
        }
        let parsed: TestStruct = serde_json::from_str(r#"{"ttl": "7d"}"#).unwrap();
        assert_eq!(parsed.ttl, HumanDuration::from_days(7));

        let parsed: TestStruct = serde_json::from_str(r#"{"ttl": 3600}"#).unwrap();
        assert_eq!(parsed.ttl, HumanDuration::from_hours(1));
    }

    #[test]
    fn test_time_delta_conversion() {
        assert_eq!(HumanDuration::from_days(7).as_time_delta(), chrono::TimeDelta::days(7));
        assert_eq!(HumanDuration(5).as_std(), Duration::from_secs(5));
    }
}
