use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used in the history file.
pub const HISTORY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One completed workout as recorded in the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub duration_minutes: u32,
    pub calories: u32,
    #[serde(with = "history_time")]
    pub completed_at: NaiveDateTime,
    pub source_session: String,
}

impl SessionRecord {
    pub fn new(
        duration_minutes: u32,
        calories: u32,
        completed_at: NaiveDateTime,
        source_session: impl Into<String>,
    ) -> Self {
        Self {
            duration_minutes,
            calories,
            completed_at,
            source_session: source_session.into(),
        }
    }
}

/// Parse a timestamp in the history file layout.
pub fn parse_history_time(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, HISTORY_TIME_FORMAT)
}

mod history_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::HISTORY_TIME_FORMAT;

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(HISTORY_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, HISTORY_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
