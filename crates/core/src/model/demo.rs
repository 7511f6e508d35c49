use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {raw}")]
pub struct UnknownOptionError {
    kind: &'static str,
    raw: String,
}

/// Part of the day the applicant would like the demo in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Flexible,
}

impl FromStr for TimeSlot {
    type Err = UnknownOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "flexible" | "any" => Ok(Self::Flexible),
            _ => Err(UnknownOptionError {
                kind: "time slot",
                raw: s.to_string(),
            }),
        }
    }
}

/// Preferred demo length, in minutes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDuration {
    ThirtyMinutes,
    FortyFiveMinutes,
    SixtyMinutes,
}

impl SessionDuration {
    #[must_use]
    pub fn minutes(self) -> u32 {
        match self {
            Self::ThirtyMinutes => 30,
            Self::FortyFiveMinutes => 45,
            Self::SixtyMinutes => 60,
        }
    }
}

impl FromStr for SessionDuration {
    type Err = UnknownOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches("min").trim_end_matches("minutes").trim();
        match digits {
            "30" => Ok(Self::ThirtyMinutes),
            "45" => Ok(Self::FortyFiveMinutes),
            "60" => Ok(Self::SixtyMinutes),
            _ => Err(UnknownOptionError {
                kind: "session duration",
                raw: s.to_string(),
            }),
        }
    }
}

impl Serialize for SessionDuration {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.minutes())
    }
}
