use crate::date::{add_days, add_months};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

/// How often a `Notification` repeats once its due reminder has been sent
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecurringPattern {
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidPatternError {
    #[error("Unsupported recurring pattern: `{0}`")]
    Unsupported(String),
    #[error("Next occurrence after {0} is not representable")]
    OutOfRange(i64),
}

impl RecurringPattern {
    /// Calendar aware increment of `timestamp` by one period of this pattern.
    /// `OneTime` does not advance and yields `None`.
    pub fn next_occurrence(&self, timestamp: i64) -> Result<Option<i64>, InvalidPatternError> {
        let next = match self {
            Self::OneTime => return Ok(None),
            Self::Daily => Some(add_days(timestamp, 1)),
            Self::Weekly => Some(add_days(timestamp, 7)),
            Self::Monthly => add_months(timestamp, 1),
            Self::Yearly => add_months(timestamp, 12),
        };
        next.map(Some)
            .ok_or(InvalidPatternError::OutOfRange(timestamp))
    }
}

impl Display for RecurringPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pattern = match self {
            Self::OneTime => "onetime",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        write!(f, "{}", pattern)
    }
}

impl FromStr for RecurringPattern {
    type Err = InvalidPatternError;

    /// An empty pattern is stored for tasks that never repeat and is the same as `onetime`
    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        match pattern {
            "" | "onetime" => Ok(Self::OneTime),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(InvalidPatternError::Unsupported(pattern.to_string())),
        }
    }
}
