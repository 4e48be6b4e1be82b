use crate::cron_field::CronFieldKind;
use std::fmt::Display;
use thiserror::Error;

/// Crate specific Errors implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
pub enum Error {
    /// Cron expression is empty or has a wrong number of fields.
    #[error("invalid cron expression `{0}`: exactly 5 fields are expected")]
    InvalidCronExpression(String),
    /// One segment of a cron field can't be parsed.
    #[error("invalid {kind} field segment `{segment}`: {reason}")]
    InvalidCronField {
        /// Field the segment belongs to.
        kind: CronFieldKind,
        /// Offending segment as it appears in the expression.
        segment: String,
        /// Why the segment was rejected.
        reason: ParseReason,
    },
    /// Unknown time zone prefix of the cron expression.
    #[cfg(feature = "tz")]
    #[error("invalid time zone: {0}")]
    InvalidTimeZone(String),
    /// Filter settings violate one of the preconditions.
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidSettings {
        /// Dotted path of the invalid property, i.e. `Recurrence.Pattern.DaysOfWeek`.
        parameter: String,
        /// Reason code.
        reason: ValidationReason,
    },
    /// Filter parameters can't be bound to the filter settings.
    #[error("invalid parameters of `{filter}` filter: {message}")]
    InvalidFilterParameters {
        /// Filter name.
        filter: String,
        /// Binding error description.
        message: String,
    },
    /// Feature isn't defined.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),
}

impl Error {
    pub(crate) fn invalid_settings(parameter: impl Into<String>, reason: ValidationReason) -> Self {
        Self::InvalidSettings {
            parameter: parameter.into(),
            reason,
        }
    }

    pub(crate) fn invalid_field(kind: CronFieldKind, segment: &str, reason: ParseReason) -> Self {
        Self::InvalidCronField {
            kind,
            segment: segment.to_owned(),
            reason,
        }
    }

    /// Returns dotted parameter path and reason if this is a settings validation error.
    pub fn validation(&self) -> Option<(&str, ValidationReason)> {
        match self {
            Self::InvalidSettings { parameter, reason } => Some((parameter.as_str(), *reason)),
            _ => None,
        }
    }
}

/// Reason of the cron field parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParseReason {
    /// Segment isn't a number, a name, a range or a wildcard.
    SyntaxError,
    /// Value or step is outside of the field's bounds, or the range is reversed.
    ValueOutOfRange,
    /// Month or weekday name is unknown.
    UnrecognizableValue,
}

impl Display for ParseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SyntaxError => write!(f, "syntax cannot be parsed"),
            Self::ValueOutOfRange => write!(f, "value out of range"),
            Self::UnrecognizableValue => write!(f, "unrecognizable value"),
        }
    }
}

/// Reason of the settings validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationReason {
    /// Mandatory value is absent or empty.
    RequiredParameter,
    /// Value is outside of the accepted range.
    ValueOutOfRange,
    /// Value is known to the configuration but not supported.
    UnrecognizableValue,
    /// Occurrence duration is longer than the recurrence period.
    TimeWindowDurationOutOfRange,
    /// `Start` isn't one of the recurring days.
    StartNotMatched,
}

impl Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::RequiredParameter => "Value cannot be null or empty.",
            Self::ValueOutOfRange => "The value is out of the accepted range.",
            Self::UnrecognizableValue => "The value is unrecognizable.",
            Self::TimeWindowDurationOutOfRange => {
                "Time window duration cannot be longer than how frequently it occurs or be longer than 10 years."
            }
            Self::StartNotMatched => "Start date is not a valid first occurrence.",
        };
        write!(f, "{message}")
    }
}
