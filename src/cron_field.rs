use crate::{error::ParseReason, utils, Error, Result};
use std::fmt::Display;

/// Numeric value of a single cron field.
pub type FieldValue = u8;

/// Kind of the cron expression field, in the order of appearance in the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CronFieldKind {
    /// Minutes, `0-59`.
    Minute,
    /// Hours, `0-23`.
    Hour,
    /// Day of month, `1-31`.
    DayOfMonth,
    /// Month, `1-12` or `JAN-DEC`.
    Month,
    /// Day of week, `0-7` or `SUN-SAT`; both `0` and `7` are Sunday.
    DayOfWeek,
}

impl CronFieldKind {
    const DAYS_OF_WEEK: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];

    /// Returns inclusive bounds of the field values.
    pub fn min_max(&self) -> (FieldValue, FieldValue) {
        match self {
            Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (0, 7),
        }
    }

    /// Parses a single value: number or three-letter name.
    fn parse_value(&self, segment: &str, input: &str) -> Result<FieldValue> {
        let (min, max) = self.min_max();
        match utils::parse_digital_value(input, min, max) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => return Err(Error::invalid_field(*self, segment, ParseReason::ValueOutOfRange)),
            Err(()) => {}
        }

        let (names, starter_shift): (&[&str], FieldValue) = match self {
            Self::Month => (Self::MONTHS.as_slice(), 1),
            Self::DayOfWeek => (Self::DAYS_OF_WEEK.as_slice(), 0),
            _ => (&[], 0),
        };

        if names.is_empty() || input.is_empty() || !input.bytes().all(|b| b.is_ascii_alphabetic()) {
            Err(Error::invalid_field(*self, segment, ParseReason::SyntaxError))
        } else if let Some(value) = utils::parse_string_value(input, names) {
            Ok(value + starter_shift)
        } else {
            Err(Error::invalid_field(*self, segment, ParseReason::UnrecognizableValue))
        }
    }

    fn parse_step(&self, segment: &str, input: &str) -> Result<usize> {
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_field(*self, segment, ParseReason::SyntaxError));
        }
        match input.parse::<usize>() {
            Ok(step) if step > 0 => Ok(step),
            _ => Err(Error::invalid_field(*self, segment, ParseReason::ValueOutOfRange)),
        }
    }
}

impl Display for CronFieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day of month",
            Self::Month => "month",
            Self::DayOfWeek => "day of week",
        };
        write!(f, "{name}")
    }
}

/// Parsed cron field: set of values it matches.
///
/// Values are kept in a bitset indexed by `value - min`.
/// For the day of week field both `0` and `7` slots are kept as parsed
/// and are merged at match time, so `SUN`, `0` and `7` are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CronField {
    kind: CronFieldKind,
    bits: u64,
    matches_all: bool,
    content: String,
}

impl CronField {
    /// Parses comma-separated list of values, names, ranges or `*`, each with optional `/step`.
    pub fn parse(kind: CronFieldKind, content: &str) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::invalid_field(kind, content, ParseReason::SyntaxError));
        }

        let mut field = Self {
            kind,
            bits: 0,
            matches_all: false,
            content: content.to_owned(),
        };

        for segment in content.split(',') {
            field.parse_segment(segment)?;
        }

        Ok(field)
    }

    fn parse_segment(&mut self, segment: &str) -> Result<()> {
        let kind = self.kind;
        let (min, max) = kind.min_max();

        let (base, step) = match segment.split_once('/') {
            Some((base, step)) => (base, Some(kind.parse_step(segment, step)?)),
            None => (segment, None),
        };

        let (first, last) = if base == "*" {
            if step.is_none() {
                self.matches_all = true;
            }
            (min, max)
        } else if let Some((first, last)) = base.split_once('-') {
            let first = kind.parse_value(segment, first)?;
            let mut last = kind.parse_value(segment, last)?;
            // `FRI-SUN` is written as `5-0`
            if kind == CronFieldKind::DayOfWeek && last == 0 && first > 0 {
                last = 7;
            }
            if first > last {
                return Err(Error::invalid_field(kind, segment, ParseReason::ValueOutOfRange));
            }
            (first, last)
        } else {
            let value = kind.parse_value(segment, base)?;
            // `a/step` runs up to the field maximum
            if step.is_some() {
                (value, max)
            } else {
                (value, value)
            }
        };

        for value in (first..=last).step_by(step.unwrap_or(1)) {
            self.bits |= 1u64 << (value - min);
        }

        Ok(())
    }

    /// Returns `true` if the value belongs to the field.
    ///
    /// Values outside of the field bounds never match.
    pub fn matches(&self, value: u32) -> bool {
        let (min, max) = self.kind.min_max();
        if value < min as u32 || value > max as u32 {
            return false;
        }
        if self.matches_all {
            return true;
        }

        if self.kind == CronFieldKind::DayOfWeek && (value == 0 || value == 7) {
            self.is_set(0) || self.is_set(7)
        } else {
            self.is_set(value as FieldValue)
        }
    }

    #[inline]
    fn is_set(&self, value: FieldValue) -> bool {
        let (min, _) = self.kind.min_max();
        self.bits & (1u64 << (value - min)) != 0
    }

    /// Kind of the field.
    pub fn kind(&self) -> CronFieldKind {
        self.kind
    }

    /// `true` if the field is a plain wildcard `*`.
    pub fn matches_all(&self) -> bool {
        self.matches_all
    }

    /// Returns all values the field was populated with, in ascending order.
    pub fn values(&self) -> impl Iterator<Item = FieldValue> + '_ {
        let (min, max) = self.kind.min_max();
        (min..=max).filter(|value| self.is_set(*value))
    }
}

impl Display for CronField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}
