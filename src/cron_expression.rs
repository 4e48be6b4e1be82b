use crate::{
    cron_field::{CronField, CronFieldKind},
    Error, Result,
};
use chrono::{DateTime, Datelike, TimeZone, Timelike};
#[cfg(feature = "tz")]
use chrono_tz::Tz;
use std::{fmt::Display, str::FromStr};

/// Traditional 5-fields cron expression: minutes, hours, days of month, months and days of week.
///
/// For the expression syntax, please refer to the [crate documentation](crate#cron-expressions).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct CronExpression {
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
    #[cfg(feature = "tz")]
    tz: Option<Tz>,
}

impl CronExpression {
    /// Parses and validates provided `expression` and constructs [`CronExpression`] instance.
    ///
    /// Alternative way to construct [`CronExpression`] is to use one of `try_from` or `from_str` methods.
    ///
    /// Returns [`Error`] in a case provided expression is unparsable,
    /// the error points to the invalid field and segment.
    pub fn parse(expression: impl AsRef<str>) -> Result<Self> {
        let expression = expression.as_ref();
        #[allow(unused_mut)]
        let mut elements: Vec<&str> = expression.split_whitespace().collect();
        #[cfg(feature = "tz")]
        let mut tz = None;

        // Parse and define TZ, if present
        #[cfg(feature = "tz")]
        if let Some((key, tz_str)) = elements.first().and_then(|e| e.split_once('=')) {
            if key.eq_ignore_ascii_case("TZ") {
                tz = Some(Tz::from_str(tz_str).map_err(|_| Error::InvalidTimeZone(tz_str.to_owned()))?);
                elements.remove(0);
            }
        }

        if elements.len() != 5 {
            return Err(Error::InvalidCronExpression(expression.to_owned()));
        }

        Ok(Self {
            minute: CronField::parse(CronFieldKind::Minute, elements[0])?,
            hour: CronField::parse(CronFieldKind::Hour, elements[1])?,
            day_of_month: CronField::parse(CronFieldKind::DayOfMonth, elements[2])?,
            month: CronField::parse(CronFieldKind::Month, elements[3])?,
            day_of_week: CronField::parse(CronFieldKind::DayOfWeek, elements[4])?,
            #[cfg(feature = "tz")]
            tz,
        })
    }

    /// Returns `true` if the provided time satisfies the expression (with minute precision).
    ///
    /// If day of month and day of week are both restricted (neither is `*`),
    /// the time should match any of them, otherwise it should match both.
    ///
    /// If `tz` feature is enabled and the expression has a time zone,
    /// `time` is converted into that zone before matching.
    /// Otherwise, the local time of the `time` instance is used.
    pub fn is_satisfied_by<T: TimeZone>(&self, time: &DateTime<T>) -> bool {
        #[cfg(feature = "tz")]
        if let Some(tz) = &self.tz {
            return self.is_satisfied_by_local(&time.with_timezone(tz));
        }

        self.is_satisfied_by_local(time)
    }

    fn is_satisfied_by_local<T: Datelike + Timelike>(&self, time: &T) -> bool {
        if !self.minute.matches(time.minute())
            || !self.hour.matches(time.hour())
            || !self.month.matches(time.month())
        {
            return false;
        }

        let dom = self.day_of_month.matches(time.day());
        let dow = self.day_of_week.matches(time.weekday().num_days_from_sunday());

        if !self.day_of_month.matches_all() && !self.day_of_week.matches_all() {
            dom || dow
        } else {
            dom && dow
        }
    }

    /// Returns all fields in the expression order.
    pub fn fields(&self) -> [&CronField; 5] {
        [
            &self.minute,
            &self.hour,
            &self.day_of_month,
            &self.month,
            &self.day_of_week,
        ]
    }

    /// Returns the expression time zone, if specified.
    #[cfg(feature = "tz")]
    pub fn timezone(&self) -> Option<Tz> {
        self.tz
    }
}

impl From<CronExpression> for String {
    fn from(value: CronExpression) -> Self {
        value.to_string()
    }
}

impl From<&CronExpression> for String {
    fn from(value: &CronExpression) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for CronExpression {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&String> for CronExpression {
    type Error = Error;

    fn try_from(value: &String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for CronExpression {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl FromStr for CronExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Display for CronExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        #[cfg(feature = "tz")]
        if let Some(tz) = self.tz {
            write!(f, "TZ={tz} ")?;
        }

        write!(
            f,
            "{} {} {} {} {}",
            self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}
