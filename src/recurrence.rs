use crate::utils::{string_enum, timestamp};
use chrono::{DateTime, FixedOffset, Weekday};
use serde::{Deserialize, Serialize};

/// Day of the week, numbered from Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DayOfWeek {
    /// Sunday, the default first day of the week.
    #[default]
    Sunday,
    /// Monday.
    Monday,
    /// Tuesday.
    Tuesday,
    /// Wednesday.
    Wednesday,
    /// Thursday.
    Thursday,
    /// Friday.
    Friday,
    /// Saturday.
    Saturday,
}

string_enum!(DayOfWeek, "day of week", {
    Sunday => "Sunday",
    Monday => "Monday",
    Tuesday => "Tuesday",
    Wednesday => "Wednesday",
    Thursday => "Thursday",
    Friday => "Friday",
    Saturday => "Saturday",
});

impl DayOfWeek {
    /// Number of days since Sunday, `0-6`.
    pub fn num_days_from_sunday(self) -> u32 {
        Weekday::from(self).num_days_from_sunday()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(value: Weekday) -> Self {
        match value {
            Weekday::Sun => Self::Sunday,
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
        }
    }
}

impl From<DayOfWeek> for Weekday {
    fn from(value: DayOfWeek) -> Self {
        match value {
            DayOfWeek::Sunday => Self::Sun,
            DayOfWeek::Monday => Self::Mon,
            DayOfWeek::Tuesday => Self::Tue,
            DayOfWeek::Wednesday => Self::Wed,
            DayOfWeek::Thursday => Self::Thu,
            DayOfWeek::Friday => Self::Fri,
            DayOfWeek::Saturday => Self::Sat,
        }
    }
}

/// How often the time window repeats.
///
/// Only `Daily` and `Weekly` patterns can be evaluated,
/// monthly and yearly types are accepted by configuration but rejected by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RecurrencePatternType {
    /// Every `Interval` days.
    #[default]
    Daily,
    /// On `DaysOfWeek` of every `Interval` weeks.
    Weekly,
    /// Legacy: a day of month.
    AbsoluteMonthly,
    /// Legacy: a weekday of month.
    RelativeMonthly,
    /// Legacy: a day of year.
    AbsoluteYearly,
    /// Legacy: a weekday of month of year.
    RelativeYearly,
}

string_enum!(RecurrencePatternType, "recurrence pattern type", {
    Daily => "Daily",
    Weekly => "Weekly",
    AbsoluteMonthly => "AbsoluteMonthly",
    RelativeMonthly => "RelativeMonthly",
    AbsoluteYearly => "AbsoluteYearly",
    RelativeYearly => "RelativeYearly",
});

/// When the recurrence stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RecurrenceRangeType {
    /// Never.
    #[default]
    NoEnd,
    /// No occurrence starts after `EndDate`.
    EndDate,
    /// After `NumberOfOccurrences` occurrences.
    Numbered,
}

string_enum!(RecurrenceRangeType, "recurrence range type", {
    NoEnd => "NoEnd",
    EndDate => "EndDate",
    Numbered => "Numbered",
});

/// Recurrence pattern as it comes from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RecurrencePattern {
    /// Pattern type.
    #[serde(rename = "Type")]
    pub type_: RecurrencePatternType,
    /// Number of days or weeks between occurrences, should be positive.
    pub interval: i32,
    /// Days of the week the window occurs on, required for `Weekly` pattern.
    pub days_of_week: Vec<DayOfWeek>,
    /// First day of the week, Sunday by default.
    pub first_day_of_week: DayOfWeek,
}

impl Default for RecurrencePattern {
    fn default() -> Self {
        Self {
            type_: RecurrencePatternType::Daily,
            interval: 1,
            days_of_week: Vec::new(),
            first_day_of_week: DayOfWeek::Sunday,
        }
    }
}

impl RecurrencePattern {
    /// Daily pattern with the given interval.
    pub fn daily(interval: i32) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Weekly pattern with the given interval and days of the week.
    pub fn weekly(interval: i32, days_of_week: impl IntoIterator<Item = DayOfWeek>) -> Self {
        Self {
            type_: RecurrencePatternType::Weekly,
            interval,
            days_of_week: days_of_week.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Set the first day of the week.
    pub fn with_first_day_of_week(mut self, first_day_of_week: DayOfWeek) -> Self {
        self.first_day_of_week = first_day_of_week;
        self
    }
}

/// Recurrence range as it comes from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RecurrenceRange {
    /// Range type.
    #[serde(rename = "Type")]
    pub type_: RecurrenceRangeType,
    /// Last allowed occurrence start, required for `EndDate` range.
    #[serde(with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<FixedOffset>>,
    /// Number of occurrences, required for `Numbered` range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_occurrences: Option<i32>,
}

impl RecurrenceRange {
    /// Range without end.
    pub fn no_end() -> Self {
        Self::default()
    }

    /// Range up to `end_date`, inclusively.
    pub fn end_date(end_date: DateTime<FixedOffset>) -> Self {
        Self {
            type_: RecurrenceRangeType::EndDate,
            end_date: Some(end_date),
            ..Default::default()
        }
    }

    /// Range of `number_of_occurrences` occurrences.
    pub fn numbered(number_of_occurrences: i32) -> Self {
        Self {
            type_: RecurrenceRangeType::Numbered,
            number_of_occurrences: Some(number_of_occurrences),
            ..Default::default()
        }
    }
}

/// Pair of recurrence pattern and range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Recurrence {
    /// Recurrence pattern, required.
    pub pattern: Option<RecurrencePattern>,
    /// Recurrence range, required.
    pub range: Option<RecurrenceRange>,
}

impl Recurrence {
    /// Constructs recurrence with both parts present.
    pub fn new(pattern: RecurrencePattern, range: RecurrenceRange) -> Self {
        Self {
            pattern: Some(pattern),
            range: Some(range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Sunday", DayOfWeek::Sunday)]
    #[case("monday", DayOfWeek::Monday)]
    #[case("WEDNESDAY", DayOfWeek::Wednesday)]
    #[case("Saturday", DayOfWeek::Saturday)]
    fn test_day_of_week_from_str(#[case] input: &str, #[case] expected: DayOfWeek) {
        assert_eq!(input.parse::<DayOfWeek>().unwrap(), expected);
    }

    #[test]
    fn test_day_of_week_conversion() {
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            let day = DayOfWeek::from(weekday);
            assert_eq!(Weekday::from(day), weekday);
            assert_eq!(day.num_days_from_sunday(), weekday.num_days_from_sunday());
        }
        assert!("Mon".parse::<DayOfWeek>().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let pattern: RecurrencePattern = serde_json::from_str("{}").unwrap();
        assert_eq!(pattern, RecurrencePattern::daily(1));

        let range: RecurrenceRange = serde_json::from_str("{}").unwrap();
        assert_eq!(range, RecurrenceRange::no_end());

        let recurrence: Recurrence = serde_json::from_str("{}").unwrap();
        assert_eq!(recurrence, Recurrence::default());
    }

    #[test]
    fn test_deserialize_recurrence() {
        let recurrence: Recurrence = serde_json::from_value(serde_json::json!({
            "Pattern": {
                "Type": "weekly",
                "Interval": 2,
                "DaysOfWeek": ["Monday", "friday"],
                "FirstDayOfWeek": "Monday"
            },
            "Range": {
                "Type": "EndDate",
                "EndDate": "Sun, 31 Mar 2024 00:00:00 GMT"
            }
        }))
        .unwrap();

        assert_eq!(
            recurrence.pattern,
            Some(
                RecurrencePattern::weekly(2, [DayOfWeek::Monday, DayOfWeek::Friday])
                    .with_first_day_of_week(DayOfWeek::Monday)
            )
        );
        assert_eq!(
            recurrence.range,
            Some(RecurrenceRange::end_date(
                DateTime::parse_from_rfc3339("2024-03-31T00:00:00Z").unwrap()
            ))
        );
    }

    #[rstest]
    #[case(r#"{"Type": "Hourly"}"#)]
    #[case(r#"{"DaysOfWeek": ["Mon"]}"#)]
    #[case(r#"{"Interval": "two"}"#)]
    fn test_deserialize_invalid_pattern(#[case] input: &str) {
        assert!(serde_json::from_str::<RecurrencePattern>(input).is_err(), "input = {input}");
    }

    #[test]
    fn test_serialize_range() {
        let range = RecurrenceRange::numbered(3);
        assert_eq!(
            serde_json::to_value(&range).unwrap(),
            serde_json::json!({"Type": "Numbered", "NumberOfOccurrences": 3})
        );
    }
}
