//! Recurrence settings validation.
//!
//! Each check either passes or returns [`Error::InvalidSettings`] with the dotted path
//! of the offending property and the reason; checks are chained and stop at the first failure.

use crate::{
    error::ValidationReason,
    recurrence::{DayOfWeek, RecurrencePattern, RecurrencePatternType, RecurrenceRange, RecurrenceRangeType},
    time_window::TimeWindowFilterSettings,
    utils::weekday_offset,
    Error, Result,
};
use chrono::{DateTime, Datelike, FixedOffset, TimeDelta};

pub(crate) const DAYS_PER_WEEK: i64 = 7;
const TEN_YEARS_IN_DAYS: i64 = 3650;

const START: &str = "Start";
const END: &str = "End";
const PATTERN: &str = "Recurrence.Pattern";
const PATTERN_TYPE: &str = "Recurrence.Pattern.Type";
const INTERVAL: &str = "Recurrence.Pattern.Interval";
const DAYS_OF_WEEK: &str = "Recurrence.Pattern.DaysOfWeek";
const RANGE: &str = "Recurrence.Range";
const END_DATE: &str = "Recurrence.Range.EndDate";
const NUMBER_OF_OCCURRENCES: &str = "Recurrence.Range.NumberOfOccurrences";

/// Recurring time window which passed validation and is ready for evaluation.
///
/// Constructed by [`validate_settings`] or [`RecurringWindow::try_from`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurringWindow {
    pub(crate) start: DateTime<FixedOffset>,
    pub(crate) duration: TimeDelta,
    pub(crate) cadence: Cadence,
    pub(crate) end: RecurrenceEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Cadence {
    Daily {
        interval: i64,
    },
    Weekly {
        interval: i64,
        // sorted by offset from the first day of week, unique
        days: Vec<DayOfWeek>,
        first_day_of_week: DayOfWeek,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RecurrenceEnd {
    NoEnd,
    EndDate(DateTime<FixedOffset>),
    Numbered(i64),
}

impl RecurringWindow {
    /// First occurrence start.
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    /// Duration of every occurrence.
    pub fn duration(&self) -> TimeDelta {
        self.duration
    }
}

impl TryFrom<&TimeWindowFilterSettings> for RecurringWindow {
    type Error = Error;

    fn try_from(settings: &TimeWindowFilterSettings) -> Result<Self> {
        validate_settings(settings)?.ok_or_else(|| Error::invalid_settings("Recurrence", ValidationReason::RequiredParameter))
    }
}

/// Validates time window settings.
///
/// Returns `Ok(None)` if there is no recurrence to validate.
pub fn validate_settings(settings: &TimeWindowFilterSettings) -> Result<Option<RecurringWindow>> {
    let Some(recurrence) = &settings.recurrence else {
        return Ok(None);
    };

    let start = settings.start.ok_or_else(|| required(START))?;
    let end = settings.end.ok_or_else(|| required(END))?;
    let pattern = recurrence.pattern.as_ref().ok_or_else(|| required(PATTERN))?;
    let range = recurrence.range.as_ref().ok_or_else(|| required(RANGE))?;

    let duration = end - start;
    if duration <= TimeDelta::zero() || duration > TimeDelta::days(TEN_YEARS_IN_DAYS) {
        return Err(Error::invalid_settings(END, ValidationReason::ValueOutOfRange));
    }

    let cadence = validate_pattern(pattern, start, duration)?;
    let end = validate_range(range, start)?;

    Ok(Some(RecurringWindow {
        start,
        duration,
        cadence,
        end,
    }))
}

fn required(parameter: &str) -> Error {
    Error::invalid_settings(parameter, ValidationReason::RequiredParameter)
}

fn validate_pattern(pattern: &RecurrencePattern, start: DateTime<FixedOffset>, duration: TimeDelta) -> Result<Cadence> {
    if pattern.interval <= 0 {
        return Err(Error::invalid_settings(INTERVAL, ValidationReason::ValueOutOfRange));
    }
    let interval = pattern.interval as i64;

    match pattern.type_ {
        RecurrencePatternType::Daily => {
            if duration > TimeDelta::days(interval) {
                return Err(Error::invalid_settings(END, ValidationReason::TimeWindowDurationOutOfRange));
            }
            Ok(Cadence::Daily { interval })
        }
        RecurrencePatternType::Weekly => {
            if pattern.days_of_week.is_empty() {
                return Err(required(DAYS_OF_WEEK));
            }

            let days = sort_days_of_week(&pattern.days_of_week, pattern.first_day_of_week);
            if duration > TimeDelta::days(interval * DAYS_PER_WEEK)
                || !is_duration_compliant_with_days_of_week(duration, interval, &days, pattern.first_day_of_week)
            {
                return Err(Error::invalid_settings(END, ValidationReason::TimeWindowDurationOutOfRange));
            }

            if !days.contains(&DayOfWeek::from(start.weekday())) {
                return Err(Error::invalid_settings(START, ValidationReason::StartNotMatched));
            }

            Ok(Cadence::Weekly {
                interval,
                days,
                first_day_of_week: pattern.first_day_of_week,
            })
        }
        RecurrencePatternType::AbsoluteMonthly
        | RecurrencePatternType::RelativeMonthly
        | RecurrencePatternType::AbsoluteYearly
        | RecurrencePatternType::RelativeYearly => {
            Err(Error::invalid_settings(PATTERN_TYPE, ValidationReason::UnrecognizableValue))
        }
    }
}

fn validate_range(range: &RecurrenceRange, start: DateTime<FixedOffset>) -> Result<RecurrenceEnd> {
    match range.type_ {
        RecurrenceRangeType::NoEnd => Ok(RecurrenceEnd::NoEnd),
        RecurrenceRangeType::EndDate => {
            let end_date = range.end_date.ok_or_else(|| required(END_DATE))?;
            if end_date < start {
                return Err(Error::invalid_settings(END_DATE, ValidationReason::ValueOutOfRange));
            }
            Ok(RecurrenceEnd::EndDate(end_date))
        }
        RecurrenceRangeType::Numbered => {
            let number = range.number_of_occurrences.ok_or_else(|| required(NUMBER_OF_OCCURRENCES))?;
            if number < 1 {
                return Err(Error::invalid_settings(
                    NUMBER_OF_OCCURRENCES,
                    ValidationReason::ValueOutOfRange,
                ));
            }
            Ok(RecurrenceEnd::Numbered(number as i64))
        }
    }
}

/// Removes duplicates and orders days by their offset from `first_day_of_week`.
pub(crate) fn sort_days_of_week(days: &[DayOfWeek], first_day_of_week: DayOfWeek) -> Vec<DayOfWeek> {
    let mut days = days.to_vec();
    days.sort_by_key(|day| day_offset(*day, first_day_of_week));
    days.dedup();
    days
}

/// Number of days from `first_day_of_week` forward to `day`.
#[inline]
pub(crate) fn day_offset(day: DayOfWeek, first_day_of_week: DayOfWeek) -> i64 {
    weekday_offset(day.num_days_from_sunday(), first_day_of_week.num_days_from_sunday())
}

/// Occurrences must not overlap: the duration should fit into the smallest gap
/// between two consecutive days, including the gap across the cycle boundary for a weekly interval.
///
/// `days` should be sorted by [`sort_days_of_week`].
fn is_duration_compliant_with_days_of_week(
    duration: TimeDelta,
    interval: i64,
    days: &[DayOfWeek],
    first_day_of_week: DayOfWeek,
) -> bool {
    if days.len() <= 1 {
        return true;
    }

    let offsets: Vec<i64> = days.iter().map(|day| day_offset(*day, first_day_of_week)).collect();
    let mut min_gap = offsets.windows(2).map(|pair| pair[1] - pair[0]).min().unwrap_or(DAYS_PER_WEEK);

    if interval == 1 {
        let (first, last) = (offsets[0], offsets[offsets.len() - 1]);
        min_gap = min_gap.min(DAYS_PER_WEEK + first - last);
    }

    TimeDelta::days(min_gap) >= duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{Recurrence, RecurrencePattern, RecurrenceRange};
    use crate::recurrence::DayOfWeek::*;
    use rstest::rstest;

    fn ts(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(value).unwrap()
    }

    fn settings(start: &str, end: &str, pattern: RecurrencePattern, range: RecurrenceRange) -> TimeWindowFilterSettings {
        TimeWindowFilterSettings {
            start: Some(ts(start)),
            end: Some(ts(end)),
            recurrence: Some(Recurrence::new(pattern, range)),
            ..Default::default()
        }
    }

    fn assert_invalid(settings: &TimeWindowFilterSettings, parameter: &str, reason: ValidationReason) {
        let result = validate_settings(settings);
        assert_eq!(
            result.as_ref().err().and_then(|e| e.validation()),
            Some((parameter, reason)),
            "result = {result:?}"
        );
    }

    #[test]
    fn test_without_recurrence() {
        let settings = TimeWindowFilterSettings::default();
        assert_eq!(validate_settings(&settings), Ok(None));
    }

    #[test]
    fn test_required_parameters() {
        let mut s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(1),
            RecurrenceRange::no_end(),
        );
        assert!(validate_settings(&s).unwrap().is_some());

        s.recurrence.as_mut().unwrap().range = None;
        assert_invalid(&s, "Recurrence.Range", ValidationReason::RequiredParameter);

        s.recurrence.as_mut().unwrap().pattern = None;
        assert_invalid(&s, "Recurrence.Pattern", ValidationReason::RequiredParameter);

        s.end = None;
        assert_invalid(&s, "End", ValidationReason::RequiredParameter);

        s.start = None;
        assert_invalid(&s, "Start", ValidationReason::RequiredParameter);
    }

    #[rstest]
    #[case("2024-01-01T10:00:00Z", "2024-01-01T10:00:00Z")]
    #[case("2024-01-01T10:00:00Z", "2024-01-01T09:00:00Z")]
    #[case("2024-01-01T10:00:00Z", "2034-01-01T10:00:00Z")]
    fn test_duration_out_of_range(#[case] start: &str, #[case] end: &str) {
        let s = settings(start, end, RecurrencePattern::daily(5000), RecurrenceRange::no_end());
        assert_invalid(&s, "End", ValidationReason::ValueOutOfRange);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    fn test_invalid_interval(#[case] interval: i32) {
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(interval),
            RecurrenceRange::no_end(),
        );
        assert_invalid(&s, "Recurrence.Pattern.Interval", ValidationReason::ValueOutOfRange);
    }

    #[rstest]
    #[case(RecurrencePatternType::AbsoluteMonthly)]
    #[case(RecurrencePatternType::RelativeMonthly)]
    #[case(RecurrencePatternType::AbsoluteYearly)]
    #[case(RecurrencePatternType::RelativeYearly)]
    fn test_legacy_pattern_types(#[case] type_: RecurrencePatternType) {
        let pattern = RecurrencePattern {
            type_,
            ..RecurrencePattern::daily(1)
        };
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            pattern,
            RecurrenceRange::no_end(),
        );
        assert_invalid(&s, "Recurrence.Pattern.Type", ValidationReason::UnrecognizableValue);
    }

    #[rstest]
    #[case(1, "2024-01-02T10:00:00Z", true)]
    #[case(1, "2024-01-02T10:00:01Z", false)]
    #[case(1, "2024-01-02T11:00:00Z", false)]
    #[case(2, "2024-01-03T10:00:00Z", true)]
    #[case(2, "2024-01-03T10:00:01Z", false)]
    fn test_daily_duration(#[case] interval: i32, #[case] end: &str, #[case] valid: bool) {
        let s = settings(
            "2024-01-01T10:00:00Z",
            end,
            RecurrencePattern::daily(interval),
            RecurrenceRange::no_end(),
        );
        if valid {
            assert!(validate_settings(&s).is_ok());
        } else {
            assert_invalid(&s, "End", ValidationReason::TimeWindowDurationOutOfRange);
        }
    }

    #[test]
    fn test_weekly_required_days() {
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::weekly(1, []),
            RecurrenceRange::no_end(),
        );
        assert_invalid(&s, "Recurrence.Pattern.DaysOfWeek", ValidationReason::RequiredParameter);
    }

    #[rstest]
    // single day: up to the whole interval
    #[case(1, vec![Monday], Sunday, "2024-01-08T10:00:00Z", true)]
    #[case(1, vec![Monday], Sunday, "2024-01-08T10:00:01Z", false)]
    #[case(2, vec![Monday], Sunday, "2024-01-15T10:00:00Z", true)]
    // gap between Monday and Wednesday is two days
    #[case(1, vec![Monday, Wednesday], Sunday, "2024-01-03T10:00:00Z", true)]
    #[case(1, vec![Monday, Wednesday], Sunday, "2024-01-03T10:00:01Z", false)]
    // gap across the weeks: Saturday to Monday
    #[case(1, vec![Monday, Saturday], Sunday, "2024-01-03T10:00:00Z", true)]
    #[case(1, vec![Monday, Saturday], Sunday, "2024-01-03T10:00:01Z", false)]
    // no gap across the weeks if interval is more than one week
    #[case(2, vec![Monday, Saturday], Sunday, "2024-01-06T10:00:00Z", true)]
    #[case(2, vec![Monday, Saturday], Sunday, "2024-01-06T10:00:01Z", false)]
    // first day of week changes ordering: Sunday goes last
    #[case(2, vec![Monday, Sunday], Monday, "2024-01-07T10:00:00Z", true)]
    #[case(2, vec![Monday, Sunday], Monday, "2024-01-07T10:00:01Z", false)]
    #[case(2, vec![Monday, Sunday], Sunday, "2024-01-02T10:00:00Z", true)]
    #[case(2, vec![Monday, Sunday], Sunday, "2024-01-02T10:00:01Z", false)]
    fn test_weekly_duration(
        #[case] interval: i32,
        #[case] days: Vec<DayOfWeek>,
        #[case] first_day_of_week: DayOfWeek,
        #[case] end: &str,
        #[case] valid: bool,
    ) {
        // 2024-01-01 is Monday
        let s = settings(
            "2024-01-01T10:00:00Z",
            end,
            RecurrencePattern::weekly(interval, days).with_first_day_of_week(first_day_of_week),
            RecurrenceRange::no_end(),
        );
        if valid {
            assert!(validate_settings(&s).is_ok(), "end = {end}");
        } else {
            assert_invalid(&s, "End", ValidationReason::TimeWindowDurationOutOfRange);
        }
    }

    #[rstest]
    #[case("2024-01-01T10:00:00Z", true)]
    #[case("2024-01-02T10:00:00Z", false)]
    // Start's own offset defines the day: Monday 23:00 UTC is Tuesday in +02:00
    #[case("2024-01-02T01:00:00+02:00", false)]
    #[case("2024-01-01T23:30:00-02:00", true)]
    #[case("2024-01-01T01:00:00+02:00", true)]
    fn test_weekly_start_not_matched(#[case] start: &str, #[case] valid: bool) {
        let start_ts = ts(start);
        let end = (start_ts + TimeDelta::hours(1)).to_rfc3339();
        let s = settings(
            start,
            &end,
            RecurrencePattern::weekly(1, [Monday, Friday]),
            RecurrenceRange::no_end(),
        );
        if valid {
            assert!(validate_settings(&s).is_ok(), "start = {start}");
        } else {
            assert_invalid(&s, "Start", ValidationReason::StartNotMatched);
        }
    }

    #[test]
    fn test_end_date_range() {
        let mut range = RecurrenceRange::end_date(ts("2024-01-01T09:00:00Z"));
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(1),
            range.clone(),
        );
        assert_invalid(&s, "Recurrence.Range.EndDate", ValidationReason::ValueOutOfRange);

        range.end_date = None;
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(1),
            range,
        );
        assert_invalid(&s, "Recurrence.Range.EndDate", ValidationReason::RequiredParameter);

        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(1),
            RecurrenceRange::end_date(ts("2024-01-01T10:00:00Z")),
        );
        assert!(validate_settings(&s).is_ok());
    }

    #[rstest]
    #[case(Some(0), Some(ValidationReason::ValueOutOfRange))]
    #[case(Some(-5), Some(ValidationReason::ValueOutOfRange))]
    #[case(None, Some(ValidationReason::RequiredParameter))]
    #[case(Some(1), None)]
    fn test_numbered_range(#[case] number: Option<i32>, #[case] reason: Option<ValidationReason>) {
        let range = RecurrenceRange {
            number_of_occurrences: number,
            ..RecurrenceRange::numbered(1)
        };
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(1),
            range,
        );
        match reason {
            Some(reason) => assert_invalid(&s, "Recurrence.Range.NumberOfOccurrences", reason),
            None => assert!(validate_settings(&s).is_ok()),
        }
    }

    #[test]
    fn test_pattern_checked_before_range() {
        let s = settings(
            "2024-01-01T10:00:00Z",
            "2024-01-01T11:00:00Z",
            RecurrencePattern::daily(0),
            RecurrenceRange {
                number_of_occurrences: None,
                ..RecurrenceRange::numbered(1)
            },
        );
        assert_invalid(&s, "Recurrence.Pattern.Interval", ValidationReason::ValueOutOfRange);
    }

    #[rstest]
    #[case(vec![Friday, Monday, Wednesday], Sunday, vec![Monday, Wednesday, Friday])]
    #[case(vec![Sunday, Saturday, Monday], Monday, vec![Monday, Saturday, Sunday])]
    #[case(vec![Sunday, Saturday, Monday], Sunday, vec![Sunday, Monday, Saturday])]
    #[case(vec![Tuesday, Tuesday, Monday], Wednesday, vec![Monday, Tuesday])]
    fn test_sort_days_of_week(
        #[case] days: Vec<DayOfWeek>,
        #[case] first_day_of_week: DayOfWeek,
        #[case] expected: Vec<DayOfWeek>,
    ) {
        assert_eq!(sort_days_of_week(&days, first_day_of_week), expected);
    }
}
