//! Recurring time window evaluation.
//!
//! All calculations are done in the offset of the window `Start`:
//! the evaluated time is converted into it first, so days of the week
//! and the beginning of the week are aligned with `Start`.

use crate::{
    recurrence::DayOfWeek,
    time_window::TimeWindowFilterSettings,
    validator::{day_offset, Cadence, RecurrenceEnd, RecurringWindow, DAYS_PER_WEEK},
    Result,
};
use chrono::{DateTime, Datelike, FixedOffset, TimeDelta, TimeZone};

/// Occurrence start with the number of occurrences since the first one, inclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Occurrence {
    start: DateTime<FixedOffset>,
    number: i64,
}

/// Returns `true` if `time` is within any occurrence of the recurring window.
///
/// Fails if settings are invalid or have no recurrence.
pub fn match_recurrence<Tz: TimeZone>(time: &DateTime<Tz>, settings: &TimeWindowFilterSettings) -> Result<bool> {
    Ok(RecurringWindow::try_from(settings)?.matches(time))
}

/// Returns start of the occurrence which contains `time`, or start of the next occurrence.
///
/// Returns `None` if there are no more occurrences.
/// Fails if settings are invalid or have no recurrence.
pub fn closest_start<Tz: TimeZone>(
    time: &DateTime<Tz>,
    settings: &TimeWindowFilterSettings,
) -> Result<Option<DateTime<FixedOffset>>> {
    Ok(RecurringWindow::try_from(settings)?.closest_start(time))
}

impl RecurringWindow {
    /// Returns `true` if `time` is within any occurrence of the window.
    pub fn matches<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> bool {
        let time = self.align(time);
        if time < self.start {
            return false;
        }

        let previous = self.find_previous_occurrence(&time);
        self.is_in_range(&previous) && time < previous.start + self.duration
    }

    /// Returns start of the latest occurrence which started at or before `time`, if it's within the range.
    pub fn previous_occurrence<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> Option<DateTime<FixedOffset>> {
        let time = self.align(time);
        if time < self.start {
            return None;
        }

        let previous = self.find_previous_occurrence(&time);
        self.is_in_range(&previous).then_some(previous.start)
    }

    /// Returns start of the occurrence which contains `time`, or start of the next occurrence.
    ///
    /// Returns `None` if there are no more occurrences.
    pub fn closest_start<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> Option<DateTime<FixedOffset>> {
        let time = self.align(time);
        if time < self.start {
            return Some(self.start);
        }

        let previous = self.find_previous_occurrence(&time);
        if self.is_in_range(&previous) && time < previous.start + self.duration {
            return Some(previous.start);
        }

        self.next_occurrence(&previous)
            .filter(|next| self.is_in_range(next))
            .map(|next| next.start)
    }

    #[inline]
    fn align<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.start.timezone())
    }

    fn is_in_range(&self, occurrence: &Occurrence) -> bool {
        match self.end {
            RecurrenceEnd::NoEnd => true,
            RecurrenceEnd::EndDate(end_date) => occurrence.start <= end_date,
            RecurrenceEnd::Numbered(number) => occurrence.number <= number,
        }
    }

    /// `time` should be aligned and not before the window start.
    fn find_previous_occurrence(&self, time: &DateTime<FixedOffset>) -> Occurrence {
        match &self.cadence {
            Cadence::Daily { interval } => self.daily_previous_occurrence(time, *interval),
            Cadence::Weekly {
                interval,
                days,
                first_day_of_week,
            } => self.weekly_previous_occurrence(time, *interval, days, *first_day_of_week),
        }
    }

    fn daily_previous_occurrence(&self, time: &DateTime<FixedOffset>, interval: i64) -> Occurrence {
        let period = TimeDelta::days(interval);
        let intervals = (*time - self.start).num_seconds().div_euclid(period.num_seconds());

        Occurrence {
            start: self.start + TimeDelta::days(intervals * interval),
            number: intervals + 1,
        }
    }

    fn weekly_previous_occurrence(
        &self,
        time: &DateTime<FixedOffset>,
        interval: i64,
        days: &[DayOfWeek],
        first_day_of_week: DayOfWeek,
    ) -> Occurrence {
        let start_day = DayOfWeek::from(self.start.weekday());
        let first_day_of_start_week = self.start - TimeDelta::days(day_offset(start_day, first_day_of_week));

        let cycle = TimeDelta::days(interval * DAYS_PER_WEEK);
        let cycles = (*time - first_day_of_start_week)
            .num_seconds()
            .div_euclid(cycle.num_seconds());
        let first_day_of_cycle = first_day_of_start_week + TimeDelta::days(cycles * interval * DAYS_PER_WEEK);
        let day_in_cycle = |day: DayOfWeek| first_day_of_cycle + TimeDelta::days(day_offset(day, first_day_of_week));

        let (Some(&first_day), Some(&last_day)) = (days.first(), days.last()) else {
            // validation guarantees days aren't empty
            return Occurrence {
                start: self.start,
                number: 1,
            };
        };

        // Occurrences of the whole passed cycles, without the days before start in the first week.
        let days_count = days.len() as i64;
        let skipped_in_first_week = days.iter().position(|day| *day == start_day).unwrap_or(0) as i64;
        let mut number = cycles * days_count - skipped_in_first_week;

        // Time is after the last week of the cycle: the last day of it is the latest.
        if *time - first_day_of_cycle > TimeDelta::days(DAYS_PER_WEEK) {
            return Occurrence {
                start: day_in_cycle(last_day),
                number: number + days_count,
            };
        }

        let mut earliest = day_in_cycle(first_day);
        if earliest < self.start {
            earliest = self.start;
            number = 0;
        }

        if *time >= earliest {
            let mut previous = earliest;
            number += 1;

            let earliest_day = DayOfWeek::from(earliest.weekday());
            let next_index = days.iter().position(|day| *day == earliest_day).map_or(days.len(), |i| i + 1);
            for day in &days[next_index..] {
                let candidate = day_in_cycle(*day);
                if *time < candidate {
                    break;
                }
                previous = candidate;
                number += 1;
            }

            Occurrence { start: previous, number }
        } else {
            // The last day of the previous cycle.
            let first_day_of_previous_cycle = first_day_of_cycle - cycle;
            Occurrence {
                start: first_day_of_previous_cycle + TimeDelta::days(day_offset(last_day, first_day_of_week)),
                number,
            }
        }
    }

    /// Returns `None` if the next occurrence is beyond the representable dates.
    fn next_occurrence(&self, previous: &Occurrence) -> Option<Occurrence> {
        let days = match &self.cadence {
            Cadence::Daily { interval } => *interval,
            Cadence::Weekly { interval, days, .. } => {
                let previous_day = DayOfWeek::from(previous.start.weekday());
                let next_index = days.iter().position(|day| *day == previous_day).map_or(0, |i| i + 1);
                match (days.get(next_index), days.first()) {
                    (Some(next_day), _) => day_offset(*next_day, previous_day),
                    // wrap into the next cycle
                    (None, Some(first_day)) => interval * DAYS_PER_WEEK - day_offset(previous_day, *first_day),
                    (None, None) => interval * DAYS_PER_WEEK,
                }
            }
        };

        let start = previous.start.checked_add_signed(TimeDelta::try_days(days)?)?;
        Some(Occurrence {
            start,
            number: previous.number + 1,
        })
    }
}
