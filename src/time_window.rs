//! Time window: optional `[Start, End)` interval, optionally recurring,
//! optionally restricted by cron expressions.

use crate::{
    evaluation::{Evaluation, EvaluationWarning},
    recurrence::Recurrence,
    utils::timestamp,
    validator::{self, RecurringWindow},
    CronExpression, Result,
};
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

/// Time window settings as they come from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TimeWindowFilterSettings {
    /// Window opens at, inclusively. Absent start means the window is already open.
    #[serde(with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<FixedOffset>>,
    /// Window closes at, exclusively. Absent end means the window never closes.
    #[serde(with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<FixedOffset>>,
    /// Makes `[Start, End)` repeat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Cron expressions, the time should satisfy at least one of them if not empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<CronExpression>,
}

impl TimeWindowFilterSettings {
    /// Window between `start` and `end`.
    pub fn new(start: Option<DateTime<FixedOffset>>, end: Option<DateTime<FixedOffset>>) -> Self {
        Self {
            start,
            end,
            ..Default::default()
        }
    }

    /// Makes the window recurring.
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Adds cron expression restriction.
    pub fn with_filter(mut self, filter: CronExpression) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Validated time window, ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
    recurrence: Option<RecurringWindow>,
    filters: Vec<CronExpression>,
}

impl TimeWindow {
    /// Validates settings and constructs the window.
    pub fn new(settings: &TimeWindowFilterSettings) -> Result<Self> {
        Ok(Self {
            start: settings.start,
            end: settings.end,
            recurrence: validator::validate_settings(settings)?,
            filters: settings.filters.clone(),
        })
    }

    /// Decides if the window is open at `now`.
    ///
    /// The window without `Start`, `End` and cron filters is never open,
    /// the result carries [`EvaluationWarning::MissingTimeWindow`] in this case.
    pub fn evaluate<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Evaluation {
        if self.start.is_none() && self.end.is_none() && self.filters.is_empty() {
            return Evaluation::disabled(EvaluationWarning::MissingTimeWindow);
        }

        let now_fixed = now.fixed_offset();
        let in_window = (self.start.map_or(true, |start| now_fixed >= start)
            && self.end.map_or(true, |end| now_fixed < end))
            || self.recurrence.as_ref().is_some_and(|recurrence| recurrence.matches(now));

        let in_schedule = self.filters.is_empty() || self.filters.iter().any(|cron| cron.is_satisfied_by(now));

        Evaluation::new(in_window && in_schedule)
    }

    /// Returns `true` if the window is open at `now`.
    pub fn contains<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.evaluate(now).enabled
    }

    /// Returns start of the current or the next window period, cron filters aren't considered.
    ///
    /// Returns `None` if the window is already closed forever
    /// or it has no start and is open.
    pub fn closest_start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<FixedOffset>> {
        if let Some(recurrence) = &self.recurrence {
            return recurrence.closest_start(now);
        }

        let now = now.fixed_offset();
        match (self.start, self.end) {
            (_, Some(end)) if now >= end => None,
            (start, _) => start,
        }
    }

    /// Recurrence of the window, if any.
    pub fn recurrence(&self) -> Option<&RecurringWindow> {
        self.recurrence.as_ref()
    }
}

impl TryFrom<&TimeWindowFilterSettings> for TimeWindow {
    type Error = crate::Error;

    fn try_from(settings: &TimeWindowFilterSettings) -> Result<Self> {
        Self::new(settings)
    }
}

/// Returns `true` if `now` is within the time window.
///
/// Fails if the settings are invalid.
pub fn evaluate_time_window<Tz: TimeZone>(now: &DateTime<Tz>, settings: &TimeWindowFilterSettings) -> Result<bool> {
    Ok(TimeWindow::new(settings)?.contains(now))
}
