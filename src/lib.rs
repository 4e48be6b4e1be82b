//! Feature flag filters: recurring time windows, cron expressions, audience targeting and variant allocation.
#![deny(unsafe_code, warnings, missing_docs)]

//! This crate decides whether a named feature is "on" for the current moment and user.
//! Its core consists of pure evaluators which take settings and a timestamp
//! (or a targeting context) and return a decision:
//! - [`CronExpression`]: traditional 5-fields cron expression matcher;
//! - [`TimeWindow`]: `[Start, End)` interval which may repeat daily or weekly
//!   and may be restricted by cron expressions;
//! - [`evaluate_targeting`]: deterministic audience targeting with stable percentage rollout;
//! - [`Allocation`]: variant assignment by user, group or percentile.
//!
//! On top of them, [`FeatureManager`] evaluates [`FeatureDefinition`]s built from configuration
//! through a set of [`FeatureFilter`]s.
//!
//! _The evaluators never read the clock and never log._ The current time is always an argument,
//! advisory conditions are returned as [`EvaluationWarning`]s. Only the filters read the clock
//! (through [`SystemClock`]) and log through the [`log`](https://crates.io/crates/log) facade.
//!
//! ## Cron expressions
//!
//! The expression has exactly 5 fields separated by whitespace: minutes, hours, days of month, months and days of week.
//!
//! | Field        | Allowed values  | Allowed special characters |
//! |--------------|-----------------|----------------------------|
//! | Minutes      | 0-59            | * , - /                    |
//! | Hours        | 0-23            | * , - /                    |
//! | Day of Month | 1-31            | * , - /                    |
//! | Month        | 1-12 or JAN-DEC | * , - /                    |
//! | Day of Week  | 0-7 or SUN-SAT  | * , - /                    |
//!
//! Patterns meanings:
//! - `*` - each possible value, i.e. `0,1,2,...,59` for minutes;
//! - `,` - list of values or patterns, i.e. `1,7,12`, `SUN,FRI`;
//! - `-` - range of values, i.e. `0-15`, `JAN-MAR`, the range can't be reversed;
//! - `/` - repeating values, i.e. `*/12`, `10/5`, `30-59/2`.
//!
//! Both `0` and `7` mean Sunday, so `5-0` is the same as `FRI-SUN`.
//! Names are case-insensitive.
//!
//! If both day of month and day of week are restricted (none of them is `*`),
//! the time should match any of them, otherwise it should match both.
//! So `0 9 1 * MON` means "at 9:00 on the 1st and on every Monday".
//!
//! ### Expression with timezone
//! If `tz` feature is enabled, it's possible to prefix the expression with timezone, for example:
//! - `TZ=Europe/Paris 0 9 * * MON-FRI`
//! - `TZ=EET 0 12 * * *`
//!
//! ## Recurring time windows
//!
//! The window `[Start, End)` repeats with a `Daily` or `Weekly` pattern until the range ends
//! (`NoEnd`, `EndDate` or `Numbered`). All the week arithmetic is done in the offset of `Start`.
//! Settings are validated before use, the error points to the invalid property:
//!
//! ```rust
//! use chrono::DateTime;
//! use feature_filters::{
//!     evaluate_time_window, DayOfWeek, Recurrence, RecurrencePattern, RecurrenceRange, Result,
//!     TimeWindowFilterSettings,
//! };
//!
//! fn main() -> Result<()> {
//!     let start = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z").unwrap();
//!     let end = DateTime::parse_from_rfc3339("2024-01-01T11:00:00Z").unwrap();
//!     let settings = TimeWindowFilterSettings::new(Some(start), Some(end)).with_recurrence(Recurrence::new(
//!         RecurrencePattern::weekly(1, [DayOfWeek::Monday, DayOfWeek::Wednesday]),
//!         RecurrenceRange::no_end(),
//!     ));
//!
//!     let wednesday = DateTime::parse_from_rfc3339("2024-01-03T10:30:00Z").unwrap();
//!     assert!(evaluate_time_window(&wednesday, &settings)?);
//!
//!     let thursday = DateTime::parse_from_rfc3339("2024-01-04T10:30:00Z").unwrap();
//!     assert!(!evaluate_time_window(&thursday, &settings)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Targeting
//!
//! ```rust
//! use feature_filters::{evaluate_targeting, Audience, Result, TargetingContext, TargetingFilterSettings};
//!
//! fn main() -> Result<()> {
//!     let settings = TargetingFilterSettings::from(
//!         Audience::default()
//!             .with_user("Jeff")
//!             .with_group("Ring0", 100.0)
//!             .with_default_rollout_percentage(20.0),
//!     );
//!
//!     let jeff = TargetingContext::new("Jeff");
//!     assert!(evaluate_targeting(&jeff, &settings, false, "Beta")?);
//!
//!     let alice = TargetingContext::new("Alice").with_groups(["Ring0"]);
//!     assert!(evaluate_targeting(&alice, &settings, false, "Beta")?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Feature manager
//!
//! ```rust
//! use feature_filters::{EvaluationContext, FeatureDefinition, FeatureManager, Result, TargetingContext};
//!
//! fn main() -> Result<()> {
//!     let features: Vec<FeatureDefinition> = serde_json::from_str(
//!         r#"[{
//!             "Name": "Beta",
//!             "EnabledFor": [
//!                 {"Name": "Targeting", "Parameters": {"Audience": {"Users": ["Jeff"]}}}
//!             ]
//!         }]"#,
//!     )
//!     .unwrap();
//!
//!     let mut manager = FeatureManager::with_default_filters();
//!     manager.add_features(features)?;
//!
//!     let context = EvaluationContext::default().with_targeting(TargetingContext::new("Jeff"));
//!     assert!(manager.is_enabled("Beta", &context)?);
//!     assert!(!manager.is_enabled("Beta", &EvaluationContext::default())?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//! * `tz`: enables support of cron [expressions with timezone](#expression-with-timezone).

/// Variant allocation.
pub mod allocation;
/// Deterministic percentage buckets.
pub mod bucketing;
/// Cron expression parser and matcher.
pub mod cron_expression;
/// Single cron field.
pub mod cron_field;
/// Crate specific Error implementation.
pub mod error;
/// Evaluation outcome.
pub mod evaluation;
/// Recurring time window evaluation.
pub mod evaluator;
/// Feature definitions and manager.
pub mod feature;
/// Feature filters.
pub mod filters;
/// Recurrence settings model.
pub mod recurrence;
/// Audience targeting.
pub mod targeting;
/// Time window filter settings and evaluation.
pub mod time_window;
mod utils;
/// Recurrence settings validation.
pub mod validator;

// Re-export of public entities.
pub use allocation::{
    Allocation, GroupAllocation, PercentileAllocation, UserAllocation, VariantAssignment, VariantAssignmentReason,
};
pub use cron_expression::CronExpression;
pub use cron_field::{CronField, CronFieldKind};
pub use error::{Error, ParseReason, ValidationReason};
pub use evaluation::{Evaluation, EvaluationWarning};
pub use evaluator::{closest_start, match_recurrence};
pub use feature::{
    FeatureDefinition, FeatureManager, FilterConfiguration, RequirementType, StatusOverride, Variant,
    VariantDefinition,
};
pub use filters::{
    Browser, BrowserFilter, EvaluationContext, FeatureFilter, FilterContext, FixedClock, PercentageFilter,
    SystemClock, TargetingFilter, TimeWindowFilter, UtcClock,
};
pub use recurrence::{
    DayOfWeek, Recurrence, RecurrencePattern, RecurrencePatternType, RecurrenceRange, RecurrenceRangeType,
};
pub use targeting::{
    evaluate_targeting, is_targeted, Audience, BasicAudience, GroupRollout, TargetingContext, TargetingFilterSettings,
};
pub use time_window::{evaluate_time_window, TimeWindow, TimeWindowFilterSettings};
pub use validator::RecurringWindow;

/// Parses cron expression, the same as [`CronExpression::parse`].
pub fn parse_cron_expression(expression: &str) -> Result<CronExpression> {
    CronExpression::parse(expression)
}

/// Convenient alias for `Result`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
