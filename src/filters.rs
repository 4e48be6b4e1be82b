//! Feature filters: named conditions a feature can be enabled for.
//!
//! Every filter binds its parameters from the feature configuration
//! and calls one of the evaluators. Filters are looked up by name or alias, case-insensitively.

use crate::{
    evaluation::{Evaluation, EvaluationWarning},
    targeting::{self, TargetingContext, TargetingFilterSettings},
    time_window::{TimeWindow, TimeWindowFilterSettings},
    utils::string_enum,
    Error, Result,
};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Request-scoped data filters may need.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvaluationContext {
    /// Current user.
    pub targeting: Option<TargetingContext>,
    /// `User-Agent` header of the current request.
    pub user_agent: Option<String>,
}

impl EvaluationContext {
    /// Sets targeting context.
    pub fn with_targeting(mut self, targeting: TargetingContext) -> Self {
        self.targeting = Some(targeting);
        self
    }

    /// Sets user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// What a filter gets to evaluate.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Name of the feature being evaluated.
    pub feature_name: &'a str,
    /// Filter parameters from the feature configuration.
    pub parameters: &'a Value,
    /// Request-scoped data.
    pub app: &'a EvaluationContext,
}

/// Named condition of the feature.
pub trait FeatureFilter: Send + Sync {
    /// Canonical name, used in configuration.
    fn name(&self) -> &str;

    /// Alternative names.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Evaluates the filter, fails if parameters are invalid.
    fn evaluate(&self, context: &FilterContext<'_>) -> Result<Evaluation>;

    /// Returns `true` if the filter is known by `name`.
    fn is_named(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name) || self.aliases().iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Binds filter parameters to the settings type, absent parameters are bound as an empty object.
pub fn bind_parameters<T: DeserializeOwned>(filter: &str, parameters: &Value) -> Result<T> {
    let result = if parameters.is_null() {
        T::deserialize(Value::Object(Default::default()))
    } else {
        T::deserialize(parameters)
    };

    result.map_err(|err| Error::InvalidFilterParameters {
        filter: filter.to_owned(),
        message: err.to_string(),
    })
}

/// Source of the current time.
pub trait SystemClock: Send + Sync {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcClock;

impl SystemClock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock which always returns the same time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl SystemClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Enables the feature within a time window.
pub struct TimeWindowFilter {
    clock: Box<dyn SystemClock>,
}

impl TimeWindowFilter {
    /// Filter name.
    pub const NAME: &'static str = "Microsoft.TimeWindow";

    /// Filter which uses the real time.
    pub fn new() -> Self {
        Self::with_clock(UtcClock)
    }

    /// Filter which uses the `clock` as a source of the current time.
    pub fn with_clock(clock: impl SystemClock + 'static) -> Self {
        Self { clock: Box::new(clock) }
    }
}

impl Default for TimeWindowFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureFilter for TimeWindowFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn aliases(&self) -> &[&str] {
        &["TimeWindow"]
    }

    fn evaluate(&self, context: &FilterContext<'_>) -> Result<Evaluation> {
        let settings: TimeWindowFilterSettings = bind_parameters(Self::NAME, context.parameters)?;
        let now = self.clock.now();
        let evaluation = TimeWindow::new(&settings)?.evaluate(&now);

        debug!(
            "time window of feature `{}` at {now}: {}",
            context.feature_name, evaluation.enabled
        );
        Ok(evaluation)
    }
}

/// Percentage filter settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PercentageFilterSettings {
    /// Chance to enable the feature, `0-100`.
    pub value: f64,
}

/// Enables the feature randomly for the given share of evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentageFilter;

impl PercentageFilter {
    /// Filter name.
    pub const NAME: &'static str = "Microsoft.Percentage";
}

impl FeatureFilter for PercentageFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn aliases(&self) -> &[&str] {
        &["Percentage"]
    }

    fn evaluate(&self, context: &FilterContext<'_>) -> Result<Evaluation> {
        let settings: PercentageFilterSettings = bind_parameters(Self::NAME, context.parameters)?;

        if settings.value < 0.0 {
            return Ok(Evaluation::disabled(EvaluationWarning::NegativePercentage));
        }

        Ok(Evaluation::new(rand::random::<f64>() * 100.0 < settings.value))
    }
}

/// Enables the feature for the audience.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetingFilter {
    ignore_case: bool,
}

impl TargetingFilter {
    /// Filter name.
    pub const NAME: &'static str = "Microsoft.Targeting";

    /// Filter which compares user ids and group names case-sensitively.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets case-insensitive comparison of user ids and group names.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
}

impl FeatureFilter for TargetingFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn aliases(&self) -> &[&str] {
        &["Targeting"]
    }

    fn evaluate(&self, context: &FilterContext<'_>) -> Result<Evaluation> {
        let settings: TargetingFilterSettings = bind_parameters(Self::NAME, context.parameters)?;
        let audience = targeting::validate_settings(&settings)?;

        let Some(targeting) = &context.app.targeting else {
            return Ok(Evaluation::disabled(EvaluationWarning::MissingTargetingContext));
        };

        let targeted = targeting::is_targeted(targeting, audience, self.ignore_case, context.feature_name);
        debug!(
            "user `{}` is targeted by feature `{}`: {targeted}",
            targeting.user_id(),
            context.feature_name
        );
        Ok(Evaluation::new(targeted))
    }
}

/// Browser family recognized from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    /// Google Chrome or Chromium.
    Chrome,
    /// Microsoft Edge.
    Edge,
    /// Mozilla Firefox.
    Firefox,
    /// Apple Safari.
    Safari,
}

string_enum!(Browser, "browser", {
    Chrome => "Chrome",
    Edge => "Edge",
    Firefox => "Firefox",
    Safari => "Safari",
});

impl Browser {
    /// Recognizes browser family from the user agent.
    pub fn from_user_agent(user_agent: &str) -> Option<Self> {
        let user_agent = user_agent.to_ascii_lowercase();
        let has = |token: &str| user_agent.contains(token);

        if has("edg/") || has("edge/") || has("edga/") || has("edgios/") {
            Some(Self::Edge)
        } else if has("firefox/") || has("fxios/") {
            Some(Self::Firefox)
        } else if has("chrome/") || has("chromium/") || has("crios/") {
            Some(Self::Chrome)
        } else if has("safari/") {
            Some(Self::Safari)
        } else {
            None
        }
    }
}

/// Browser filter settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BrowserFilterSettings {
    /// Browsers to enable the feature for.
    pub allowed_browsers: Vec<Browser>,
}

/// Enables the feature for the listed browsers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserFilter;

impl BrowserFilter {
    /// Filter name.
    pub const NAME: &'static str = "Browser";
}

impl FeatureFilter for BrowserFilter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, context: &FilterContext<'_>) -> Result<Evaluation> {
        let settings: BrowserFilterSettings = bind_parameters(Self::NAME, context.parameters)?;

        let Some(user_agent) = &context.app.user_agent else {
            return Ok(Evaluation::disabled(EvaluationWarning::MissingUserAgent));
        };

        let browser = Browser::from_user_agent(user_agent);
        Ok(Evaluation::new(
            browser.is_some_and(|browser| settings.allowed_browsers.contains(&browser)),
        ))
    }
}

/// Filters shipped with the crate.
pub fn default_filters() -> Vec<Box<dyn FeatureFilter>> {
    vec![
        Box::new(TimeWindowFilter::new()),
        Box::new(PercentageFilter),
        Box::new(TargetingFilter::new()),
        Box::new(BrowserFilter),
    ]
}
