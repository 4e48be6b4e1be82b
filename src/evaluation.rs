use std::fmt::Display;

/// Result of the filter evaluation: decision with an optional advisory warning.
///
/// A warning doesn't make the result invalid, it explains why the feature is disabled
/// while the settings are formally correct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Evaluation {
    /// Decision.
    pub enabled: bool,
    /// Why the decision may differ from the expected one.
    pub warning: Option<EvaluationWarning>,
}

impl Evaluation {
    /// Decision without warning.
    pub fn new(enabled: bool) -> Self {
        Self { enabled, warning: None }
    }

    /// Disabled with the warning.
    pub fn disabled(warning: EvaluationWarning) -> Self {
        Self {
            enabled: false,
            warning: Some(warning),
        }
    }
}

impl From<bool> for Evaluation {
    fn from(enabled: bool) -> Self {
        Self::new(enabled)
    }
}

/// Advisory condition which disables a feature without failing the evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvaluationWarning {
    /// Time window has no `Start`, `End` or cron filters: it's never open.
    MissingTimeWindow,
    /// Percentage filter value is negative.
    NegativePercentage,
    /// Targeting filter was evaluated without targeting context.
    MissingTargetingContext,
    /// Browser filter was evaluated without user agent.
    MissingUserAgent,
}

impl Display for EvaluationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTimeWindow => write!(f, "time window must have at least one of `Start`, `End` or `Filters`"),
            Self::NegativePercentage => write!(f, "percentage value must not be negative"),
            Self::MissingTargetingContext => write!(f, "no targeting context is available"),
            Self::MissingUserAgent => write!(f, "no user agent is available"),
        }
    }
}
