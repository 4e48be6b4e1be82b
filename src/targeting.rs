//! Audience targeting.
//!
//! A user is targeted if isn't excluded and either is listed in the audience directly,
//! or falls into the rollout percentage of one of their groups, or into the default rollout.
//! Percentage checks use [`bucketing`](crate::bucketing), so the decision is stable for
//! the same user, hint (usually the feature name) and group.

use crate::{bucketing, error::ValidationReason, Error, Result};
use serde::{Deserialize, Serialize};

const AUDIENCE: &str = "Audience";
const DEFAULT_ROLLOUT_PERCENTAGE: &str = "Audience.DefaultRolloutPercentage";

/// Rollout percentage of a group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GroupRollout {
    /// Group name.
    pub name: String,
    /// Share of the group members to target, `0-100`.
    pub rollout_percentage: f64,
}

impl GroupRollout {
    /// Constructs group rollout.
    pub fn new(name: impl Into<String>, rollout_percentage: f64) -> Self {
        Self {
            name: name.into(),
            rollout_percentage,
        }
    }
}

/// Plain lists of users and groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BasicAudience {
    /// User ids.
    pub users: Vec<String>,
    /// Group names.
    pub groups: Vec<String>,
}

/// Who should see the feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Audience {
    /// Users targeted directly.
    pub users: Vec<String>,
    /// Groups targeted partially.
    pub groups: Vec<GroupRollout>,
    /// Share of all users to target, `0-100`.
    pub default_rollout_percentage: f64,
    /// Users and groups which are never targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusion: Option<BasicAudience>,
}

impl Audience {
    /// Adds directly targeted user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.users.push(user.into());
        self
    }

    /// Adds group rollout.
    pub fn with_group(mut self, name: impl Into<String>, rollout_percentage: f64) -> Self {
        self.groups.push(GroupRollout::new(name, rollout_percentage));
        self
    }

    /// Sets default rollout percentage.
    pub fn with_default_rollout_percentage(mut self, percentage: f64) -> Self {
        self.default_rollout_percentage = percentage;
        self
    }

    /// Sets exclusion.
    pub fn with_exclusion(mut self, exclusion: BasicAudience) -> Self {
        self.exclusion = Some(exclusion);
        self
    }
}

/// Targeting filter settings as they come from configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TargetingFilterSettings {
    /// Audience, required.
    pub audience: Option<Audience>,
}

impl From<Audience> for TargetingFilterSettings {
    fn from(audience: Audience) -> Self {
        Self {
            audience: Some(audience),
        }
    }
}

/// User to evaluate targeting for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TargetingContext {
    /// User id, absent id is treated as an empty string.
    pub user_id: Option<String>,
    /// Groups the user belongs to.
    pub groups: Vec<String>,
}

impl TargetingContext {
    /// Context of the user without groups.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            groups: Vec::new(),
        }
    }

    /// Adds groups.
    pub fn with_groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    pub(crate) fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }
}

/// Validates targeting settings and returns the audience.
pub fn validate_settings(settings: &TargetingFilterSettings) -> Result<&Audience> {
    let audience = settings
        .audience
        .as_ref()
        .ok_or_else(|| Error::invalid_settings(AUDIENCE, ValidationReason::RequiredParameter))?;

    if !is_valid_percentage(audience.default_rollout_percentage) {
        return Err(Error::invalid_settings(
            DEFAULT_ROLLOUT_PERCENTAGE,
            ValidationReason::ValueOutOfRange,
        ));
    }

    if let Some(index) = audience
        .groups
        .iter()
        .position(|group| !is_valid_percentage(group.rollout_percentage))
    {
        return Err(Error::invalid_settings(
            format!("Audience.Groups[{index}].RolloutPercentage"),
            ValidationReason::ValueOutOfRange,
        ));
    }

    Ok(audience)
}

/// Validates settings and decides if the user is targeted.
///
/// `hint` separates buckets of different features, usually it's the feature name.
pub fn evaluate_targeting(
    context: &TargetingContext,
    settings: &TargetingFilterSettings,
    ignore_case: bool,
    hint: &str,
) -> Result<bool> {
    let audience = validate_settings(settings)?;
    Ok(is_targeted(context, audience, ignore_case, hint))
}

/// Decides if the user is targeted by the audience, the audience isn't validated.
pub fn is_targeted(context: &TargetingContext, audience: &Audience, ignore_case: bool, hint: &str) -> bool {
    let user_id = context.user_id();

    if let Some(exclusion) = &audience.exclusion {
        if contains_user(&exclusion.users, user_id, ignore_case)
            || intersects_groups(&exclusion.groups, &context.groups, ignore_case)
        {
            return false;
        }
    }

    if contains_user(&audience.users, user_id, ignore_case) {
        return true;
    }

    let user_id = normalize(user_id, ignore_case);

    for group in &context.groups {
        let rollout = audience.groups.iter().find(|rollout| same(&rollout.name, group, ignore_case));
        if let Some(rollout) = rollout {
            let group = normalize(group, ignore_case);
            if bucketing::is_targeted(&format!("{user_id}\n{hint}\n{group}"), rollout.rollout_percentage) {
                return true;
            }
        }
    }

    bucketing::is_targeted(&format!("{user_id}\n{hint}"), audience.default_rollout_percentage)
}

/// Returns `true` if `users` has `user_id`.
pub(crate) fn contains_user(users: &[String], user_id: &str, ignore_case: bool) -> bool {
    users.iter().any(|user| same(user, user_id, ignore_case))
}

/// Returns `true` if any of `context_groups` is in `groups`.
pub(crate) fn intersects_groups(groups: &[String], context_groups: &[String], ignore_case: bool) -> bool {
    context_groups
        .iter()
        .any(|context_group| groups.iter().any(|group| same(group, context_group, ignore_case)))
}

fn same(left: &str, right: &str, ignore_case: bool) -> bool {
    if ignore_case {
        left.chars()
            .flat_map(char::to_lowercase)
            .eq(right.chars().flat_map(char::to_lowercase))
    } else {
        left == right
    }
}

fn normalize(value: &str, ignore_case: bool) -> std::borrow::Cow<'_, str> {
    if ignore_case {
        value.to_lowercase().into()
    } else {
        value.into()
    }
}

#[inline]
pub(crate) fn is_valid_percentage(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}
