//! Variant allocation: which variant of the feature a user gets.
//!
//! Allocations are checked in order: users, groups, percentiles.
//! The first match wins, otherwise the default variant is assigned.

use crate::{
    bucketing,
    error::ValidationReason,
    targeting::{self, is_valid_percentage, TargetingContext},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Variant assigned to listed users.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserAllocation {
    /// Variant name.
    pub variant: String,
    /// User ids.
    pub users: Vec<String>,
}

/// Variant assigned to members of listed groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GroupAllocation {
    /// Variant name.
    pub variant: String,
    /// Group names.
    pub groups: Vec<String>,
}

/// Variant assigned to users whose bucket is within `[From, To)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PercentileAllocation {
    /// Variant name.
    pub variant: String,
    /// Lower bound, inclusive.
    pub from: f64,
    /// Upper bound, exclusive unless it's `100`.
    pub to: f64,
}

/// Variant allocation settings of a feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Allocation {
    /// Variant of the disabled feature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_when_disabled: Option<String>,
    /// Variant of the enabled feature if no allocation matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_when_enabled: Option<String>,
    /// Allocations by user.
    pub user: Vec<UserAllocation>,
    /// Allocations by group.
    pub group: Vec<GroupAllocation>,
    /// Allocations by percentile.
    pub percentile: Vec<PercentileAllocation>,
    /// Percentile bucketing seed, `allocation\n{feature name}` by default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
}

/// Why the variant was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariantAssignmentReason {
    /// No variant.
    #[default]
    None,
    /// Feature is disabled.
    DefaultWhenDisabled,
    /// Feature is enabled, but no allocation matches.
    DefaultWhenEnabled,
    /// User is listed.
    User,
    /// One of the user groups is listed.
    Group,
    /// User bucket is within the percentile.
    Percentile,
}

impl Display for VariantAssignmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::None => "None",
            Self::DefaultWhenDisabled => "DefaultWhenDisabled",
            Self::DefaultWhenEnabled => "DefaultWhenEnabled",
            Self::User => "User",
            Self::Group => "Group",
            Self::Percentile => "Percentile",
        };
        write!(f, "{reason}")
    }
}

/// Assigned variant name with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantAssignment<'a> {
    /// Variant name.
    pub variant: &'a str,
    /// Why it's assigned.
    pub reason: VariantAssignmentReason,
}

impl<'a> VariantAssignment<'a> {
    fn new(variant: &'a str, reason: VariantAssignmentReason) -> Self {
        Self { variant, reason }
    }
}

impl Allocation {
    /// Checks percentile bounds: both within `[0, 100]` and `From <= To`.
    pub fn validate(&self) -> Result<()> {
        for (index, percentile) in self.percentile.iter().enumerate() {
            if !is_valid_percentage(percentile.from) {
                return Err(Error::invalid_settings(
                    format!("Allocation.Percentile[{index}].From"),
                    ValidationReason::ValueOutOfRange,
                ));
            }
            if !is_valid_percentage(percentile.to) || percentile.to < percentile.from {
                return Err(Error::invalid_settings(
                    format!("Allocation.Percentile[{index}].To"),
                    ValidationReason::ValueOutOfRange,
                ));
            }
        }

        Ok(())
    }

    /// Assigns variant of the enabled feature.
    pub fn assign<'a>(
        &'a self,
        context: &TargetingContext,
        feature_name: &str,
        ignore_case: bool,
    ) -> Option<VariantAssignment<'a>> {
        if let Some(user_id) = context.user_id.as_deref() {
            let allocation = self
                .user
                .iter()
                .find(|allocation| targeting::contains_user(&allocation.users, user_id, ignore_case));
            if let Some(allocation) = allocation {
                return Some(VariantAssignment::new(&allocation.variant, VariantAssignmentReason::User));
            }
        }

        let allocation = self
            .group
            .iter()
            .find(|allocation| targeting::intersects_groups(&allocation.groups, &context.groups, ignore_case));
        if let Some(allocation) = allocation {
            return Some(VariantAssignment::new(&allocation.variant, VariantAssignmentReason::Group));
        }

        if !self.percentile.is_empty() {
            let context_id = match &self.seed {
                Some(seed) => format!("{}\n{seed}", context.user_id()),
                None => format!("{}\nallocation\n{feature_name}", context.user_id()),
            };
            let allocation = self
                .percentile
                .iter()
                .find(|allocation| bucketing::is_targeted_in_range(&context_id, allocation.from, allocation.to));
            if let Some(allocation) = allocation {
                return Some(VariantAssignment::new(
                    &allocation.variant,
                    VariantAssignmentReason::Percentile,
                ));
            }
        }

        self.default_when_enabled
            .as_deref()
            .map(|variant| VariantAssignment::new(variant, VariantAssignmentReason::DefaultWhenEnabled))
    }

    /// Assigns variant of the disabled feature.
    pub fn assign_disabled(&self) -> Option<VariantAssignment<'_>> {
        self.default_when_disabled
            .as_deref()
            .map(|variant| VariantAssignment::new(variant, VariantAssignmentReason::DefaultWhenDisabled))
    }
}
