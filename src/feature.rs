//! Feature definitions and the manager which evaluates them.

use crate::{
    allocation::{Allocation, VariantAssignment, VariantAssignmentReason},
    filters::{default_filters, EvaluationContext, FeatureFilter, FilterContext},
    utils::string_enum,
    Error, Result,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// How filters of the feature are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequirementType {
    /// Any filter should pass.
    #[default]
    Any,
    /// All filters should pass.
    All,
}

string_enum!(RequirementType, "requirement type", {
    Any => "Any",
    All => "All",
});

/// Overrides the feature state when the variant is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusOverride {
    /// Keep the state.
    #[default]
    None,
    /// Feature is enabled.
    Enabled,
    /// Feature is disabled.
    Disabled,
}

string_enum!(StatusOverride, "status override", {
    None => "None",
    Enabled => "Enabled",
    Disabled => "Disabled",
});

/// Filter reference in the feature definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FilterConfiguration {
    /// Filter name or alias.
    pub name: String,
    /// Filter parameters.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub parameters: Value,
}

impl FilterConfiguration {
    /// Constructs filter reference.
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// Variant of the feature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VariantDefinition {
    /// Variant name, referenced by allocation.
    pub name: String,
    /// Arbitrary value of the variant.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub configuration_value: Value,
    /// Feature state override.
    pub status_override: StatusOverride,
}

/// Feature as it comes from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FeatureDefinition {
    /// Feature name.
    pub name: String,
    /// Disabled feature is never enabled by filters.
    pub enabled: bool,
    /// Filters, the enabled feature without filters is always on.
    pub enabled_for: Vec<FilterConfiguration>,
    /// How filters are combined.
    pub requirement_type: RequirementType,
    /// Variant allocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Allocation>,
    /// Variants.
    pub variants: Vec<VariantDefinition>,
}

impl Default for FeatureDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            enabled_for: Vec::new(),
            requirement_type: RequirementType::Any,
            allocation: None,
            variants: Vec::new(),
        }
    }
}

impl FeatureDefinition {
    /// Enabled feature without filters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds filter.
    pub fn with_filter(mut self, name: impl Into<String>, parameters: Value) -> Self {
        self.enabled_for.push(FilterConfiguration::new(name, parameters));
        self
    }

    /// Sets requirement type.
    pub fn with_requirement_type(mut self, requirement_type: RequirementType) -> Self {
        self.requirement_type = requirement_type;
        self
    }
}

/// Variant assigned to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Variant name.
    pub name: String,
    /// Arbitrary value of the variant.
    pub configuration: Value,
    /// Why it's assigned.
    pub reason: VariantAssignmentReason,
}

/// Evaluates features by name.
pub struct FeatureManager {
    features: HashMap<String, FeatureDefinition>,
    filters: Vec<Box<dyn FeatureFilter>>,
    ignore_case: bool,
}

impl Default for FeatureManager {
    fn default() -> Self {
        Self::with_default_filters()
    }
}

impl FeatureManager {
    /// Manager without filters.
    pub fn new() -> Self {
        Self {
            features: HashMap::new(),
            filters: Vec::new(),
            ignore_case: false,
        }
    }

    /// Manager with filters shipped with the crate.
    pub fn with_default_filters() -> Self {
        let mut manager = Self::new();
        manager.filters = default_filters();
        manager
    }

    /// Sets case-insensitive comparison of user ids and group names in allocation.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Registers the filter, replaces a filter with the same name.
    pub fn add_filter(&mut self, filter: impl FeatureFilter + 'static) {
        self.filters.retain(|existing| !existing.is_named(filter.name()));
        self.filters.push(Box::new(filter));
    }

    /// Adds or replaces the feature, fails if its allocation is invalid.
    pub fn add_feature(&mut self, feature: FeatureDefinition) -> Result<()> {
        if let Some(allocation) = &feature.allocation {
            allocation.validate()?;
        }
        self.features.insert(feature.name.clone(), feature);
        Ok(())
    }

    /// Adds or replaces all features.
    pub fn add_features(&mut self, features: impl IntoIterator<Item = FeatureDefinition>) -> Result<()> {
        features.into_iter().try_for_each(|feature| self.add_feature(feature))
    }

    /// Names of the known features.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Returns `true` if the feature is enabled in the `context`.
    ///
    /// Fails if the feature is unknown or parameters of its filters are invalid.
    pub fn is_enabled(&self, feature_name: &str, context: &EvaluationContext) -> Result<bool> {
        let feature = self.feature(feature_name)?;
        let enabled = self.evaluate_filters(feature, context)?;

        let status_override = self
            .assign_variant(feature, enabled, context)
            .map(|(definition, _)| definition.status_override);

        Ok(match status_override {
            Some(StatusOverride::Enabled) => true,
            Some(StatusOverride::Disabled) => false,
            _ => enabled,
        })
    }

    /// Returns variant of the feature assigned in the `context`.
    ///
    /// Fails if the feature is unknown or parameters of its filters are invalid.
    pub fn get_variant(&self, feature_name: &str, context: &EvaluationContext) -> Result<Option<Variant>> {
        let feature = self.feature(feature_name)?;
        let enabled = self.evaluate_filters(feature, context)?;

        Ok(self
            .assign_variant(feature, enabled, context)
            .map(|(definition, reason)| Variant {
                name: definition.name.clone(),
                configuration: definition.configuration_value.clone(),
                reason,
            }))
    }

    fn feature(&self, feature_name: &str) -> Result<&FeatureDefinition> {
        self.features
            .get(feature_name)
            .ok_or_else(|| Error::UnknownFeature(feature_name.to_owned()))
    }

    fn find_filter(&self, name: &str) -> Option<&dyn FeatureFilter> {
        self.filters.iter().find(|filter| filter.is_named(name)).map(|filter| filter.as_ref())
    }

    fn evaluate_filters(&self, feature: &FeatureDefinition, context: &EvaluationContext) -> Result<bool> {
        if !feature.enabled {
            return Ok(false);
        }
        if feature.enabled_for.is_empty() {
            return Ok(true);
        }

        for configuration in &feature.enabled_for {
            let enabled = match self.find_filter(&configuration.name) {
                Some(filter) => {
                    let evaluation = filter.evaluate(&FilterContext {
                        feature_name: &feature.name,
                        parameters: &configuration.parameters,
                        app: context,
                    })?;
                    if let Some(warning) = &evaluation.warning {
                        warn!(
                            "filter `{}` of feature `{}`: {warning}",
                            configuration.name, feature.name
                        );
                    }
                    evaluation.enabled
                }
                None => {
                    warn!(
                        "filter `{}` of feature `{}` isn't registered",
                        configuration.name, feature.name
                    );
                    false
                }
            };

            match feature.requirement_type {
                RequirementType::Any if enabled => return Ok(true),
                RequirementType::All if !enabled => return Ok(false),
                _ => {}
            }
        }

        Ok(feature.requirement_type == RequirementType::All)
    }

    fn assign_variant<'a>(
        &self,
        feature: &'a FeatureDefinition,
        enabled: bool,
        context: &EvaluationContext,
    ) -> Option<(&'a VariantDefinition, VariantAssignmentReason)> {
        let allocation = feature.allocation.as_ref()?;
        if feature.variants.is_empty() {
            return None;
        }

        let assignment = if !enabled {
            allocation.assign_disabled()
        } else if let Some(targeting) = &context.targeting {
            allocation.assign(targeting, &feature.name, self.ignore_case)
        } else {
            debug!("no targeting context for variant of feature `{}`", feature.name);
            allocation
                .default_when_enabled
                .as_deref()
                .map(|variant| VariantAssignment {
                    variant,
                    reason: VariantAssignmentReason::DefaultWhenEnabled,
                })
        };
        let assignment = assignment?;

        let definition = feature.variants.iter().find(|variant| variant.name == assignment.variant);
        if definition.is_none() {
            warn!(
                "variant `{}` of feature `{}` isn't defined",
                assignment.variant, feature.name
            );
        }
        definition.map(|definition| (definition, assignment.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        filters::{FixedClock, TimeWindowFilter},
        targeting::TargetingContext,
    };
    use chrono::{DateTime, Utc};
    use rstest::rstest;
    use serde_json::json;

    fn manager_at(now: &str) -> FeatureManager {
        let mut manager = FeatureManager::with_default_filters();
        manager.add_filter(TimeWindowFilter::with_clock(FixedClock(
            DateTime::parse_from_rfc3339(now).unwrap().with_timezone(&Utc),
        )));
        manager
    }

    fn always_on() -> FilterConfiguration {
        FilterConfiguration::new("Percentage", json!({"Value": 100}))
    }

    fn always_off() -> FilterConfiguration {
        FilterConfiguration::new("Percentage", json!({"Value": 0}))
    }

    #[rstest]
    #[case(RequirementType::Any, vec![], true)]
    #[case(RequirementType::Any, vec![always_off(), always_on()], true)]
    #[case(RequirementType::Any, vec![always_off(), always_off()], false)]
    #[case(RequirementType::All, vec![always_on(), always_on()], true)]
    #[case(RequirementType::All, vec![always_on(), always_off()], false)]
    #[case(RequirementType::Any, vec![FilterConfiguration::new("Unknown", Value::Null)], false)]
    #[case(RequirementType::Any, vec![FilterConfiguration::new("Unknown", Value::Null), always_on()], true)]
    fn test_requirement_type(
        #[case] requirement_type: RequirementType,
        #[case] filters: Vec<FilterConfiguration>,
        #[case] expected: bool,
    ) {
        let mut manager = FeatureManager::with_default_filters();
        manager
            .add_feature(FeatureDefinition {
                enabled_for: filters,
                ..FeatureDefinition::new("Beta").with_requirement_type(requirement_type)
            })
            .unwrap();
        assert_eq!(manager.is_enabled("Beta", &EvaluationContext::default()), Ok(expected));
    }

    #[test]
    fn test_disabled_feature() {
        let mut manager = FeatureManager::with_default_filters();
        manager
            .add_feature(FeatureDefinition {
                enabled: false,
                enabled_for: vec![always_on()],
                ..FeatureDefinition::new("Beta")
            })
            .unwrap();
        assert_eq!(manager.is_enabled("Beta", &EvaluationContext::default()), Ok(false));
    }

    #[test]
    fn test_unknown_feature() {
        let manager = FeatureManager::new();
        assert_eq!(
            manager.is_enabled("Beta", &EvaluationContext::default()),
            Err(Error::UnknownFeature("Beta".to_owned()))
        );
    }

    #[test]
    fn test_invalid_filter_parameters_fail() {
        let mut manager = FeatureManager::with_default_filters();
        manager
            .add_feature(FeatureDefinition::new("Beta").with_filter("Microsoft.Percentage", json!({"Value": "half"})))
            .unwrap();
        assert!(matches!(
            manager.is_enabled("Beta", &EvaluationContext::default()),
            Err(Error::InvalidFilterParameters { .. })
        ));
    }

    #[rstest]
    #[case("2024-01-01T10:30:00Z", true)]
    #[case("2024-01-01T11:30:00Z", false)]
    fn test_time_window_with_clock(#[case] now: &str, #[case] expected: bool) {
        let mut manager = manager_at(now);
        manager
            .add_feature(FeatureDefinition::new("Beta").with_filter(
                "TimeWindow",
                json!({"Start": "2024-01-01T10:00:00Z", "End": "2024-01-01T11:00:00Z"}),
            ))
            .unwrap();
        assert_eq!(manager.is_enabled("Beta", &EvaluationContext::default()), Ok(expected));
    }

    fn feature_with_variants(enabled: bool) -> FeatureDefinition {
        serde_json::from_value(json!({
            "Name": "Checkout",
            "Enabled": enabled,
            "Allocation": {
                "DefaultWhenDisabled": "Off",
                "DefaultWhenEnabled": "On",
                "User": [{"Variant": "Forced", "Users": ["Marsha"]}],
                "Group": [{"Variant": "Hidden", "Groups": ["Blocked"]}]
            },
            "Variants": [
                {"Name": "Off", "ConfigurationValue": "old"},
                {"Name": "On", "ConfigurationValue": "new"},
                {"Name": "Forced", "ConfigurationValue": "new", "StatusOverride": "Enabled"},
                {"Name": "Hidden", "StatusOverride": "Disabled"}
            ]
        }))
        .unwrap()
    }

    #[rstest]
    #[case(true, None, "On", VariantAssignmentReason::DefaultWhenEnabled, true)]
    #[case(true, Some(TargetingContext::new("Alice")), "On", VariantAssignmentReason::DefaultWhenEnabled, true)]
    #[case(true, Some(TargetingContext::new("Alice").with_groups(["Blocked"])), "Hidden", VariantAssignmentReason::Group, false)]
    #[case(false, Some(TargetingContext::new("Alice")), "Off", VariantAssignmentReason::DefaultWhenDisabled, false)]
    #[case(false, Some(TargetingContext::new("Marsha")), "Off", VariantAssignmentReason::DefaultWhenDisabled, false)]
    #[case(true, Some(TargetingContext::new("Marsha")), "Forced", VariantAssignmentReason::User, true)]
    fn test_variants(
        #[case] enabled: bool,
        #[case] targeting: Option<TargetingContext>,
        #[case] variant: &str,
        #[case] reason: VariantAssignmentReason,
        #[case] expected: bool,
    ) {
        let mut manager = FeatureManager::with_default_filters();
        manager.add_feature(feature_with_variants(enabled)).unwrap();
        let context = EvaluationContext {
            targeting,
            ..Default::default()
        };

        let assigned = manager.get_variant("Checkout", &context).unwrap().unwrap();
        assert_eq!(assigned.name, variant);
        assert_eq!(assigned.reason, reason);
        assert_eq!(manager.is_enabled("Checkout", &context), Ok(expected));
    }

    #[test]
    fn test_status_override_enables_disabled_by_filters() {
        let mut feature = feature_with_variants(true);
        feature.enabled_for = vec![always_off()];
        feature.variants[0].status_override = StatusOverride::Enabled;

        let mut manager = FeatureManager::with_default_filters();
        manager.add_feature(feature).unwrap();
        assert_eq!(manager.is_enabled("Checkout", &EvaluationContext::default()), Ok(true));
    }

    #[test]
    fn test_undefined_variant() {
        let mut feature = feature_with_variants(true);
        feature.variants.retain(|variant| variant.name != "On");

        let mut manager = FeatureManager::with_default_filters();
        manager.add_feature(feature).unwrap();
        assert_eq!(manager.get_variant("Checkout", &EvaluationContext::default()), Ok(None));
        assert_eq!(manager.is_enabled("Checkout", &EvaluationContext::default()), Ok(true));
    }

    #[test]
    fn test_invalid_allocation_is_rejected() {
        let mut manager = FeatureManager::new();
        let feature: FeatureDefinition = serde_json::from_value(json!({
            "Name": "Checkout",
            "Allocation": {"Percentile": [{"Variant": "On", "From": 50, "To": 10}]}
        }))
        .unwrap();
        assert_eq!(
            manager.add_feature(feature).unwrap_err().validation(),
            Some(("Allocation.Percentile[0].To", crate::ValidationReason::ValueOutOfRange))
        );
        assert_eq!(manager.feature_names().count(), 0);
    }

    #[test]
    fn test_deserialize_definition() {
        let feature: FeatureDefinition = serde_json::from_value(json!({
            "Name": "Beta",
            "EnabledFor": [{"Name": "Browser", "Parameters": {"AllowedBrowsers": ["Firefox"]}}],
            "RequirementType": "all"
        }))
        .unwrap();
        assert!(feature.enabled);
        assert_eq!(feature.requirement_type, RequirementType::All);
        assert_eq!(feature.enabled_for[0].name, "Browser");
        assert!(feature.variants.is_empty());
    }
}
