use crate::config::EngineConfig;
use crate::model::RoleRequirement;
use thiserror::Error;

/// A single problem with a requirement list. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequirementError {
    #[error("at least one role requirement required")]
    Empty,
    #[error("requirement {position}: role must be selected")]
    MissingRole { position: usize },
    #[error("requirement {position}: hours must be greater than 0")]
    NonPositiveHours { position: usize },
    #[error("requirement {position}: max {max} hours/week allowed")]
    TooManyHours { position: usize, max: f64 },
}

/// Collects every violation instead of stopping at the first one.
pub fn check_role_requirements(
    requirements: &[RoleRequirement],
    max_hours: f64,
) -> Vec<RequirementError> {
    if requirements.is_empty() {
        return vec![RequirementError::Empty];
    }

    let mut errors = Vec::new();
    for (idx, requirement) in requirements.iter().enumerate() {
        let position = idx + 1;
        if requirement.role_id.trim().is_empty() {
            errors.push(RequirementError::MissingRole { position });
        }
        // NaN fails this comparison too.
        if !(requirement.hours > 0.0) {
            errors.push(RequirementError::NonPositiveHours { position });
        } else if requirement.hours > max_hours {
            errors.push(RequirementError::TooManyHours {
                position,
                max: max_hours,
            });
        }
    }
    errors
}

pub fn validate_role_requirements(requirements: &[RoleRequirement]) -> Vec<String> {
    validate_role_requirements_with(requirements, &EngineConfig::default())
}

pub fn validate_role_requirements_with(
    requirements: &[RoleRequirement],
    config: &EngineConfig,
) -> Vec<String> {
    check_role_requirements(requirements, config.max_requirement_hours)
        .iter()
        .map(ToString::to_string)
        .collect()
}
