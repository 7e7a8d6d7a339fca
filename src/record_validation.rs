use crate::model::{Assignment, AssignmentKey, DataProduct, Label, Person, Role, Skill};
use std::collections::HashSet;
use thiserror::Error;

/// Upper bound for a person's contracted weekly hours.
pub const MAX_WEEKLY_HOURS: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RecordValidationError {
    message: String,
}

impl RecordValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn require_text(kind: &str, field: &str, id: &str, value: &str) -> Result<(), RecordValidationError> {
    if value.trim().is_empty() {
        return Err(RecordValidationError::new(format!(
            "{kind} '{id}' has an empty {field}"
        )));
    }
    Ok(())
}

fn require_id(kind: &str, id: &str) -> Result<(), RecordValidationError> {
    if id.trim().is_empty() {
        return Err(RecordValidationError::new(format!("{kind} id must not be empty")));
    }
    Ok(())
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn validate_person(person: &Person) -> Result<(), RecordValidationError> {
    require_id("person", &person.id)?;
    require_text("person", "name", &person.id, &person.name)?;
    if let Some(hours) = person.weekly_hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(RecordValidationError::new(format!(
                "person '{}' has invalid weekly_hours {hours}",
                person.id
            )));
        }
        if hours > MAX_WEEKLY_HOURS {
            return Err(RecordValidationError::new(format!(
                "person '{}' has weekly_hours {hours} above {MAX_WEEKLY_HOURS}",
                person.id
            )));
        }
    }
    Ok(())
}

pub fn validate_role(role: &Role) -> Result<(), RecordValidationError> {
    require_id("role", &role.id)?;
    require_text("role", "name", &role.id, &role.name)?;
    if !role.color.is_empty() && !is_hex_color(&role.color) {
        return Err(RecordValidationError::new(format!(
            "role '{}' has invalid color '{}' (expected #RRGGBB)",
            role.id, role.color
        )));
    }
    Ok(())
}

pub fn validate_data_product(product: &DataProduct) -> Result<(), RecordValidationError> {
    require_id("data product", &product.id)?;
    require_text("data product", "name", &product.id, &product.name)
}

pub fn validate_label(label: &Label) -> Result<(), RecordValidationError> {
    require_id("label", &label.id)?;
    require_text("label", "name", &label.id, &label.name)
}

pub fn validate_skill(skill: &Skill) -> Result<(), RecordValidationError> {
    require_id("skill", &skill.id)?;
    require_text("skill", "name", &skill.id, &skill.name)
}

pub fn validate_assignment_hours(key: &AssignmentKey, hours: f64) -> Result<(), RecordValidationError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(RecordValidationError::new(format!(
            "assignment {key} has invalid hours {hours}"
        )));
    }
    Ok(())
}

pub fn validate_assignment(assignment: &Assignment) -> Result<(), RecordValidationError> {
    require_id("assignment person", &assignment.person_id)?;
    require_id("assignment data product", &assignment.data_product_id)?;
    require_id("assignment role", &assignment.role_id)?;
    validate_assignment_hours(&assignment.key(), assignment.hours)
}

fn unique_ids<'a, I>(kind: &str, ids: I) -> Result<HashSet<&'a str>, RecordValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(RecordValidationError::new(format!("duplicate {kind} id '{id}'")));
        }
    }
    Ok(seen)
}

/// Whole-collection checks: per-record rules, unique ids, unique assignment
/// keys and assignments pointing at existing records.
pub fn validate_collections(
    persons: &[Person],
    roles: &[Role],
    data_products: &[DataProduct],
    assignments: &[Assignment],
) -> Result<(), RecordValidationError> {
    for person in persons {
        validate_person(person)?;
    }
    for role in roles {
        validate_role(role)?;
    }
    for product in data_products {
        validate_data_product(product)?;
    }

    let person_ids = unique_ids("person", persons.iter().map(|p| p.id.as_str()))?;
    let role_ids = unique_ids("role", roles.iter().map(|r| r.id.as_str()))?;
    let product_ids = unique_ids("data product", data_products.iter().map(|d| d.id.as_str()))?;

    let mut keys = HashSet::new();
    for assignment in assignments {
        validate_assignment(assignment)?;
        let key = assignment.key();
        if !person_ids.contains(key.person_id.as_str()) {
            return Err(RecordValidationError::new(format!(
                "assignment {key} references unknown person"
            )));
        }
        if !product_ids.contains(key.data_product_id.as_str()) {
            return Err(RecordValidationError::new(format!(
                "assignment {key} references unknown data product"
            )));
        }
        if !role_ids.contains(key.role_id.as_str()) {
            return Err(RecordValidationError::new(format!(
                "assignment {key} references unknown role"
            )));
        }
        if !keys.insert(key.clone()) {
            return Err(RecordValidationError::new(format!("duplicate assignment {key}")));
        }
    }
    Ok(())
}

/// Per-record rules and unique ids for labels and skills.
pub fn validate_tags(labels: &[Label], skills: &[Skill]) -> Result<(), RecordValidationError> {
    for label in labels {
        validate_label(label)?;
    }
    for skill in skills {
        validate_skill(skill)?;
    }
    unique_ids("label", labels.iter().map(|l| l.id.as_str()))?;
    unique_ids("skill", skills.iter().map(|s| s.id.as_str()))?;
    Ok(())
}
