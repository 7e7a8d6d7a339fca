use chrono::NaiveDate;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub type PersonId = String;
pub type RoleId = String;
pub type DataProductId = String;
pub type LabelId = String;
pub type SkillId = String;

/// A team member with a weekly capacity and tags used for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    /// Contracted hours per week. `None` falls back to [`Person::DEFAULT_WEEKLY_HOURS`];
    /// an explicit `0` is kept as zero capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_hours: Option<f64>,
    #[serde(default)]
    pub skill_ids: BTreeSet<SkillId>,
    /// Labels drive the affinity fallback when a person has no history in a role.
    #[serde(default)]
    pub label_ids: BTreeSet<LabelId>,
    /// Organisation membership flag ("M13").
    #[serde(default)]
    pub is_m13: bool,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl Person {
    pub const DEFAULT_WEEKLY_HOURS: f64 = 31.0;

    pub fn new(id: impl Into<PersonId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weekly_hours: None,
            skill_ids: BTreeSet::new(),
            label_ids: BTreeSet::new(),
            is_m13: false,
            categories: BTreeSet::new(),
        }
    }

    pub fn with_weekly_hours(mut self, hours: f64) -> Self {
        self.weekly_hours = Some(hours);
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<LabelId>,
    {
        self.label_ids.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SkillId>,
    {
        self.skill_ids.extend(skills.into_iter().map(Into::into));
        self
    }

    /// Weekly capacity with the default applied.
    pub fn capacity(&self) -> f64 {
        self.weekly_hours.unwrap_or(Self::DEFAULT_WEEKLY_HOURS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    /// Display color (`#RRGGBB`). Expected to be unique across roles.
    #[serde(default)]
    pub color: String,
}

impl Role {
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProduct {
    pub id: DataProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DataProduct {
    pub fn new(id: impl Into<DataProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Label {
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Skill {
    pub fn new(id: impl Into<SkillId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
        }
    }
}

/// The unique key of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub person_id: PersonId,
    pub data_product_id: DataProductId,
    pub role_id: RoleId,
}

impl AssignmentKey {
    pub fn new(
        person_id: impl Into<PersonId>,
        data_product_id: impl Into<DataProductId>,
        role_id: impl Into<RoleId>,
    ) -> Self {
        Self {
            person_id: person_id.into(),
            data_product_id: data_product_id.into(),
            role_id: role_id.into(),
        }
    }
}

impl fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.person_id, self.data_product_id, self.role_id
        )
    }
}

/// A person occupying a role on a data product for a number of weekly hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub person_id: PersonId,
    pub data_product_id: DataProductId,
    pub role_id: RoleId,
    /// Weekly hours. Missing, null, non-numeric or non-finite input reads as `0`.
    #[serde(default, deserialize_with = "deserialize_lenient_hours")]
    pub hours: f64,
    /// Set once the assignment is over; it then only counts as role history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_on: Option<NaiveDate>,
}

impl Assignment {
    pub fn new(
        person_id: impl Into<PersonId>,
        data_product_id: impl Into<DataProductId>,
        role_id: impl Into<RoleId>,
        hours: f64,
    ) -> Self {
        Self {
            person_id: person_id.into(),
            data_product_id: data_product_id.into(),
            role_id: role_id.into(),
            hours,
            ended_on: None,
        }
    }

    pub fn ended(mut self, date: NaiveDate) -> Self {
        self.ended_on = Some(date);
        self
    }

    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::new(
            self.person_id.clone(),
            self.data_product_id.clone(),
            self.role_id.clone(),
        )
    }

    pub fn matches(&self, key: &AssignmentKey) -> bool {
        self.person_id == key.person_id
            && self.data_product_id == key.data_product_id
            && self.role_id == key.role_id
    }

    pub fn is_current(&self) -> bool {
        self.ended_on.is_none()
    }

    /// Hours as a usable number; anything non-finite counts as zero.
    pub fn effective_hours(&self) -> f64 {
        sanitize_hours(self.hours)
    }
}

/// One line of a team request: a role and the weekly hours it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRequirement {
    #[serde(default)]
    pub role_id: RoleId,
    #[serde(default)]
    pub hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

impl RoleRequirement {
    pub fn new(role_id: impl Into<RoleId>, hours: f64) -> Self {
        Self {
            role_id: role_id.into(),
            hours,
            role_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.role_name = Some(name.into());
        self
    }
}

pub(crate) fn sanitize_hours(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Parses an hours cell the way imported sheets deliver it.
pub fn parse_lenient_hours(input: &str) -> f64 {
    input
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map(sanitize_hours)
        .unwrap_or(0.0)
}

fn deserialize_lenient_hours<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LooseHours {
        Number(f64),
        Text(String),
        Other(IgnoredAny),
    }

    Ok(match LooseHours::deserialize(deserializer)? {
        LooseHours::Number(value) => sanitize_hours(value),
        LooseHours::Text(text) => parse_lenient_hours(&text),
        LooseHours::Other(_) => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_defaults_only_when_absent() {
        let person = Person::new("p1", "Ada");
        assert_eq!(person.capacity(), 31.0);
        let zero = Person::new("p2", "Bob").with_weekly_hours(0.0);
        assert_eq!(zero.capacity(), 0.0);
    }

    #[test]
    fn assignment_hours_deserialize_leniently() {
        let json = r#"[
            {"person_id":"p","data_product_id":"d","role_id":"r","hours":"12,5"},
            {"person_id":"p","data_product_id":"d","role_id":"r","hours":null},
            {"person_id":"p","data_product_id":"d","role_id":"r","hours":"lots"},
            {"person_id":"p","data_product_id":"d","role_id":"r"},
            {"person_id":"p","data_product_id":"d","role_id":"r","hours":8}
        ]"#;
        let parsed: Vec<Assignment> = serde_json::from_str(json).unwrap();
        let hours: Vec<f64> = parsed.iter().map(|a| a.hours).collect();
        assert_eq!(hours, vec![12.5, 0.0, 0.0, 0.0, 8.0]);
    }

    #[test]
    fn person_sets_default_when_missing() {
        let person: Person = serde_json::from_str(r#"{"id":"p1","name":"Ada"}"#).unwrap();
        assert!(person.label_ids.is_empty());
        assert!(person.weekly_hours.is_none());
        assert!(!person.is_m13);
    }
}
