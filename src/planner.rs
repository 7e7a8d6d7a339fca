use crate::config::EngineConfig;
use crate::model::{
    Assignment, AssignmentKey, DataProduct, Label, LabelId, Person, Role, RoleId,
    RoleRequirement, Skill,
};
use crate::recommendation::{
    PlanningSnapshot, RecommendationEngine, RoleRecommendation, validate_role_requirements_with,
};
use crate::recommendation::team::TeamResult;
use crate::record_validation::{self, RecordValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Colors handed out by [`Planner::fix_role_colors`], in order.
pub const ROLE_COLOR_PALETTE: [&str; 16] = [
    "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2", "#7F7F7F",
    "#BCBD22", "#17BECF", "#393B79", "#637939", "#8C6D31", "#843C39", "#7B4173", "#3182BD",
];

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{kind} '{id}' already exists")]
    Conflict { kind: &'static str, id: String },
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("role '{role_id}' is still used by {count} assignment(s)")]
    RoleInUse { role_id: RoleId, count: usize },
    #[error("invalid data: {0}")]
    InvalidData(#[from] RecordValidationError),
    #[error("invalid requirements: {}", .0.join("; "))]
    InvalidRequirements(Vec<String>),
}

impl PlannerError {
    fn conflict(kind: &'static str, id: impl Into<String>) -> Self {
        PlannerError::Conflict {
            kind,
            id: id.into(),
        }
    }

    fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        PlannerError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Plain collections of a planner, the unit that gets persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerData {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub data_products: Vec<DataProduct>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

impl PlannerData {
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        record_validation::validate_collections(
            &self.persons,
            &self.roles,
            &self.data_products,
            &self.assignments,
        )?;
        record_validation::validate_tags(&self.labels, &self.skills)
    }
}

/// In-memory owner of every planning collection. Insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Planner {
    data: PlannerData,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: PlannerData) -> PlannerResult<Self> {
        data.validate()?;
        Ok(Self { data })
    }

    pub fn data(&self) -> &PlannerData {
        &self.data
    }

    pub fn into_data(self) -> PlannerData {
        self.data
    }

    pub fn persons(&self) -> &[Person] {
        &self.data.persons
    }

    pub fn roles(&self) -> &[Role] {
        &self.data.roles
    }

    pub fn data_products(&self) -> &[DataProduct] {
        &self.data.data_products
    }

    pub fn labels(&self) -> &[Label] {
        &self.data.labels
    }

    pub fn skills(&self) -> &[Skill] {
        &self.data.skills
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.data.assignments
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.data.persons.iter().find(|p| p.id == id)
    }

    pub fn role(&self, id: &str) -> Option<&Role> {
        self.data.roles.iter().find(|r| r.id == id)
    }

    pub fn data_product(&self, id: &str) -> Option<&DataProduct> {
        self.data.data_products.iter().find(|d| d.id == id)
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.data.labels.iter().find(|l| l.id == id)
    }

    pub fn skill(&self, id: &str) -> Option<&Skill> {
        self.data.skills.iter().find(|s| s.id == id)
    }

    pub fn assignment(&self, key: &AssignmentKey) -> Option<&Assignment> {
        self.data.assignments.iter().find(|a| a.matches(key))
    }

    pub fn assignments_for_person<'a>(
        &'a self,
        person_id: &'a str,
    ) -> impl Iterator<Item = &'a Assignment> + 'a {
        self.data
            .assignments
            .iter()
            .filter(move |a| a.person_id == person_id)
    }

    pub fn snapshot(&self) -> PlanningSnapshot<'_> {
        PlanningSnapshot::new(&self.data.persons, &self.data.roles, &self.data.assignments)
            .with_labels(&self.data.labels)
    }

    // persons

    pub fn add_person(&mut self, person: Person) -> PlannerResult<()> {
        record_validation::validate_person(&person)?;
        if self.person(&person.id).is_some() {
            return Err(PlannerError::conflict("person", person.id));
        }
        tracing::info!(person_id = %person.id, "person added");
        self.data.persons.push(person);
        Ok(())
    }

    pub fn update_person(&mut self, person: Person) -> PlannerResult<()> {
        record_validation::validate_person(&person)?;
        let slot = self
            .data
            .persons
            .iter_mut()
            .find(|p| p.id == person.id)
            .ok_or_else(|| PlannerError::not_found("person", person.id.clone()))?;
        tracing::debug!(person_id = %person.id, "person updated");
        *slot = person;
        Ok(())
    }

    /// Removes the person together with all of their assignments.
    pub fn remove_person(&mut self, id: &str) -> PlannerResult<Person> {
        let idx = self
            .data
            .persons
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PlannerError::not_found("person", id))?;
        let person = self.data.persons.remove(idx);
        let before = self.data.assignments.len();
        self.data.assignments.retain(|a| a.person_id != id);
        tracing::info!(
            person_id = id,
            assignments_removed = before - self.data.assignments.len(),
            "person removed"
        );
        Ok(person)
    }

    pub fn tag_person(&mut self, person_id: &str, label_id: &str) -> PlannerResult<()> {
        if self.label(label_id).is_none() {
            return Err(PlannerError::not_found("label", label_id));
        }
        let person = self
            .data
            .persons
            .iter_mut()
            .find(|p| p.id == person_id)
            .ok_or_else(|| PlannerError::not_found("person", person_id))?;
        person.label_ids.insert(LabelId::from(label_id));
        Ok(())
    }

    // roles

    pub fn add_role(&mut self, role: Role) -> PlannerResult<()> {
        record_validation::validate_role(&role)?;
        if self.role(&role.id).is_some() {
            return Err(PlannerError::conflict("role", role.id));
        }
        tracing::info!(role_id = %role.id, "role added");
        self.data.roles.push(role);
        Ok(())
    }

    pub fn update_role(&mut self, role: Role) -> PlannerResult<()> {
        record_validation::validate_role(&role)?;
        let slot = self
            .data
            .roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| PlannerError::not_found("role", role.id.clone()))?;
        *slot = role;
        Ok(())
    }

    /// Fails with [`PlannerError::RoleInUse`] while any assignment, current or
    /// ended, references the role.
    pub fn remove_role(&mut self, id: &str) -> PlannerResult<Role> {
        let idx = self
            .data
            .roles
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PlannerError::not_found("role", id))?;
        let count = self
            .data
            .assignments
            .iter()
            .filter(|a| a.role_id == id)
            .count();
        if count > 0 {
            return Err(PlannerError::RoleInUse {
                role_id: id.to_string(),
                count,
            });
        }
        tracing::info!(role_id = id, "role removed");
        Ok(self.data.roles.remove(idx))
    }

    // data products

    pub fn add_data_product(&mut self, product: DataProduct) -> PlannerResult<()> {
        record_validation::validate_data_product(&product)?;
        if self.data_product(&product.id).is_some() {
            return Err(PlannerError::conflict("data product", product.id));
        }
        tracing::info!(data_product_id = %product.id, "data product added");
        self.data.data_products.push(product);
        Ok(())
    }

    pub fn update_data_product(&mut self, product: DataProduct) -> PlannerResult<()> {
        record_validation::validate_data_product(&product)?;
        let slot = self
            .data
            .data_products
            .iter_mut()
            .find(|d| d.id == product.id)
            .ok_or_else(|| PlannerError::not_found("data product", product.id.clone()))?;
        *slot = product;
        Ok(())
    }

    /// Removes the data product together with its assignments.
    pub fn remove_data_product(&mut self, id: &str) -> PlannerResult<DataProduct> {
        let idx = self
            .data
            .data_products
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| PlannerError::not_found("data product", id))?;
        let product = self.data.data_products.remove(idx);
        let before = self.data.assignments.len();
        self.data.assignments.retain(|a| a.data_product_id != id);
        tracing::info!(
            data_product_id = id,
            assignments_removed = before - self.data.assignments.len(),
            "data product removed"
        );
        Ok(product)
    }

    // labels and skills

    pub fn add_label(&mut self, label: Label) -> PlannerResult<()> {
        record_validation::validate_label(&label)?;
        if self.label(&label.id).is_some() {
            return Err(PlannerError::conflict("label", label.id));
        }
        self.data.labels.push(label);
        Ok(())
    }

    pub fn update_label(&mut self, label: Label) -> PlannerResult<()> {
        record_validation::validate_label(&label)?;
        let slot = self
            .data
            .labels
            .iter_mut()
            .find(|l| l.id == label.id)
            .ok_or_else(|| PlannerError::not_found("label", label.id.clone()))?;
        *slot = label;
        Ok(())
    }

    /// Removes the label and strips it from every person.
    pub fn remove_label(&mut self, id: &str) -> PlannerResult<Label> {
        let idx = self
            .data
            .labels
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| PlannerError::not_found("label", id))?;
        for person in &mut self.data.persons {
            person.label_ids.remove(id);
        }
        tracing::info!(label_id = id, "label removed");
        Ok(self.data.labels.remove(idx))
    }

    pub fn add_skill(&mut self, skill: Skill) -> PlannerResult<()> {
        record_validation::validate_skill(&skill)?;
        if self.skill(&skill.id).is_some() {
            return Err(PlannerError::conflict("skill", skill.id));
        }
        self.data.skills.push(skill);
        Ok(())
    }

    pub fn update_skill(&mut self, skill: Skill) -> PlannerResult<()> {
        record_validation::validate_skill(&skill)?;
        let slot = self
            .data
            .skills
            .iter_mut()
            .find(|s| s.id == skill.id)
            .ok_or_else(|| PlannerError::not_found("skill", skill.id.clone()))?;
        *slot = skill;
        Ok(())
    }

    /// Removes the skill and strips it from every person.
    pub fn remove_skill(&mut self, id: &str) -> PlannerResult<Skill> {
        let idx = self
            .data
            .skills
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| PlannerError::not_found("skill", id))?;
        for person in &mut self.data.persons {
            person.skill_ids.remove(id);
        }
        tracing::info!(skill_id = id, "skill removed");
        Ok(self.data.skills.remove(idx))
    }

    // assignments

    pub fn assign(&mut self, assignment: Assignment) -> PlannerResult<()> {
        record_validation::validate_assignment(&assignment)?;
        if self.person(&assignment.person_id).is_none() {
            return Err(PlannerError::not_found("person", assignment.person_id));
        }
        if self.data_product(&assignment.data_product_id).is_none() {
            return Err(PlannerError::not_found(
                "data product",
                assignment.data_product_id,
            ));
        }
        if self.role(&assignment.role_id).is_none() {
            return Err(PlannerError::not_found("role", assignment.role_id));
        }
        let key = assignment.key();
        if self.assignment(&key).is_some() {
            return Err(PlannerError::conflict("assignment", key.to_string()));
        }
        tracing::info!(assignment = %key, hours = assignment.hours, "assignment added");
        self.data.assignments.push(assignment);
        Ok(())
    }

    pub fn set_assignment_hours(&mut self, key: &AssignmentKey, hours: f64) -> PlannerResult<()> {
        record_validation::validate_assignment_hours(key, hours)?;
        let assignment = self.assignment_mut(key)?;
        assignment.hours = hours;
        tracing::debug!(assignment = %key, hours, "assignment hours changed");
        Ok(())
    }

    /// Marks the assignment as over. It stays on record as role history.
    pub fn end_assignment(&mut self, key: &AssignmentKey, date: NaiveDate) -> PlannerResult<()> {
        let assignment = self.assignment_mut(key)?;
        assignment.ended_on = Some(date);
        tracing::info!(assignment = %key, ended_on = %date, "assignment ended");
        Ok(())
    }

    pub fn unassign(&mut self, key: &AssignmentKey) -> PlannerResult<Assignment> {
        let idx = self
            .data
            .assignments
            .iter()
            .position(|a| a.matches(key))
            .ok_or_else(|| PlannerError::not_found("assignment", key.to_string()))?;
        tracing::info!(assignment = %key, "assignment removed");
        Ok(self.data.assignments.remove(idx))
    }

    fn assignment_mut(&mut self, key: &AssignmentKey) -> PlannerResult<&mut Assignment> {
        self.data
            .assignments
            .iter_mut()
            .find(|a| a.matches(key))
            .ok_or_else(|| PlannerError::not_found("assignment", key.to_string()))
    }

    // role colors

    /// Groups of role ids sharing one color (case-insensitive), first owner first.
    pub fn duplicate_role_colors(&self) -> Vec<(String, Vec<RoleId>)> {
        let mut groups: Vec<(String, Vec<RoleId>)> = Vec::new();
        for role in &self.data.roles {
            if role.color.is_empty() {
                continue;
            }
            let color = role.color.to_ascii_uppercase();
            match groups.iter_mut().find(|(c, _)| *c == color) {
                Some((_, ids)) => ids.push(role.id.clone()),
                None => groups.push((color, vec![role.id.clone()])),
            }
        }
        groups.retain(|(_, ids)| ids.len() > 1);
        groups
    }

    /// Gives every later holder of a duplicated (or missing) color an unused
    /// one. Returns the ids of the roles that changed.
    pub fn fix_role_colors(&mut self) -> Vec<RoleId> {
        let mut used: HashSet<String> = HashSet::new();
        let mut needs_color = Vec::new();
        for (idx, role) in self.data.roles.iter().enumerate() {
            let color = role.color.to_ascii_uppercase();
            if color.is_empty() || !used.insert(color) {
                needs_color.push(idx);
            }
        }

        let mut palette = ROLE_COLOR_PALETTE.iter().map(|c| c.to_string());
        let mut generated: u32 = 0;
        let mut changed = Vec::with_capacity(needs_color.len());
        for idx in needs_color {
            let color = loop {
                let next = palette.next().unwrap_or_else(|| {
                    generated += 1;
                    format!("#{:06X}", generated.wrapping_mul(0x9E3779) & 0x00FF_FFFF)
                });
                if !used.contains(&next) {
                    break next;
                }
            };
            used.insert(color.clone());
            let role = &mut self.data.roles[idx];
            tracing::info!(role_id = %role.id, from = %role.color, to = %color, "role color reassigned");
            role.color = color;
            changed.push(role.id.clone());
        }
        changed
    }

    // recommendations

    pub fn validate_requirements(
        &self,
        requirements: &[RoleRequirement],
        config: &EngineConfig,
    ) -> PlannerResult<()> {
        let errors = validate_role_requirements_with(requirements, config);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlannerError::InvalidRequirements(errors))
        }
    }

    pub fn recommendations(
        &self,
        requirements: &[RoleRequirement],
        config: &EngineConfig,
    ) -> PlannerResult<Vec<RoleRecommendation>> {
        self.validate_requirements(requirements, config)?;
        let engine = RecommendationEngine::with_config(self.snapshot(), config.clone());
        Ok(engine.recommend_team_for_project(requirements))
    }

    pub fn recommend(
        &self,
        requirements: &[RoleRequirement],
        config: &EngineConfig,
    ) -> PlannerResult<TeamResult> {
        self.validate_requirements(requirements, config)?;
        let engine = RecommendationEngine::with_config(self.snapshot(), config.clone());
        Ok(engine.generate_optimal_team(requirements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Planner {
        let mut planner = Planner::new();
        planner.add_person(Person::new("p1", "Ada")).unwrap();
        planner.add_role(Role::new("r1", "Engineer", "#112233")).unwrap();
        planner.add_data_product(DataProduct::new("d1", "Sales")).unwrap();
        planner
    }

    #[test]
    fn duplicate_ids_conflict() {
        let mut planner = seeded();
        let err = planner.add_person(Person::new("p1", "Other")).unwrap_err();
        assert!(matches!(err, PlannerError::Conflict { kind: "person", .. }));
    }

    #[test]
    fn assign_requires_existing_references() {
        let mut planner = seeded();
        let err = planner
            .assign(Assignment::new("p1", "d1", "missing", 4.0))
            .unwrap_err();
        assert!(matches!(err, PlannerError::NotFound { kind: "role", .. }));
    }

    #[test]
    fn fix_role_colors_keeps_first_owner() {
        let mut planner = seeded();
        planner.add_role(Role::new("r2", "Analyst", "#112233")).unwrap();
        planner.add_role(Role::new("r3", "Lead", "#1F77B4")).unwrap();
        assert_eq!(planner.duplicate_role_colors().len(), 1);

        let changed = planner.fix_role_colors();
        assert_eq!(changed, vec!["r2".to_string()]);
        assert_eq!(planner.role("r1").unwrap().color, "#112233");
        // the first palette color is taken by r3
        assert_eq!(planner.role("r2").unwrap().color, "#FF7F0E");
        assert!(planner.duplicate_role_colors().is_empty());
    }
}
