//! Team recommendation engine.
//!
//! A pure pipeline over a borrowed snapshot of persons, roles and assignments:
//! requirements are validated by the caller, every requirement gets a ranked
//! candidate list, and the assembler derives one team from those lists.
//! Nothing here mutates its inputs or keeps state between calls.

pub mod affinity;
pub mod ranking;
pub mod team;
pub mod validation;
pub mod workload;

use crate::config::EngineConfig;
use crate::model::{Assignment, Label, Person, Role, RoleId, RoleRequirement};
use affinity::AffinityIndex;
use ranking::{Candidate, CandidateRanker};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use team::{RankedRequirement, TeamResult};
use workload::WorkloadIndex;

pub use affinity::{Affinity, role_affinity, role_match_score};
pub use team::{TeamMember, UnfilledRequirement};
pub use validation::{
    RequirementError, check_role_requirements, validate_role_requirements,
    validate_role_requirements_with,
};
pub use workload::{available_hours, compute_workload};

/// Read-only view of the collections the engine scores against.
#[derive(Debug, Clone, Copy)]
pub struct PlanningSnapshot<'a> {
    pub persons: &'a [Person],
    pub roles: &'a [Role],
    pub assignments: &'a [Assignment],
    /// Carried along for future scoring rules; the current ladder does not read it.
    pub labels: &'a [Label],
}

impl<'a> PlanningSnapshot<'a> {
    pub fn new(persons: &'a [Person], roles: &'a [Role], assignments: &'a [Assignment]) -> Self {
        Self {
            persons,
            roles,
            assignments,
            labels: &[],
        }
    }

    pub fn with_labels(mut self, labels: &'a [Label]) -> Self {
        self.labels = labels;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecommendation {
    pub role_id: RoleId,
    pub role_name: String,
    pub required_hours: f64,
    pub candidates: Vec<Candidate>,
}

pub struct RecommendationEngine<'a> {
    snapshot: PlanningSnapshot<'a>,
    config: EngineConfig,
    ranker: CandidateRanker<'a>,
}

impl<'a> RecommendationEngine<'a> {
    pub fn new(snapshot: PlanningSnapshot<'a>) -> Self {
        Self::with_config(snapshot, EngineConfig::default())
    }

    pub fn with_config(snapshot: PlanningSnapshot<'a>, config: EngineConfig) -> Self {
        let ranker = CandidateRanker::new(
            snapshot.persons,
            AffinityIndex::build(snapshot.assignments, snapshot.persons),
            WorkloadIndex::build(snapshot.assignments),
            config.min_role_match_score,
        );
        Self {
            snapshot,
            config,
            ranker,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full ranked list for one requirement, without the display limit.
    pub fn rank_candidates(&self, requirement: &RoleRequirement) -> Vec<Candidate> {
        self.ranker.rank(requirement)
    }

    /// Top candidates per requirement, in requirement order.
    pub fn recommend_team_for_project(
        &self,
        requirements: &[RoleRequirement],
    ) -> Vec<RoleRecommendation> {
        self.rank_all(requirements)
            .into_iter()
            .map(|ranked| self.to_recommendation(ranked))
            .collect()
    }

    pub fn generate_optimal_team(&self, requirements: &[RoleRequirement]) -> TeamResult {
        let ranked = self.rank_all(requirements);
        let (team, unfilled) = team::assemble(&ranked);
        let recommendations = ranked
            .into_iter()
            .map(|entry| self.to_recommendation(entry))
            .collect();
        let result = TeamResult::new(team, unfilled, recommendations);
        tracing::debug!(
            members = result.team.len(),
            unfilled = result.unfilled.len(),
            total_hours = result.total_hours,
            feasible = result.feasible,
            "assembled team"
        );
        result
    }

    /// Display name: the requirement's own label, then the role record, then the id.
    pub fn role_name(&self, requirement: &RoleRequirement) -> String {
        if let Some(name) = requirement.role_name.as_deref() {
            if !name.trim().is_empty() {
                return name.to_string();
            }
        }
        self.snapshot
            .roles
            .iter()
            .find(|role| role.id == requirement.role_id)
            .map(|role| role.name.clone())
            .unwrap_or_else(|| requirement.role_id.clone())
    }

    fn rank_all<'r>(&self, requirements: &'r [RoleRequirement]) -> Vec<RankedRequirement<'r>> {
        requirements
            .par_iter()
            .map(|requirement| RankedRequirement {
                requirement,
                role_name: self.role_name(requirement),
                candidates: self.ranker.rank(requirement),
            })
            .collect()
    }

    fn to_recommendation(&self, ranked: RankedRequirement<'_>) -> RoleRecommendation {
        let mut candidates = ranked.candidates;
        candidates.truncate(self.config.candidate_display_limit);
        RoleRecommendation {
            role_id: ranked.requirement.role_id.clone(),
            role_name: ranked.role_name,
            required_hours: ranked.requirement.hours,
            candidates,
        }
    }
}

/// One-shot helper taking the collections directly.
pub fn recommend_team_for_project(
    requirements: &[RoleRequirement],
    persons: &[Person],
    assignments: &[Assignment],
    roles: &[Role],
    labels: &[Label],
) -> Vec<RoleRecommendation> {
    let snapshot = PlanningSnapshot::new(persons, roles, assignments).with_labels(labels);
    RecommendationEngine::new(snapshot).recommend_team_for_project(requirements)
}

/// One-shot helper taking the collections directly.
pub fn generate_optimal_team(
    requirements: &[RoleRequirement],
    persons: &[Person],
    assignments: &[Assignment],
    roles: &[Role],
    labels: &[Label],
) -> TeamResult {
    let snapshot = PlanningSnapshot::new(persons, roles, assignments).with_labels(labels);
    RecommendationEngine::new(snapshot).generate_optimal_team(requirements)
}
