use super::affinity::{Affinity, AffinityIndex};
use super::workload::{WorkloadIndex, remaining_capacity, workload_ratio};
use crate::model::{Person, RoleRequirement};
use serde::{Deserialize, Serialize};

const AVAILABILITY_MAX_SCORE: f64 = 30.0;
const WORKLOAD_MAX_SCORE: f64 = 20.0;

/// A scored (person, role) pairing. Computed per call, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub person: Person,
    pub available_hours: f64,
    pub score: f64,
    pub role_match_score: f64,
    pub affinity: Affinity,
    pub workload_ratio: f64,
    pub can_fulfill_hours: bool,
}

/// Full credit when the hours fit, linear partial credit otherwise.
pub fn availability_score(available_hours: f64, required_hours: f64) -> f64 {
    if !(required_hours > 0.0) {
        return 0.0;
    }
    if available_hours >= required_hours {
        AVAILABILITY_MAX_SCORE
    } else {
        available_hours * AVAILABILITY_MAX_SCORE / required_hours
    }
}

/// Goes negative once a person is booked beyond capacity.
pub fn workload_score(ratio: f64) -> f64 {
    (1.0 - ratio) * WORKLOAD_MAX_SCORE
}

pub struct CandidateRanker<'a> {
    persons: &'a [Person],
    affinity: AffinityIndex<'a>,
    workloads: WorkloadIndex<'a>,
    min_role_match_score: f64,
}

impl<'a> CandidateRanker<'a> {
    pub fn new(
        persons: &'a [Person],
        affinity: AffinityIndex<'a>,
        workloads: WorkloadIndex<'a>,
        min_role_match_score: f64,
    ) -> Self {
        Self {
            persons,
            affinity,
            workloads,
            min_role_match_score,
        }
    }

    /// Scores one person, or `None` when the role match is below the cutoff.
    pub fn evaluate(&self, person: &Person, requirement: &RoleRequirement) -> Option<Candidate> {
        let affinity = self.affinity.affinity(person, &requirement.role_id);
        let role_match_score = affinity.score();
        if role_match_score < self.min_role_match_score {
            return None;
        }

        let capacity = person.capacity();
        let workload = self.workloads.workload(&person.id);
        let available_hours = remaining_capacity(capacity, workload);
        let ratio = workload_ratio(capacity, workload);
        let score = role_match_score
            + availability_score(available_hours, requirement.hours)
            + workload_score(ratio);

        Some(Candidate {
            person: person.clone(),
            available_hours,
            score,
            role_match_score,
            affinity,
            workload_ratio: ratio,
            can_fulfill_hours: available_hours >= requirement.hours,
        })
    }

    /// Every qualifying person, best first. Equal scores keep person order.
    pub fn rank(&self, requirement: &RoleRequirement) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .persons
            .iter()
            .filter_map(|person| self.evaluate(person, requirement))
            .collect();
        // sort_by is stable
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }
}
