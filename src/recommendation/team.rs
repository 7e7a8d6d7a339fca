use super::RoleRecommendation;
use super::ranking::Candidate;
use crate::model::{PersonId, RoleId, RoleRequirement};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub person_id: PersonId,
    pub person_name: String,
    pub role_id: RoleId,
    pub role_name: String,
    pub hours: f64,
    pub score: f64,
    pub can_fulfill_hours: bool,
    /// Picked as the top candidate after every unclaimed, fitting candidate ran out.
    /// The person may then appear in more than one row.
    pub fallback: bool,
}

/// A requirement that had no qualifying candidate at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfilledRequirement {
    pub position: usize,
    pub role_id: RoleId,
    pub role_name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamResult {
    pub team: Vec<TeamMember>,
    pub total_hours: f64,
    /// Every assembled member can cover their hours.
    pub feasible: bool,
    pub recommendations: Vec<RoleRecommendation>,
    #[serde(default)]
    pub unfilled: Vec<UnfilledRequirement>,
}

impl TeamResult {
    pub fn new(
        team: Vec<TeamMember>,
        unfilled: Vec<UnfilledRequirement>,
        recommendations: Vec<RoleRecommendation>,
    ) -> Self {
        let total_hours = team.iter().map(|member| member.hours).sum();
        let feasible = team.iter().all(|member| member.can_fulfill_hours);
        Self {
            team,
            total_hours,
            feasible,
            recommendations,
            unfilled,
        }
    }

    /// Feasible and no requirement was dropped.
    pub fn is_complete(&self) -> bool {
        self.feasible && self.unfilled.is_empty()
    }

    /// Persons that occupy more than one row of the team.
    pub fn double_booked(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut repeated = Vec::new();
        for member in &self.team {
            if !seen.insert(member.person_id.as_str()) && !repeated.contains(&member.person_id.as_str())
            {
                repeated.push(member.person_id.as_str());
            }
        }
        repeated
    }
}

pub(crate) struct RankedRequirement<'r> {
    pub requirement: &'r RoleRequirement,
    pub role_name: String,
    pub candidates: Vec<Candidate>,
}

/// Greedy single pass over requirements in the given order.
pub(crate) fn assemble(ranked: &[RankedRequirement<'_>]) -> (Vec<TeamMember>, Vec<UnfilledRequirement>) {
    let mut claimed: HashSet<&str> = HashSet::new();
    let mut team = Vec::with_capacity(ranked.len());
    let mut unfilled = Vec::new();

    for (idx, entry) in ranked.iter().enumerate() {
        let preferred = entry.candidates.iter().find(|candidate| {
            candidate.can_fulfill_hours && !claimed.contains(candidate.person.id.as_str())
        });

        let (chosen, fallback) = match preferred {
            Some(candidate) => {
                claimed.insert(candidate.person.id.as_str());
                (candidate, false)
            }
            None => match entry.candidates.first() {
                Some(top) => {
                    tracing::debug!(
                        role_id = %entry.requirement.role_id,
                        person_id = %top.person.id,
                        "no unclaimed candidate fits, falling back to top candidate"
                    );
                    (top, true)
                }
                None => {
                    tracing::debug!(
                        role_id = %entry.requirement.role_id,
                        "no candidates for requirement"
                    );
                    unfilled.push(UnfilledRequirement {
                        position: idx + 1,
                        role_id: entry.requirement.role_id.clone(),
                        role_name: entry.role_name.clone(),
                        hours: entry.requirement.hours,
                    });
                    continue;
                }
            },
        };

        team.push(TeamMember {
            person_id: chosen.person.id.clone(),
            person_name: chosen.person.name.clone(),
            role_id: entry.requirement.role_id.clone(),
            role_name: entry.role_name.clone(),
            hours: entry.requirement.hours,
            score: chosen.score,
            can_fulfill_hours: chosen.can_fulfill_hours,
            fallback,
        });
    }

    (team, unfilled)
}
