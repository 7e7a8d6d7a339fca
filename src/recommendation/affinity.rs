//! Role affinity: how well a person fits a role, judged from assignment history.
//!
//! The ladder is strict, the first matching rung wins:
//!   1. currently holds the role            -> 100
//!   2. held the role before                -> 90
//!   3. nobody ever held the role           -> 30 with any labels, 5 without
//!   4. label overlap with past role holders -> round(ratio * 60), 0 without overlap

use crate::model::{Assignment, Person};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const CURRENT_ROLE_SCORE: f64 = 100.0;
const PAST_ROLE_SCORE: f64 = 90.0;
const LABEL_OVERLAP_MAX_SCORE: f64 = 60.0;
const UNSTAFFED_WITH_LABELS_SCORE: f64 = 30.0;
const UNSTAFFED_WITHOUT_LABELS_SCORE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Affinity {
    CurrentRole,
    PastRole,
    LabelOverlap { matched: usize, relevant: usize },
    NoLabelOverlap,
    UnstaffedRoleWithLabels,
    UnstaffedRoleWithoutLabels,
}

impl Affinity {
    pub fn score(&self) -> f64 {
        match self {
            Affinity::CurrentRole => CURRENT_ROLE_SCORE,
            Affinity::PastRole => PAST_ROLE_SCORE,
            Affinity::LabelOverlap { matched, relevant } => {
                let ratio = *matched as f64 / *relevant as f64;
                (ratio * LABEL_OVERLAP_MAX_SCORE).round()
            }
            Affinity::NoLabelOverlap => 0.0,
            Affinity::UnstaffedRoleWithLabels => UNSTAFFED_WITH_LABELS_SCORE,
            Affinity::UnstaffedRoleWithoutLabels => UNSTAFFED_WITHOUT_LABELS_SCORE,
        }
    }
}

#[derive(Debug, Default)]
struct RoleHistory<'a> {
    current_holders: HashSet<&'a str>,
    holders: HashSet<&'a str>,
    relevant_labels: HashSet<&'a str>,
}

/// Role histories for every role that appears in the assignments.
#[derive(Debug, Default)]
pub struct AffinityIndex<'a> {
    roles: HashMap<&'a str, RoleHistory<'a>>,
}

impl<'a> AffinityIndex<'a> {
    pub fn build(assignments: &'a [Assignment], persons: &'a [Person]) -> Self {
        let by_id: HashMap<&'a str, &'a Person> =
            persons.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut roles: HashMap<&'a str, RoleHistory<'a>> = HashMap::new();
        for assignment in assignments {
            let history = roles.entry(assignment.role_id.as_str()).or_default();
            let person_id = assignment.person_id.as_str();
            history.holders.insert(person_id);
            if assignment.is_current() {
                history.current_holders.insert(person_id);
            }
            if let Some(person) = by_id.get(person_id) {
                history
                    .relevant_labels
                    .extend(person.label_ids.iter().map(String::as_str));
            }
        }
        Self { roles }
    }

    pub fn affinity(&self, person: &Person, role_id: &str) -> Affinity {
        let Some(history) = self.roles.get(role_id) else {
            return unstaffed(person);
        };
        if history.current_holders.contains(person.id.as_str()) {
            return Affinity::CurrentRole;
        }
        if history.holders.contains(person.id.as_str()) {
            return Affinity::PastRole;
        }
        if history.relevant_labels.is_empty() {
            return unstaffed(person);
        }
        let matched = person
            .label_ids
            .iter()
            .filter(|label| history.relevant_labels.contains(label.as_str()))
            .count();
        if matched == 0 {
            Affinity::NoLabelOverlap
        } else {
            Affinity::LabelOverlap {
                matched,
                relevant: history.relevant_labels.len(),
            }
        }
    }
}

fn unstaffed(person: &Person) -> Affinity {
    if person.label_ids.is_empty() {
        Affinity::UnstaffedRoleWithoutLabels
    } else {
        Affinity::UnstaffedRoleWithLabels
    }
}

pub fn role_affinity(
    person: &Person,
    role_id: &str,
    assignments: &[Assignment],
    all_persons: &[Person],
) -> Affinity {
    AffinityIndex::build(assignments, all_persons).affinity(person, role_id)
}

/// Score in `[0, 100]` for `person` filling `role_id`.
pub fn role_match_score(
    person: &Person,
    role_id: &str,
    assignments: &[Assignment],
    all_persons: &[Person],
) -> f64 {
    role_affinity(person, role_id, assignments, all_persons).score()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn past() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn ladder_scores() {
        assert_eq!(Affinity::CurrentRole.score(), 100.0);
        assert_eq!(Affinity::PastRole.score(), 90.0);
        assert_eq!(Affinity::UnstaffedRoleWithLabels.score(), 30.0);
        assert_eq!(Affinity::UnstaffedRoleWithoutLabels.score(), 5.0);
        assert_eq!(Affinity::NoLabelOverlap.score(), 0.0);
        assert_eq!(
            Affinity::LabelOverlap {
                matched: 1,
                relevant: 3
            }
            .score(),
            20.0
        );
        assert_eq!(
            Affinity::LabelOverlap {
                matched: 3,
                relevant: 3
            }
            .score(),
            60.0
        );
    }

    #[test]
    fn current_beats_past() {
        let persons = vec![Person::new("a", "A")];
        let assignments = vec![
            Assignment::new("a", "dp1", "r1", 5.0).ended(past()),
            Assignment::new("a", "dp2", "r1", 5.0),
        ];
        assert_eq!(
            role_affinity(&persons[0], "r1", &assignments, &persons),
            Affinity::CurrentRole
        );
    }

    #[test]
    fn ended_assignment_counts_as_past_role() {
        let persons = vec![Person::new("a", "A")];
        let assignments = vec![Assignment::new("a", "dp1", "r1", 5.0).ended(past())];
        assert_eq!(role_match_score(&persons[0], "r1", &assignments, &persons), 90.0);
    }

    #[test]
    fn label_overlap_rounds_half_up() {
        // 1 of 8 relevant labels: 7.5 rounds to 8.
        let holder = Person::new("h", "H")
            .with_labels(["l1", "l2", "l3", "l4", "l5", "l6", "l7", "l8"]);
        let candidate = Person::new("c", "C").with_labels(["l1", "other"]);
        let persons = vec![holder, candidate];
        let assignments = vec![Assignment::new("h", "dp", "r1", 10.0)];
        assert_eq!(role_match_score(&persons[1], "r1", &assignments, &persons), 8.0);
    }

    #[test]
    fn holders_missing_from_person_list_contribute_no_labels() {
        let candidate = Person::new("c", "C").with_labels(["l1"]);
        let persons = vec![candidate];
        let assignments = vec![Assignment::new("ghost", "dp", "r1", 10.0)];
        assert_eq!(
            role_affinity(&persons[0], "r1", &assignments, &persons),
            Affinity::UnstaffedRoleWithLabels
        );
    }
}
