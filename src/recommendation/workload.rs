use crate::model::{Assignment, Person};
use std::collections::HashMap;

/// Sum of the person's committed weekly hours over current assignments.
pub fn compute_workload(person_id: &str, assignments: &[Assignment]) -> f64 {
    assignments
        .iter()
        .filter(|assignment| assignment.person_id == person_id && assignment.is_current())
        .map(Assignment::effective_hours)
        .sum()
}

/// Remaining weekly capacity, floored at zero.
pub fn available_hours(person: &Person, assignments: &[Assignment]) -> f64 {
    remaining_capacity(person.capacity(), compute_workload(&person.id, assignments))
}

pub(crate) fn remaining_capacity(capacity: f64, workload: f64) -> f64 {
    (capacity - workload).max(0.0)
}

/// Booked share of capacity. Zero capacity counts as fully booked while
/// nothing is booked, and every booked hour on top pushes the ratio past 1.
pub(crate) fn workload_ratio(capacity: f64, workload: f64) -> f64 {
    if capacity > 0.0 {
        workload / capacity
    } else if workload > 0.0 {
        1.0 + workload
    } else {
        1.0
    }
}

/// Per-person workloads computed in one pass over the assignments.
#[derive(Debug, Default)]
pub struct WorkloadIndex<'a> {
    totals: HashMap<&'a str, f64>,
}

impl<'a> WorkloadIndex<'a> {
    pub fn build(assignments: &'a [Assignment]) -> Self {
        let mut totals: HashMap<&'a str, f64> = HashMap::new();
        for assignment in assignments.iter().filter(|a| a.is_current()) {
            *totals.entry(assignment.person_id.as_str()).or_insert(0.0) +=
                assignment.effective_hours();
        }
        Self { totals }
    }

    pub fn workload(&self, person_id: &str) -> f64 {
        self.totals.get(person_id).copied().unwrap_or(0.0)
    }

    pub fn available_hours(&self, person: &Person) -> f64 {
        remaining_capacity(person.capacity(), self.workload(&person.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn index_matches_direct_computation() {
        let assignments = vec![
            Assignment::new("a", "dp1", "r1", 10.0),
            Assignment::new("a", "dp2", "r2", 5.5),
            Assignment::new("b", "dp1", "r1", 8.0),
            Assignment::new("a", "dp3", "r1", 4.0)
                .ended(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()),
        ];
        let index = WorkloadIndex::build(&assignments);
        assert_eq!(index.workload("a"), compute_workload("a", &assignments));
        assert_eq!(index.workload("a"), 15.5);
        assert_eq!(index.workload("missing"), 0.0);
    }

    #[test]
    fn zero_capacity_ratio_grows_with_booked_hours() {
        assert_eq!(workload_ratio(0.0, 0.0), 1.0);
        assert_eq!(workload_ratio(0.0, 30.0), 31.0);
        assert!(workload_ratio(0.0, 0.5) > workload_ratio(10.0, 10.0));
        assert_eq!(workload_ratio(40.0, 10.0), 0.25);
    }
}
