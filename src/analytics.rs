//! Staffing views over a planning snapshot, with polars conversions for display.

use crate::model::{DataProduct, DataProductId, PersonId, RoleId};
use crate::recommendation::PlanningSnapshot;
use crate::recommendation::workload::WorkloadIndex;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilizationFilter {
    #[serde(default)]
    pub is_m13: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
}

impl UtilizationFilter {
    fn accepts(&self, person: &crate::model::Person) -> bool {
        if let Some(flag) = self.is_m13 {
            if person.is_m13 != flag {
                return false;
            }
        }
        match &self.category {
            Some(category) => person.categories.contains(category),
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonUtilization {
    pub person_id: PersonId,
    pub name: String,
    pub capacity: f64,
    pub booked_hours: f64,
    pub available_hours: f64,
    /// Booked share of capacity; zero capacity reads as fully booked.
    pub utilization: f64,
    pub overbooked: bool,
}

pub fn person_utilization(
    snapshot: PlanningSnapshot<'_>,
    filter: &UtilizationFilter,
) -> Vec<PersonUtilization> {
    let workloads = WorkloadIndex::build(snapshot.assignments);
    snapshot
        .persons
        .iter()
        .filter(|person| filter.accepts(person))
        .map(|person| {
            let capacity = person.capacity();
            let booked_hours = workloads.workload(&person.id);
            let utilization = if capacity > 0.0 {
                booked_hours / capacity
            } else {
                1.0
            };
            PersonUtilization {
                person_id: person.id.clone(),
                name: person.name.clone(),
                capacity,
                booked_hours,
                available_hours: workloads.available_hours(person),
                utilization,
                overbooked: booked_hours > capacity,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleCoverage {
    pub role_id: RoleId,
    pub name: String,
    pub color: String,
    pub assignees: usize,
    pub total_hours: f64,
}

/// Current assignments per role. Roles nobody holds report zero.
pub fn role_coverage(snapshot: PlanningSnapshot<'_>) -> Vec<RoleCoverage> {
    let mut holders: HashMap<&str, HashSet<&str>> = HashMap::new();
    let mut hours: HashMap<&str, f64> = HashMap::new();
    for assignment in snapshot.assignments.iter().filter(|a| a.is_current()) {
        holders
            .entry(assignment.role_id.as_str())
            .or_default()
            .insert(assignment.person_id.as_str());
        *hours.entry(assignment.role_id.as_str()).or_insert(0.0) += assignment.effective_hours();
    }

    snapshot
        .roles
        .iter()
        .map(|role| RoleCoverage {
            role_id: role.id.clone(),
            name: role.name.clone(),
            color: role.color.clone(),
            assignees: holders.get(role.id.as_str()).map_or(0, HashSet::len),
            total_hours: hours.get(role.id.as_str()).copied().unwrap_or(0.0),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProductStaffing {
    pub data_product_id: DataProductId,
    pub name: String,
    pub members: usize,
    pub total_hours: f64,
    pub role_ids: BTreeSet<RoleId>,
}

pub fn data_product_staffing(
    snapshot: PlanningSnapshot<'_>,
    data_products: &[DataProduct],
) -> Vec<DataProductStaffing> {
    data_products
        .iter()
        .map(|product| {
            let mut members: HashSet<&str> = HashSet::new();
            let mut role_ids = BTreeSet::new();
            let mut total_hours = 0.0;
            for assignment in snapshot
                .assignments
                .iter()
                .filter(|a| a.is_current() && a.data_product_id == product.id)
            {
                members.insert(assignment.person_id.as_str());
                role_ids.insert(assignment.role_id.clone());
                total_hours += assignment.effective_hours();
            }
            DataProductStaffing {
                data_product_id: product.id.clone(),
                name: product.name.clone(),
                members: members.len(),
                total_hours,
                role_ids,
            }
        })
        .collect()
}

pub fn utilization_frame(rows: &[PersonUtilization]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = rows.iter().map(|r| r.person_id.as_str()).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let capacity: Vec<f64> = rows.iter().map(|r| r.capacity).collect();
    let booked: Vec<f64> = rows.iter().map(|r| r.booked_hours).collect();
    let available: Vec<f64> = rows.iter().map(|r| r.available_hours).collect();
    let utilization: Vec<f64> = rows
        .iter()
        .map(|r| (r.utilization * 100.0).round() / 100.0)
        .collect();
    let overbooked: Vec<bool> = rows.iter().map(|r| r.overbooked).collect();

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("person_id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("capacity"), capacity).into_column(),
        Series::new(PlSmallStr::from_static("booked_hours"), booked).into_column(),
        Series::new(PlSmallStr::from_static("available_hours"), available).into_column(),
        Series::new(PlSmallStr::from_static("utilization"), utilization).into_column(),
        Series::new(PlSmallStr::from_static("overbooked"), overbooked).into_column(),
    ])
}

pub fn role_coverage_frame(rows: &[RoleCoverage]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = rows.iter().map(|r| r.role_id.as_str()).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let colors: Vec<&str> = rows.iter().map(|r| r.color.as_str()).collect();
    let assignees: Vec<u32> = rows.iter().map(|r| r.assignees as u32).collect();
    let hours: Vec<f64> = rows.iter().map(|r| r.total_hours).collect();

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("role_id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("color"), colors).into_column(),
        Series::new(PlSmallStr::from_static("assignees"), assignees).into_column(),
        Series::new(PlSmallStr::from_static("total_hours"), hours).into_column(),
    ])
}

pub fn data_product_staffing_frame(rows: &[DataProductStaffing]) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = rows.iter().map(|r| r.data_product_id.as_str()).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let members: Vec<u32> = rows.iter().map(|r| r.members as u32).collect();
    let hours: Vec<f64> = rows.iter().map(|r| r.total_hours).collect();
    let roles: Vec<String> = rows
        .iter()
        .map(|r| r.role_ids.iter().cloned().collect::<Vec<_>>().join(";"))
        .collect();

    DataFrame::new(vec![
        Series::new(PlSmallStr::from_static("data_product_id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("members"), members).into_column(),
        Series::new(PlSmallStr::from_static("total_hours"), hours).into_column(),
        Series::new(PlSmallStr::from_static("roles"), roles).into_column(),
    ])
}
