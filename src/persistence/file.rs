use super::{PersistenceError, PersistenceResult};
use crate::model::{Assignment, AssignmentKey, Person, parse_lenient_hours};
use crate::planner::{Planner, PlannerData};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PlannerSnapshot {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(flatten)]
    data: PlannerData,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

pub fn save_planner_to_json<P: AsRef<Path>>(planner: &Planner, path: P) -> PersistenceResult<()> {
    super::validate_data(planner.data())?;
    let snapshot = PlannerSnapshot {
        version: SNAPSHOT_VERSION,
        data: planner.data().clone(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_planner_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Planner> {
    let file = File::open(path)?;
    let snapshot: PlannerSnapshot = serde_json::from_reader(file)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(PersistenceError::InvalidData(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }
    Ok(Planner::from_data(snapshot.data)?)
}

/// Outcome of an upserting CSV import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Default, Serialize, Deserialize)]
struct PersonCsvRecord {
    id: String,
    name: String,
    #[serde(default)]
    weekly_hours: String,
    #[serde(default)]
    is_m13: String,
    #[serde(default)]
    label_ids: String,
    #[serde(default)]
    skill_ids: String,
    #[serde(default)]
    categories: String,
}

impl From<&Person> for PersonCsvRecord {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id.clone(),
            name: person.name.clone(),
            weekly_hours: person
                .weekly_hours
                .map(|h| h.to_string())
                .unwrap_or_default(),
            is_m13: person.is_m13.to_string(),
            label_ids: join_set(&person.label_ids),
            skill_ids: join_set(&person.skill_ids),
            categories: join_set(&person.categories),
        }
    }
}

impl PersonCsvRecord {
    fn into_person(self) -> PersistenceResult<Person> {
        let mut person = Person::new(self.id.trim(), self.name.trim());
        person.weekly_hours = parse_optional_hours(&self.weekly_hours)?;
        person.is_m13 = parse_bool(&self.is_m13)?;
        person.label_ids = split_set(&self.label_ids);
        person.skill_ids = split_set(&self.skill_ids);
        person.categories = split_set(&self.categories);
        Ok(person)
    }
}

#[derive(Default, Serialize, Deserialize)]
struct AssignmentCsvRecord {
    person_id: String,
    data_product_id: String,
    role_id: String,
    #[serde(default)]
    hours: String,
    #[serde(default)]
    ended_on: String,
}

impl From<&Assignment> for AssignmentCsvRecord {
    fn from(assignment: &Assignment) -> Self {
        Self {
            person_id: assignment.person_id.clone(),
            data_product_id: assignment.data_product_id.clone(),
            role_id: assignment.role_id.clone(),
            hours: assignment.hours.to_string(),
            ended_on: format_date(assignment.ended_on),
        }
    }
}

impl AssignmentCsvRecord {
    fn into_assignment(self) -> PersistenceResult<Assignment> {
        let mut assignment = Assignment::new(
            self.person_id.trim(),
            self.data_product_id.trim(),
            self.role_id.trim(),
            parse_lenient_hours(&self.hours),
        );
        assignment.ended_on = parse_date(&self.ended_on)?;
        Ok(assignment)
    }
}

pub fn export_persons_csv<P: AsRef<Path>>(planner: &Planner, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for person in planner.persons() {
        writer.serialize(PersonCsvRecord::from(person))?;
    }
    writer.flush()?;
    Ok(())
}

/// Upserts persons by id. Rows are applied in file order; the first bad row
/// aborts the import and leaves the planner untouched.
pub fn import_persons_csv<P: AsRef<Path>>(
    planner: &mut Planner,
    path: P,
) -> PersistenceResult<ImportSummary> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut staged = planner.clone();
    let mut summary = ImportSummary::default();
    for (idx, record) in reader.deserialize::<PersonCsvRecord>().enumerate() {
        let record = record?;
        let line = idx as u64 + 2;
        let person = record
            .into_person()
            .map_err(|err| invalid_record(line, err))?;
        let result = if staged.person(&person.id).is_some() {
            summary.updated += 1;
            staged.update_person(person)
        } else {
            summary.inserted += 1;
            staged.add_person(person)
        };
        result.map_err(|err| invalid_record(line, err))?;
    }
    *planner = staged;
    tracing::info!(
        inserted = summary.inserted,
        updated = summary.updated,
        "persons imported"
    );
    Ok(summary)
}

pub fn export_assignments_csv<P: AsRef<Path>>(
    planner: &Planner,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for assignment in planner.assignments() {
        writer.serialize(AssignmentCsvRecord::from(assignment))?;
    }
    writer.flush()?;
    Ok(())
}

/// Upserts assignments by key. Referenced persons, roles and data products
/// must already exist.
pub fn import_assignments_csv<P: AsRef<Path>>(
    planner: &mut Planner,
    path: P,
) -> PersistenceResult<ImportSummary> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut staged = planner.clone();
    let mut summary = ImportSummary::default();
    for (idx, record) in reader.deserialize::<AssignmentCsvRecord>().enumerate() {
        let record = record?;
        let assignment = record
            .into_assignment()
            .map_err(|err| invalid_record(idx as u64 + 2, err))?;
        let key: AssignmentKey = assignment.key();
        let result = if staged.assignment(&key).is_some() {
            summary.updated += 1;
            staged
                .set_assignment_hours(&key, assignment.hours)
                .and_then(|_| match assignment.ended_on {
                    Some(date) => staged.end_assignment(&key, date),
                    None => Ok(()),
                })
        } else {
            summary.inserted += 1;
            staged.assign(assignment)
        };
        result.map_err(|err| invalid_record(idx as u64 + 2, err))?;
    }
    *planner = staged;
    tracing::info!(
        inserted = summary.inserted,
        updated = summary.updated,
        "assignments imported"
    );
    Ok(summary)
}

fn invalid_record(line: u64, err: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::InvalidRecord {
        line,
        message: err.to_string(),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_optional_hours(input: &str) -> PersistenceResult<Option<f64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid weekly_hours '{input}': {e}")))
}

fn parse_bool(input: &str) -> PersistenceResult<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

fn join_set(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}

fn split_set(input: &str) -> BTreeSet<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
