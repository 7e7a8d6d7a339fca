use chrono::NaiveDate;
use std::fs;
use team_planner::{
    Assignment, AssignmentKey, DataProduct, Person, PersistenceError, Planner, Role,
    export_assignments_csv, export_persons_csv, import_assignments_csv, import_persons_csv,
    load_planner_from_json, save_planner_to_json,
};
use tempfile::NamedTempFile;

fn build_sample_planner() -> Planner {
    let mut planner = Planner::new();
    let mut ada = Person::new("p1", "Ada Lovelace")
        .with_weekly_hours(37.5)
        .with_labels(["analytics", "python"]);
    ada.is_m13 = true;
    ada.categories.insert("internal".into());
    planner.add_person(ada).unwrap();
    planner.add_person(Person::new("p2", "Bob")).unwrap();
    planner.add_role(Role::new("r1", "Engineer", "#1F77B4")).unwrap();
    planner.add_data_product(DataProduct::new("d1", "Sales")).unwrap();
    planner.assign(Assignment::new("p1", "d1", "r1", 12.5)).unwrap();
    planner
        .assign(
            Assignment::new("p2", "d1", "r1", 4.0)
                .ended(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
        )
        .unwrap();
    planner
}

#[test]
fn json_round_trip_preserves_planner() {
    let planner = build_sample_planner();
    let tmp = NamedTempFile::new().unwrap();
    save_planner_to_json(&planner, tmp.path()).unwrap();
    let loaded = load_planner_from_json(tmp.path()).unwrap();
    assert_eq!(loaded, planner);
}

#[test]
fn json_load_reads_lenient_hours_and_defaults() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r##"{
            "persons": [{"id": "p1", "name": "Ada"}],
            "roles": [{"id": "r1", "name": "Engineer", "color": "#000000"}],
            "data_products": [{"id": "d1", "name": "Sales"}],
            "assignments": [
                {"person_id": "p1", "data_product_id": "d1", "role_id": "r1", "hours": "7,5"}
            ]
        }"##,
    )
    .unwrap();
    let planner = load_planner_from_json(tmp.path()).unwrap();
    assert_eq!(planner.assignments()[0].hours, 7.5);
    assert_eq!(planner.person("p1").unwrap().capacity(), 31.0);
    assert!(planner.labels().is_empty());
}

#[test]
fn json_load_rejects_dangling_assignment() {
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{"persons": [], "assignments": [{"person_id": "ghost", "data_product_id": "d", "role_id": "r", "hours": 1}]}"#,
    )
    .unwrap();
    let err = load_planner_from_json(tmp.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn persons_csv_round_trip_upserts() {
    let planner = build_sample_planner();
    let tmp = NamedTempFile::new().unwrap();
    export_persons_csv(&planner, tmp.path()).unwrap();

    let contents = fs::read_to_string(tmp.path()).unwrap();
    assert!(contents.contains("analytics;python"));

    let mut target = Planner::new();
    target.add_person(Person::new("p2", "Old Bob")).unwrap();
    let summary = import_persons_csv(&mut target, tmp.path()).unwrap();
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.updated, 1);

    let ada = target.person("p1").unwrap();
    assert_eq!(ada, planner.person("p1").unwrap());
    assert_eq!(target.person("p2").unwrap().name, "Bob");
    assert_eq!(target.person("p2").unwrap().weekly_hours, None);
}

#[test]
fn assignments_csv_round_trip_keeps_end_dates() {
    let planner = build_sample_planner();
    let tmp = NamedTempFile::new().unwrap();
    export_assignments_csv(&planner, tmp.path()).unwrap();

    let mut target = planner.clone();
    for assignment in planner.assignments() {
        target.unassign(&assignment.key()).unwrap();
    }
    let summary = import_assignments_csv(&mut target, tmp.path()).unwrap();
    assert_eq!(summary.inserted, 2);
    assert_eq!(target.assignments(), planner.assignments());
}

#[test]
fn assignment_import_updates_existing_hours() {
    let mut planner = build_sample_planner();
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "person_id,data_product_id,role_id,hours,ended_on\np1,d1,r1,\"20,5\",\n",
    )
    .unwrap();
    let summary = import_assignments_csv(&mut planner, tmp.path()).unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(
        planner
            .assignment(&AssignmentKey::new("p1", "d1", "r1"))
            .unwrap()
            .hours,
        20.5
    );
}

#[test]
fn failed_import_leaves_planner_untouched() {
    let mut planner = build_sample_planner();
    let before = planner.clone();
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "person_id,data_product_id,role_id,hours,ended_on\np2,d1,r1,3,\nghost,d1,r1,3,\n",
    )
    .unwrap();
    let err = import_assignments_csv(&mut planner, tmp.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidRecord { line: 3, .. }));
    assert_eq!(planner, before);
}

#[test]
fn persons_import_reports_failing_line() {
    let mut planner = build_sample_planner();
    let before = planner.clone();
    let tmp = NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        "id,name,weekly_hours,is_m13,categories,label_ids,skill_ids\n\
         p3,Cleo,20,false,,,\n\
         p4,Dan,95,false,,,\n",
    )
    .unwrap();
    let err = import_persons_csv(&mut planner, tmp.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidRecord { line: 3, .. }));
    assert_eq!(planner, before);
}
