use team_planner::{
    Affinity, Assignment, EngineConfig, Person, PlanningSnapshot, RecommendationEngine, Role,
    RoleRequirement, available_hours, compute_workload, generate_optimal_team,
    recommend_team_for_project, role_match_score, validate_role_requirements,
};

fn roles() -> Vec<Role> {
    vec![
        Role::new("r1", "Engineer", "#1F77B4"),
        Role::new("dpo", "Data Product Owner", "#FF7F0E"),
    ]
}

#[test]
fn existing_role_holder_can_cover_remaining_hours() {
    let persons = vec![Person::new("a", "Alice").with_weekly_hours(31.0)];
    let assignments = vec![Assignment::new("a", "dp1", "r1", 20.0)];

    assert_eq!(available_hours(&persons[0], &assignments), 11.0);

    let recs = recommend_team_for_project(
        &[RoleRequirement::new("r1", 10.0)],
        &persons,
        &assignments,
        &roles(),
        &[],
    );
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].role_name, "Engineer");
    let candidate = &recs[0].candidates[0];
    assert_eq!(candidate.role_match_score, 100.0);
    assert_eq!(candidate.affinity, Affinity::CurrentRole);
    assert!(candidate.can_fulfill_hours);
    // 100 match + 30 availability + (1 - 20/31) * 20 workload
    let expected = 100.0 + 30.0 + (1.0 - 20.0 / 31.0) * 20.0;
    assert!((candidate.score - expected).abs() < 1e-9);
}

#[test]
fn person_without_overlapping_labels_is_excluded() {
    let holder = Person::new("h", "Holder").with_labels(["L1"]);
    let newcomer = Person::new("b", "Bob");
    let persons = vec![holder, newcomer];
    let assignments = vec![Assignment::new("h", "dp1", "dpo", 10.0)];

    assert_eq!(role_match_score(&persons[1], "dpo", &assignments, &persons), 0.0);

    let recs = recommend_team_for_project(
        &[RoleRequirement::new("dpo", 5.0)],
        &persons,
        &assignments,
        &roles(),
        &[],
    );
    let ids: Vec<&str> = recs[0]
        .candidates
        .iter()
        .map(|c| c.person.id.as_str())
        .collect();
    assert_eq!(ids, vec!["h"]);
}

#[test]
fn single_qualified_candidate_is_reused_through_fallback() {
    let persons = vec![Person::new("c", "Carol"), Person::new("d", "Dan")];
    let assignments = vec![Assignment::new("c", "dp0", "r1", 5.0)];
    let requirements = vec![
        RoleRequirement::new("r1", 20.0),
        RoleRequirement::new("r1", 10.0),
    ];

    let result = generate_optimal_team(&requirements, &persons, &assignments, &roles(), &[]);
    assert_eq!(result.team.len(), 2);
    assert!(result.team.iter().all(|m| m.person_id == "c"));
    assert!(!result.team[0].fallback);
    assert!(result.team[1].fallback);
    assert!(result.team.iter().all(|m| m.can_fulfill_hours));
    assert!(result.feasible);
    assert_eq!(result.total_hours, 30.0);
    assert_eq!(result.double_booked(), vec!["c"]);
    assert!(result.unfilled.is_empty());
}

#[test]
fn fallback_row_reports_capacity_per_row() {
    let persons = vec![Person::new("c", "Carol").with_weekly_hours(20.0)];
    let assignments = vec![Assignment::new("c", "dp0", "r1", 5.0)];
    let requirements = vec![
        RoleRequirement::new("r1", 10.0),
        RoleRequirement::new("r1", 30.0),
    ];

    let result = generate_optimal_team(&requirements, &persons, &assignments, &roles(), &[]);
    assert_eq!(result.team.len(), 2);
    assert!(result.team[0].can_fulfill_hours);
    assert!(!result.team[1].can_fulfill_hours);
    assert!(!result.feasible);
}

#[test]
fn requirement_without_candidates_is_listed_as_unfilled() {
    let persons = vec![Person::new("a", "Alice")];
    let assignments = vec![Assignment::new("a", "dp0", "r1", 5.0)];
    let requirements = vec![
        RoleRequirement::new("r1", 5.0),
        // Alice has no labels, so the unstaffed role scores 5 and filters her out.
        RoleRequirement::new("dpo", 5.0),
    ];

    let result = generate_optimal_team(&requirements, &persons, &assignments, &roles(), &[]);
    assert_eq!(result.team.len(), 1);
    assert!(result.feasible);
    assert!(!result.is_complete());
    assert_eq!(result.unfilled.len(), 1);
    assert_eq!(result.unfilled[0].position, 2);
    assert_eq!(result.unfilled[0].role_name, "Data Product Owner");
    assert_eq!(result.recommendations.len(), 2);
}

#[test]
fn validation_reports_every_problem_with_positions() {
    assert_eq!(
        validate_role_requirements(&[RoleRequirement::new("", 0.0)]),
        vec![
            "requirement 1: role must be selected".to_string(),
            "requirement 1: hours must be greater than 0".to_string(),
        ]
    );
    assert_eq!(
        validate_role_requirements(&[
            RoleRequirement::new("r1", 10.0),
            RoleRequirement::new("r1", 81.0),
        ]),
        vec!["requirement 2: max 80 hours/week allowed".to_string()]
    );
}

#[test]
fn workload_defaults_and_isolation() {
    assert_eq!(compute_workload("personX", &[]), 0.0);
    assert_eq!(available_hours(&Person::new("x", "X"), &[]), 31.0);

    let assignments = vec![
        Assignment::new("x", "dp1", "r1", 10.0),
        Assignment::new("y", "dp1", "r1", 25.0),
    ];
    assert_eq!(compute_workload("x", &assignments), 10.0);

    let overbooked = vec![Assignment::new("x", "dp1", "r1", 50.0)];
    assert_eq!(available_hours(&Person::new("x", "X"), &overbooked), 0.0);
}

#[test]
fn equal_scores_keep_person_order() {
    let persons = vec![
        Person::new("p1", "One").with_labels(["L1"]),
        Person::new("p2", "Two").with_labels(["L2"]),
        Person::new("p3", "Three").with_labels(["L3"]),
    ];
    let recs = recommend_team_for_project(
        &[RoleRequirement::new("r1", 8.0)],
        &persons,
        &[],
        &roles(),
        &[],
    );
    let ids: Vec<&str> = recs[0]
        .candidates
        .iter()
        .map(|c| c.person.id.as_str())
        .collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    assert!(recs[0].candidates.iter().all(|c| c.role_match_score == 30.0));
}

#[test]
fn display_list_is_truncated_but_full_ranking_is_available() {
    let persons: Vec<Person> = (0..8)
        .map(|i| Person::new(format!("p{i}"), format!("P{i}")).with_labels(["L"]))
        .collect();
    let role_list = roles();
    let snapshot = PlanningSnapshot::new(&persons, &role_list, &[]);
    let engine = RecommendationEngine::new(snapshot);
    let requirement = RoleRequirement::new("r1", 8.0);

    assert_eq!(engine.rank_candidates(&requirement).len(), 8);
    let recs = engine.recommend_team_for_project(std::slice::from_ref(&requirement));
    assert_eq!(recs[0].candidates.len(), 5);
}

#[test]
fn hard_filter_follows_configured_cutoff() {
    let persons = vec![Person::new("a", "Alice")];
    let role_list = roles();
    let snapshot = PlanningSnapshot::new(&persons, &role_list, &[]);
    let requirement = RoleRequirement::new("r1", 8.0);

    assert!(
        RecommendationEngine::new(snapshot)
            .rank_candidates(&requirement)
            .is_empty()
    );

    let lenient = EngineConfig {
        min_role_match_score: 5.0,
        ..EngineConfig::default()
    };
    let ranked = RecommendationEngine::with_config(snapshot, lenient).rank_candidates(&requirement);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].affinity, Affinity::UnstaffedRoleWithoutLabels);
}

#[test]
fn no_candidate_below_cutoff_and_results_are_deterministic() {
    let persons = vec![
        Person::new("a", "Alice").with_labels(["L1", "L2"]),
        Person::new("b", "Bob").with_labels(["L2"]),
        Person::new("c", "Carol").with_labels(["L3"]),
        Person::new("d", "Dan"),
    ];
    let assignments = vec![
        Assignment::new("a", "dp1", "r1", 12.0),
        Assignment::new("c", "dp2", "dpo", 30.0),
    ];
    let requirements = vec![
        RoleRequirement::new("r1", 10.0),
        RoleRequirement::new("dpo", 10.0),
    ];

    let first = generate_optimal_team(&requirements, &persons, &assignments, &roles(), &[]);
    let second = generate_optimal_team(&requirements, &persons, &assignments, &roles(), &[]);
    assert_eq!(first, second);

    for rec in &first.recommendations {
        assert!(rec.candidates.iter().all(|c| c.role_match_score >= 25.0));
    }
}

#[test]
fn ended_assignment_counts_as_history_but_not_workload() {
    let date = chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let persons = vec![Person::new("a", "Alice")];
    let assignments = vec![Assignment::new("a", "dp1", "r1", 25.0).ended(date)];

    assert_eq!(compute_workload("a", &assignments), 0.0);
    assert_eq!(role_match_score(&persons[0], "r1", &assignments, &persons), 90.0);
}

fn labels(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("L{i}")).collect()
}

#[test]
fn label_overlap_at_cutoff_is_kept() {
    let persons = vec![
        Person::new("h", "Holder").with_labels(labels(0..12)),
        Person::new("c", "Cleo").with_labels(labels(0..5)),
    ];
    let assignments = vec![Assignment::new("h", "dp1", "r1", 10.0)];

    let recs = recommend_team_for_project(
        &[RoleRequirement::new("r1", 8.0)],
        &persons,
        &assignments,
        &roles(),
        &[],
    );
    let cleo = recs[0]
        .candidates
        .iter()
        .find(|c| c.person.id == "c")
        .expect("candidate at the cutoff is kept");
    // round(5 / 12 * 60) = 25
    assert_eq!(cleo.role_match_score, 25.0);
    assert_eq!(
        cleo.affinity,
        Affinity::LabelOverlap {
            matched: 5,
            relevant: 12
        }
    );
}

#[test]
fn label_overlap_below_cutoff_is_excluded() {
    let persons = vec![
        Person::new("h", "Holder").with_labels(labels(0..3)),
        Person::new("c", "Cleo").with_labels(labels(0..1)),
    ];
    let assignments = vec![Assignment::new("h", "dp1", "r1", 10.0)];

    assert_eq!(role_match_score(&persons[1], "r1", &assignments, &persons), 20.0);
    let recs = recommend_team_for_project(
        &[RoleRequirement::new("r1", 8.0)],
        &persons,
        &assignments,
        &roles(),
        &[],
    );
    let ids: Vec<&str> = recs[0]
        .candidates
        .iter()
        .map(|c| c.person.id.as_str())
        .collect();
    assert_eq!(ids, vec!["h"]);
}

#[test]
fn zero_capacity_overbooking_ranks_below_full_capacity() {
    let persons = vec![
        Person::new("zero", "Zed").with_weekly_hours(0.0),
        Person::new("full", "Fay").with_weekly_hours(10.0),
    ];
    let assignments = vec![
        Assignment::new("zero", "dp1", "r1", 30.0),
        Assignment::new("full", "dp2", "r1", 10.0),
    ];

    let recs = recommend_team_for_project(
        &[RoleRequirement::new("r1", 5.0)],
        &persons,
        &assignments,
        &roles(),
        &[],
    );
    let candidates = &recs[0].candidates;
    assert_eq!(candidates[0].person.id, "full");
    assert_eq!(candidates[0].score, 100.0);
    assert_eq!(candidates[1].person.id, "zero");
    assert!(candidates[1].workload_ratio > 1.0);
    assert!(candidates[1].score < 100.0);
}
