pub mod analytics;
pub mod config;
pub mod model;
pub mod persistence;
pub mod planner;
pub mod rate_limit;
pub mod recommendation;
pub mod record_validation;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use analytics::{
    DataProductStaffing, PersonUtilization, RoleCoverage, UtilizationFilter,
    data_product_staffing, data_product_staffing_frame, person_utilization, role_coverage,
    role_coverage_frame, utilization_frame,
};
pub use config::{ConfigError, EngineConfig, ServerConfig};
pub use model::{
    Assignment, AssignmentKey, DataProduct, Label, Person, Role, RoleRequirement, Skill,
};
pub use persistence::{
    ImportSummary, PersistenceError, PlannerStore, export_assignments_csv, export_persons_csv,
    import_assignments_csv, import_persons_csv, load_planner_from_json, save_planner_to_json,
};
#[cfg(feature = "sqlite")]
pub use persistence::SqlitePlannerStore;
pub use planner::{Planner, PlannerData, PlannerError};
pub use rate_limit::{Clock, ManualClock, RateDecision, RateLimiter, SystemClock};
pub use recommendation::team::{TeamMember, TeamResult, UnfilledRequirement};
pub use recommendation::{
    Affinity, PlanningSnapshot, RecommendationEngine, RoleRecommendation, available_hours,
    compute_workload, generate_optimal_team, recommend_team_for_project, role_match_score,
    validate_role_requirements,
};
pub use recommendation::ranking::Candidate;
