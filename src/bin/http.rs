use std::sync::Arc;

use team_planner::http_api::{self, AppState};
use team_planner::{Planner, RateLimiter, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let engine_config = config.load_engine_config()?;
    engine_config.validate()?;

    let (planner, store) = open_planner(&config)?;
    let mut state = if config.read_only {
        AppState::read_only(planner)
    } else {
        AppState::new(planner)
    };
    if let Some(store) = store {
        if !config.read_only {
            state = state.with_store(store);
        }
    }
    if config.rate_limit > 0 {
        state = state.with_rate_limiter(RateLimiter::new(
            config.rate_limit,
            chrono::Duration::seconds(config.rate_window_secs),
        ));
    }
    state = state.with_engine_config(engine_config);

    http_api::serve(config.addr, state).await?;
    Ok(())
}

type OpenedPlanner = (Planner, Option<Arc<dyn team_planner::PlannerStore>>);

#[cfg(feature = "sqlite")]
fn open_planner(config: &ServerConfig) -> Result<OpenedPlanner, Box<dyn std::error::Error>> {
    use team_planner::{PlannerStore, SqlitePlannerStore};

    let Some(path) = &config.database else {
        return Ok((Planner::new(), None));
    };
    let store = SqlitePlannerStore::new(path)?;
    let planner = store.load_planner()?.unwrap_or_default();
    tracing::info!(
        database = %path.display(),
        persons = planner.persons().len(),
        assignments = planner.assignments().len(),
        "planner loaded"
    );
    let store: Arc<dyn PlannerStore> = Arc::new(store);
    Ok((planner, Some(store)))
}

#[cfg(not(feature = "sqlite"))]
fn open_planner(config: &ServerConfig) -> Result<OpenedPlanner, Box<dyn std::error::Error>> {
    if config.database.is_some() {
        tracing::warn!("TEAM_PLANNER_DB is set but the `sqlite` feature is disabled");
    }
    Ok((Planner::new(), None))
}
