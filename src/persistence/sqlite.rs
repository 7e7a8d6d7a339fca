use super::{PersistenceResult, PlannerStore};
use crate::model::Assignment;
use crate::planner::{Planner, PlannerData};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Record tables that share the `(id, position, payload_json)` layout.
const RECORD_TABLES: [&str; 5] = ["persons", "roles", "data_products", "labels", "skills"];

pub struct SqlitePlannerStore {
    connection: Mutex<Connection>,
}

impl SqlitePlannerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let mut ddl = String::from(
            r#"
            CREATE TABLE IF NOT EXISTS planner_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                saved_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS assignments (
                person_id TEXT NOT NULL,
                data_product_id TEXT NOT NULL,
                role_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                assignment_json TEXT NOT NULL,
                UNIQUE (person_id, data_product_id, role_id)
            );
            "#,
        );
        for table in RECORD_TABLES {
            ddl.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id TEXT PRIMARY KEY,
                    position INTEGER NOT NULL,
                    payload_json TEXT NOT NULL
                );\n"
            ));
        }
        connection.execute_batch(&ddl)?;
        Ok(())
    }

    fn save_records<T: Serialize>(
        tx: &Transaction,
        table: &str,
        records: &[T],
        id_of: impl Fn(&T) -> &str,
    ) -> PersistenceResult<()> {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} (id, position, payload_json) VALUES (?1, ?2, ?3)"
        ))?;
        for (position, record) in records.iter().enumerate() {
            let json = serde_json::to_string(record)?;
            stmt.execute(params![id_of(record), position as i64, json])?;
        }
        Ok(())
    }

    fn save_assignments(tx: &Transaction, assignments: &[Assignment]) -> PersistenceResult<()> {
        tx.execute("DELETE FROM assignments", [])?;
        let mut stmt = tx.prepare(
            "INSERT INTO assignments (person_id, data_product_id, role_id, position, assignment_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, assignment) in assignments.iter().enumerate() {
            let json = serde_json::to_string(assignment)?;
            stmt.execute(params![
                assignment.person_id,
                assignment.data_product_id,
                assignment.role_id,
                position as i64,
                json
            ])?;
        }
        Ok(())
    }

    fn load_records<T: DeserializeOwned>(conn: &Connection, table: &str) -> PersistenceResult<Vec<T>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT payload_json FROM {table} ORDER BY position ASC"
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }
}

impl PlannerStore for SqlitePlannerStore {
    fn save_planner(&self, planner: &Planner) -> PersistenceResult<()> {
        let data = planner.data();
        super::validate_data(data)?;
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        Self::save_records(&tx, "persons", &data.persons, |p| p.id.as_str())?;
        Self::save_records(&tx, "roles", &data.roles, |r| r.id.as_str())?;
        Self::save_records(&tx, "data_products", &data.data_products, |d| d.id.as_str())?;
        Self::save_records(&tx, "labels", &data.labels, |l| l.id.as_str())?;
        Self::save_records(&tx, "skills", &data.skills, |s| s.id.as_str())?;
        Self::save_assignments(&tx, &data.assignments)?;
        tx.execute(
            "INSERT OR REPLACE INTO planner_meta (id, saved_at) VALUES (1, ?1)",
            params![chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        tracing::debug!(
            persons = data.persons.len(),
            assignments = data.assignments.len(),
            "planner saved to sqlite"
        );
        Ok(())
    }

    fn load_planner(&self) -> PersistenceResult<Option<Planner>> {
        let conn = self.connection.lock();

        let saved: i64 = conn.query_row("SELECT COUNT(*) FROM planner_meta", [], |row| row.get(0))?;
        if saved == 0 {
            return Ok(None);
        }

        let mut stmt =
            conn.prepare("SELECT assignment_json FROM assignments ORDER BY position ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut assignments = Vec::new();
        for json in rows {
            assignments.push(serde_json::from_str::<Assignment>(&json?)?);
        }

        let data = PlannerData {
            persons: Self::load_records(&conn, "persons")?,
            roles: Self::load_records(&conn, "roles")?,
            data_products: Self::load_records(&conn, "data_products")?,
            labels: Self::load_records(&conn, "labels")?,
            skills: Self::load_records(&conn, "skills")?,
            assignments,
        };
        Ok(Some(Planner::from_data(data)?))
    }
}
