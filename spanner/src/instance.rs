use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use snippets_gax::status::Status;

use crate::database::Database;
use crate::value::Value;

/// An instance owns a set of databases, addressed by id.
pub struct Instance {
    name: String,
    databases: RwLock<BTreeMap<String, Arc<Database>>>,
}

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to restore database {0}: {1}")]
    Restore(String, Status),
}

#[derive(Serialize, Deserialize)]
struct InstanceState {
    name: String,
    databases: BTreeMap<String, DatabaseState>,
}

#[derive(Serialize, Deserialize)]
struct DatabaseState {
    ddl: Vec<String>,
    tables: Vec<TableState>,
}

#[derive(Serialize, Deserialize)]
struct TableState {
    name: String,
    rows: Vec<BTreeMap<String, Value>>,
}

impl Instance {
    pub fn new(instance_id: &str) -> Self {
        Instance {
            name: format!("instances/{}", instance_id),
            databases: RwLock::new(BTreeMap::new()),
        }
    }

    /// Resource name, `instances/<instance_id>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_name(&self, database_id: &str) -> String {
        format!("{}/databases/{}", self.name, database_id)
    }

    pub fn database(&self, database_id: &str) -> Result<Arc<Database>, Status> {
        self.databases.read().get(database_id).cloned().ok_or_else(|| {
            Status::not_found(format!("Database not found: {}", self.database_name(database_id)))
        })
    }

    pub fn database_ids(&self) -> Vec<String> {
        self.databases.read().keys().cloned().collect()
    }

    pub(crate) fn contains(&self, database_id: &str) -> bool {
        self.databases.read().contains_key(database_id)
    }

    pub(crate) fn register(&self, database_id: &str, database: Arc<Database>) -> Result<(), Status> {
        let mut databases = self.databases.write();
        if databases.contains_key(database_id) {
            return Err(Status::already_exists(format!(
                "Database already exists: {}",
                self.database_name(database_id)
            )));
        }
        databases.insert(database_id.to_string(), database);
        Ok(())
    }

    pub(crate) fn remove(&self, database_id: &str) -> Result<Arc<Database>, Status> {
        self.databases.write().remove(database_id).ok_or_else(|| {
            Status::not_found(format!("Database not found: {}", self.database_name(database_id)))
        })
    }

    /// Loads the instance from a state file written by [`Instance::save`].
    /// A missing file yields an empty instance.
    pub fn load(instance_id: &str, path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let instance = Instance::new(instance_id);
        if !path.exists() {
            tracing::debug!("state file {} not found, starting empty", path.display());
            return Ok(instance);
        }
        let state: InstanceState = serde_json::from_slice(&std::fs::read(path)?)?;
        if state.name != instance.name {
            tracing::warn!("state file {} belongs to {}, ignoring", path.display(), state.name);
            return Ok(instance);
        }
        for (id, db_state) in state.databases {
            let database = Database::new(instance.database_name(&id));
            let tables: Vec<_> = db_state.tables.into_iter().map(|t| (t.name, t.rows)).collect();
            database
                .import(&db_state.ddl, &tables)
                .map_err(|e| PersistError::Restore(id.clone(), e))?;
            instance
                .register(&id, Arc::new(database))
                .map_err(|e| PersistError::Restore(id.clone(), e))?;
        }
        tracing::debug!("loaded {} databases from {}", instance.database_ids().len(), path.display());
        Ok(instance)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let databases = self
            .databases
            .read()
            .iter()
            .map(|(id, database)| {
                let (ddl, tables) = database.export();
                let tables = tables.into_iter().map(|(name, rows)| TableState { name, rows }).collect();
                (id.clone(), DatabaseState { ddl, tables })
            })
            .collect();
        let state = InstanceState {
            name: self.name.clone(),
            databases,
        };
        std::fs::write(path.as_ref(), serde_json::to_vec_pretty(&state)?)?;
        Ok(())
    }
}
