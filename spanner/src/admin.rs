use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use snippets_gax::cancel::CancellationToken;
use snippets_gax::retry::{invoke, RetrySetting};
use snippets_gax::status::{Code, Status};

use crate::database::Database;
use crate::instance::Instance;
use crate::lexer::Parser;
use crate::longrunning::Operation;

pub fn default_retry_setting() -> RetrySetting {
    RetrySetting {
        from_millis: 50,
        max_delay: Some(Duration::from_secs(10)),
        factor: 1u64,
        take: 20,
        codes: vec![Code::Unavailable, Code::Unknown, Code::DeadlineExceeded],
    }
}

/// Metadata describing one database of an instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct CreateDatabaseRequest {
    /// Instance name, `instances/<instance_id>`.
    pub parent: String,
    /// `CREATE DATABASE <database_id>`; the id may be backquoted.
    pub create_statement: String,
    pub extra_statements: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateDatabaseDdlRequest {
    pub database: String,
    pub statements: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GetDatabaseDdlRequest {
    pub database: String,
}

#[derive(Clone, Debug, Default)]
pub struct DropDatabaseRequest {
    pub database: String,
}

#[derive(Clone, Debug, Default)]
pub struct ListDatabasesRequest {
    pub parent: String,
}

#[derive(Clone)]
pub struct DatabaseAdminClient {
    instance: Arc<Instance>,
    operation_seq: Arc<AtomicU64>,
}

impl DatabaseAdminClient {
    pub fn new(instance: Arc<Instance>) -> Self {
        Self {
            instance,
            operation_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    fn operation_name(&self, database: &str) -> String {
        format!(
            "{}/operations/_auto_op_{}",
            database,
            self.operation_seq.fetch_add(1, Ordering::Relaxed)
        )
    }

    fn check_parent(&self, parent: &str) -> Result<(), Status> {
        if parent == self.instance.name() {
            Ok(())
        } else {
            Err(Status::not_found(format!("Instance not found: {}", parent)))
        }
    }

    /// Splits `instances/<i>/databases/<d>` into the database id after checking the instance.
    fn database_id<'a>(&self, database: &'a str) -> Result<&'a str, Status> {
        match database.rsplit_once("/databases/") {
            Some((parent, id)) if !id.is_empty() => {
                self.check_parent(parent)?;
                Ok(id)
            }
            _ => Err(Status::invalid_argument(format!("Invalid database name: {}", database))),
        }
    }

    /// list_databases lists the databases of the instance.
    pub async fn list_databases(
        &self,
        cancel: Option<CancellationToken>,
        req: ListDatabasesRequest,
        opt: Option<RetrySetting>,
    ) -> Result<Vec<DatabaseInfo>, Status> {
        let opt = Some(opt.unwrap_or_else(default_retry_setting));
        let action = || async {
            self.check_parent(&req.parent)?;
            Ok::<_, Status>(self
                .instance
                .database_ids()
                .iter()
                .map(|id| DatabaseInfo {
                    name: self.instance.database_name(id),
                })
                .collect::<Vec<_>>())
        };
        invoke(cancel, opt, action).await
    }

    /// create_database creates a new database and applies `extra_statements`
    /// to it. The returned operation has a name of the format
    /// `<database_name>/operations/<operation_id>`. The database becomes
    /// visible only once every statement has been applied.
    pub async fn create_database(
        &self,
        cancel: Option<CancellationToken>,
        req: CreateDatabaseRequest,
        opt: Option<RetrySetting>,
    ) -> Result<Operation<DatabaseInfo>, Status> {
        let opt = Some(opt.unwrap_or_else(default_retry_setting));
        let action = || async {
            self.check_parent(&req.parent)?;
            let id = parse_create_database(&req.create_statement)?;
            if self.instance.contains(&id) {
                return Err(Status::already_exists(format!(
                    "Database already exists: {}",
                    self.instance.database_name(&id)
                )));
            }
            Ok(id)
        };
        let id: String = invoke(cancel, opt, action).await?;

        let name = self.instance.database_name(&id);
        let instance = self.instance.clone();
        let statements = req.extra_statements;
        tracing::debug!("creating database {} with {} statements", name, statements.len());
        Ok(Operation::spawn(self.operation_name(&name), move || {
            let database = Database::new(instance.database_name(&id));
            if !statements.is_empty() {
                database.update_ddl(&statements)?;
            }
            let info = DatabaseInfo {
                name: database.name().to_string(),
            };
            instance.register(&id, Arc::new(database))?;
            Ok(info)
        }))
    }

    /// update_database_ddl updates the schema of a database by
    /// creating/altering/dropping tables and columns. Either every statement
    /// is applied or none is. The operation has no response.
    pub async fn update_database_ddl(
        &self,
        cancel: Option<CancellationToken>,
        req: UpdateDatabaseDdlRequest,
        opt: Option<RetrySetting>,
    ) -> Result<Operation<()>, Status> {
        let opt = Some(opt.unwrap_or_else(default_retry_setting));
        let action = || async {
            let id = self.database_id(&req.database)?;
            self.instance.database(id)
        };
        let database = invoke(cancel, opt, action).await?;
        let statements = req.statements;
        tracing::debug!("updating ddl of {}: {:?}", req.database, statements);
        Ok(Operation::spawn(self.operation_name(&req.database), move || {
            database.update_ddl(&statements)
        }))
    }

    /// get_database_ddl returns the schema of a database as a list of
    /// CREATE TABLE statements, parents before their interleaved children.
    pub async fn get_database_ddl(
        &self,
        cancel: Option<CancellationToken>,
        req: GetDatabaseDdlRequest,
        opt: Option<RetrySetting>,
    ) -> Result<Vec<String>, Status> {
        let opt = Some(opt.unwrap_or_else(default_retry_setting));
        let action = || async {
            let id = self.database_id(&req.database)?;
            Ok::<_, Status>(self.instance.database(id)?.schema().ddl())
        };
        invoke(cancel, opt, action).await
    }

    /// drop_database drops a database and deletes all of its data.
    pub async fn drop_database(
        &self,
        cancel: Option<CancellationToken>,
        req: DropDatabaseRequest,
        opt: Option<RetrySetting>,
    ) -> Result<(), Status> {
        let opt = Some(opt.unwrap_or_else(default_retry_setting));
        let action = || async {
            let id = self.database_id(&req.database)?;
            self.instance.remove(id).map(|_| ())
        };
        invoke(cancel, opt, action).await
    }
}

fn parse_create_database(sql: &str) -> Result<String, Status> {
    let parse = || -> Result<String, String> {
        let mut p = Parser::new(sql)?;
        p.expect_keyword("CREATE")?;
        p.expect_keyword("DATABASE")?;
        let id = p.expect_identifier()?;
        p.expect_end()?;
        Ok(id)
    };
    parse().map_err(|e| {
        Status::invalid_argument(format!("Error parsing CREATE DATABASE statement: {}", e))
    })
}
