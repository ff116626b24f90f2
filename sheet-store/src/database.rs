use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{ConnectionError, ConnectionResult};
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager, ManagerConfig,
    },
    sync_connection_wrapper::SyncConnectionWrapper,
    AsyncConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use crate::catalog::DatasetEntry;
use crate::domain::{Record, StoredRecord};
use crate::error::SheetStoreError;
use crate::models::*;
use crate::schema::*;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type SqliteConn = SyncConnectionWrapper<SqliteConnection>;

/// Applied to every pooled connection. Foreign keys are off by default in SQLite.
const CONNECTION_PRAGMAS: &[&str] = &["PRAGMA foreign_keys = ON", "PRAGMA busy_timeout = 5000"];

#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<SqliteConn>,
}

impl DatabaseManager {
    /// Open the store at `database_url` (a SQLite file path) and bring its
    /// schema up to date.
    pub async fn new(database_url: &str) -> Result<Self, SheetStoreError> {
        let mut config = ManagerConfig::default();
        config.custom_setup = Box::new(establish_connection);

        let manager =
            AsyncDieselConnectionManager::<SqliteConn>::new_with_config(database_url, config);
        let pool = Pool::builder(manager)
            .build()
            .map_err(|e| SheetStoreError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let manager = Self { pool };
        manager.run_migrations(database_url).await?;

        Ok(manager)
    }

    pub async fn run_migrations(&self, database_url: &str) -> Result<(), SheetStoreError> {
        // diesel_migrations only drives synchronous connections
        let database_url = database_url.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), SheetStoreError> {
            let mut connection = SqliteConnection::establish(&database_url).map_err(|e| {
                SheetStoreError::ConfigError {
                    message: format!("Failed to establish connection for migrations: {}", e),
                }
            })?;

            let applied = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
                SheetStoreError::ConfigError {
                    message: format!("Failed to run migrations: {}", e),
                }
            })?;

            info!("Applied {} pending migration(s)", applied.len());
            Ok(())
        })
        .await?
    }

    async fn connection(&self) -> Result<Object<SqliteConn>, SheetStoreError> {
        self.pool.get().await.map_err(|e| SheetStoreError::Store {
            message: format!("Failed to get database connection: {}", e),
        })
    }

    pub async fn create_dataset(
        &self,
        stored_name: &str,
        original_name: &str,
        uploaded_at: DateTime<Utc>,
    ) -> Result<i64, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        let dataset_id = insert_dataset(conn, stored_name, original_name, &uploaded_at).await?;
        info!("Created dataset {} for '{}'", dataset_id, original_name);

        Ok(dataset_id)
    }

    /// Persist all `records` under an existing dataset. Either every record is
    /// stored or none is.
    pub async fn insert_records(
        &self,
        dataset_id: i64,
        records: &[Record],
    ) -> Result<usize, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        let inserted = conn
            .transaction::<_, SheetStoreError, _>(|conn| {
                Box::pin(async move {
                    // First statement writes, so the lock is taken up front
                    if touch_dataset(conn, dataset_id).await? == 0 {
                        return Err(SheetStoreError::DatasetNotFound { dataset_id });
                    }
                    insert_rows(conn, dataset_id, records).await
                })
            })
            .await?;

        info!("Saved {} record(s) for dataset {}", inserted, dataset_id);
        Ok(inserted)
    }

    /// Create a dataset and store its records in a single transaction.
    pub async fn create_dataset_with_records(
        &self,
        stored_name: &str,
        original_name: &str,
        uploaded_at: DateTime<Utc>,
        records: &[Record],
    ) -> Result<i64, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        let dataset_id = conn
            .transaction::<_, SheetStoreError, _>(|conn| {
                Box::pin(async move {
                    let dataset_id =
                        insert_dataset(conn, stored_name, original_name, &uploaded_at).await?;
                    insert_rows(conn, dataset_id, records).await?;
                    Ok(dataset_id)
                })
            })
            .await?;

        info!(
            "Created dataset {} for '{}' with {} record(s)",
            dataset_id,
            original_name,
            records.len()
        );
        Ok(dataset_id)
    }

    pub async fn get_dataset(&self, dataset_id: i64) -> Result<Option<DatasetEntry>, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        find_dataset(conn, dataset_id).await?.map(TryInto::try_into).transpose()
    }

    /// All datasets, newest first.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetEntry>, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        let dataset_list = datasets::table
            .order(datasets::id.desc())
            .select(Dataset::as_select())
            .load::<Dataset>(conn)
            .await
            .map_err(|e| SheetStoreError::Store {
                message: format!("Failed to fetch datasets: {}", e),
            })?;

        dataset_list.into_iter().map(TryInto::try_into).collect()
    }

    /// Records of a dataset in insertion order. Unknown datasets have none.
    pub async fn get_records(&self, dataset_id: i64) -> Result<Vec<StoredRecord>, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        let row_list = rows::table
            .filter(rows::dataset_id.eq(dataset_id))
            .order(rows::id.asc())
            .select(RowModel::as_select())
            .load::<RowModel>(conn)
            .await
            .map_err(|e| SheetStoreError::Store {
                message: format!("Failed to fetch rows for dataset {}: {}", dataset_id, e),
            })?;

        debug!("Loaded {} row(s) for dataset {}", row_list.len(), dataset_id);
        row_list.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn count_records(&self, dataset_id: i64) -> Result<i64, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        let count = rows::table
            .filter(rows::dataset_id.eq(dataset_id))
            .count()
            .get_result::<i64>(conn)
            .await?;

        Ok(count)
    }

    /// Remove a dataset and its records. Returns the removed entry so the
    /// caller can clean up the stored file.
    pub async fn delete_dataset(&self, dataset_id: i64) -> Result<DatasetEntry, SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;

        // Records go with the dataset through ON DELETE CASCADE
        let removed = diesel::delete(datasets::table.filter(datasets::id.eq(dataset_id)))
            .returning(Dataset::as_returning())
            .get_result::<Dataset>(conn)
            .await
            .optional()?
            .ok_or(SheetStoreError::DatasetNotFound { dataset_id })?;

        info!("Deleted dataset {} ('{}')", removed.id, removed.originalname);
        removed.try_into()
    }

    pub async fn health_check(&self) -> Result<(), SheetStoreError> {
        let mut conn = self.connection().await?;
        let conn: &mut SqliteConn = &mut conn;
        diesel::sql_query("SELECT 1").execute(conn).await?;
        Ok(())
    }
}

fn establish_connection(url: &str) -> BoxFuture<'_, ConnectionResult<SqliteConn>> {
    async move {
        let mut conn = SqliteConn::establish(url).await?;
        for pragma in CONNECTION_PRAGMAS {
            diesel::sql_query(*pragma)
                .execute(&mut conn)
                .await
                .map_err(ConnectionError::CouldntSetupConfiguration)?;
        }
        Ok(conn)
    }
    .boxed()
}

/// No-op write on a dataset row. Returns the number of rows matched.
async fn touch_dataset(conn: &mut SqliteConn, dataset_id: i64) -> Result<usize, SheetStoreError> {
    let matched = diesel::update(datasets::table.filter(datasets::id.eq(dataset_id)))
        .set(datasets::originalname.eq(datasets::originalname))
        .execute(conn)
        .await?;

    Ok(matched)
}

async fn find_dataset(
    conn: &mut SqliteConn,
    dataset_id: i64,
) -> Result<Option<Dataset>, SheetStoreError> {
    let dataset = datasets::table
        .filter(datasets::id.eq(dataset_id))
        .select(Dataset::as_select())
        .first::<Dataset>(conn)
        .await
        .optional()?;

    Ok(dataset)
}

async fn insert_dataset(
    conn: &mut SqliteConn,
    stored_name: &str,
    original_name: &str,
    uploaded_at: &DateTime<Utc>,
) -> Result<i64, SheetStoreError> {
    let new_dataset = NewDataset::new(stored_name, original_name, uploaded_at);

    diesel::insert_into(datasets::table)
        .values(&new_dataset)
        .returning(datasets::id)
        .get_result::<i64>(conn)
        .await
        .map_err(|e| SheetStoreError::Store {
            message: format!("Failed to insert dataset: {}", e),
        })
}

async fn insert_rows(
    conn: &mut SqliteConn,
    dataset_id: i64,
    records: &[Record],
) -> Result<usize, SheetStoreError> {
    let new_rows = records
        .iter()
        .map(|record| NewRow::from_record(dataset_id, record))
        .collect::<Result<Vec<_>, _>>()?;

    let mut inserted = 0;
    for row in &new_rows {
        inserted += diesel::insert_into(rows::table)
            .values(row)
            .execute(conn)
            .await
            .map_err(|e| SheetStoreError::Store {
                message: format!("Failed to insert rows for dataset {}: {}", dataset_id, e),
            })?;
    }

    if inserted != records.len() {
        return Err(SheetStoreError::Store {
            message: format!(
                "Stored {} of {} rows for dataset {}",
                inserted,
                records.len(),
                dataset_id
            ),
        });
    }

    Ok(inserted)
}
