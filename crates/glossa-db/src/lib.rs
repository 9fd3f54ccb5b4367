//! # glossa-db
//!
//! PostgreSQL and blob storage layer for glossa.
//!
//! This crate provides:
//! - Connection pool management
//! - The job repository, where the `jobs` table doubles as the work queue
//!   (claims use `FOR UPDATE SKIP LOCKED`)
//! - Filesystem-backed blob storage for original and translated documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use glossa_db::{CreateJobRequest, Database, JobRepository};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/glossa").await?;
//!
//!     let job = db
//!         .jobs
//!         .upsert(&CreateJobRequest::new(Uuid::new_v4()).with_file_name("paper.pdf"))
//!         .await?;
//!
//!     println!("Created job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod blob_storage;
pub mod jobs;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so downstream crates can use the in-memory fakes
pub mod test_fixtures;

// Re-export core types
pub use glossa_core::*;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// Re-export storage and repository implementations
pub use blob_storage::{
    artifact_path, ArtifactKind, BlobStore, FilesystemBackend, StorageBackend,
};
pub use jobs::PgJobRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Job repository backing both the HTTP surface and the worker queue.
    pub jobs: PgJobRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_passthrough() {
        assert_eq!(escape_like("report"), "report");
        assert_eq!(escape_like(""), "");
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        // Backslash escaped before the wildcards it might precede.
        assert_eq!(escape_like("\\%"), "\\\\\\%");
    }
}
