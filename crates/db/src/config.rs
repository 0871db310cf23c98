use pantry_core::error::CoreError;

/// Which document store implementation to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl StoreBackend {
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(CoreError::Config(format!(
                "Unknown STORE_BACKEND '{other}'. Must be one of: memory, postgres"
            ))),
        }
    }
}

/// Document store configuration supplied at process start.
///
/// The embedding process is expected to call `dotenvy::dotenv()` (or use
/// [`StoreConfig::from_env`], which does it) before reading.
#[derive(Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Required for [`StoreBackend::Postgres`].
    pub database_url: Option<String>,
    /// Pool size for [`StoreBackend::Postgres`] (default: `10`).
    pub max_connections: u32,
    /// Project identifier (default: `pantry`).
    pub project_id: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: 10,
            project_id: "pantry".into(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from `.env` and environment variables.
    ///
    /// | Env Var                 | Default  |
    /// |-------------------------|----------|
    /// | `STORE_BACKEND`         | `memory` |
    /// | `DATABASE_URL`          | none     |
    /// | `STORE_MAX_CONNECTIONS` | `10`     |
    /// | `STORE_PROJECT_ID`      | `pantry` |
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let backend = match lookup("STORE_BACKEND") {
            Some(name) => StoreBackend::from_name(&name)?,
            None => defaults.backend,
        };

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(CoreError::Config(
                "DATABASE_URL must be set when STORE_BACKEND is postgres".into(),
            ));
        }

        let max_connections = match lookup("STORE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    CoreError::Config(format!(
                        "STORE_MAX_CONNECTIONS must be a positive integer, got '{raw}'"
                    ))
                })?,
            None => defaults.max_connections,
        };

        let project_id = lookup("STORE_PROJECT_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.project_id);

        Ok(Self {
            backend,
            database_url,
            max_connections,
            project_id,
        })
    }
}
