//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_STORAGE_PROVIDER: &str = "memory";
pub(crate) const DEFAULT_POSTGRES_HOST: &str = "localhost";
pub(crate) const DEFAULT_POSTGRES_DATABASE: &str = "javagraph";
pub(crate) const DEFAULT_POSTGRES_USER: &str = "javagraph";
pub(crate) const DEFAULT_POSTGRES_PASSWORD: &str = "javagraph";
pub(crate) const DEFAULT_INPUT_PATH: &str = "repo";

/// Upper bound accepted for `importer.thread_count`
pub const MAX_THREAD_COUNT: usize = 256;

/// Upper bound accepted for `importer.max_rows_per_batch`. Postgres binds at
/// most 65535 parameters per statement and an entity row binds 9.
pub const MAX_ROWS_PER_BATCH: usize = 7000;

pub(crate) fn default_thread_count() -> usize {
    4
}

pub(crate) fn default_max_rows_per_batch() -> usize {
    1000
}

pub(crate) fn default_strict_references() -> bool {
    false
}

pub(crate) fn default_storage_provider() -> String {
    DEFAULT_STORAGE_PROVIDER.to_string()
}

pub(crate) fn default_postgres_host() -> String {
    DEFAULT_POSTGRES_HOST.to_string()
}

pub(crate) fn default_postgres_port() -> u16 {
    5432
}

pub(crate) fn default_postgres_database() -> String {
    DEFAULT_POSTGRES_DATABASE.to_string()
}

pub(crate) fn default_postgres_user() -> String {
    DEFAULT_POSTGRES_USER.to_string()
}

pub(crate) fn default_postgres_password() -> String {
    DEFAULT_POSTGRES_PASSWORD.to_string()
}

pub(crate) fn default_postgres_pool_size() -> u32 {
    20
}

pub(crate) fn default_input_path() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_INPUT_PATH)
}
