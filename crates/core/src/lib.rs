pub mod artifact;
pub mod bulk;
pub mod cache;
pub mod category;
pub mod config;
pub mod engine;
pub mod export;
pub mod metrics;
pub mod query;
pub mod search;
pub mod store;
pub mod testing;

pub use artifact::{ArtifactError, ArtifactStore, FsArtifactStore};
pub use bulk::{BulkOps, DeleteOutcome, DeleteReport};
pub use cache::{CachedValue, Fingerprint, MemoryCache, ResultCache};
pub use category::CategoryTree;
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{CollaboratorError, EngineError, ReleaseQueryEngine};
pub use export::{ExportCollector, ExportError};
pub use search::{IndexQuery, ManticoreIndex, SearchError, SearchIndex};
pub use store::{
    Release, ReleaseStore, ReleaseUpdate, ResultPage, SqliteReleaseStore, StoreError,
};
