mod loader;

pub use loader::{Config, ExpertConfig, LoggingConfig, StoreKind};
