mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use crate::config::{Config, StoreKind};
use crate::engine::{AssignmentManager, ExpertRoster};
use crate::store::{MemoryStore, YamlStore};

pub use store::ConfiguredStore;

/// Everything a command needs, built once from configuration.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<ConfiguredStore>,
    pub assignments: AssignmentManager<ConfiguredStore>,
    pub experts: ExpertRoster<ConfiguredStore>,
}

impl AppContext {
    /// Open the configured store and seed the roster if it is empty.
    pub async fn open(config: Config) -> Result<Self> {
        let store = match config.store {
            StoreKind::Yaml => {
                let path = config.store_path();
                let store = YamlStore::open(&path)
                    .await
                    .with_context(|| format!("Failed to open store: {:?}", path))?;
                ConfiguredStore::Yaml(store)
            }
            StoreKind::Memory => ConfiguredStore::Memory(MemoryStore::new()),
        };

        let ctx = Self::with_store(config, Arc::new(store));
        let seeded = ctx
            .experts
            .seed(&ctx.config.experts)
            .await
            .context("Failed to seed expert roster")?;
        if seeded > 0 {
            debug!("Seeded roster with {} configured experts", seeded);
        }

        Ok(ctx)
    }

    pub fn with_store(config: Config, store: Arc<ConfiguredStore>) -> Self {
        Self {
            assignments: AssignmentManager::new(
                Arc::clone(&store),
                config.availability.clone(),
            ),
            experts: ExpertRoster::new(Arc::clone(&store)),
            store,
            config,
        }
    }
}
