//! Shared setup for commands: config, env overlay, logging, store.

use anyhow::Result;
use harvest_core::config::{self, EnvSettings, HarvestConfig};
use harvest_core::gate::ScheduleGate;
use harvest_core::ledger::RunLedger;
use harvest_core::logging;
use harvest_core::object_store::{FsObjectStore, ObjectStore};
use harvest_core::report::ExecutionRecorder;
use std::path::Path;
use std::sync::Arc;

pub struct Context {
    pub cfg: HarvestConfig,
    pub env: EnvSettings,
    pub store: Arc<dyn ObjectStore>,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut cfg = match config_path {
            Some(p) => config::load_from_path(p)?,
            None => config::load_or_init()?,
        };
        let env = EnvSettings::from_env();
        cfg.apply_env(&env);

        let format = cfg.logging.format;
        if !cfg.logging.to_file || logging::init_logging(format).is_err() {
            logging::init_logging_stderr(format);
        }

        cfg.validate()?;
        let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&cfg.storage.root));
        Ok(Self { cfg, env, store })
    }

    pub fn ledger(&self) -> RunLedger {
        RunLedger::new(Arc::clone(&self.store))
    }

    pub fn recorder(&self) -> ExecutionRecorder {
        ExecutionRecorder::new(Arc::clone(&self.store))
    }

    pub fn gate(&self) -> ScheduleGate {
        ScheduleGate::new(Arc::new(self.ledger())).enabled(self.cfg.gate.enabled)
    }
}
