use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use elsh_fmap::{ConfusionCounters, ProtocolParams, TheoreticalPrediction};
use tracing::info;

use crate::experiment::Timings;

const LEDGER_VERSION: &str = "1.0";

/// Every run of the driver, keyed by run name (`n{n}_d{d}_delta{delta}`).
#[derive(Serialize, Deserialize, Debug)]
pub struct Ledger {
    pub version: String,
    pub runs: BTreeMap<String, RunEntry>,
    #[serde(skip)]
    path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunEntry {
    pub run_name: String,
    pub n: usize,
    pub params: ProtocolParams,
    pub k: usize,
    pub counters: ConfusionCounters,
    pub theory: TheoreticalPrediction,
    pub timings: Timings,
    pub created_at: String,
    pub updated_at: String,
}

impl Ledger {
    /// Load the ledger at `path`, or start an empty one if the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            info!("no ledger at {}, starting a new one", path.display());
            return Ok(Ledger {
                version: LEDGER_VERSION.to_string(),
                runs: BTreeMap::new(),
                path: path.to_path_buf(),
            });
        }

        let data = fs::read_to_string(path)?;
        let mut ledger: Ledger = serde_json::from_str(&data)?;
        ledger.path = path.to_path_buf();
        info!("ledger loaded: {} runs", ledger.runs.len());
        Ok(ledger)
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Insert or replace a run. A replaced run keeps its original `created_at`.
    pub fn insert(&mut self, mut entry: RunEntry) {
        if let Some(previous) = self.runs.get(&entry.run_name) {
            entry.created_at = previous.created_at.clone();
        }
        self.runs.insert(entry.run_name.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }
}

impl RunEntry {
    pub fn new(
        run_name: String,
        n: usize,
        params: ProtocolParams,
        k: usize,
        counters: ConfusionCounters,
        theory: TheoreticalPrediction,
        timings: Timings,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            run_name,
            n,
            params,
            k,
            counters,
            theory,
            timings,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
