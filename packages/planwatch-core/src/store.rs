//! JSON file store for holdings, prices and the decision log.
//!
//! The calculations never touch storage. This adapter exists for the CLI and
//! for callers without a storage layer of their own.

use crate::types::{DecisionEntry, Holdings, Prices};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const HOLDINGS_FILE: &str = "holdings.json";
const PRICES_FILE: &str = "prices.json";
const DECISIONS_FILE: &str = "decisions.json";

/// Store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create a store in the default data directory.
    ///
    /// Default directory: `~/.planwatch/`
    /// Can be overridden with `PLANWATCH_DATA_DIR` environment variable.
    pub fn new() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }

    /// Create a store rooted at a custom directory.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Get the default data directory.
    pub fn default_dir() -> PathBuf {
        if let Ok(dir) = env::var("PLANWATCH_DATA_DIR") {
            return PathBuf::from(dir);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".planwatch"))
            .unwrap_or_else(|| PathBuf::from(".planwatch"))
    }

    /// Get the data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        if !path.exists() {
            tracing::debug!("{} not found, starting empty", path.display());
            return Ok(T::default());
        }

        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(value)?;
        fs::write(self.dir.join(name), content)?;
        Ok(())
    }

    /// Load holdings; empty when none were saved yet.
    pub fn load_holdings(&self) -> Result<Holdings> {
        self.load(HOLDINGS_FILE)
    }

    /// Replace the saved holdings wholesale.
    pub fn save_holdings(&self, holdings: &Holdings) -> Result<()> {
        holdings.validate()?;
        self.save(HOLDINGS_FILE, holdings)
    }

    /// Load the last price refresh; every quote is missing when none was saved.
    pub fn load_prices(&self) -> Result<Prices> {
        self.load(PRICES_FILE)
    }

    pub fn save_prices(&self, prices: &Prices) -> Result<()> {
        self.save(PRICES_FILE, prices)
    }

    /// Load the full decision log in stored order.
    pub fn load_decisions(&self) -> Result<Vec<DecisionEntry>> {
        self.load(DECISIONS_FILE)
    }

    /// Append a decision to the log. Existing entries are never rewritten.
    pub fn append_decision(&self, entry: &DecisionEntry) -> Result<()> {
        let mut decisions = self.load_decisions()?;
        decisions.push(entry.clone());
        self.save(DECISIONS_FILE, &decisions)?;
        tracing::debug!(
            id = %entry.id,
            count = decisions.len(),
            "Appended decision to log"
        );
        Ok(())
    }
}

impl Default for JsonStore {
    fn default() -> Self {
        Self::new()
    }
}
