//! Dashboard settings.
//!
//! Settings come from an optional TOML file, overridden by `DISTWATCH_`
//! environment variables (nested keys separated by `__`):
//!
//! ```toml
//! [supabase]
//! url = "https://xyzcompany.supabase.co"
//! api_key = "public-anon-key"
//!
//! [table]
//! name = "mediciones_distancia"
//! schema = "public"
//!
//! [chart]
//! width = 800
//! ```
//!
//! ```bash
//! DISTWATCH_SUPABASE__API_KEY=... distwatch --config distwatch.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::limits::CHART_DEFAULT_WIDTH;
#[cfg(feature = "supabase")]
use crate::source::SupabaseConfig;
use crate::source::{TableFilter, DEFAULT_SCHEMA, DEFAULT_TABLE};

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Supabase project to read from. Takes precedence over `stream`.
    #[cfg(feature = "supabase")]
    pub supabase: Option<SupabaseConfig>,
    pub stream: StreamSettings,
    pub table: TableSettings,
    pub chart: ChartSettings,
}

/// Newline-delimited JSON stream settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// `host:port` to connect to.
    pub connect: Option<String>,
    /// JSON file with the initial rows.
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub name: String,
    pub schema: String,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_TABLE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl TableSettings {
    pub fn filter(&self) -> TableFilter {
        TableFilter::new(&self.name).with_schema(&self.schema)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Width of exported charts in pixels.
    pub width: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: CHART_DEFAULT_WIDTH,
        }
    }
}

impl Settings {
    /// Load settings from `path` (if any) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(Environment::with_prefix("DISTWATCH").separator("__"))
            .build()
            .context("loading settings")?;

        config
            .try_deserialize()
            .context("invalid settings")
    }
}
