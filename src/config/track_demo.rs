use crate::finder::FinderParams;
use crate::hits::LayoutParams;
use crate::synthetic::SyntheticParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrackDemoOutput {
    /// Tracks and diagnostics of every event.
    pub result_json: Option<PathBuf>,
    /// Simulated hits and truth labels, when events are simulated.
    pub events_json: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TrackDemoConfig {
    /// Events to load (array of hit arrays). When absent, events are simulated.
    pub input: Option<PathBuf>,
    /// Number of simulated events; seeds count up from `synthetic.seed`.
    pub events: usize,
    pub layout: LayoutParams,
    pub synthetic: SyntheticParams,
    pub finder: FinderParams,
    pub output: TrackDemoOutput,
}

impl Default for TrackDemoConfig {
    fn default() -> Self {
        Self {
            input: None,
            events: 1,
            layout: LayoutParams::default(),
            synthetic: SyntheticParams::default(),
            finder: FinderParams::default(),
            output: TrackDemoOutput::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<TrackDemoConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: TrackDemoConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
