use serde::{Deserialize, Serialize};

use std::path::PathBuf;

#[derive(Default, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct Config {
    /// Marker to plot when none is given on the command line.
    pub marker: Option<String>,
    pub output: Option<PathBuf>,
    pub plot: PlotSettings,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct PlotSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        PlotSettings {
            width: 1000,
            height: 1200,
        }
    }
}
