use std::path::{Path, PathBuf};

use crate::config::FlowConfig;

use super::output::OutputFormat;

/// What every command gets: the layered configuration, where it came from,
/// and how to print results.
pub struct CliContext {
    config: FlowConfig,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: FlowConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }
}
