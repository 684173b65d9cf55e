//! CLI arguments for the upload pipeline.

use clap::Args;
use serde::{Deserialize, Serialize};
use vertex_swarm_primitives::RedundancyLevel;

/// Default number of in-flight chunk puts or fetches per operation.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// CLI wrapper for [`RedundancyLevel`] with clap integration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RedundancyArg {
    /// No parity chunks.
    #[default]
    None,
    Medium,
    Strong,
    Insane,
    Paranoid,
}

impl From<RedundancyArg> for RedundancyLevel {
    fn from(arg: RedundancyArg) -> Self {
        match arg {
            RedundancyArg::None => Self::None,
            RedundancyArg::Medium => Self::Medium,
            RedundancyArg::Strong => Self::Strong,
            RedundancyArg::Insane => Self::Insane,
            RedundancyArg::Paranoid => Self::Paranoid,
        }
    }
}

impl From<RedundancyLevel> for RedundancyArg {
    fn from(level: RedundancyLevel) -> Self {
        match level {
            RedundancyLevel::None => Self::None,
            RedundancyLevel::Medium => Self::Medium,
            RedundancyLevel::Strong => Self::Strong,
            RedundancyLevel::Insane => Self::Insane,
            RedundancyLevel::Paranoid => Self::Paranoid,
        }
    }
}

/// Upload pipeline configuration.
#[derive(Debug, Args, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Upload")]
#[serde(default)]
pub struct PipelineArgs {
    /// Maximum chunks stored or fetched concurrently per operation.
    #[arg(long = "upload.concurrency", default_value_t = DEFAULT_CONCURRENCY, value_name = "N")]
    pub concurrency: usize,

    /// Default redundancy level for uploads.
    #[arg(long = "upload.redundancy", value_enum, default_value_t = RedundancyArg::None)]
    pub redundancy: RedundancyArg,

    /// Stage uploads locally rather than pushing them directly.
    #[arg(long = "upload.deferred", default_value_t = true, action = clap::ArgAction::Set, value_name = "BOOL")]
    pub deferred: bool,
}

impl Default for PipelineArgs {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            redundancy: RedundancyArg::None,
            deferred: true,
        }
    }
}

impl PipelineArgs {
    /// Validate argument values.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("upload.concurrency must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn redundancy(&self) -> RedundancyLevel {
        self.redundancy.into()
    }
}
