use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::kernel::memory::{MAX_PROGRAMS, PARTITION_SIZE};
use crate::kernel::{SchedulingAlgorithm, DEFAULT_QUANTUM};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub policy: SchedulingAlgorithm,
    pub quantum: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            policy: SchedulingAlgorithm::RoundRobin,
            quantum: DEFAULT_QUANTUM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub partition_size: usize,
    pub partitions: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            partition_size: PARTITION_SIZE,
            partitions: MAX_PROGRAMS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub memory: MemoryConfig,
    pub single_step: bool,
    pub max_ticks: u64,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scheduler: SchedulerConfig::default(),
            memory: MemoryConfig::default(),
            single_step: false,
            max_ticks: 10_000,
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)?;
        Config::from_toml(&text)
    }
}
