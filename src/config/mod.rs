//! Session configuration.
//!
//! Every structure in this crate is sized once, before any hook is
//! attached. The defaults match the capacities the kernel-side programs
//! have shipped with; overrides come from a toml file provided by the
//! loader.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::histogram::HistogramError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} must be nonzero")]
    ZeroCapacity(&'static str),
    #[error(transparent)]
    Histogram(#[from] HistogramError),
}

#[derive(Deserialize)]
pub struct Config {
    #[serde(default = "max_cpus")]
    max_cpus: usize,

    #[serde(default = "max_cgroups")]
    max_cgroups: usize,

    // thread ids are bounded by the kernel pid space
    #[serde(default = "max_pid")]
    max_pid: usize,

    #[serde(default = "max_syscall_id")]
    max_syscall_id: usize,

    #[serde(default = "max_irqs")]
    max_irqs: usize,

    // in-flight socket operations tracked at once
    #[serde(default = "max_sockets")]
    max_sockets: usize,

    #[serde(default = "max_numa_nodes")]
    max_numa_nodes: usize,

    #[serde(default = "histogram_grouping_power")]
    histogram_grouping_power: u8,

    #[serde(default = "histogram_max_value_power")]
    histogram_max_value_power: u8,

    // cgroup metadata records buffered for the reader
    #[serde(default = "channel_capacity")]
    channel_capacity: usize,

    // sockets whose identity matches the mask are not sampled; 0 samples
    // everything
    #[serde(default)]
    tcp_sample_mask: u64,
}

fn max_cpus() -> usize {
    1024
}

fn max_cgroups() -> usize {
    4096
}

fn max_pid() -> usize {
    4194304
}

fn max_syscall_id() -> usize {
    1024
}

fn max_irqs() -> usize {
    4096
}

fn max_sockets() -> usize {
    10240
}

fn max_numa_nodes() -> usize {
    1024
}

fn histogram_grouping_power() -> u8 {
    3
}

fn histogram_max_value_power() -> u8 {
    64
}

fn channel_capacity() -> usize {
    1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cpus: max_cpus(),
            max_cgroups: max_cgroups(),
            max_pid: max_pid(),
            max_syscall_id: max_syscall_id(),
            max_irqs: max_irqs(),
            max_sockets: max_sockets(),
            max_numa_nodes: max_numa_nodes(),
            histogram_grouping_power: histogram_grouping_power(),
            histogram_max_value_power: histogram_max_value_power(),
            channel_capacity: channel_capacity(),
            tcp_sample_mask: 0,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("loading config: {:?}", path);

        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;

        config.check()?;

        Ok(config)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.max_cpus == 0 {
            return Err(ConfigError::ZeroCapacity("max_cpus"));
        }

        if self.max_cgroups == 0 {
            return Err(ConfigError::ZeroCapacity("max_cgroups"));
        }

        if self.max_pid == 0 {
            return Err(ConfigError::ZeroCapacity("max_pid"));
        }

        if self.max_syscall_id == 0 {
            return Err(ConfigError::ZeroCapacity("max_syscall_id"));
        }

        if self.max_irqs == 0 {
            return Err(ConfigError::ZeroCapacity("max_irqs"));
        }

        if self.max_sockets == 0 {
            return Err(ConfigError::ZeroCapacity("max_sockets"));
        }

        if self.max_numa_nodes == 0 {
            return Err(ConfigError::ZeroCapacity("max_numa_nodes"));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("channel_capacity"));
        }

        crate::histogram::validate(self.histogram_grouping_power, self.histogram_max_value_power)?;

        Ok(())
    }

    pub fn max_cpus(&self) -> usize {
        self.max_cpus
    }

    pub fn max_cgroups(&self) -> usize {
        self.max_cgroups
    }

    pub fn max_pid(&self) -> usize {
        self.max_pid
    }

    pub fn max_syscall_id(&self) -> usize {
        self.max_syscall_id
    }

    pub fn max_irqs(&self) -> usize {
        self.max_irqs
    }

    pub fn max_sockets(&self) -> usize {
        self.max_sockets
    }

    pub fn max_numa_nodes(&self) -> usize {
        self.max_numa_nodes
    }

    pub fn histogram_grouping_power(&self) -> u8 {
        self.histogram_grouping_power
    }

    pub fn histogram_max_value_power(&self) -> u8 {
        self.histogram_max_value_power
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn tcp_sample_mask(&self) -> u64 {
        self.tcp_sample_mask
    }
}
