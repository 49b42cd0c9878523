//! Configuration for EmberKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for an EmberKV server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Append-only record file replayed at startup
    pub log_path: PathBuf,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Maximum bytes pulled from a socket by a single read syscall
    pub read_chunk_size: usize,

    // -------------------------------------------------------------------------
    // Reactor Configuration
    // -------------------------------------------------------------------------
    /// Readiness events collected per poll call
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("logfile.log"),
            listen_addr: "0.0.0.0:1234".to_string(),
            read_chunk_size: 1024,
            event_capacity: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the record file path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the per-syscall read size (in bytes)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the number of readiness events collected per poll
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
