use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{IdleReader, IdleWriter};

pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;

fn default_idle_timeout_ms() -> u64 {
    DEFAULT_IDLE_TIMEOUT_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdleTimeoutBuilder {
    #[serde(default = "default_idle_timeout_ms")]
    pub read_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub write_ms: u64,
}

impl IdleTimeoutBuilder {
    pub fn build(self) -> IdleTimeouts {
        IdleTimeouts {
            read: Duration::from_millis(self.read_ms),
            write: Duration::from_millis(self.write_ms),
        }
    }
}

impl Default for IdleTimeoutBuilder {
    fn default() -> Self {
        Self {
            read_ms: DEFAULT_IDLE_TIMEOUT_MS,
            write_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

/// Idle windows for the two directions of a stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdleTimeouts {
    pub read: Duration,
    pub write: Duration,
}

impl IdleTimeouts {
    pub fn symmetric(idle_timeout: Duration) -> Self {
        Self {
            read: idle_timeout,
            write: idle_timeout,
        }
    }

    pub fn reader<C, R>(&self, controller: C, reader: R) -> IdleReader<C, R> {
        IdleReader::new(controller, reader, self.read)
    }

    pub fn writer<C, W>(&self, controller: C, writer: W) -> IdleWriter<C, W> {
        IdleWriter::new(controller, writer, self.write)
    }
}

impl Default for IdleTimeouts {
    fn default() -> Self {
        IdleTimeoutBuilder::default().build()
    }
}
