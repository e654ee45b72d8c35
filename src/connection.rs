//! Connection Quality Signal
//!
//! Classifies the reported network effective type (`slow-2g`, `2g`, `3g`,
//! `4g`, ...) into three buckets the prefetch engine can act on.

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

// == Connection Quality ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Slow,
    Medium,
    Fast,
}

impl ConnectionQuality {
    /// `slow-2g`/`2g` are slow, `3g` is medium, any other reported type is
    /// fast. No report at all is medium, so environments without the
    /// capability are not starved of prefetching.
    pub fn from_effective_type(effective_type: Option<&str>) -> Self {
        let Some(kind) = effective_type.map(str::trim).filter(|k| !k.is_empty()) else {
            return ConnectionQuality::Medium;
        };

        match kind.to_ascii_lowercase().as_str() {
            "slow-2g" | "2g" => ConnectionQuality::Slow,
            "3g" => ConnectionQuality::Medium,
            _ => ConnectionQuality::Fast,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionQuality::Slow => "slow",
            ConnectionQuality::Medium => "medium",
            ConnectionQuality::Fast => "fast",
        }
    }
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Signal Trait ==
/// Read-only view of the current network information. Evaluated on every
/// call, never cached.
pub trait ConnectionSignal: Send + Sync {
    /// Reported effective type, `None` when the capability is missing.
    fn effective_type(&self) -> Option<String>;

    fn quality(&self) -> ConnectionQuality {
        ConnectionQuality::from_effective_type(self.effective_type().as_deref())
    }
}

/// Signal for environments with no network information at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl ConnectionSignal for Unavailable {
    fn effective_type(&self) -> Option<String> {
        None
    }
}

// == Connection Monitor ==
/// Reactive signal: the host pushes changes with [`report`](Self::report)
/// and interested parties can [`subscribe`](Self::subscribe).
#[derive(Debug)]
pub struct ConnectionMonitor {
    tx: watch::Sender<Option<String>>,
}

impl ConnectionMonitor {
    pub fn new(initial: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Records a new effective type (or its disappearance).
    pub fn report(&self, effective_type: Option<String>) {
        let quality = ConnectionQuality::from_effective_type(effective_type.as_deref());
        let previous = self.tx.send_replace(effective_type.clone());
        if previous != effective_type {
            info!(effective_type = ?effective_type, %quality, "Connection changed");
        }
    }

    /// Receiver that wakes on every reported change.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ConnectionSignal for ConnectionMonitor {
    fn effective_type(&self) -> Option<String> {
        self.tx.borrow().clone()
    }
}
