//! Event system for UI decoupling.
//!
//! Allows the CLI (or any other front end) to follow a flashing run without
//! tight coupling to the protocol engine.

use std::fmt;

use crate::error::FlashError;
use crate::state::ProtocolState;

/// Events emitted by the protocol engine.
#[derive(Debug, Clone)]
pub enum FlashEvent {
    /// Session moved to a new state.
    StateChanged {
        from: ProtocolState,
        to: ProtocolState,
    },
    /// A step failed and will be attempted again.
    Retry {
        state: ProtocolState,
        attempt: u8,
        max_attempts: u8,
        error: FlashError,
    },
    /// A chunk was acknowledged.
    Progress { bytes_sent: u32, total: u32 },
    /// Bytes sent/received on the transport.
    Packet {
        direction: PacketDirection,
        length: usize,
        data: Option<Vec<u8>>,
    },
    /// Whole image acknowledged and jump signal sent.
    Complete { bytes_sent: u32 },
    /// Session ended in `Failed`.
    Failed { error: FlashError },
}

/// Packet direction on the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Host -> Target
    Rx, // Target -> Host
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Observer trait for receiving flashing events.
///
/// Implement this trait in your UI layer to receive updates.
pub trait FlashObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &FlashEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl FlashObserver for NullObserver {
    fn on_event(&self, _event: &FlashEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl FlashObserver for TracingObserver {
    fn on_event(&self, event: &FlashEvent) {
        match event {
            FlashEvent::StateChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "State changed");
            }
            FlashEvent::Retry {
                state,
                attempt,
                max_attempts,
                error,
            } => {
                tracing::warn!(state = %state, attempt, max_attempts, "Retrying: {}", error);
            }
            FlashEvent::Progress { bytes_sent, total } => {
                let pct = if *total > 0 {
                    (*bytes_sent as u64 * 100) / *total as u64
                } else {
                    100
                };
                tracing::debug!(bytes_sent, total, progress = %format!("{}%", pct), "Progress");
            }
            FlashEvent::Packet {
                direction, length, ..
            } => {
                tracing::trace!(dir = %direction, len = length, "Serial packet");
            }
            FlashEvent::Complete { bytes_sent } => {
                tracing::info!(bytes_sent, "Flashing complete");
            }
            FlashEvent::Failed { error } => {
                tracing::error!("Flashing failed: {}", error);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Observer that keeps every event for later inspection.
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        events: Mutex<Vec<FlashEvent>>,
    }

    impl RecordingObserver {
        pub(crate) fn events(&self) -> Vec<FlashEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl FlashObserver for RecordingObserver {
        fn on_event(&self, event: &FlashEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(PacketDirection::Tx.to_string(), "TX");
        assert_eq!(PacketDirection::Rx.to_string(), "RX");
    }

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::default();
        observer.on_event(&FlashEvent::Progress {
            bytes_sent: 1,
            total: 2,
        });
        observer.on_event(&FlashEvent::Complete { bytes_sent: 2 });

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], FlashEvent::Complete { bytes_sent: 2 }));
    }
}
