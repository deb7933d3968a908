//! Protocol engine - drives a session through the state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::config::ProtocolConfig;
use crate::error::FlashError;
use crate::events::{FlashEvent, FlashObserver, PacketDirection, TracingObserver};
use crate::image::ImageSource;
use crate::session::{FlashReport, Session};
use crate::state::{HandlerContext, ProtocolState, enter_complete, handle_state};
use crate::transport::{Transport, TransportError};

/// Flashing protocol engine.
///
/// Owns the transport and the image source; the caller owns the
/// [`Session`], which the engine borrows one step at a time.
pub struct ProtocolEngine<T: Transport, I: ImageSource, O: FlashObserver = TracingObserver> {
    transport: T,
    image: I,
    config: ProtocolConfig,
    observer: Arc<O>,
}

impl<T: Transport, I: ImageSource> ProtocolEngine<T, I, TracingObserver> {
    /// Create an engine with the default tracing observer.
    pub fn new(transport: T, image: I, config: ProtocolConfig) -> Result<Self, FlashError> {
        Self::with_observer(transport, image, config, Arc::new(TracingObserver))
    }
}

impl<T: Transport, I: ImageSource, O: FlashObserver> ProtocolEngine<T, I, O> {
    /// Create an engine with a custom observer.
    pub fn with_observer(
        transport: T,
        image: I,
        config: ProtocolConfig,
        observer: Arc<O>,
    ) -> Result<Self, FlashError> {
        config.validate()?;
        Ok(Self {
            transport,
            image,
            config,
            observer,
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn image(&self) -> &I {
        &self.image
    }

    pub fn into_parts(self) -> (T, I) {
        (self.transport, self.image)
    }

    /// New session sized from the engine's image.
    pub fn start_session(&self, target_base_address: u32) -> Result<Session, FlashError> {
        Session::for_image(target_base_address, &self.image)
    }

    /// Perform the entry action of the session's current state and move it
    /// to the next state. A terminal session is left untouched.
    pub fn step(&mut self, session: &mut Session) -> ProtocolState {
        if session.is_terminal() {
            return session.state().clone();
        }

        let mut transport = ObservableTransport {
            inner: &mut self.transport,
            observer: self.observer.as_ref(),
        };
        let mut ctx = HandlerContext {
            transport: &mut transport,
            image: &mut self.image,
            config: &self.config,
            observer: self.observer.as_ref(),
            session: &mut *session,
        };

        let mut next = handle_state(&mut ctx).unwrap_or_else(ProtocolState::Failed);
        if next == ProtocolState::Complete
            && let Err(e) = enter_complete(&mut ctx)
        {
            next = ProtocolState::Failed(e);
        }

        let from = session.goto_state(next.clone());
        if from != next {
            self.observer.on_event(&FlashEvent::StateChanged {
                from,
                to: next.clone(),
            });
        }
        match &next {
            ProtocolState::Complete => self.observer.on_event(&FlashEvent::Complete {
                bytes_sent: session.bytes_sent(),
            }),
            ProtocolState::Failed(error) => self.observer.on_event(&FlashEvent::Failed {
                error: error.clone(),
            }),
            _ => {}
        }
        next
    }

    /// Step the session until it is `Complete` or `Failed`.
    #[instrument(skip(self, session), fields(base = %format!("0x{:08X}", session.target_base_address()), length = session.image_length()))]
    pub fn run(&mut self, session: &mut Session) -> Result<FlashReport, FlashError> {
        while !session.is_terminal() {
            self.step(session);
        }

        match session.error() {
            Some(error) => Err(error.clone()),
            None => {
                let report = session.report();
                info!(
                    bytes_sent = report.bytes_sent,
                    frames = report.frames_sent,
                    resends = report.resends,
                    crc32 = %format!("0x{:08X}", report.image_crc32),
                    "Session complete"
                );
                Ok(report)
            }
        }
    }

    /// Flash the whole image at `target_base_address`.
    pub fn flash(&mut self, target_base_address: u32) -> Result<FlashReport, FlashError> {
        let mut session = self.start_session(target_base_address)?;
        self.run(&mut session)
    }
}

/// Transport wrapper that emits packet events.
struct ObservableTransport<'a, T: Transport, O: FlashObserver> {
    inner: &'a mut T,
    observer: &'a O,
}

impl<'a, T: Transport, O: FlashObserver> Transport for ObservableTransport<'a, T, O> {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let res = self.inner.write(data);
        if let Ok(n) = &res {
            self.observer.on_event(&FlashEvent::Packet {
                direction: PacketDirection::Tx,
                length: *n,
                data: Some(data.iter().take((*n).min(32)).cloned().collect()),
            });
        }
        res
    }

    fn read(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let res = self.inner.read(max_len, timeout);
        if let Ok(data) = &res
            && !data.is_empty()
        {
            self.observer.on_event(&FlashEvent::Packet {
                direction: PacketDirection::Rx,
                length: data.len(),
                data: Some(data.clone()),
            });
        }
        res
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.inner.clear_input()
    }
}
