//! Bidirectional channel between the phone and the watch.
//!
//! [`PeerLink`] sits on top of a [`PeerTransport`]. Sends are fire-and-forget:
//! the outcome of each one is published on the [`EventBus`] as a `Replied`
//! or `Failed` envelope. Channel state changes are published there too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use domain::models::{Command, DeviceSettings, DeviceTag, LocationEnvelope, Phrase};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::TrackerError;
use crate::events::{Event, EventBus};
use crate::settings::{adopt_instance_id, merge_settings, SettingsStore};

/// Activation lifecycle of the peer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Activating,
    Activated,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("peer channel is not activated")]
    NotActivated,

    #[error("paired device is not reachable")]
    Unreachable,

    #[error("peer channel closed")]
    Closed,

    #[error("peer delivery failed: {0}")]
    Delivery(String),
}

/// Platform messaging between the two devices of a pairing.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Establishes the session.
    async fn activate(&self) -> Result<(), TransportError>;

    fn is_reachable(&self) -> bool;

    /// Delivers one message and waits for the peer's optional reply.
    async fn send_message(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError>;

    /// Replaces the shared application context seen by the peer.
    async fn update_application_context(&self, context: Vec<u8>) -> Result<(), TransportError>;
}

pub struct PeerLink {
    device: DeviceTag,
    transport: Arc<dyn PeerTransport>,
    settings: Arc<dyn SettingsStore>,
    events: EventBus,
    state: Mutex<ActivationState>,
    reachable: AtomicBool,
}

impl PeerLink {
    pub fn new(
        device: DeviceTag,
        transport: Arc<dyn PeerTransport>,
        settings: Arc<dyn SettingsStore>,
        events: EventBus,
    ) -> Self {
        Self {
            device,
            transport,
            settings,
            events,
            state: Mutex::new(ActivationState::Inactive),
            reachable: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> DeviceTag {
        self.device
    }

    pub fn activation_state(&self) -> ActivationState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    fn set_state(&self, next: ActivationState) {
        let changed = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let changed = *state != next;
            *state = next;
            changed
        };
        if changed {
            debug!(device = %self.device, state = ?next, "Peer activation changed");
            self.events.emit(Event::ActivationChanged(next));
        }
    }

    /// Activates the channel, reporting `Activating` then `Activated`, or
    /// falling back to `Inactive` on failure.
    pub async fn activate(&self) -> Result<(), TransportError> {
        self.set_state(ActivationState::Activating);
        match self.transport.activate().await {
            Ok(()) => {
                self.set_state(ActivationState::Activated);
                self.refresh_reachability();
                Ok(())
            }
            Err(e) => {
                warn!(device = %self.device, error = %e, "Peer activation failed");
                self.set_state(ActivationState::Inactive);
                Err(e)
            }
        }
    }

    /// Polls the transport and reports a reachability transition if any.
    pub fn refresh_reachability(&self) -> bool {
        let reachable = self.transport.is_reachable();
        if self.reachable.swap(reachable, Ordering::SeqCst) != reachable {
            info!(device = %self.device, reachable, "Peer reachability changed");
            self.events.emit(Event::ReachabilityChanged(reachable));
        }
        reachable
    }

    /// Sends `envelope` without waiting for delivery.
    ///
    /// Emits the outgoing envelope, then later either the peer's reply as
    /// `Replied` or the envelope as `Failed`. A reply carrying an instance
    /// id is offered to local settings like any inbound envelope.
    /// Reachability is read but never reported from here; see
    /// [`refresh_reachability`](Self::refresh_reachability).
    pub fn send(&self, envelope: LocationEnvelope) {
        if self.activation_state() != ActivationState::Activated {
            self.fail(envelope, &TransportError::NotActivated);
            return;
        }
        if !self.transport.is_reachable() {
            self.fail(envelope, &TransportError::Unreachable);
            return;
        }

        let payload = match envelope.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                let message = e.to_string();
                warn!(device = %self.device, error = %message, "Envelope could not be encoded");
                self.events.emit(Event::DataFlowed(envelope.failed(message)));
                return;
            }
        };

        self.events.emit(Event::DataFlowed(envelope.clone()));

        let transport = self.transport.clone();
        let settings = self.settings.clone();
        let events = self.events.clone();
        let device = self.device;
        tokio::spawn(async move {
            match transport.send_message(payload).await {
                Ok(Some(bytes)) => match LocationEnvelope::from_bytes(&bytes) {
                    Ok(reply) => {
                        if let Err(e) = adopt_instance_id(settings.as_ref(), &reply.instance_id).await
                        {
                            warn!(device = %device, error = %e, "Failed to store instance id");
                        }
                        events.emit(Event::DataFlowed(reply.replied()));
                    }
                    Err(e) => {
                        warn!(device = %device, error = %e, "Dropping malformed peer reply");
                        events.emit(Event::DataFlowed(envelope.failed(e.to_string())));
                    }
                },
                Ok(None) => debug!(device = %device, "Peer accepted envelope without reply"),
                Err(e) => {
                    warn!(device = %device, error = %e, "Peer delivery failed");
                    events.emit(Event::DataFlowed(envelope.failed(e.to_string())));
                }
            }
        });
    }

    fn fail(&self, envelope: LocationEnvelope, error: &TransportError) {
        debug!(device = %self.device, error = %error, "Envelope not sent");
        self.events
            .emit(Event::DataFlowed(envelope.failed(error.to_string())));
    }

    /// Handles one message from the paired device and builds the reply.
    ///
    /// Malformed messages are logged and dropped without a reply.
    pub async fn handle_inbound(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let envelope = match LocationEnvelope::from_bytes(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(device = %self.device, error = %e, "Dropping malformed peer envelope");
                return None;
            }
        };

        if envelope.has_instance_id() {
            if let Err(e) = adopt_instance_id(self.settings.as_ref(), &envelope.instance_id).await {
                warn!(device = %self.device, error = %e, "Failed to store instance id");
            }
        }

        let command = envelope.command;
        self.events
            .emit(Event::DataFlowed(envelope.with_phrase(Phrase::Received)));

        let local_id = match self.settings.load().await {
            Ok(settings) => settings.instance_id,
            Err(e) => {
                warn!(device = %self.device, error = %e, "Failed to read settings for reply");
                String::new()
            }
        };

        let reply =
            LocationEnvelope::status(command, Phrase::Replied, local_id, self.device, Utc::now());
        match reply.to_bytes() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(device = %self.device, error = %e, "Failed to encode reply");
                None
            }
        }
    }

    /// Merges settings pushed by the paired device through the application context.
    pub async fn handle_context(&self, context: &[u8]) -> Result<bool, TrackerError> {
        let incoming: DeviceSettings = serde_json::from_slice(context)?;
        let instance_id = incoming.instance_id.clone();
        let changed = merge_settings(self.settings.as_ref(), incoming).await?;

        if changed {
            debug!(device = %self.device, "Settings merged from peer");
            self.events.emit(Event::DataFlowed(LocationEnvelope::status(
                Command::SyncSettings,
                Phrase::Received,
                instance_id,
                self.device,
                Utc::now(),
            )));
        }
        Ok(changed)
    }

    /// Publishes the local settings to the paired device.
    pub async fn sync_settings(&self) -> Result<(), TrackerError> {
        let settings = self.settings.load().await?;
        let context = serde_json::to_vec(&settings)?;
        self.transport.update_application_context(context).await?;

        self.events.emit(Event::DataFlowed(LocationEnvelope::status(
            Command::SyncSettings,
            Phrase::Sent,
            settings.instance_id,
            self.device,
            Utc::now(),
        )));
        Ok(())
    }
}

/// Message crossing an in-process channel.
#[derive(Debug)]
pub enum PeerMessage {
    Message {
        payload: Vec<u8>,
        reply: oneshot::Sender<Vec<u8>>,
    },
    Context(Vec<u8>),
}

/// Receiving end of one side of a [`ChannelTransport`] pair.
pub type PeerInbox = mpsc::Receiver<PeerMessage>;

/// In-process transport joining two [`PeerLink`]s, used for loopback pairing.
#[derive(Debug)]
pub struct ChannelTransport {
    outbound: mpsc::Sender<PeerMessage>,
    reachable: Arc<AtomicBool>,
}

impl ChannelTransport {
    /// Two connected endpoints, each with the inbox its own link serves.
    pub fn pair(capacity: usize) -> ((ChannelTransport, PeerInbox), (ChannelTransport, PeerInbox)) {
        let (to_b, inbox_b) = mpsc::channel(capacity);
        let (to_a, inbox_a) = mpsc::channel(capacity);
        let reachable = Arc::new(AtomicBool::new(true));

        let a = ChannelTransport {
            outbound: to_b,
            reachable: reachable.clone(),
        };
        let b = ChannelTransport {
            outbound: to_a,
            reachable,
        };
        ((a, inbox_a), (b, inbox_b))
    }

    /// Simulates the devices moving in or out of range, for both ends.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerTransport for ChannelTransport {
    async fn activate(&self) -> Result<(), TransportError> {
        if self.outbound.is_closed() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }

    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    async fn send_message(&self, payload: Vec<u8>) -> Result<Option<Vec<u8>>, TransportError> {
        let (reply, response) = oneshot::channel();
        self.outbound
            .send(PeerMessage::Message { payload, reply })
            .await
            .map_err(|_| TransportError::Closed)?;

        // A dropped reply sender means the peer chose not to answer.
        Ok(response.await.ok())
    }

    async fn update_application_context(&self, context: Vec<u8>) -> Result<(), TransportError> {
        self.outbound
            .send(PeerMessage::Context(context))
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Feeds every message arriving in `inbox` to `link` until the other end is dropped.
pub async fn serve(link: Arc<PeerLink>, mut inbox: PeerInbox) {
    while let Some(message) = inbox.recv().await {
        match message {
            PeerMessage::Message { payload, reply } => {
                if let Some(bytes) = link.handle_inbound(&payload).await {
                    let _ = reply.send(bytes);
                }
            }
            PeerMessage::Context(context) => {
                if let Err(e) = link.handle_context(&context).await {
                    warn!(device = %link.device(), error = %e, "Failed to apply peer context");
                }
            }
        }
    }
    debug!(device = %link.device(), "Peer inbox closed");
}
