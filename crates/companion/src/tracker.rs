//! Observation pipeline of one device.
//!
//! A fresh location passes the staleness gate, gets stamped with the
//! pairing's instance id and goes out to both the paired device and the
//! relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::models::{Command, DeviceTag, LocationEnvelope, Phrase};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::CompanionConfig;
use crate::error::TrackerError;
use crate::events::{Event, EventBus};
use crate::peer::{PeerLink, PeerTransport};
use crate::relay_client::{DistanceCheck, RelayClient};
use crate::settings::{ensure_instance_id, FileSettingsStore, SettingsStore};
use crate::staleness::StalenessGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The `0.0, 0.0` sentinel.
    NoLocation,
    /// Too soon after the last accepted observation.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Skipped(SkipReason),
    /// The envelope went to the peer link; `relayed` tells whether the
    /// relay acknowledged it.
    Dispatched {
        envelope: LocationEnvelope,
        relayed: bool,
    },
}

pub struct LocationTracker {
    device: DeviceTag,
    settings: Arc<dyn SettingsStore>,
    relay: RelayClient,
    peer: Arc<PeerLink>,
    events: EventBus,
    gate: Mutex<StalenessGate>,
    authorized: AtomicBool,
}

impl LocationTracker {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        relay: RelayClient,
        peer: Arc<PeerLink>,
        events: EventBus,
    ) -> Self {
        Self {
            device: peer.device(),
            settings,
            relay,
            peer,
            events,
            gate: Mutex::new(StalenessGate::new()),
            authorized: AtomicBool::new(false),
        }
    }

    /// Wires a tracker for `config.device` with file-backed settings at
    /// `config.settings_path`. The returned tracker's [`peer`](Self::peer)
    /// still has to be activated and served by the host.
    pub fn from_config(
        config: &CompanionConfig,
        transport: Arc<dyn PeerTransport>,
        events: EventBus,
    ) -> Result<Self, TrackerError> {
        let settings: Arc<dyn SettingsStore> =
            Arc::new(FileSettingsStore::new(config.settings_path.clone()));
        let relay = RelayClient::from_config(config)?;
        let peer = Arc::new(PeerLink::new(
            config.device,
            transport,
            settings.clone(),
            events.clone(),
        ));

        info!(
            device = %config.device,
            relay = %relay.base_url(),
            settings = %config.settings_path.display(),
            "Location tracker configured"
        );
        Ok(Self::new(settings, relay, peer, events))
    }

    pub fn device(&self) -> DeviceTag {
        self.device
    }

    pub fn peer(&self) -> &Arc<PeerLink> {
        &self.peer
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    /// Records the platform's location permission and reports it.
    pub async fn authorization_changed(&self, granted: bool) {
        let previous = self.authorized.swap(granted, Ordering::SeqCst);
        if previous == granted {
            return;
        }

        let phrase = if granted {
            Phrase::Authorized
        } else {
            Phrase::Unauthorized
        };
        info!(device = %self.device, granted, "Location authorization changed");

        let instance_id = self.local_instance_id().await;
        self.events.emit(Event::DataFlowed(LocationEnvelope::status(
            Command::UpdateLocation,
            phrase,
            instance_id,
            self.device,
            Utc::now(),
        )));
    }

    /// Lets the next observation through regardless of timing.
    pub async fn request_location(&self) {
        self.gate.lock().await.reset();
        debug!(device = %self.device, "Location re-requested, gate reset");
    }

    /// Processes one location fix taken at `now`.
    pub async fn observe(
        &self,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<Observation, TrackerError> {
        if !self.is_authorized() {
            return Err(TrackerError::PermissionDenied);
        }
        if latitude == 0.0 && longitude == 0.0 {
            return Ok(Observation::Skipped(SkipReason::NoLocation));
        }

        let settings = self.settings.load().await?;

        // Held until the fix is recorded.
        let mut gate = self.gate.lock().await;
        if !gate.is_open(settings.seconds_before_checking_location, now) {
            debug!(device = %self.device, "Observation within staleness window, skipped");
            return Ok(Observation::Skipped(SkipReason::Stale));
        }

        let instance_id = ensure_instance_id(self.settings.as_ref()).await?;
        let envelope =
            LocationEnvelope::location_update(instance_id, self.device, latitude, longitude, now);
        gate.record(now);
        drop(gate);

        self.peer.send(envelope.clone());

        let relayed = match self.relay.post_location(&envelope).await {
            Ok(ack) => {
                debug!(device = %self.device, record = ?ack.result, "Location relayed");
                true
            }
            Err(e) => {
                warn!(device = %self.device, error = %e, "Failed to relay location");
                self.events
                    .emit(Event::DataFlowed(envelope.clone().failed(e.to_string())));
                false
            }
        };

        Ok(Observation::Dispatched { envelope, relayed })
    }

    /// Asks the relay how far apart the pairing is and reports the result
    /// as a `Checked` envelope whose payload is the distance in feet.
    pub async fn check_distance(&self) -> Result<DistanceCheck, TrackerError> {
        let settings = self.settings.load().await?;
        if !settings.has_instance_id() {
            return Err(TrackerError::Unpaired);
        }

        let check = self
            .relay
            .check_distance(&settings.instance_id, settings.distance_before_notifying as f64)
            .await?;

        if check.exceeded {
            info!(
                device = %self.device,
                distance = check.distance,
                threshold = settings.distance_before_notifying,
                "Paired device beyond notification distance"
            );
        }

        let mut envelope = LocationEnvelope::status(
            Command::UpdateLocation,
            Phrase::Checked,
            settings.instance_id,
            self.device,
            Utc::now(),
        );
        envelope.timed_color.payload = check.distance.to_string();
        self.events.emit(Event::DataFlowed(envelope));

        Ok(check)
    }

    async fn local_instance_id(&self) -> String {
        match self.settings.load().await {
            Ok(settings) => settings.instance_id,
            Err(e) => {
                warn!(device = %self.device, error = %e, "Failed to read settings");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::{serve, ChannelTransport};
    use crate::settings::{MemorySettingsStore, SettingsError, SettingsUpdate};
    use async_trait::async_trait;
    use axum::{routing::post, Json, Router};
    use std::sync::atomic::AtomicUsize;
    use domain::models::DeviceSettings;
    use serde_json::{json, Value};
    use std::time::Duration;

    type Posted = Arc<std::sync::Mutex<Vec<Value>>>;

    /// Relay stand-in that records location posts and reports a fixed distance.
    async fn fake_relay(distance: f64) -> (String, Posted) {
        let posted: Posted = Arc::default();
        let sink = posted.clone();
        let router = Router::new()
            .route(
                "/PostLocationByInstanceId",
                post(move |Json(body): Json<Value>| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().unwrap().push(body);
                        Json(json!({"body": {"result": "rec-1"}}))
                    }
                }),
            )
            .route(
                "/CheckDistanceByInstanceId",
                post(move || async move { Json(json!({"distance": distance, "body": {"result": []}})) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{}", addr), posted)
    }

    struct Harness {
        tracker: LocationTracker,
        settings: Arc<MemorySettingsStore>,
        events: EventBus,
        watch_settings: Arc<MemorySettingsStore>,
    }

    async fn harness(relay_url: &str, settings: DeviceSettings) -> Harness {
        let ((a, inbox_a), (b, inbox_b)) = ChannelTransport::pair(8);
        let settings = Arc::new(MemorySettingsStore::new(settings));
        let watch_settings = Arc::new(MemorySettingsStore::default());
        let events = EventBus::default();

        let phone = Arc::new(PeerLink::new(
            DeviceTag::Ios,
            Arc::new(a),
            settings.clone(),
            events.clone(),
        ));
        let watch = Arc::new(PeerLink::new(
            DeviceTag::WatchOs,
            Arc::new(b),
            watch_settings.clone(),
            EventBus::default(),
        ));
        tokio::spawn(serve(phone.clone(), inbox_a));
        tokio::spawn(serve(watch, inbox_b));
        phone.activate().await.unwrap();

        let relay = RelayClient::new(relay_url, "k", Duration::from_secs(2)).unwrap();
        let tracker = LocationTracker::new(settings.clone(), relay, phone, events.clone());
        tracker.authorization_changed(true).await;

        Harness {
            tracker,
            settings,
            events,
            watch_settings,
        }
    }

    fn gated(seconds: u64) -> DeviceSettings {
        DeviceSettings {
            seconds_before_checking_location: seconds,
            distance_before_notifying: 100,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unauthorized_observation_is_denied() {
        let (url, posted) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;
        h.tracker.authorization_changed(false).await;

        let result = h.tracker.observe(35.7314, -78.7811, Utc::now()).await;
        assert!(matches!(result, Err(TrackerError::PermissionDenied)));
        assert!(posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_change_is_reported_once() {
        let (url, _) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;
        let mut rx = h.events.subscribe();

        h.tracker.authorization_changed(true).await;
        h.tracker.authorization_changed(false).await;

        match rx.recv().await.unwrap() {
            Event::DataFlowed(envelope) => assert_eq!(envelope.phrase, Phrase::Unauthorized),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sentinel_location_is_skipped() {
        let (url, posted) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;

        let result = h.tracker.observe(0.0, 0.0, Utc::now()).await.unwrap();
        assert_eq!(result, Observation::Skipped(SkipReason::NoLocation));
        assert!(posted.lock().unwrap().is_empty());
        assert!(!h.settings.load().await.unwrap().has_instance_id());
    }

    #[tokio::test]
    async fn test_first_observation_generates_id_and_relays() {
        let (url, posted) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;

        let (envelope, relayed) = match h.tracker.observe(35.7314, -78.7811, Utc::now()).await {
            Ok(Observation::Dispatched { envelope, relayed }) => (envelope, relayed),
            other => panic!("expected dispatch, got {:?}", other),
        };

        assert!(relayed);
        assert_eq!(envelope.command, Command::UpdateLocation);
        assert_eq!(envelope.device_id, DeviceTag::Ios);
        let id = h.settings.load().await.unwrap().instance_id;
        assert_eq!(envelope.instance_id, id);

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0]["instanceId"], id.as_str());
        assert_eq!(posted[0]["latitude"], "35.7314");
        assert_eq!(posted[0]["deviceId"], "ios");
    }

    #[tokio::test]
    async fn test_watch_adopts_generated_id() {
        let (url, _) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;
        let mut rx = h.events.subscribe();

        h.tracker.observe(35.7314, -78.7811, Utc::now()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Event::DataFlowed(e) = rx.recv().await.unwrap() {
                    if e.phrase == Phrase::Replied {
                        break;
                    }
                }
            }
        })
        .await
        .unwrap();

        let phone_id = h.settings.load().await.unwrap().instance_id;
        assert_eq!(h.watch_settings.load().await.unwrap().instance_id, phone_id);
    }

    #[tokio::test]
    async fn test_staleness_gate_and_reset() {
        let (url, posted) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;
        let start = Utc::now();

        h.tracker.observe(35.7314, -78.7811, start).await.unwrap();
        let soon = start + chrono::Duration::seconds(10);
        assert_eq!(
            h.tracker.observe(35.7315, -78.7811, soon).await.unwrap(),
            Observation::Skipped(SkipReason::Stale)
        );

        let later = start + chrono::Duration::seconds(50);
        assert!(matches!(
            h.tracker.observe(35.7316, -78.7811, later).await.unwrap(),
            Observation::Dispatched { .. }
        ));

        h.tracker.request_location().await;
        assert!(matches!(
            h.tracker.observe(35.7317, -78.7811, later).await.unwrap(),
            Observation::Dispatched { .. }
        ));
        assert_eq!(posted.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unsynced_threshold_blocks_after_first() {
        let (url, _) = fake_relay(0.0).await;
        let h = harness(&url, gated(0)).await;
        let start = Utc::now();

        assert!(matches!(
            h.tracker.observe(35.7314, -78.7811, start).await.unwrap(),
            Observation::Dispatched { .. }
        ));
        let hour_later = start + chrono::Duration::hours(1);
        assert_eq!(
            h.tracker.observe(35.7314, -78.7811, hour_later).await.unwrap(),
            Observation::Skipped(SkipReason::Stale)
        );
    }

    #[tokio::test]
    async fn test_relay_failure_emits_failed_envelope() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let h = harness(&url, gated(45)).await;
        let mut rx = h.events.subscribe();

        let result = h.tracker.observe(35.7314, -78.7811, Utc::now()).await.unwrap();
        assert!(matches!(result, Observation::Dispatched { relayed: false, .. }));

        let failed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Event::DataFlowed(e) = rx.recv().await.unwrap() {
                    if e.phrase == Phrase::Failed {
                        return e;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert!(failed.error_message.starts_with("HTTP error"));
    }

    #[tokio::test]
    async fn test_check_distance_requires_pairing() {
        let (url, _) = fake_relay(0.0).await;
        let h = harness(&url, gated(45)).await;
        assert!(matches!(
            h.tracker.check_distance().await,
            Err(TrackerError::Unpaired)
        ));
    }

    #[tokio::test]
    async fn test_check_distance_reports_checked() {
        let (url, _) = fake_relay(365.0).await;
        let mut settings = gated(45);
        settings.instance_id = "X".to_string();
        let h = harness(&url, settings).await;
        let mut rx = h.events.subscribe();

        let check = h.tracker.check_distance().await.unwrap();
        assert_eq!(check.distance, 365.0);
        assert!(check.exceeded);

        match rx.recv().await.unwrap() {
            Event::DataFlowed(envelope) => {
                assert_eq!(envelope.phrase, Phrase::Checked);
                assert_eq!(envelope.instance_id, "X");
                assert_eq!(envelope.timed_color.payload, "365");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    /// Memory settings whose next `failures` updates fail like a full disk.
    struct FailingUpdates {
        inner: MemorySettingsStore,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl SettingsStore for FailingUpdates {
        async fn load(&self) -> Result<DeviceSettings, SettingsError> {
            self.inner.load().await
        }

        async fn save(&self, settings: &DeviceSettings) -> Result<(), SettingsError> {
            self.inner.save(settings).await
        }

        async fn update(
            &self,
            apply: SettingsUpdate,
        ) -> Result<(DeviceSettings, bool), SettingsError> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(SettingsError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.inner.update(apply).await
        }
    }

    #[tokio::test]
    async fn test_failed_id_write_does_not_start_staleness_window() {
        let (url, posted) = fake_relay(0.0).await;
        let store = Arc::new(FailingUpdates {
            inner: MemorySettingsStore::new(gated(45)),
            failures: AtomicUsize::new(1),
        });
        let ((a, _inbox_a), (_b, _inbox_b)) = ChannelTransport::pair(8);
        let events = EventBus::default();
        let link = Arc::new(PeerLink::new(
            DeviceTag::Ios,
            Arc::new(a),
            store.clone(),
            events.clone(),
        ));
        let relay = RelayClient::new(&url, "k", Duration::from_secs(2)).unwrap();
        let tracker = LocationTracker::new(store.clone(), relay, link, events);
        tracker.authorization_changed(true).await;

        let start = Utc::now();
        let first = tracker.observe(35.7314, -78.7811, start).await;
        assert!(matches!(first, Err(TrackerError::Storage(_))));
        assert!(posted.lock().unwrap().is_empty());

        let retry = start + chrono::Duration::seconds(5);
        let second = tracker.observe(35.7314, -78.7811, retry).await.unwrap();
        assert!(matches!(
            second,
            Observation::Dispatched { relayed: true, .. }
        ));
        assert_eq!(posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsynced_distance_threshold_never_exceeded() {
        let (url, _) = fake_relay(365.0).await;
        let settings = DeviceSettings {
            instance_id: "X".to_string(),
            seconds_before_checking_location: 45,
            ..Default::default()
        };
        let h = harness(&url, settings).await;

        let check = h.tracker.check_distance().await.unwrap();
        assert_eq!(check.distance, 365.0);
        assert!(!check.exceeded);
    }

    #[tokio::test]
    async fn test_from_config_uses_device_and_settings_path() {
        let (url, posted) = fake_relay(0.0).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.json");
        let config = CompanionConfig::from_toml_str(
            r#"
                relay_url = "http://placeholder"
                client_key = "k"
            "#,
            &[
                ("relay_url", url.as_str()),
                ("device", "watchos"),
                ("settings_path", path.to_str().unwrap()),
            ],
        )
        .unwrap();

        let ((a, _inbox_a), (_b, _inbox_b)) = ChannelTransport::pair(8);
        let tracker =
            LocationTracker::from_config(&config, Arc::new(a), EventBus::default()).unwrap();
        assert_eq!(tracker.device(), DeviceTag::WatchOs);
        assert_eq!(tracker.peer().device(), DeviceTag::WatchOs);

        tracker.authorization_changed(true).await;
        tracker.observe(35.7314, -78.7811, Utc::now()).await.unwrap();

        let stored = FileSettingsStore::new(&path).load().await.unwrap();
        assert!(stored.has_instance_id());
        assert_eq!(posted.lock().unwrap()[0]["deviceId"], "watchos");
    }
}
