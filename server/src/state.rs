use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::Utc;
use cyclops_shared::{RegionCatalog, TemperatureScale};
use tokio::sync::{RwLock, broadcast, mpsc, watch};

use crate::config::{COMMAND_BUFFER, sse_broadcast_buffer};
use crate::services::view_driver::ViewCommand;

/// Pre-serialized SSE event, serialized once by the view driver and shared by all clients.
#[derive(Debug, Clone)]
pub enum PreSerializedEvent {
    Snapshot { seq: u64, json: Arc<Bytes> },
    Update { seq: u64, json: Arc<Bytes> },
}

/// Last published view, as served to readers.
#[derive(Debug, Clone)]
pub struct LiveView {
    pub seq: u64,
    pub timestamp: String,
    pub region: String,
    pub city_count: usize,
    /// `ViewPayload` JSON for `/api/view`.
    pub view_json: Arc<Bytes>,
    /// `ViewEvent::Snapshot` JSON for SSE.
    pub snapshot_json: Arc<Bytes>,
}

impl Default for LiveView {
    fn default() -> Self {
        Self {
            seq: 0,
            timestamp: Utc::now().to_rfc3339(),
            region: String::new(),
            city_count: 0,
            view_json: Arc::new(Bytes::new()),
            snapshot_json: Arc::new(Bytes::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RegionCatalog>,
    pub scale: TemperatureScale,
    pub live_view: Arc<RwLock<LiveView>>,
    pub event_tx: broadcast::Sender<PreSerializedEvent>,
    /// Inbox of the task that owns the view state.
    pub commands: mpsc::Sender<ViewCommand>,
    pub observability: Arc<ObservabilityCounters>,
    /// Distinguishes this process's views from a previous run's in ETags.
    pub instance: u64,
    shutdown: Arc<watch::Sender<bool>>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    view_requests_total: AtomicU64,
    refresh_ticks_total: AtomicU64,
    provider_requests_total: AtomicU64,
    provider_failures_total: AtomicU64,
    region_switches_total: AtomicU64,
    rejected_region_switches_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilitySnapshot {
    pub view_requests_total: u64,
    pub refresh_ticks_total: u64,
    pub provider_requests_total: u64,
    pub provider_failures_total: u64,
    pub region_switches_total: u64,
    pub rejected_region_switches_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            view_requests_total: self.view_requests_total.load(Ordering::Relaxed),
            refresh_ticks_total: self.refresh_ticks_total.load(Ordering::Relaxed),
            provider_requests_total: self.provider_requests_total.load(Ordering::Relaxed),
            provider_failures_total: self.provider_failures_total.load(Ordering::Relaxed),
            region_switches_total: self.region_switches_total.load(Ordering::Relaxed),
            rejected_region_switches_total: self
                .rejected_region_switches_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_view_request(&self) {
        self.view_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self, requests: u64, failures: u64) {
        self.refresh_ticks_total.fetch_add(1, Ordering::Relaxed);
        self.provider_requests_total
            .fetch_add(requests, Ordering::Relaxed);
        self.provider_failures_total
            .fetch_add(failures, Ordering::Relaxed);
    }

    pub fn record_region_switch(&self) {
        self.region_switches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_region_switch(&self) {
        self.rejected_region_switches_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    /// Returns the state together with the receiving end of its command channel,
    /// which belongs to the view driver.
    pub fn new(
        catalog: Arc<RegionCatalog>,
        scale: TemperatureScale,
    ) -> (Self, mpsc::Receiver<ViewCommand>) {
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown, _) = watch::channel(false);
        let state = Self {
            catalog,
            scale,
            live_view: Arc::new(RwLock::new(LiveView::default())),
            event_tx,
            commands,
            observability: Arc::new(ObservabilityCounters::default()),
            instance: Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_else(|| Utc::now().timestamp_millis()) as u64,
            shutdown: Arc::new(shutdown),
        };
        (state, command_rx)
    }

    /// Ask long-lived tasks and streams to finish.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

/// Resolves once shutdown has begun, immediately if it already has.
pub async fn shutdown_requested(mut signal: watch::Receiver<bool>) {
    // A dropped sender also means nothing is left to serve.
    let _ = signal.wait_for(|stopping| *stopping).await;
}
