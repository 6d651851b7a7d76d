use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use cyclops_shared::{Region, RegionCatalog, RegionSelection, RegionSummary, SampleColumns};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::services::weather_provider::WeatherProvider;
use crate::services::weather_refresh::refresh_samples;
use crate::state::{AppState, LiveView, PreSerializedEvent, shutdown_requested};
use crate::view_state::{ViewError, ViewState};

pub type SelectReply = oneshot::Sender<Result<RegionSummary, ViewError>>;

#[derive(Debug)]
pub enum ViewCommand {
    SelectRegion {
        selection: RegionSelection,
        reply: SelectReply,
    },
}

/// Owns the view state until the server begins shutting down.
///
/// Timer ticks and commands are handled one at a time, each to completion, so a
/// region switch can never interleave with a refresh. The first tick fires
/// immediately, giving the startup fetch.
pub async fn run<P>(
    state: AppState,
    provider: P,
    mut commands: mpsc::Receiver<ViewCommand>,
    mut view: ViewState,
    period: Duration,
) where
    P: WeatherProvider,
{
    publish(&state, &view, PublishKind::Snapshot).await;

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = shutdown_requested(state.shutdown_signal());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("shutdown requested; stopping view driver");
                break;
            }
            _ = interval.tick() => {
                refresh_view(&state, &provider, &mut view).await;
            }
            Some(command) = commands.recv() => {
                handle_command(&state, &provider, &mut view, command).await;
            }
        }
    }
}

async fn handle_command<P>(
    state: &AppState,
    provider: &P,
    view: &mut ViewState,
    command: ViewCommand,
) where
    P: WeatherProvider + ?Sized,
{
    match command {
        ViewCommand::SelectRegion { selection, reply } => {
            let result = select_region(state, provider, view, &selection).await;
            // The requester may have given up; the switch stands either way.
            let _ = reply.send(result);
        }
    }
}

/// Switch the displayed region, publish the zeroed view, then refresh it.
///
/// Returns only after the refresh has been published. On error nothing is
/// published and `view` is left as it was.
pub async fn select_region<P>(
    state: &AppState,
    provider: &P,
    view: &mut ViewState,
    selection: &RegionSelection,
) -> Result<RegionSummary, ViewError>
where
    P: WeatherProvider + ?Sized,
{
    let summary = match resolve_selection(&state.catalog, selection) {
        Ok((index, region)) => region_summary(index, region),
        Err(e) => {
            state.observability.record_rejected_region_switch();
            warn!(error = %e, "rejected region selection");
            return Err(e);
        }
    };

    view.switch_region(&state.catalog, &summary.key)?;
    state.observability.record_region_switch();
    info!(region = %summary.key, cities = view.len(), "switched region");

    publish(state, view, PublishKind::Snapshot).await;
    refresh_view(state, provider, view).await;

    Ok(summary)
}

pub fn resolve_selection<'a>(
    catalog: &'a RegionCatalog,
    selection: &RegionSelection,
) -> Result<(usize, &'a Region), ViewError> {
    match selection {
        RegionSelection::Index { index } => catalog
            .by_index(*index)
            .map(|region| (*index, region))
            .ok_or(ViewError::RegionIndexOutOfRange {
                index: *index,
                count: catalog.len(),
            }),
        RegionSelection::Key { key } => catalog
            .position(key)
            .and_then(|index| catalog.by_index(index).map(|region| (index, region)))
            .ok_or_else(|| ViewError::UnknownRegion(key.clone())),
    }
}

pub fn region_summary(index: usize, region: &Region) -> RegionSummary {
    RegionSummary {
        index,
        key: region.key.clone(),
        label: region.label.clone(),
        points: region.points.len(),
    }
}

/// One tick: fetch every displayed city and swap the results in as a whole.
pub async fn refresh_view<P>(state: &AppState, provider: &P, view: &mut ViewState)
where
    P: WeatherProvider + ?Sized,
{
    let outcome = refresh_samples(provider, view.cities()).await;
    let failures = outcome.failures;
    state
        .observability
        .record_refresh(view.len() as u64, failures as u64);

    if let Err(e) = view.apply_samples(outcome.samples) {
        warn!(error = %e, "discarding refresh result");
        return;
    }

    if failures > 0 {
        warn!(
            region = %view.active_region(),
            cities = view.len(),
            failures,
            "weather refresh completed with failures"
        );
    } else {
        info!(region = %view.active_region(), cities = view.len(), "weather refreshed");
    }

    publish(state, view, PublishKind::Update).await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PublishKind {
    Snapshot,
    Update,
}

#[derive(serde::Serialize)]
#[serde(tag = "type")]
enum SerializedUpdateEvent<'a> {
    Update {
        seq: u64,
        timestamp: &'a str,
        region: &'a str,
        #[serde(flatten)]
        samples: &'a SampleColumns,
    },
}

/// Serialize the view once, swap it into the live snapshot, then broadcast.
async fn publish(state: &AppState, view: &ViewState, kind: PublishKind) {
    let mut live = state.live_view.write().await;
    let seq = live.seq.wrapping_add(1);
    let timestamp = Utc::now().to_rfc3339();
    let payload = view.to_payload(seq, &timestamp, &state.scale);

    let view_vec = match serde_json::to_vec(&payload) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize live view: {e}");
            return;
        }
    };
    let snapshot_json = Arc::new(Bytes::from(snapshot_event_json(&view_vec)));

    let event = match kind {
        PublishKind::Snapshot => PreSerializedEvent::Snapshot {
            seq,
            json: Arc::clone(&snapshot_json),
        },
        PublishKind::Update => {
            let update = SerializedUpdateEvent::Update {
                seq,
                timestamp: &timestamp,
                region: &payload.region,
                samples: &payload.samples,
            };
            match serde_json::to_vec(&update) {
                Ok(json) => PreSerializedEvent::Update {
                    seq,
                    json: Arc::new(Bytes::from(json)),
                },
                Err(e) => {
                    warn!("failed to serialize update event: {e}");
                    return;
                }
            }
        }
    };

    *live = LiveView {
        seq,
        timestamp,
        region: payload.region,
        city_count: view.len(),
        view_json: Arc::new(Bytes::from(view_vec)),
        snapshot_json,
    };
    drop(live);

    // No subscribers is fine.
    let _ = state.event_tx.send(event);
}

/// `{"type":"Snapshot",...}` from the already serialized view object.
fn snapshot_event_json(view_json: &[u8]) -> Vec<u8> {
    let body = view_json.strip_prefix(b"{").unwrap_or(view_json);
    let mut buf = Vec::with_capacity(body.len() + 20);
    buf.extend_from_slice(b"{\"type\":\"Snapshot\",");
    buf.extend_from_slice(body);
    buf
}
