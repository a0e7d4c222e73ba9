//! App core for the suspension engine.
//!
//! Central struct owning the coordinator. Every host event enters through
//! [`App::dispatch`]; handlers log their own failures so one bad event never
//! stops the loop.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::managers::suspend_coordinator::SuspendCoordinator;
use crate::services::collaborators::Collaborators;
use crate::types::errors::CommandError;
use crate::types::event::{ExternalRequest, HostEvent, Lane};
use crate::types::settings::{CoreConfig, Environment};

pub struct App {
    coordinator: Arc<SuspendCoordinator>,
}

impl App {
    pub fn new(config: CoreConfig, env: Environment, collaborators: Collaborators) -> Self {
        Self {
            coordinator: SuspendCoordinator::new(config, env, collaborators),
        }
    }

    pub fn coordinator(&self) -> &Arc<SuspendCoordinator> {
        &self.coordinator
    }

    /// Startup sequence: seed focus from the host, then arm every timer.
    pub async fn startup(&self) {
        self.coordinator.startup().await;
    }

    /// Routes one host event to its handler.
    pub async fn dispatch(&self, event: HostEvent) {
        let span = tracing::debug_span!("event", kind = event.kind());
        let c = &self.coordinator;
        async move {
            match event {
                HostEvent::WindowFocusChanged { window_id } => {
                    c.handle_window_focus_changed(window_id).await;
                }
                HostEvent::TabActivated { tab_id, window_id } => {
                    c.handle_tab_focus_changed(tab_id, window_id).await;
                }
                HostEvent::TabUpdated { tab_id, change, tab } => {
                    if tab.id != tab_id {
                        tracing::debug!(tab_id = %tab_id, reported = %tab.id, "Update names a different tab");
                    }
                    c.handle_tab_updated(&tab, &change).await;
                }
                HostEvent::TabCreated { tab } => c.handle_tab_created(&tab).await,
                HostEvent::TabRemoved { tab_id } => c.handle_tab_removed(tab_id),
                HostEvent::TabReplaced {
                    added_tab_id,
                    removed_tab_id,
                } => c.handle_tab_replaced(added_tab_id, removed_tab_id),
                HostEvent::WindowCreated { window_id } | HostEvent::WindowRemoved { window_id } => {
                    tracing::debug!(window_id = %window_id, "Window set changed");
                    c.queue_session_save();
                }
                HostEvent::SuspendedPageUnloading { tab } => c.handle_suspended_page_unloading(&tab),
                HostEvent::AgentReport { tab, status } => c.handle_agent_report(&tab, status).await,
                HostEvent::ChargingChanged { charging } => c.handle_charging_changed(charging).await,
                HostEvent::ConnectivityChanged { online } => c.handle_connectivity_changed(online).await,
                HostEvent::Command { command } => c.handle_command(command).await,
            }
        }
        .instrument(span)
        .await
    }

    pub async fn handle_external_request(&self, request: ExternalRequest) -> Result<(), CommandError> {
        let result = self.coordinator.handle_external_request(request).await;
        if let Err(e) = &result {
            tracing::info!(error = %e, "Rejected external request");
        }
        result
    }

    /// Dispatches events until the channel closes. Each tab gets its own
    /// lane so its events are handled strictly in arrival order, while
    /// different tabs interleave at their await points like the host's own
    /// callbacks.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<HostEvent>) {
        let mut lanes: HashMap<Lane, mpsc::UnboundedSender<HostEvent>> = HashMap::new();
        let mut workers = JoinSet::new();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let lane = event.lane();
                        let closes = event.closes_lane();
                        let sender = lanes
                            .entry(lane)
                            .or_insert_with(|| self.spawn_lane(lane, &mut workers));
                        if let Err(mpsc::error::SendError(event)) = sender.send(event) {
                            tracing::warn!(?lane, "Lane worker is gone; restarting it");
                            let sender = self.spawn_lane(lane, &mut workers);
                            if sender.send(event).is_err() {
                                tracing::error!(?lane, "Dropped event for dead lane");
                            }
                            lanes.insert(lane, sender);
                        }
                        if closes {
                            lanes.remove(&lane);
                        }
                    }
                    None => break,
                },
                Some(result) = workers.join_next() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Event lane failed");
                    }
                }
            }
        }

        // Closing every lane lets the workers drain what they hold.
        lanes.clear();
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Event lane failed");
            }
        }
        tracing::info!("Event channel closed");
    }

    fn spawn_lane(self: &Arc<Self>, lane: Lane, workers: &mut JoinSet<()>) -> mpsc::UnboundedSender<HostEvent> {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let app = Arc::clone(self);
        workers.spawn(async move {
            while let Some(event) = receiver.recv().await {
                app.dispatch(event).await;
            }
            tracing::trace!(?lane, "Lane closed");
        });
        sender
    }
}
