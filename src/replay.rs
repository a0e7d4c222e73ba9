//! tabsuspend-replay: drives the suspension core from a script.
//!
//! Protocol: one JSON object per line on stdin (newline-delimited JSON).
//! Ops:    {"op":"seed","tabs":[...],"settings":{...}}, {"op":"event","event":{...}},
//!         {"op":"request","request":{...}}, {"op":"wait","ms":500}
//! Output: {"line":1,"calls":[...]} listing every host call the line caused,
//!         or {"line":1,"error":"..."}.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tabsuspend::app::App;
use tabsuspend::host::memory::MemoryHost;
use tabsuspend::services::collaborators::Collaborators;
use tabsuspend::types::errors::ReplayError;
use tabsuspend::types::event::{ExternalRequest, HostEvent};
use tabsuspend::types::settings::{CoreConfig, Environment, SettingKey};
use tabsuspend::types::tab::{Tab, WindowId};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "op")]
enum Op {
    #[serde(rename_all = "camelCase")]
    Seed {
        #[serde(default)]
        tabs: Vec<Tab>,
        #[serde(default)]
        settings: BTreeMap<String, Value>,
        #[serde(default)]
        environment: Environment,
        #[serde(default)]
        config: CoreConfig,
        #[serde(default)]
        last_focused_window: Option<WindowId>,
    },
    Event { event: HostEvent },
    Request { request: ExternalRequest },
    Wait { ms: u64 },
}

struct Session {
    host: Arc<MemoryHost>,
    app: App,
}

impl Session {
    async fn seed(
        tabs: Vec<Tab>,
        settings: BTreeMap<String, Value>,
        environment: Environment,
        config: CoreConfig,
        last_focused_window: Option<WindowId>,
    ) -> Self {
        let host = Arc::new(MemoryHost::new());
        for tab in tabs {
            host.insert_tab(tab);
        }
        for (name, value) in settings {
            match SettingKey::ALL.into_iter().find(|key| key.as_str() == name) {
                Some(key) => host.put_option(key, value),
                None => tracing::warn!(option = %name, "Unknown option in seed"),
            }
        }
        host.set_last_focused_window(last_focused_window);

        let app = App::new(config, environment, Collaborators::from_host(host.clone()));
        app.startup().await;
        Self { host, app }
    }

    /// Mirrors the event into the host's own tab table before dispatching.
    async fn event(&self, event: HostEvent) {
        match &event {
            HostEvent::TabUpdated { tab, .. } | HostEvent::TabCreated { tab } => {
                self.host.insert_tab(tab.clone());
            }
            HostEvent::TabRemoved { tab_id } => {
                self.host.remove_tab(*tab_id);
            }
            HostEvent::TabReplaced {
                added_tab_id,
                removed_tab_id,
            } => {
                self.host.replace_tab(*removed_tab_id, *added_tab_id);
            }
            _ => {}
        }
        self.app.dispatch(event).await;
    }
}

fn emit(value: Value) {
    println!("{}", value);
}

#[tokio::main]
async fn main() -> Result<(), ReplayError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabsuspend=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut session: Option<Session> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let op: Op = match serde_json::from_str(&line) {
            Ok(op) => op,
            Err(source) => {
                let e = ReplayError::Parse {
                    line: line_no,
                    source,
                };
                tracing::warn!(error = %e, "Skipping line");
                emit(json!({"line": line_no, "error": e.to_string()}));
                continue;
            }
        };

        let mut outcome = None;
        match op {
            Op::Seed {
                tabs,
                settings,
                environment,
                config,
                last_focused_window,
            } => {
                session = Some(Session::seed(tabs, settings, environment, config, last_focused_window).await);
            }
            Op::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
            Op::Event { event } => match &session {
                Some(s) => s.event(event).await,
                None => outcome = Some(Err("no seed before event".to_string())),
            },
            Op::Request { request } => match &session {
                Some(s) => outcome = Some(s.app.handle_external_request(request).await.map_err(|e| e.to_string())),
                None => outcome = Some(Err("no seed before request".to_string())),
            },
        }

        let calls = session.as_ref().map(|s| s.host.drain()).unwrap_or_default();
        match outcome {
            Some(Err(error)) => emit(json!({"line": line_no, "error": error, "calls": calls})),
            _ => emit(json!({"line": line_no, "calls": calls})),
        }
    }

    tracing::info!(lines = line_no, "Replay finished");
    Ok(())
}
