// src/pwa.rs
//! Client-side half of the offline story: registration state, the deferred
//! install prompt and status notifications for the UI.
//!
//! A `PwaSession` is created once per page session and passed to whatever
//! needs it. Status changes are published on a broadcast channel; slow
//! subscribers simply miss old events.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::cache::ControlMessage;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PwaState {
    pub supported: bool,
    pub registered: bool,
    pub update_available: bool,
    pub install_prompt_available: bool,
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    UpdateAvailable,
    InstallPromptAvailable,
    OnlineStatusChanged { offline: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// A captured `beforeinstallprompt` event. Showing it resolves to the
/// user's choice.
#[async_trait]
pub trait DeferredPrompt: Send + Sync {
    async fn prompt(&self) -> Result<InstallOutcome>;
}

#[derive(Debug, Deserialize)]
struct WorkerMessage {
    #[serde(rename = "type")]
    kind: String,
}

pub struct PwaSession {
    state: Mutex<PwaState>,
    prompt: Mutex<Option<Box<dyn DeferredPrompt>>>,
    production: bool,
    events: broadcast::Sender<ClientEvent>,
}

impl PwaSession {
    /// `supported`: the runtime has service workers at all.
    /// `production`: registration only happens in production builds.
    pub fn new(supported: bool, production: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        if !supported {
            tracing::warn!(target: "pwa", "service workers are not supported");
        }
        Self {
            state: Mutex::new(PwaState {
                supported,
                ..PwaState::default()
            }),
            prompt: Mutex::new(None),
            production,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> PwaState {
        *self.lock_state()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PwaState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn should_register(&self) -> bool {
        let supported = self.lock_state().supported;
        if supported && !self.production {
            tracing::info!(target: "pwa", "service worker registration skipped outside production");
        }
        supported && self.production
    }

    pub fn mark_registered(&self) {
        self.lock_state().registered = true;
        tracing::info!(target: "pwa", "service worker registered");
    }

    /// A new worker reached `installed`. With an existing controller this is
    /// an update; without one it is the first install and nothing is shown.
    pub fn on_worker_installed(&self, has_controller: bool) {
        if has_controller {
            self.flag_update();
        }
    }

    /// Handle a message posted by the worker. Returns whether it was understood.
    pub fn on_worker_message(&self, raw: &str) -> bool {
        match serde_json::from_str::<WorkerMessage>(raw) {
            Ok(m) if m.kind == "SW_UPDATED" => {
                self.flag_update();
                true
            }
            _ => false,
        }
    }

    fn flag_update(&self) {
        self.lock_state().update_available = true;
        tracing::info!(target: "pwa", "new content available");
        self.emit(ClientEvent::UpdateAvailable);
    }

    /// Keep the prompt for later instead of letting the browser show it.
    pub fn defer_install_prompt(&self, prompt: Box<dyn DeferredPrompt>) {
        *self.prompt.lock().unwrap_or_else(|p| p.into_inner()) = Some(prompt);
        self.lock_state().install_prompt_available = true;
        self.emit(ClientEvent::InstallPromptAvailable);
    }

    /// Show the deferred prompt. `true` only when the user accepted. The
    /// prompt is single use and is consumed either way.
    pub async fn prompt_install(&self) -> bool {
        let taken = self.prompt.lock().unwrap_or_else(|p| p.into_inner()).take();
        let Some(prompt) = taken else {
            tracing::warn!(target: "pwa", "no install prompt available");
            return false;
        };
        self.lock_state().install_prompt_available = false;

        match prompt.prompt().await {
            Ok(outcome) => {
                tracing::info!(target: "pwa", ?outcome, "install prompt answered");
                outcome == InstallOutcome::Accepted
            }
            Err(e) => {
                tracing::error!(target: "pwa", error = ?e, "install prompt failed");
                false
            }
        }
    }

    /// Record connectivity. Emits only when the value changes.
    pub fn set_online(&self, online: bool) {
        let offline = !online;
        let changed = {
            let mut s = self.lock_state();
            let changed = s.offline != offline;
            s.offline = offline;
            changed
        };
        if changed {
            self.emit(ClientEvent::OnlineStatusChanged { offline });
        }
    }

    /// Message to post to the active worker to apply a waiting update.
    pub fn apply_update(&self) -> Option<ControlMessage> {
        self.lock_state()
            .registered
            .then_some(ControlMessage::SkipWaiting)
    }

    /// Message asking the worker to refresh its cached copy of `url`.
    pub fn update_cache(&self, url: &str) -> Option<ControlMessage> {
        self.lock_state().registered.then(|| ControlMessage::CacheUpdate {
            url: Some(url.to_string()),
        })
    }
}
