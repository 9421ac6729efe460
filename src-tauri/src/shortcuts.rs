//! Global shortcut table and dispatch.
//!
//! The OS shortcut handler and the `trigger_shortcut` bridge command both go
//! through [`dispatch`], keyed by [`ShortcutAction`].
//!
//! The global-shortcut plugin calls handlers while holding its own registry
//! lock, and on Windows and macOS it does so on the main thread. Handlers
//! therefore only hand work to [`run_outside_handler`]; anything that
//! registers or unregisters shortcuts must not run inline.

use crate::backend::BackendClient;
use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Manager};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortcutAction {
    RegionCapture,
    QuickScreenshot,
}

impl ShortcutAction {
    pub const ALL: [ShortcutAction; 2] = [
        ShortcutAction::RegionCapture,
        ShortcutAction::QuickScreenshot,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ShortcutAction::RegionCapture => "region-capture",
            ShortcutAction::QuickScreenshot => "quick-screenshot",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShortcutError {
    #[error("Unknown shortcut '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBinding {
    pub key_combo: String,
    pub action: ShortcutAction,
}

/// The bindings registered at startup. Immutable afterwards.
#[derive(Debug, Clone)]
pub struct ShortcutTable {
    bindings: Vec<ShortcutBinding>,
}

impl ShortcutTable {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bindings: vec![
                ShortcutBinding {
                    key_combo: config.region_shortcut.clone(),
                    action: ShortcutAction::RegionCapture,
                },
                ShortcutBinding {
                    key_combo: config.quick_shortcut.clone(),
                    action: ShortcutAction::QuickScreenshot,
                },
            ],
        }
    }

    pub fn bindings(&self) -> &[ShortcutBinding] {
        &self.bindings
    }

    /// Map a logical action id, or a configured key combo, to its action.
    pub fn resolve(&self, id: &str) -> Result<ShortcutAction, ShortcutError> {
        if let Some(action) = ShortcutAction::ALL.into_iter().find(|a| a.id() == id) {
            return Ok(action);
        }
        self.bindings
            .iter()
            .find(|b| b.key_combo.eq_ignore_ascii_case(id))
            .map(|b| b.action)
            .ok_or_else(|| ShortcutError::Unknown(id.to_string()))
    }
}

/// Run one action. Never blocks the caller.
pub fn dispatch(app: &AppHandle, action: ShortcutAction) {
    log::info!("[SHORTCUT] Dispatching {}", action.id());
    match action {
        ShortcutAction::RegionCapture => crate::capture::request_open(app),
        ShortcutAction::QuickScreenshot => {
            let client = app.state::<BackendClient>().inner().clone();
            tauri::async_runtime::spawn(async move {
                match client.shortcut_screenshot().await {
                    Ok(status) => log::info!(
                        "[SHORTCUT] Quick screenshot response: HTTP {}",
                        status.as_u16()
                    ),
                    Err(e) => log::warn!("[SHORTCUT] Quick screenshot failed: {}", e),
                }
            });
        }
    }
}

/// Run `work` on the blocking pool instead of the calling shortcut handler.
///
/// From there `run_on_main_thread` queues rather than running inline, so the
/// plugin's lock is released before the work touches any registration.
pub fn run_outside_handler<F>(work: F)
where
    F: FnOnce() + Send + 'static,
{
    let _ = tauri::async_runtime::spawn_blocking(work);
}

/// Register every binding. A failing binding is logged and skipped.
///
/// Returns how many were registered.
pub fn register_all(app: &AppHandle, table: &ShortcutTable) -> usize {
    let mut registered = 0;
    for binding in table.bindings() {
        let action = binding.action;
        let result = app
            .global_shortcut()
            .on_shortcut(binding.key_combo.as_str(), move |app, _shortcut, event| {
                if event.state == ShortcutState::Pressed {
                    let app = app.clone();
                    run_outside_handler(move || dispatch(&app, action));
                }
            });
        match result {
            Ok(()) => {
                registered += 1;
                log::info!(
                    "[SHORTCUT] Registered {} -> {}",
                    binding.key_combo,
                    action.id()
                );
            }
            Err(e) => log::error!(
                "[SHORTCUT] Failed to register {} ({}): {}",
                binding.key_combo,
                action.id(),
                e
            ),
        }
    }
    registered
}

pub fn unregister_all(app: &AppHandle) {
    match app.global_shortcut().unregister_all() {
        Ok(()) => log::info!("[SHORTCUT] All shortcuts unregistered"),
        Err(e) => log::warn!("[SHORTCUT] Failed to unregister shortcuts: {}", e),
    }
}
