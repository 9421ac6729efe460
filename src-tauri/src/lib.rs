//! Lex Laboris: Tauri application entry point.
//!
//! This is the app shell that wires the domains together: module
//! declarations, plugin registration, managed state, the command registry
//! and the exit hooks. No business logic lives here.
//!
//! Domains:
//!   - backend: worker process supervision, readiness probe, HTTP client
//!   - capture: multi-monitor region selection and delivery
//!   - shortcuts: global hotkeys and their dispatch table
//!   - startup: spawn -> probe -> init -> main window
//!   - commands: the frontend bridge

pub mod api;
pub mod backend;
pub mod capture;
mod commands;
pub mod config;
pub mod shortcuts;
pub mod startup;

use backend::{BackendClient, BackendSupervisor};
use capture::CaptureState;
use config::AppConfig;
use shortcuts::ShortcutTable;
use startup::StartupState;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tauri::Manager;

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Entry point, called by the Tauri runtime.
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    config::load_dotenv();
    env_logger::init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        log::error!("[STARTUP] Invalid configuration, using defaults: {}", e);
        AppConfig::default()
    });
    log::info!(
        "[STARTUP] Run mode {:?}, backend {}",
        config.run_mode,
        config.backend_base_url()
    );

    let client = BackendClient::new(config.backend_base_url());
    let shortcut_table = ShortcutTable::from_config(&config);

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .manage(config)
        .manage(client)
        .manage(shortcut_table)
        .manage(BackendSupervisor::new())
        .manage(CaptureState::new())
        .manage(StartupState::default())
        .invoke_handler(tauri::generate_handler![
            // Backend pass-through
            commands::start_tracking,
            commands::stop_tracking,
            commands::get_status,
            commands::get_events,
            commands::take_screenshot,
            commands::generate_report,
            commands::get_screenshot_url,
            // Capture overlays
            commands::overlay_pointer_down,
            commands::overlay_pointer_move,
            commands::overlay_pointer_up,
            commands::overlay_key,
            commands::capture_end,
            commands::capture_close,
            // Actions
            commands::trigger_shortcut,
            commands::show_save_report_dialog,
            commands::show_file_in_folder,
            commands::open_external_link,
        ])
        .setup(|app| {
            log::info!("[STARTUP] Lex Laboris starting up");
            let handle = app.handle().clone();

            capture::attach_main_window_delivery(&handle);

            let table = handle.state::<ShortcutTable>();
            let registered = shortcuts::register_all(&handle, &table);
            log::info!(
                "[STARTUP] {}/{} shortcuts registered",
                registered,
                table.bindings().len()
            );

            tauri::async_runtime::spawn(startup::launch(handle.clone()));
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("Error building Lex Laboris");

    app.run(|app, event| match event {
        // Closing the last overlay before the main window exists would
        // otherwise end the process while the backend is still starting.
        tauri::RunEvent::ExitRequested { code, api, .. } => {
            if code.is_none() && !app.state::<StartupState>().backend_initialized() {
                api.prevent_exit();
            }
        }
        tauri::RunEvent::Exit => {
            log::info!("[STARTUP] Exiting, cleaning up");
            shortcuts::unregister_all(app);
            capture::detach_main_window_delivery(app);
            tauri::async_runtime::block_on(app.state::<BackendSupervisor>().shutdown());
        }
        #[cfg(target_os = "macos")]
        tauri::RunEvent::Reopen { .. } => {
            if app.state::<StartupState>().backend_initialized() {
                startup::show_main_window(app);
            }
        }
        _ => {}
    });
}
