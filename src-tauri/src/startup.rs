//! Startup sequence: spawn backend, wait for it, initialise it, then show
//! the main window.

use crate::backend::{
    self, BackendClient, BackendCommand, BackendError, BackendSupervisor, InitRequest, ProbeError,
    SupervisorError,
};
use crate::config::{self, AppConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};

pub const MAIN_WINDOW_LABEL: &str = "main";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("Could not resolve data directories: {0}")]
    DataDirs(String),

    #[error("Failed to initialize backend: {0}")]
    Init(#[from] BackendError),
}

#[derive(Debug, Default)]
pub struct StartupState {
    backend_initialized: AtomicBool,
}

impl StartupState {
    pub fn backend_initialized(&self) -> bool {
        self.backend_initialized.load(Ordering::SeqCst)
    }
}

/// Run the whole sequence. Spawned once from `setup`.
///
/// The main window only appears once the backend accepted `init`; any
/// failure exits the process with code 1.
pub async fn launch(app: AppHandle) {
    let config = app.state::<AppConfig>().inner().clone();
    let client = app.state::<BackendClient>().inner().clone();

    let request = match init_request(&app, &config) {
        Ok(request) => request,
        Err(e) => {
            log::error!("[INIT] {}", e);
            app.exit(1);
            return;
        }
    };

    let resource_dir = app.path().resource_dir().ok();
    let command =
        BackendCommand::resolve(&config, &config::project_root(), resource_dir.as_deref());
    let supervisor = app.state::<BackendSupervisor>();

    if let Err(e) = bring_up_backend(&supervisor, command, &client, &config, &request).await {
        log::error!("[INIT] {}", e);
        app.exit(1);
        return;
    }

    app.state::<StartupState>()
        .backend_initialized
        .store(true, Ordering::SeqCst);

    let handle = app.clone();
    if let Err(e) = app.run_on_main_thread(move || show_main_window(&handle)) {
        log::error!("[STARTUP] Could not schedule main window: {}", e);
    }
}

/// Spawn the worker, wait for its HTTP server, then send `init`.
///
/// A launch failure is only logged: the probe then never resolves (unless
/// `config.probe_timeout` is set), so the caller never gets to show a window.
pub async fn bring_up_backend(
    supervisor: &BackendSupervisor,
    command: Result<BackendCommand, SupervisorError>,
    client: &BackendClient,
    config: &AppConfig,
    request: &InitRequest,
) -> Result<(), StartupError> {
    if let Err(e) = command.and_then(|command| supervisor.start(&command)) {
        log::error!("[BACKEND] {}", e);
    }

    backend::await_ready(
        client.http(),
        &client.endpoint("/status"),
        config.probe_interval,
        config.probe_timeout,
    )
    .await?;

    client.init(request).await?;
    log::info!("[INIT] Backend initialized");
    Ok(())
}

fn init_request(app: &AppHandle, config: &AppConfig) -> Result<InitRequest, StartupError> {
    let paths = app.path();
    let dir = |resolved: tauri::Result<std::path::PathBuf>| {
        resolved
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|e| StartupError::DataDirs(e.to_string()))
    };
    Ok(InitRequest {
        user_data_path: dir(paths.app_data_dir())?,
        logs_path: dir(paths.app_log_dir())?,
        is_dev: config.run_mode.is_dev(),
    })
}

/// Create the main window, or focus it if it already exists.
pub fn show_main_window(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW_LABEL) {
        let _ = window.show();
        let _ = window.set_focus();
        return;
    }

    let built = WebviewWindowBuilder::new(
        app,
        MAIN_WINDOW_LABEL,
        WebviewUrl::App("index.html".into()),
    )
    .title("Lex Laboris")
    .inner_size(1280.0, 800.0)
    .min_inner_size(800.0, 600.0)
    .center()
    .build();

    match built {
        Ok(_window) => {
            #[cfg(debug_assertions)]
            _window.open_devtools();
            log::info!("[STARTUP] Main window opened");
        }
        Err(e) => log::error!("[STARTUP] Failed to open main window: {}", e),
    }
}
