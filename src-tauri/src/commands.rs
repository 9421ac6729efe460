//! Tauri command handlers: the bridge between the webviews and the host.
//!
//! Every command resolves to an [`ApiResponse`]; failures become
//! `{"status": "error"}` payloads instead of rejected promises.
//!
//! Overlay commands are synchronous: Tauri runs those on the main thread in
//! the order the webview sent them, which is where session state lives.

use crate::api::{ApiResponse, Empty};
use crate::backend::BackendClient;
use crate::capture::{self, CaptureArea, InputResult, Point, SelectionEvent, SelectionRect};
use crate::shortcuts::{self, ShortcutTable};
use crate::startup::MAIN_WINDOW_LABEL;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tauri::{AppHandle, Manager, WebviewWindow};
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

const EXTERNAL_LINK_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

fn client(app: &AppHandle) -> BackendClient {
    app.state::<BackendClient>().inner().clone()
}

// Backend pass-through

#[tauri::command]
pub async fn start_tracking(app: AppHandle) -> ApiResponse<Value> {
    client(&app).start_tracking().await
}

#[tauri::command]
pub async fn stop_tracking(app: AppHandle) -> ApiResponse<Value> {
    client(&app).stop_tracking().await
}

#[tauri::command]
pub async fn get_status(app: AppHandle) -> ApiResponse<Value> {
    client(&app).status().await
}

#[tauri::command]
pub async fn get_events(app: AppHandle) -> ApiResponse<Value> {
    client(&app).events().await
}

/// `bbox` is `[left, top, right, bottom]`; omit it for the full screen.
#[tauri::command]
pub async fn take_screenshot(app: AppHandle, bbox: Option<Vec<f64>>) -> ApiResponse<Value> {
    client(&app).take_screenshot(bbox).await
}

#[tauri::command]
pub async fn generate_report(app: AppHandle, data: Value) -> ApiResponse<Value> {
    client(&app).generate_report(&data).await
}

#[derive(Debug, Serialize)]
pub struct UrlPayload {
    pub url: String,
}

#[tauri::command]
pub fn get_screenshot_url(
    client: tauri::State<'_, BackendClient>,
    filepath: String,
) -> ApiResponse<UrlPayload> {
    client.screenshot_url(&filepath).map(|url| UrlPayload { url }).into()
}

// Capture overlays

#[derive(Debug, Serialize)]
pub struct SelectionPayload {
    /// Live rectangle to draw, `null` when not dragging.
    pub selection: Option<SelectionRect>,
    /// The session closed as a result of this event.
    pub ended: bool,
}

impl From<InputResult> for SelectionPayload {
    fn from(result: InputResult) -> Self {
        match result {
            InputResult::Selecting(selection) => SelectionPayload {
                selection,
                ended: false,
            },
            InputResult::Ended(_) => SelectionPayload {
                selection: None,
                ended: true,
            },
            InputResult::Ignored => SelectionPayload {
                selection: None,
                ended: false,
            },
        }
    }
}

fn overlay_event(window: &WebviewWindow, event: SelectionEvent) -> ApiResponse<SelectionPayload> {
    let result = capture::handle_overlay_input(window.app_handle(), window.label(), event);
    ApiResponse::success(result.into())
}

#[tauri::command]
pub fn overlay_pointer_down(
    window: WebviewWindow,
    x: f64,
    y: f64,
) -> ApiResponse<SelectionPayload> {
    overlay_event(&window, SelectionEvent::PointerDown(Point::new(x, y)))
}

#[tauri::command]
pub fn overlay_pointer_move(
    window: WebviewWindow,
    x: f64,
    y: f64,
) -> ApiResponse<SelectionPayload> {
    overlay_event(&window, SelectionEvent::PointerMove(Point::new(x, y)))
}

#[tauri::command]
pub fn overlay_pointer_up(
    window: WebviewWindow,
    x: f64,
    y: f64,
) -> ApiResponse<SelectionPayload> {
    overlay_event(&window, SelectionEvent::PointerUp(Point::new(x, y)))
}

/// Only `Escape` means anything to an overlay; other keys are ignored.
#[tauri::command]
pub fn overlay_key(window: WebviewWindow, key: String) -> ApiResponse<SelectionPayload> {
    if key != "Escape" {
        return ApiResponse::success(InputResult::Ignored.into());
    }
    overlay_event(&window, SelectionEvent::Escape)
}

/// An overlay finished its own selection (logical pixels).
#[tauri::command]
pub fn capture_end(
    window: WebviewWindow,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
) -> ApiResponse<Empty> {
    let area = CaptureArea {
        x,
        y,
        width,
        height,
    };
    log::info!("[BRIDGE] capture_end from {}: {:?}", window.label(), area);
    capture::end_with_area(window.app_handle(), window.label(), area);
    ApiResponse::ok()
}

#[tauri::command]
pub fn capture_close(window: WebviewWindow) -> ApiResponse<Empty> {
    log::info!("[BRIDGE] capture_close from {}", window.label());
    capture::cancel(window.app_handle());
    ApiResponse::ok()
}

// Actions

/// Async so a region capture is queued onto the main thread rather than
/// creating windows from inside a command running there.
#[tauri::command]
pub async fn trigger_shortcut(app: AppHandle, shortcut_id: String) -> ApiResponse<Empty> {
    let resolved = app.state::<ShortcutTable>().resolve(&shortcut_id);
    match resolved {
        Ok(action) => {
            shortcuts::dispatch(&app, action);
            ApiResponse::ok()
        }
        Err(e) => {
            log::warn!("[BRIDGE] {}", e);
            ApiResponse::error(e.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePath {
    /// `null` when the user dismissed the dialog.
    pub file_path: Option<String>,
}

#[tauri::command]
pub async fn show_save_report_dialog(
    app: AppHandle,
    default_filename: String,
) -> ApiResponse<SavePath> {
    let Some(main) = app.get_webview_window(MAIN_WINDOW_LABEL) else {
        return ApiResponse::error("Main window is not available");
    };

    let (tx, rx) = tokio::sync::oneshot::channel();
    app.dialog()
        .file()
        .set_parent(&main)
        .set_title("Save work record report")
        .set_file_name(default_filename)
        .add_filter("PDF document", &["pdf"])
        .save_file(move |path| {
            let _ = tx.send(path);
        });

    match rx.await {
        Ok(path) => ApiResponse::success(SavePath {
            file_path: path.map(|p| p.to_string()),
        }),
        Err(_) => ApiResponse::error("Save dialog closed without a result"),
    }
}

#[tauri::command]
pub fn show_file_in_folder(app: AppHandle, path: String) -> ApiResponse<Empty> {
    let target = match reveal_target(&path) {
        Ok(target) => target,
        Err(e) => {
            log::warn!("[BRIDGE] {}", e);
            return ApiResponse::error(e);
        }
    };
    match app.opener().reveal_item_in_dir(&target) {
        Ok(()) => {
            log::info!("[BRIDGE] Revealed {}", target.display());
            ApiResponse::ok()
        }
        Err(e) => {
            log::warn!("[BRIDGE] Failed to reveal {}: {}", target.display(), e);
            ApiResponse::error(format!("Failed to open folder: {}", e))
        }
    }
}

#[tauri::command]
pub fn open_external_link(app: AppHandle, url: String) -> ApiResponse<Empty> {
    if !is_allowed_external_link(&url) {
        log::warn!("[BRIDGE] Refusing to open {}", url);
        return ApiResponse::error(format!("Refusing to open '{}'", url));
    }
    app.opener()
        .open_url(url.as_str(), None::<&str>)
        .map(|()| Empty {})
        .into()
}

fn is_allowed_external_link(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|parsed| EXTERNAL_LINK_SCHEMES.contains(&parsed.scheme()))
        .unwrap_or(false)
}

/// The file to select in the platform file manager. It must exist.
fn reveal_target(path: &str) -> Result<PathBuf, String> {
    if path.trim().is_empty() {
        return Err("No file path given".to_string());
    }
    let target = PathBuf::from(path);
    if !target.exists() {
        return Err(format!("File not found: {}", path));
    }
    Ok(target)
}
