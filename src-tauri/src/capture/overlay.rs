//! Tauri side of the overlays: display enumeration, pointer position, the
//! webview windows themselves and the session-scoped Escape shortcut.

use super::geometry::{DisplayInfo, Point};
use super::session::OverlayHost;
use super::{CaptureError, ESCAPE_SHORTCUT};
use crate::shortcuts::run_outside_handler;
use tauri::{
    AppHandle, LogicalPosition, LogicalSize, Manager, PhysicalPosition, PhysicalSize, WebviewUrl,
    WebviewWindow, WebviewWindowBuilder,
};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

/// Page every overlay loads; it only forwards pointer and key input.
const OVERLAY_PAGE: &str = "capture.html";

pub struct WindowOverlayHost<'a> {
    app: &'a AppHandle,
}

impl<'a> WindowOverlayHost<'a> {
    pub fn new(app: &'a AppHandle) -> Self {
        Self { app }
    }
}

/// Move a hidden overlay onto its display and show it.
///
/// Placement is physical: logical coordinates would be converted with the
/// scale of whichever monitor the window was created on.
fn place(window: &WebviewWindow, display: &DisplayInfo) -> tauri::Result<()> {
    let bounds = display.physical_bounds();
    window.set_position(PhysicalPosition::new(bounds.x, bounds.y))?;
    window.set_size(PhysicalSize::new(bounds.width, bounds.height))?;
    window.show()?;
    window.set_focus()
}

impl OverlayHost for WindowOverlayHost<'_> {
    fn create_overlay(&self, label: &str, display: &DisplayInfo) -> Result<(), CaptureError> {
        let failed = |e: tauri::Error| CaptureError::OverlayWindow {
            label: label.to_string(),
            reason: e.to_string(),
        };

        let window = WebviewWindowBuilder::new(self.app, label, WebviewUrl::App(OVERLAY_PAGE.into()))
            .title("Lex Laboris Capture")
            .decorations(false)
            .transparent(true)
            .always_on_top(true)
            .skip_taskbar(true)
            .resizable(false)
            .shadow(false)
            .visible(false)
            .build()
            .map_err(failed)?;

        if let Err(e) = place(&window, display) {
            let _ = window.destroy();
            return Err(failed(e));
        }

        log::debug!(
            "[CAPTURE] Overlay {} covers {:?} (scale {})",
            label,
            display.physical_bounds(),
            display.scale_factor
        );
        Ok(())
    }

    fn focus_overlay(&self, label: &str) {
        if let Some(window) = self.app.get_webview_window(label) {
            if let Err(e) = window.set_focus() {
                log::warn!("[CAPTURE] Failed to focus {}: {}", label, e);
            }
        }
    }

    fn destroy_overlay(&self, label: &str) {
        if let Some(window) = self.app.get_webview_window(label) {
            if let Err(e) = window.destroy() {
                log::warn!("[CAPTURE] Failed to destroy {}: {}", label, e);
            }
        }
    }

    fn bind_escape(&self) {
        let result = self
            .app
            .global_shortcut()
            .on_shortcut(ESCAPE_SHORTCUT, |app, _shortcut, event| {
                if event.state == ShortcutState::Pressed {
                    log::info!("[SHORTCUT] Escape pressed, cancelling capture");
                    let app = app.clone();
                    run_outside_handler(move || super::request_cancel(&app));
                }
            });
        if let Err(e) = result {
            log::warn!("[SHORTCUT] Failed to register {}: {}", ESCAPE_SHORTCUT, e);
        }
    }

    fn release_escape(&self) {
        let shortcuts = self.app.global_shortcut();
        if !shortcuts.is_registered(ESCAPE_SHORTCUT) {
            return;
        }
        if let Err(e) = shortcuts.unregister(ESCAPE_SHORTCUT) {
            log::warn!("[SHORTCUT] Failed to unregister {}: {}", ESCAPE_SHORTCUT, e);
        }
    }
}

/// Current displays with logical bounds. Queried fresh on every call.
pub fn enumerate_displays(app: &AppHandle) -> Result<Vec<DisplayInfo>, CaptureError> {
    let monitors = app
        .available_monitors()
        .map_err(|e| CaptureError::DisplayEnumeration(e.to_string()))?;

    Ok(monitors
        .iter()
        .map(|monitor| {
            let scale = monitor.scale_factor();
            let position: LogicalPosition<f64> = monitor.position().to_logical(scale);
            let size: LogicalSize<f64> = monitor.size().to_logical(scale);
            DisplayInfo {
                name: monitor.name().cloned(),
                bounds_x: position.x,
                bounds_y: position.y,
                bounds_width: size.width,
                bounds_height: size.height,
                scale_factor: scale,
            }
        })
        .collect())
}

/// Pointer position in physical screen pixels, if the platform reports it.
pub fn cursor_position(app: &AppHandle) -> Option<Point> {
    match app.cursor_position() {
        Ok(position) => Some(Point::new(position.x, position.y)),
        Err(e) => {
            log::warn!("[CAPTURE] Cursor position unavailable: {}", e);
            None
        }
    }
}
