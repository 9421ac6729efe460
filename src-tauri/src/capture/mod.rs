//! Region capture domain: public API.
//!
//! - **geometry**: areas, displays, logical -> physical transform
//! - **selection**: per-overlay drag state machine
//! - **session**: the single active session and its overlays
//! - **feed**: in-process subscribers for delivered areas
//! - **overlay**: Tauri windows, monitors and cursor
//!
//! Every session mutation runs on the Tauri main thread. Synchronous
//! commands already run there, in IPC order; shortcut handlers and async
//! commands hop there through [`request_open`] or [`request_cancel`].

pub mod feed;
pub mod geometry;
pub mod overlay;
pub mod selection;
pub mod session;

pub use feed::{AreaFeed, Subscription};
pub use geometry::{CaptureArea, DisplayInfo, Point};
pub use selection::{SelectionEvent, SelectionOutcome, SelectionRect};
pub use session::{CaptureSessions, InputResult, OpenOutcome, SessionEnd};

use std::sync::Mutex;
use tauri::{AppHandle, Emitter, Manager};

/// Event the main window receives with the physical-pixel area.
pub const AREA_CAPTURED_EVENT: &str = "screenshot-area-captured";

/// Bound globally only while a session is active.
pub const ESCAPE_SHORTCUT: &str = "Escape";

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate displays: {0}")]
    DisplayEnumeration(String),

    #[error("No displays available for capture")]
    NoDisplays,

    #[error("Failed to create overlay window '{label}': {reason}")]
    OverlayWindow { label: String, reason: String },
}

/// Managed state for the capture domain.
pub struct CaptureState {
    sessions: Mutex<CaptureSessions>,
    feed: AreaFeed,
    delivery: Mutex<Option<Subscription>>,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureState {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(CaptureSessions::new()),
            feed: AreaFeed::new(),
            delivery: Mutex::new(None),
        }
    }

    pub fn feed(&self) -> &AreaFeed {
        &self.feed
    }
}

/// Forward delivered areas to the main window as [`AREA_CAPTURED_EVENT`].
pub fn attach_main_window_delivery(app: &AppHandle) {
    let state = app.state::<CaptureState>();
    let handle = app.clone();
    let subscription = state.feed.subscribe(move |area| {
        if let Err(e) = handle.emit_to(crate::startup::MAIN_WINDOW_LABEL, AREA_CAPTURED_EVENT, area)
        {
            log::error!("[CAPTURE] Failed to emit {}: {}", AREA_CAPTURED_EVENT, e);
        }
    });
    *crate::lock(&state.delivery) = Some(subscription);
}

/// Stop forwarding areas to the main window.
pub fn detach_main_window_delivery(app: &AppHandle) {
    let state = app.state::<CaptureState>();
    if let Some(subscription) = crate::lock(&state.delivery).take() {
        subscription.cancel();
    };
}

/// Fire-and-forget `open` from any thread.
pub fn request_open(app: &AppHandle) {
    let handle = app.clone();
    let scheduled = app.run_on_main_thread(move || {
        if let Err(e) = open(&handle) {
            log::error!("[CAPTURE] Could not start capture: {}", e);
        }
    });
    if let Err(e) = scheduled {
        log::error!("[CAPTURE] Could not schedule capture: {}", e);
    }
}

/// Fire-and-forget `cancel` from any thread.
pub fn request_cancel(app: &AppHandle) {
    let handle = app.clone();
    let scheduled = app.run_on_main_thread(move || {
        cancel(&handle);
    });
    if let Err(e) = scheduled {
        log::error!("[CAPTURE] Could not schedule cancel: {}", e);
    }
}

/// Start a session, or refocus the active one. Main thread only.
pub fn open(app: &AppHandle) -> Result<OpenOutcome, CaptureError> {
    let state = app.state::<CaptureState>();
    let host = overlay::WindowOverlayHost::new(app);
    let outcome = crate::lock(&state.sessions).open(&host, || overlay::enumerate_displays(app));
    outcome
}

/// Route one overlay input event. Main thread only.
pub fn handle_overlay_input(app: &AppHandle, label: &str, event: SelectionEvent) -> InputResult {
    let state = app.state::<CaptureState>();
    let host = overlay::WindowOverlayHost::new(app);
    let result = crate::lock(&state.sessions).handle_input(&host, label, event);
    if let InputResult::Ended(end) = &result {
        finish(app, end);
    }
    result
}

/// An overlay reported its finished rectangle. Main thread only.
pub fn end_with_area(app: &AppHandle, label: &str, area: CaptureArea) -> Option<SessionEnd> {
    let state = app.state::<CaptureState>();
    let host = overlay::WindowOverlayHost::new(app);
    let end = crate::lock(&state.sessions).end_with_area(&host, label, area);
    match &end {
        Some(end) => finish(app, end),
        None => log::debug!("[CAPTURE] Ignoring area from inactive overlay {}", label),
    }
    end
}

/// Cancel the active session, if any. Main thread only.
pub fn cancel(app: &AppHandle) -> Option<SessionEnd> {
    let state = app.state::<CaptureState>();
    let host = overlay::WindowOverlayHost::new(app);
    let end = crate::lock(&state.sessions).cancel(&host);
    if let Some(end) = &end {
        finish(app, end);
    }
    end
}

fn finish(app: &AppHandle, end: &SessionEnd) {
    match end.outcome {
        SelectionOutcome::Finished(area) => {
            let displays = overlay::enumerate_displays(app).unwrap_or_else(|e| {
                log::warn!("[CAPTURE] {}", e);
                Vec::new()
            });
            let pointer = overlay::cursor_position(app);
            let state = app.state::<CaptureState>();
            let delivered = publish_area(&state.feed, &displays, pointer, end.origin.as_ref(), area);
            if delivered == 0 {
                log::warn!("[CAPTURE] No subscriber for the captured area");
            }
        }
        SelectionOutcome::Cancelled => {
            log::info!("[CAPTURE] Session {} cancelled", end.session);
        }
    }
}

/// Scale a logical `area` to physical pixels and publish it on `feed`.
///
/// The scale comes from the display nearest `pointer`, falling back to
/// `origin` (the overlay the selection was drawn on). Returns how many
/// subscribers received the area.
pub fn publish_area(
    feed: &AreaFeed,
    displays: &[DisplayInfo],
    pointer: Option<Point>,
    origin: Option<&DisplayInfo>,
    area: CaptureArea,
) -> usize {
    let scale = geometry::resolve_scale_factor(displays, pointer, origin);
    let physical = geometry::to_physical(area, scale);

    log::info!(
        "[CAPTURE] Area {}x{} at ({}, {}) -> physical {}x{} at ({}, {}) (scale {})",
        area.width,
        area.height,
        area.x,
        area.y,
        physical.width,
        physical.height,
        physical.x,
        physical.y,
        scale
    );

    feed.publish(physical)
}
