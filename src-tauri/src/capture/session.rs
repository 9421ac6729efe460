//! Capture session registry.
//!
//! Owns the overlay windows of the (at most one) active session and the
//! selection machine each window runs. Window creation goes through an
//! [`OverlayHost`] so the registry can be driven without a windowing system.

use super::geometry::{CaptureArea, DisplayInfo};
use super::selection::{
    SelectionEvent, SelectionMachine, SelectionOutcome, SelectionRect, MIN_SELECTION_SIZE,
};
use super::CaptureError;

pub type SessionId = u64;

/// Label prefix shared by every overlay window.
pub const OVERLAY_LABEL_PREFIX: &str = "capture-overlay-";

/// Platform side of the overlay windows.
pub trait OverlayHost {
    /// Create one borderless overlay covering `display`.
    fn create_overlay(&self, label: &str, display: &DisplayInfo) -> Result<(), CaptureError>;
    fn focus_overlay(&self, label: &str);
    /// Must tolerate windows that are already gone.
    fn destroy_overlay(&self, label: &str);
    /// Route the global Escape key to a cancel while a session is open.
    fn bind_escape(&self);
    fn release_escape(&self);
}

pub fn overlay_label(session: SessionId, index: usize) -> String {
    format!("{}{}-{}", OVERLAY_LABEL_PREFIX, session, index)
}

#[derive(Debug, Clone)]
pub struct OverlayWindow {
    pub label: String,
    pub display: DisplayInfo,
    machine: SelectionMachine,
}

impl OverlayWindow {
    pub fn machine(&self) -> &SelectionMachine {
        &self.machine
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Created(SessionId),
    /// A session was already active; its windows were focused instead.
    Refocused(SessionId),
}

impl OpenOutcome {
    pub fn session(&self) -> SessionId {
        match *self {
            OpenOutcome::Created(id) | OpenOutcome::Refocused(id) => id,
        }
    }
}

/// How a session ended. `origin` is the display of the overlay that ended
/// it, when one did.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEnd {
    pub session: SessionId,
    pub outcome: SelectionOutcome,
    pub origin: Option<DisplayInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputResult {
    /// No active overlay with that label.
    Ignored,
    /// Still selecting; the live rectangle while dragging.
    Selecting(Option<SelectionRect>),
    Ended(SessionEnd),
}

#[derive(Debug)]
struct ActiveSession {
    id: SessionId,
    windows: Vec<OverlayWindow>,
}

#[derive(Debug)]
pub struct CaptureSessions {
    next_id: SessionId,
    active: Option<ActiveSession>,
}

impl Default for CaptureSessions {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSessions {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            active: None,
        }
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|s| s.id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn windows(&self) -> &[OverlayWindow] {
        self.active
            .as_ref()
            .map(|s| s.windows.as_slice())
            .unwrap_or(&[])
    }

    /// Start a session with one overlay per enumerated display, or refocus
    /// the active one.
    ///
    /// Creation is all-or-nothing: if any overlay fails, the ones already
    /// created are destroyed and no session is recorded.
    pub fn open<H, F>(&mut self, host: &H, enumerate: F) -> Result<OpenOutcome, CaptureError>
    where
        H: OverlayHost + ?Sized,
        F: FnOnce() -> Result<Vec<DisplayInfo>, CaptureError>,
    {
        if let Some(active) = &self.active {
            log::info!(
                "[CAPTURE] Session {} already active, focusing {} overlay(s)",
                active.id,
                active.windows.len()
            );
            for window in &active.windows {
                host.focus_overlay(&window.label);
            }
            return Ok(OpenOutcome::Refocused(active.id));
        }

        let displays = enumerate()?;
        if displays.is_empty() {
            return Err(CaptureError::NoDisplays);
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut windows: Vec<OverlayWindow> = Vec::with_capacity(displays.len());
        for (index, display) in displays.into_iter().enumerate() {
            let label = overlay_label(id, index);
            if let Err(e) = host.create_overlay(&label, &display) {
                log::error!(
                    "[CAPTURE] Overlay {} failed, rolling back {} window(s): {}",
                    label,
                    windows.len(),
                    e
                );
                for created in &windows {
                    host.destroy_overlay(&created.label);
                }
                return Err(e);
            }
            windows.push(OverlayWindow {
                label,
                display,
                machine: SelectionMachine::new(),
            });
        }

        log::info!(
            "[CAPTURE] Session {} opened with {} overlay(s)",
            id,
            windows.len()
        );
        self.active = Some(ActiveSession { id, windows });
        host.bind_escape();
        Ok(OpenOutcome::Created(id))
    }

    /// Destroy every window of session `id`. No-op unless `id` is active.
    pub fn close<H: OverlayHost + ?Sized>(&mut self, host: &H, id: SessionId) -> bool {
        if self.active_id() != Some(id) {
            return false;
        }
        self.teardown(host);
        true
    }

    /// Cancel whatever session is active (global Escape, `capture_close`).
    pub fn cancel<H: OverlayHost + ?Sized>(&mut self, host: &H) -> Option<SessionEnd> {
        let session = self.teardown(host)?;
        Some(SessionEnd {
            session,
            outcome: SelectionOutcome::Cancelled,
            origin: None,
        })
    }

    /// Feed one input event to the overlay labelled `label`.
    ///
    /// A terminal transition in any window ends the whole session.
    pub fn handle_input<H: OverlayHost + ?Sized>(
        &mut self,
        host: &H,
        label: &str,
        event: SelectionEvent,
    ) -> InputResult {
        let Some(active) = self.active.as_mut() else {
            return InputResult::Ignored;
        };
        let Some(window) = active.windows.iter_mut().find(|w| w.label == label) else {
            return InputResult::Ignored;
        };

        match window.machine.handle(event) {
            None => InputResult::Selecting(window.machine.selection()),
            Some(outcome) => {
                let origin = window.display.clone();
                let session = active.id;
                self.teardown(host);
                InputResult::Ended(SessionEnd {
                    session,
                    outcome,
                    origin: Some(origin),
                })
            }
        }
    }

    /// An overlay reported a finished rectangle on its own.
    ///
    /// The size threshold still applies; a small area cancels the session.
    pub fn end_with_area<H: OverlayHost + ?Sized>(
        &mut self,
        host: &H,
        label: &str,
        area: CaptureArea,
    ) -> Option<SessionEnd> {
        let active = self.active.as_ref()?;
        let window = active.windows.iter().find(|w| w.label == label)?;
        let origin = window.display.clone();
        let session = active.id;

        let outcome = if f64::from(area.width) > MIN_SELECTION_SIZE
            && f64::from(area.height) > MIN_SELECTION_SIZE
        {
            SelectionOutcome::Finished(area)
        } else {
            log::info!(
                "[CAPTURE] Reported area {}x{} is too small, cancelling",
                area.width,
                area.height
            );
            SelectionOutcome::Cancelled
        };

        self.teardown(host);
        Some(SessionEnd {
            session,
            outcome,
            origin: Some(origin),
        })
    }

    fn teardown<H: OverlayHost + ?Sized>(&mut self, host: &H) -> Option<SessionId> {
        let active = self.active.take()?;
        for window in &active.windows {
            host.destroy_overlay(&window.label);
        }
        host.release_escape();
        log::info!(
            "[CAPTURE] Session {} closed ({} overlay(s) destroyed)",
            active.id,
            active.windows.len()
        );
        Some(active.id)
    }
}
