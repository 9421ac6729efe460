//! Pointer-drag selection state machine, one per overlay window.
//!
//! ```text
//! Idle --down--> Dragging --move--> Dragging
//!                Dragging --up--> Finished (w > 5 && h > 5) | Cancelled
//! Idle | Dragging --Escape--> Cancelled
//! ```
//!
//! Coordinates are the overlay window's logical pixels.

use super::geometry::{round_half_up, CaptureArea, Point};
use serde::Serialize;

/// Selections must be strictly larger than this on both axes.
pub const MIN_SELECTION_SIZE: f64 = 5.0;

/// The live rectangle while dragging (not yet rounded).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    /// Zero-size rectangle at `point`.
    pub fn at(point: Point) -> Self {
        Self {
            x: point.x,
            y: point.y,
            width: 0.0,
            height: 0.0,
        }
    }

    /// Axis-aligned bounding box of two corners, in any drag direction.
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.width > MIN_SELECTION_SIZE && self.height > MIN_SELECTION_SIZE
    }

    /// Round to whole pixels.
    pub fn to_area(&self) -> CaptureArea {
        CaptureArea {
            x: round_half_up(self.x) as i32,
            y: round_half_up(self.y) as i32,
            width: round_half_up(self.width).max(0.0) as u32,
            height: round_half_up(self.height).max(0.0) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Finished(CaptureArea),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    Idle,
    Dragging { anchor: Point, selection: SelectionRect },
    Finished(CaptureArea),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SelectionMachine {
    state: SelectionState,
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self {
            state: SelectionState::Idle,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Current rectangle while dragging.
    pub fn selection(&self) -> Option<SelectionRect> {
        match self.state {
            SelectionState::Dragging { selection, .. } => Some(selection),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<SelectionOutcome> {
        match self.state {
            SelectionState::Finished(area) => Some(SelectionOutcome::Finished(area)),
            SelectionState::Cancelled => Some(SelectionOutcome::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    /// Apply one input event.
    ///
    /// Returns the outcome only on the transition into a terminal state.
    /// Events that do not apply to the current state are ignored.
    pub fn handle(&mut self, event: SelectionEvent) -> Option<SelectionOutcome> {
        let (next, outcome) = match (self.state, event) {
            (SelectionState::Finished(_) | SelectionState::Cancelled, _) => return None,

            (_, SelectionEvent::Escape) => {
                (SelectionState::Cancelled, Some(SelectionOutcome::Cancelled))
            }

            (SelectionState::Idle, SelectionEvent::PointerDown(point)) => (
                SelectionState::Dragging {
                    anchor: point,
                    selection: SelectionRect::at(point),
                },
                None,
            ),
            (SelectionState::Idle, _) => return None,

            (SelectionState::Dragging { anchor, .. }, SelectionEvent::PointerMove(point)) => (
                SelectionState::Dragging {
                    anchor,
                    selection: SelectionRect::spanning(anchor, point),
                },
                None,
            ),
            (SelectionState::Dragging { anchor, .. }, SelectionEvent::PointerUp(point)) => {
                let released = SelectionRect::spanning(anchor, point);
                if released.is_selectable() {
                    let area = released.to_area();
                    (
                        SelectionState::Finished(area),
                        Some(SelectionOutcome::Finished(area)),
                    )
                } else {
                    (SelectionState::Cancelled, Some(SelectionOutcome::Cancelled))
                }
            }
            // A second button going down mid-drag.
            (SelectionState::Dragging { .. }, SelectionEvent::PointerDown(_)) => return None,
        };

        self.state = next;
        outcome
    }
}
