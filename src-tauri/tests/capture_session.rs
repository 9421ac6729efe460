//! End-to-end capture flow without a windowing system: session registry,
//! selection machines, the Escape binding, scale resolution and delivery
//! through the feed.

use lex_laboris_lib::capture::session::OverlayHost;
use lex_laboris_lib::capture::{
    publish_area, AreaFeed, CaptureArea, CaptureError, CaptureSessions, DisplayInfo, InputResult,
    OpenOutcome, Point, SelectionEvent, SelectionOutcome, SessionEnd,
};
use std::cell::{Cell, RefCell};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeScreens {
    open: RefCell<Vec<(String, DisplayInfo)>>,
    focus_calls: RefCell<usize>,
    escape_bound: Cell<bool>,
}

impl OverlayHost for FakeScreens {
    fn create_overlay(&self, label: &str, display: &DisplayInfo) -> Result<(), CaptureError> {
        self.open
            .borrow_mut()
            .push((label.to_string(), display.clone()));
        Ok(())
    }

    fn focus_overlay(&self, _label: &str) {
        *self.focus_calls.borrow_mut() += 1;
    }

    fn destroy_overlay(&self, label: &str) {
        self.open.borrow_mut().retain(|(l, _)| l != label);
    }

    fn bind_escape(&self) {
        self.escape_bound.set(true);
    }

    fn release_escape(&self) {
        self.escape_bound.set(false);
    }
}

fn display(x: f64, y: f64, w: f64, h: f64, scale: f64) -> DisplayInfo {
    DisplayInfo {
        name: None,
        bounds_x: x,
        bounds_y: y,
        bounds_width: w,
        bounds_height: h,
        scale_factor: scale,
    }
}

/// Four displays; the second one is a 2x panel to the right of the first.
fn four_displays() -> Vec<DisplayInfo> {
    vec![
        display(0.0, 0.0, 1920.0, 1080.0, 1.0),
        display(1920.0, 0.0, 1280.0, 800.0, 2.0),
        display(-1280.0, 0.0, 1280.0, 1024.0, 1.0),
        display(0.0, 1080.0, 1920.0, 1080.0, 1.25),
    ]
}

fn drag(
    sessions: &mut CaptureSessions,
    host: &FakeScreens,
    label: &str,
    from: (f64, f64),
    to: (f64, f64),
) -> InputResult {
    sessions.handle_input(host, label, SelectionEvent::PointerDown(Point::new(from.0, from.1)));
    sessions.handle_input(host, label, SelectionEvent::PointerMove(Point::new(to.0, to.1)));
    sessions.handle_input(host, label, SelectionEvent::PointerUp(Point::new(to.0, to.1)))
}


#[test]
fn four_displays_drag_on_the_second_delivers_physical_area() {
    let host = FakeScreens::default();
    let mut sessions = CaptureSessions::new();
    let feed = AreaFeed::new();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let _subscription = feed.subscribe(move |area| sink.lock().unwrap().push(area));

    let displays = four_displays();
    let outcome = sessions.open(&host, || Ok(displays.clone())).unwrap();
    assert!(matches!(outcome, OpenOutcome::Created(_)));
    assert!(host.escape_bound.get());

    let open = host.open.borrow().clone();
    assert_eq!(open.len(), 4);
    for ((_, shown), expected) in open.iter().zip(&displays) {
        assert_eq!(shown, expected, "each overlay covers its own display");
    }
    let second_bounds = open[1].1.physical_bounds();
    assert_eq!(
        second_bounds,
        CaptureArea {
            x: 3840,
            y: 0,
            width: 2560,
            height: 1600
        }
    );

    let second = open[1].0.clone();
    let result = drag(&mut sessions, &host, &second, (100.0, 100.0), (300.0, 250.0));
    let InputResult::Ended(end) = result else {
        panic!("drag should end the session, got {:?}", result);
    };
    assert_eq!(
        end.outcome,
        SelectionOutcome::Finished(CaptureArea {
            x: 100,
            y: 100,
            width: 200,
            height: 150
        })
    );
    assert!(host.open.borrow().is_empty(), "all overlays close together");
    assert!(!host.escape_bound.get());

    // Pointer released inside display 2: physical x 3840.. at scale 2.
    let SelectionOutcome::Finished(area) = end.outcome else {
        unreachable!();
    };
    let pointer = Point::new(3840.0 + 600.0, 500.0);
    assert_eq!(
        publish_area(&feed, &displays, Some(pointer), end.origin.as_ref(), area),
        1
    );
    assert_eq!(
        *delivered.lock().unwrap(),
        vec![CaptureArea {
            x: 200,
            y: 200,
            width: 400,
            height: 300
        }]
    );
}

#[test]
fn tiny_drag_cancels_the_session() {
    let host = FakeScreens::default();
    let mut sessions = CaptureSessions::new();

    sessions.open(&host, || Ok(four_displays())).unwrap();
    let label = host.open.borrow()[0].0.clone();

    let InputResult::Ended(end) = drag(&mut sessions, &host, &label, (10.0, 10.0), (12.0, 12.0))
    else {
        panic!("tiny drag should still end the session");
    };
    assert_eq!(end.outcome, SelectionOutcome::Cancelled);
    assert!(host.open.borrow().is_empty());
    assert!(!sessions.is_active());
    assert!(!host.escape_bound.get());
}

#[test]
fn escape_mid_drag_tears_down_every_overlay() {
    let host = FakeScreens::default();
    let mut sessions = CaptureSessions::new();
    sessions.open(&host, || Ok(four_displays())).unwrap();

    let first = host.open.borrow()[0].0.clone();
    let third = host.open.borrow()[2].0.clone();
    sessions.handle_input(&host, &first, SelectionEvent::PointerDown(Point::new(5.0, 5.0)));
    sessions.handle_input(&host, &first, SelectionEvent::PointerMove(Point::new(400.0, 300.0)));

    let result = sessions.handle_input(&host, &third, SelectionEvent::Escape);
    assert!(matches!(
        result,
        InputResult::Ended(SessionEnd {
            outcome: SelectionOutcome::Cancelled,
            ..
        })
    ));
    assert!(host.open.borrow().is_empty());
}

#[test]
fn global_cancel_ends_the_session() {
    let host = FakeScreens::default();
    let mut sessions = CaptureSessions::new();
    let id = sessions.open(&host, || Ok(four_displays())).unwrap().session();

    assert!(host.escape_bound.get());

    let end = sessions.cancel(&host).expect("active session");
    assert_eq!(end.session, id);
    assert_eq!(end.outcome, SelectionOutcome::Cancelled);
    assert!(host.open.borrow().is_empty());
    assert!(!host.escape_bound.get());
}

#[test]
fn trigger_during_a_session_only_refocuses() {
    let host = FakeScreens::default();
    let mut sessions = CaptureSessions::new();
    let id = sessions.open(&host, || Ok(four_displays())).unwrap().session();

    for _ in 0..3 {
        let outcome = sessions.open(&host, || Ok(four_displays())).unwrap();
        assert_eq!(outcome, OpenOutcome::Refocused(id));
    }
    assert_eq!(host.open.borrow().len(), 4);
    assert_eq!(*host.focus_calls.borrow(), 12);
}

#[test]
fn a_new_session_uses_fresh_labels() {
    let host = FakeScreens::default();
    let mut sessions = CaptureSessions::new();

    sessions.open(&host, || Ok(four_displays())).unwrap();
    let old_labels: Vec<String> = host.open.borrow().iter().map(|(l, _)| l.clone()).collect();
    sessions.cancel(&host);

    sessions.open(&host, || Ok(four_displays())).unwrap();
    for (label, _) in host.open.borrow().iter() {
        assert!(!old_labels.contains(label), "label {} was reused", label);
    }

    // Input addressed to the previous session's windows is ignored.
    assert_eq!(
        sessions.handle_input(&host, &old_labels[0], SelectionEvent::Escape),
        InputResult::Ignored
    );
    assert!(sessions.is_active());
}

#[test]
fn delivery_without_a_pointer_uses_the_overlay_display() {
    let feed = AreaFeed::new();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let _subscription = feed.subscribe(move |area| sink.lock().unwrap().push(area));

    let displays = four_displays();
    let area = CaptureArea {
        x: 101,
        y: 7,
        width: 9,
        height: 300,
    };
    publish_area(&feed, &displays, None, Some(&displays[3]), area);
    publish_area(&feed, &[], None, None, area);

    assert_eq!(
        *delivered.lock().unwrap(),
        vec![
            CaptureArea {
                x: 126,
                y: 9,
                width: 11,
                height: 375
            },
            area
        ]
    );
}

#[test]
fn pointer_display_wins_over_the_overlay_display() {
    let feed = AreaFeed::new();
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&delivered);
    let _subscription = feed.subscribe(move |area| sink.lock().unwrap().push(area));

    let displays = four_displays();
    let area = CaptureArea {
        x: 10,
        y: 10,
        width: 100,
        height: 100,
    };
    // Drawn on the 2x panel, released over the primary.
    publish_area(&feed, &displays, Some(Point::new(50.0, 50.0)), Some(&displays[1]), area);
    assert_eq!(*delivered.lock().unwrap(), vec![area]);
}

#[test]
fn nothing_is_published_once_the_subscription_is_gone() {
    let feed = AreaFeed::new();
    let subscription = feed.subscribe(|area| panic!("unexpected delivery: {:?}", area));
    drop(subscription);

    let area = CaptureArea {
        x: 0,
        y: 0,
        width: 50,
        height: 50,
    };
    assert_eq!(publish_area(&feed, &four_displays(), None, None, area), 0);
}
