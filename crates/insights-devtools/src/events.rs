//! Window events
//!
//! Pointer, resize and error events delivered to window listeners, with
//! capture/bubble phases.

use std::rc::Rc;

use crate::value::ScriptError;

/// Event types a window listener can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PointerMove,
    Resize,
    Error,
}

/// Listener phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    Capture,
    #[default]
    Bubble,
}

/// Element or object an event was fired at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    Window,
    Image { src: String },
    Script { src: String },
    Element { tag: String },
}

/// Error event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub target: EventTarget,
    pub message: String,
    pub error: Option<ScriptError>,
}

impl ErrorEvent {
    /// Resource failure on an `<img>`; carries no error object
    pub fn image_load_failed(src: impl Into<String>) -> Self {
        Self {
            target: EventTarget::Image { src: src.into() },
            message: String::new(),
            error: None,
        }
    }

    /// Uncaught script error reported on the window
    pub fn uncaught(error: ScriptError) -> Self {
        Self {
            target: EventTarget::Window,
            message: error.to_string(),
            error: Some(error),
        }
    }
}

/// Window event
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    PointerMove { x: f64, y: f64 },
    Resize { width: u32, height: u32 },
    Error(ErrorEvent),
}

impl WindowEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            WindowEvent::PointerMove { .. } => EventType::PointerMove,
            WindowEvent::Resize { .. } => EventType::Resize,
            WindowEvent::Error(_) => EventType::Error,
        }
    }

    /// Whether bubble-phase window listeners see this event.
    /// Element resource errors do not bubble; everything targeting the
    /// window itself is delivered at-target.
    pub fn reaches_bubble_listeners(&self) -> bool {
        match self {
            WindowEvent::Error(e) => e.target == EventTarget::Window,
            _ => true,
        }
    }
}

pub type Listener = Rc<dyn Fn(&WindowEvent)>;

/// Handle for removing a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    event_type: EventType,
    phase: Phase,
    listener: Listener,
}

/// Registered listeners in registration order
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    entries: Vec<Entry>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, event_type: EventType, phase: Phase, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(Entry {
            id,
            event_type,
            phase,
            listener,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Listeners to invoke for `event`, capture phase first
    pub(crate) fn route(&self, event: &WindowEvent) -> Vec<Listener> {
        let event_type = event.event_type();
        let matching = |phase: Phase| {
            self.entries
                .iter()
                .filter(move |e| e.event_type == event_type && e.phase == phase)
                .map(|e| e.listener.clone())
        };

        let mut route: Vec<Listener> = matching(Phase::Capture).collect();
        if event.reaches_bubble_listeners() {
            route.extend(matching(Phase::Bubble));
        }
        route
    }
}
