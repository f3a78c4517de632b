//! Event model for the mounted container
//!
//! Events carry the node they were fired on. A container owns one
//! `EventDispatcher`; listeners are registered with an id so the same
//! binding can be removed on unmount.

use markup5ever_rcdom::Handle;
use std::collections::HashMap;
use std::rc::Rc;

/// Event types the container listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    KeyDown,
    TouchStart,
}

/// Keyboard event data
#[derive(Debug, Clone, Default)]
pub struct KeyboardEvent {
    pub key: String,
}

/// Unified event data
#[derive(Debug, Clone)]
pub enum EventData {
    Pointer,
    Keyboard(KeyboardEvent),
    Touch,
}

/// A DOM event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: EventType,
    pub data: EventData,
    /// Node the event was fired on
    pub target: Handle,
    pub cancelable: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl Event {
    /// Create a new event
    pub fn new(event_type: EventType, data: EventData, target: Handle) -> Self {
        Self {
            event_type,
            data,
            target,
            cancelable: true,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Create a click event
    pub fn click(target: &Handle) -> Self {
        Self::new(EventType::Click, EventData::Pointer, target.clone())
    }

    /// Create a key down event
    pub fn key_down(target: &Handle, key: &str) -> Self {
        Self::new(
            EventType::KeyDown,
            EventData::Keyboard(KeyboardEvent { key: key.to_string() }),
            target.clone(),
        )
    }

    /// Create a touch start event
    pub fn touch_start(target: &Handle) -> Self {
        Self::new(EventType::TouchStart, EventData::Touch, target.clone())
    }

    /// Key of a keyboard event
    pub fn key(&self) -> Option<&str> {
        match &self.data {
            EventData::Keyboard(kbd) => Some(kbd.key.as_str()),
            _ => None,
        }
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    /// Stop event propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

/// Event handler callback type
pub type EventHandler = Rc<dyn Fn(&mut Event)>;

/// Identifies one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event listener registration
struct EventListener {
    id: ListenerId,
    handler: EventHandler,
    capture: bool,
}

/// Event dispatcher for one container
pub struct EventDispatcher {
    listeners: HashMap<EventType, Vec<EventListener>>,
    next_id: u64,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 1,
        }
    }

    /// Add an event listener
    pub fn add_listener(&mut self, event_type: EventType, handler: EventHandler, capture: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(event_type)
            .or_default()
            .push(EventListener { id, handler, capture });
        id
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let mut removed = false;
        for listeners in self.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.id != id);
            removed |= listeners.len() != before;
        }
        removed
    }

    /// Handlers for an event type: capture listeners first, then bubble listeners
    pub fn handlers(&self, event_type: EventType) -> Vec<EventHandler> {
        let Some(listeners) = self.listeners.get(&event_type) else {
            return Vec::new();
        };
        listeners
            .iter()
            .filter(|l| l.capture)
            .chain(listeners.iter().filter(|l| !l.capture))
            .map(|l| Rc::clone(&l.handler))
            .collect()
    }

    /// Get listener count for an event type
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners.get(&event_type).map(|l| l.len()).unwrap_or(0)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Run handlers in order until one stops propagation
pub fn run_handlers(handlers: &[EventHandler], event: &mut Event) {
    for handler in handlers {
        if event.propagation_stopped {
            return;
        }
        handler(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::dom::create_element;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_event_creation() {
        let target = create_element("button", &[]);
        let event = Event::click(&target);
        assert_eq!(event.event_type, EventType::Click);
        assert!(event.cancelable);
        assert!(!event.default_prevented);
        assert_eq!(Event::key_down(&target, " ").key(), Some(" "));
    }

    #[test]
    fn test_only_keyboard_events_carry_a_key() {
        let target = create_element("div", &[]);
        assert_eq!(Event::key_down(&target, "Enter").key(), Some("Enter"));
        let touch = Event::touch_start(&target);
        assert!(matches!(touch.data, EventData::Touch));
        assert_eq!(touch.key(), None);
        assert_eq!(Event::click(&target).key(), None);
    }

    #[test]
    fn test_prevent_default_respects_cancelable() {
        let target = create_element("button", &[]);
        let mut event = Event::click(&target);
        event.cancelable = false;
        event.prevent_default();
        assert!(!event.default_prevented);
    }

    #[test]
    fn test_capture_runs_before_bubble_and_stops() {
        let mut dispatcher = EventDispatcher::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = Rc::clone(&order);
        dispatcher.add_listener(EventType::Click, Rc::new(move |_| o.borrow_mut().push("bubble")), false);
        let o = Rc::clone(&order);
        dispatcher.add_listener(
            EventType::Click,
            Rc::new(move |e| {
                o.borrow_mut().push("capture");
                e.stop_propagation();
            }),
            true,
        );

        let target = create_element("div", &[]);
        let mut event = Event::click(&target);
        run_handlers(&dispatcher.handlers(EventType::Click), &mut event);
        assert_eq!(*order.borrow(), vec!["capture"]);
    }

    #[test]
    fn test_remove_listener() {
        let mut dispatcher = EventDispatcher::new();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let id = dispatcher.add_listener(EventType::KeyDown, Rc::new(move |_| c.set(c.get() + 1)), true);
        assert_eq!(dispatcher.listener_count(EventType::KeyDown), 1);
        assert!(dispatcher.remove_listener(id));
        assert!(!dispatcher.remove_listener(id));
        assert_eq!(dispatcher.listener_count(EventType::KeyDown), 0);
        assert!(dispatcher.handlers(EventType::KeyDown).is_empty());
        assert_eq!(calls.get(), 0);
    }
}
