//! Host page and mount point
//!
//! The host page is the surrounding application page: navigation chrome plus
//! one element the study guide is mounted into. Its head is modelled by the
//! injectable `StyleRegistry`.

use super::events::{Event, EventDispatcher, run_handlers};
use crate::renderer::dom::{NodeExt, create_element, create_text};
use crate::renderer::html::{HtmlParser, find_body, find_head, serialize_document};
use crate::renderer::StyleRegistry;
use crate::utils::Result;
use markup5ever_rcdom::{Handle, RcDom};
use std::cell::{Ref, RefCell, RefMut};

const SKELETON: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Apostila</title></head>
<body><nav class="app-nav"><a href="/">Home</a> <a href="/apostilas">Library</a></nav>
<main class="app-main"></main></body></html>"#;

/// Element a document is mounted into, with its listener set
pub struct MountPoint {
    node: Handle,
    events: RefCell<EventDispatcher>,
}

impl MountPoint {
    /// Wrap an element as a mount point
    pub fn new(node: Handle) -> Self {
        Self {
            node,
            events: RefCell::new(EventDispatcher::new()),
        }
    }

    /// The container element
    pub fn node(&self) -> &Handle {
        &self.node
    }

    pub fn events(&self) -> Ref<'_, EventDispatcher> {
        self.events.borrow()
    }

    pub fn events_mut(&self) -> RefMut<'_, EventDispatcher> {
        self.events.borrow_mut()
    }

    /// Deliver an event fired inside the container.
    ///
    /// Events whose target lies outside the container are ignored. Handlers
    /// are cloned out of the dispatcher first so they may re-enter it.
    pub fn dispatch(&self, event: &mut Event) {
        if !self.node.contains(&event.target) {
            return;
        }
        let handlers = self.events.borrow().handlers(event.event_type);
        run_handlers(&handlers, event);
    }
}

/// The page hosting the renderer
pub struct HostPage {
    dom: RcDom,
    mount: Handle,
    styles: RefCell<StyleRegistry>,
}

impl HostPage {
    /// Build the page skeleton with an empty mount element
    pub fn new() -> Self {
        let dom = HtmlParser::new().parse(SKELETON);
        let mount = create_element("div", &[("id", "apostila-root")]);
        let main = dom
            .document
            .descendant_elements()
            .into_iter()
            .find(|el| el.is_tag("main"))
            .or_else(|| find_body(&dom.document));
        match main {
            Some(main) => main.append_child(mount.clone()),
            None => dom.document.append_child(mount.clone()),
        }
        Self {
            dom,
            mount,
            styles: RefCell::new(StyleRegistry::new()),
        }
    }

    /// The mount element
    pub fn mount_node(&self) -> &Handle {
        &self.mount
    }

    /// Root of the whole page
    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn styles(&self) -> Ref<'_, StyleRegistry> {
        self.styles.borrow()
    }

    pub fn styles_mut(&self) -> RefMut<'_, StyleRegistry> {
        self.styles.borrow_mut()
    }

    /// Serialize the page with every installed style placed in its head.
    ///
    /// The style elements only exist for the duration of the call, so the
    /// registry stays the single record of what is installed.
    pub fn render(&self) -> Result<String> {
        let Some(head) = find_head(&self.dom.document) else {
            return serialize_document(&self.dom);
        };
        let before = head.children.borrow().len();
        for style in self.styles.borrow().iter() {
            let element = create_element("style", &[("id", &style.id)]);
            element.append_child(create_text(&style.css));
            head.append_child(element);
        }
        let page = serialize_document(&self.dom);
        let injected: Vec<Handle> = head.children.borrow_mut().drain(before..).collect();
        for element in &injected {
            element.parent.set(None);
        }
        page
    }
}

impl Default for HostPage {
    fn default() -> Self {
        Self::new()
    }
}
