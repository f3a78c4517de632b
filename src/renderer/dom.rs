//! Live tree helpers over `markup5ever_rcdom`
//!
//! The mounted study guide is an rcdom tree. `NodeExt` gives it the small
//! element API the renderer needs: attributes, classes, sibling and ancestor
//! navigation, text content and child replacement.

use markup5ever::{Attribute, LocalName, QualName, ns};
use markup5ever_rcdom::{Handle, Node, NodeData};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Element API over rcdom handles
pub trait NodeExt {
    /// Local tag name for elements
    fn tag_name(&self) -> Option<&str>;
    /// Whether this is an element with the given tag
    fn is_tag(&self, tag: &str) -> bool;
    /// Get an attribute value
    fn get_attribute(&self, name: &str) -> Option<String>;
    /// Set an attribute value, replacing an existing one
    fn set_attribute(&self, name: &str, value: &str);
    /// Remove an attribute, returning whether it was present
    fn remove_attribute(&self, name: &str) -> bool;
    /// Whether the attribute is present
    fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }
    /// The `id` attribute
    fn id(&self) -> Option<String> {
        self.get_attribute("id")
    }
    /// Class names
    fn classes(&self) -> Vec<String> {
        self.get_attribute("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
    /// Whether the element carries a class
    fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }
    /// Toggle a class, returning whether it is now present
    fn toggle_class(&self, class: &str) -> bool;
    /// Remove a class if present
    fn remove_class(&self, class: &str);

    fn parent_node(&self) -> Option<Handle>;
    fn next_element_sibling(&self) -> Option<Handle>;
    fn element_children(&self) -> Vec<Handle>;
    /// Elements below this node in document order
    fn descendant_elements(&self) -> Vec<Handle>;
    /// Whether `other` is this node or one of its descendants
    fn contains(&self, other: &Handle) -> bool;
    fn find_element_by_id(&self, id: &str) -> Option<Handle>;
    /// Concatenated text of all descendant text nodes
    fn text_content(&self) -> String;

    fn append_child(&self, child: Handle);
    /// Detach every child
    fn clear_children(&self);
    /// Move every child of `self` to the end of `target`
    fn move_children_to(&self, target: &Handle);
}

impl NodeExt for Handle {
    fn tag_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        }
    }

    fn is_tag(&self, tag: &str) -> bool {
        self.tag_name().is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    fn get_attribute(&self, name: &str) -> Option<String> {
        match &self.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|attr| attr.name.local.as_ref() == name)
                .map(|attr| attr.value.to_string()),
            _ => None,
        }
    }

    fn set_attribute(&self, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &self.data {
            let mut attrs = attrs.borrow_mut();
            if let Some(existing) = attrs.iter_mut().find(|a| a.name.local.as_ref() == name) {
                existing.value = value.to_string().into();
            } else {
                attrs.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(name)),
                    value: value.to_string().into(),
                });
            }
        }
    }

    fn remove_attribute(&self, name: &str) -> bool {
        match &self.data {
            NodeData::Element { attrs, .. } => {
                let mut attrs = attrs.borrow_mut();
                let before = attrs.len();
                attrs.retain(|a| a.name.local.as_ref() != name);
                attrs.len() != before
            }
            _ => false,
        }
    }

    fn toggle_class(&self, class: &str) -> bool {
        let mut classes = self.classes();
        let present = if let Some(pos) = classes.iter().position(|c| c == class) {
            classes.remove(pos);
            false
        } else {
            classes.push(class.to_string());
            true
        };
        if classes.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_attribute("class", &classes.join(" "));
        }
        present
    }

    fn remove_class(&self, class: &str) {
        if self.has_class(class) {
            self.toggle_class(class);
        }
    }

    fn parent_node(&self) -> Option<Handle> {
        let weak = self.parent.take();
        let parent = weak.as_ref().and_then(|w| w.upgrade());
        self.parent.set(weak);
        parent
    }

    fn next_element_sibling(&self) -> Option<Handle> {
        let parent = self.parent_node()?;
        let siblings = parent.children.borrow();
        let pos = siblings.iter().position(|s| Rc::ptr_eq(s, self))?;
        siblings[pos + 1..]
            .iter()
            .find(|s| s.tag_name().is_some())
            .cloned()
    }

    fn element_children(&self) -> Vec<Handle> {
        self.children
            .borrow()
            .iter()
            .filter(|c| c.tag_name().is_some())
            .cloned()
            .collect()
    }

    fn descendant_elements(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        let mut stack: Vec<Handle> = self.children.borrow().iter().rev().cloned().collect();
        while let Some(node) = stack.pop() {
            if node.tag_name().is_some() {
                out.push(node.clone());
            }
            stack.extend(node.children.borrow().iter().rev().cloned());
        }
        out
    }

    fn contains(&self, other: &Handle) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if Rc::ptr_eq(&node, self) {
                return true;
            }
            current = node.parent_node();
        }
        false
    }

    fn find_element_by_id(&self, id: &str) -> Option<Handle> {
        self.descendant_elements()
            .into_iter()
            .find(|el| el.get_attribute("id").as_deref() == Some(id))
    }

    fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(self, &mut text);
        text
    }

    fn append_child(&self, child: Handle) {
        child.parent.set(Some(Rc::downgrade(self)));
        self.children.borrow_mut().push(child);
    }

    fn clear_children(&self) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in &children {
            child.parent.set(None);
        }
    }

    fn move_children_to(&self, target: &Handle) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            target.append_child(child);
        }
    }
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// Create a detached element
pub fn create_element(tag: &str, attrs: &[(&str, &str)]) -> Handle {
    let attributes = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: QualName::new(None, ns!(html), LocalName::from(tag)),
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a detached text node
pub fn create_text(text: &str) -> Handle {
    Rc::new(Node {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// A small closed set of element patterns, enough for the control roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementMatcher {
    /// `tag[attr="value"]`
    TagAttr {
        tag: &'static str,
        attr: &'static str,
        value: &'static str,
    },
    /// `#id`
    Id(&'static str),
    /// `tag.class`
    TagClass {
        tag: &'static str,
        class: &'static str,
    },
}

impl ElementMatcher {
    /// Check if the matcher matches a node
    pub fn matches(&self, node: &Handle) -> bool {
        match *self {
            Self::TagAttr { tag, attr, value } => {
                node.is_tag(tag) && node.get_attribute(attr).as_deref() == Some(value)
            }
            Self::Id(id) => node.tag_name().is_some() && node.id().as_deref() == Some(id),
            Self::TagClass { tag, class } => node.is_tag(tag) && node.has_class(class),
        }
    }

    /// Closest inclusive ancestor of `target` matching, never leaving `boundary`
    pub fn closest(&self, target: &Handle, boundary: &Handle) -> Option<Handle> {
        if !boundary.contains(target) {
            return None;
        }
        let mut current = Some(target.clone());
        while let Some(node) = current {
            if self.matches(&node) {
                return Some(node);
            }
            if Rc::ptr_eq(&node, boundary) {
                return None;
            }
            current = node.parent_node();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (Handle, Handle, Handle, Handle) {
        let root = create_element("div", &[("id", "root")]);
        let heading = create_element("h2", &[("role", "button"), ("aria-expanded", "true")]);
        let controls = create_element("div", &[("class", "controls")]);
        let content = create_element("div", &[("class", "content")]);
        heading.append_child(create_text("Intro"));
        root.append_child(heading.clone());
        root.append_child(create_text("\n  "));
        root.append_child(controls.clone());
        root.append_child(content.clone());
        (root, heading, controls, content)
    }

    #[test]
    fn test_attributes() {
        let el = create_element("div", &[("id", "main")]);
        assert_eq!(el.id(), Some("main".to_string()));
        el.set_attribute("hidden", "");
        assert!(el.has_attribute("hidden"));
        assert!(el.remove_attribute("hidden"));
        assert!(!el.has_attribute("hidden"));
        assert!(!el.remove_attribute("hidden"));
    }

    #[test]
    fn test_toggle_class() {
        let el = create_element("div", &[("class", "container")]);
        assert!(el.toggle_class("dark"));
        assert_eq!(el.classes(), vec!["container", "dark"]);
        assert!(!el.toggle_class("dark"));
        assert_eq!(el.get_attribute("class"), Some("container".to_string()));
    }

    #[test]
    fn test_next_element_sibling_skips_text() {
        let (_root, heading, controls, content) = tree();
        let next = heading.next_element_sibling().unwrap();
        assert!(Rc::ptr_eq(&next, &controls));
        let third = next.next_element_sibling().unwrap();
        assert!(Rc::ptr_eq(&third, &content));
        assert!(content.next_element_sibling().is_none());
    }

    #[test]
    fn test_contains_and_closest() {
        let (root, heading, _controls, content) = tree();
        let text = heading.children.borrow()[0].clone();
        assert!(root.contains(&text));
        assert!(!content.contains(&heading));

        let matcher = ElementMatcher::TagAttr {
            tag: "h2",
            attr: "role",
            value: "button",
        };
        let found = matcher.closest(&text, &root).unwrap();
        assert!(Rc::ptr_eq(&found, &heading));
        assert!(matcher.closest(&content, &root).is_none());
    }

    #[test]
    fn test_text_content_and_find_by_id() {
        let (root, ..) = tree();
        assert_eq!(root.text_content(), "Intro\n  ");
        assert!(root.find_element_by_id("root").is_none());
        let nested = create_element("p", &[("id", "deep")]);
        root.element_children()[2].append_child(nested.clone());
        assert!(Rc::ptr_eq(&root.find_element_by_id("deep").unwrap(), &nested));
    }

    #[test]
    fn test_move_children() {
        let (root, ..) = tree();
        let target = create_element("section", &[]);
        root.move_children_to(&target);
        assert!(root.children.borrow().is_empty());
        assert_eq!(target.element_children().len(), 3);
        let first = target.element_children()[0].clone();
        assert!(Rc::ptr_eq(&first.parent_node().unwrap(), &target));
    }
}
