//! Delegated interaction handling for a mounted study guide
//!
//! One capture listener per event type is bound to the container. Clicks are
//! resolved against a fixed table of control roles by closest-ancestor
//! matching; keys and touches only drive section headings. Every command
//! works on the live tree and never fails loudly: a broken document makes
//! the command a no-op.

use super::events::{Event, EventType, ListenerId};
use super::host::MountPoint;
use super::speech::{Playback, SpeechChannel};
use crate::config::RendererConfig;
use crate::renderer::css::{InlineStyle, parse_scale};
use crate::renderer::dom::{ElementMatcher, NodeExt};
use crate::renderer::section::{
    EXPANDED_ATTR, SECTION_REF_ATTR, TOGGLE_HEADING, content_block, find_section, is_expanded,
    section_heading,
};
use crate::renderer::StyleRegistry;
use crate::utils::{ApostilaError, Result};
use markup5ever_rcdom::Handle;
use std::rc::Rc;

/// Controls the container responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRole {
    SectionToggle,
    ThemeToggle,
    FontIncrease,
    FontDecrease,
    Listen,
}

/// Click dispatch table, checked in order
const CONTROL_TABLE: [(ControlRole, ElementMatcher); 5] = [
    (ControlRole::SectionToggle, TOGGLE_HEADING),
    (ControlRole::ThemeToggle, ElementMatcher::Id("toggle-theme")),
    (ControlRole::FontIncrease, ElementMatcher::Id("font-increase")),
    (ControlRole::FontDecrease, ElementMatcher::Id("font-decrease")),
    (
        ControlRole::Listen,
        ElementMatcher::TagClass {
            tag: "button",
            class: "ouvir",
        },
    ),
];

/// Current theme of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// Direction of a font step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStep {
    Up,
    Down,
}

/// Ephemeral per-mount state, derived from the live tree
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub theme: Theme,
    pub font_scale: f32,
    /// Section whose text is being spoken
    pub playing: Option<String>,
}

/// Result of one dispatched command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Section toggled; carries the new expanded state
    Toggled(bool),
    /// Toggle ignored because the content block is missing
    Skipped,
    Theme(Theme),
    FontScale(f32),
    Playback(Playback),
}

/// Commands shared by the listeners and the programmatic API
struct Commands {
    container: Handle,
    config: Rc<RendererConfig>,
    speech: SpeechChannel,
}

impl Commands {
    fn resolve_click(&self, target: &Handle) -> Option<(ControlRole, Handle)> {
        CONTROL_TABLE.iter().find_map(|(role, matcher)| {
            matcher
                .closest(target, &self.container)
                .map(|element| (*role, element))
        })
    }

    fn run(&self, role: ControlRole, element: &Handle) -> CommandOutcome {
        match role {
            ControlRole::SectionToggle => self.toggle_heading(element),
            ControlRole::ThemeToggle => CommandOutcome::Theme(self.toggle_theme()),
            ControlRole::FontIncrease => CommandOutcome::FontScale(self.step_font(FontStep::Up)),
            ControlRole::FontDecrease => CommandOutcome::FontScale(self.step_font(FontStep::Down)),
            ControlRole::Listen => {
                let key = element.get_attribute(SECTION_REF_ATTR).unwrap_or_default();
                match self.listen(&key) {
                    Ok(playback) => CommandOutcome::Playback(playback),
                    Err(e) => {
                        log::warn!("listen control ignored: {}", e);
                        CommandOutcome::Playback(Playback::Idle)
                    }
                }
            }
        }
    }

    fn toggle_heading(&self, heading: &Handle) -> CommandOutcome {
        let Some(content) = content_block(heading) else {
            log::warn!("toggle heading has no content block, ignoring");
            return CommandOutcome::Skipped;
        };
        let expanded = is_expanded(heading);
        heading.set_attribute(EXPANDED_ATTR, if expanded { "false" } else { "true" });
        if expanded {
            content.set_attribute("hidden", "");
        } else {
            content.remove_attribute("hidden");
        }
        log::debug!("section {} now expanded: {}", heading.text_content().trim(), !expanded);
        CommandOutcome::Toggled(!expanded)
    }

    fn toggle_theme(&self) -> Theme {
        let theme = if self.container.toggle_class(&self.config.theme_class) {
            Theme::Dark
        } else {
            Theme::Light
        };
        log::debug!("theme switched to {:?}", theme);
        theme
    }

    fn font_scale(&self) -> f32 {
        self.container
            .get_attribute("style")
            .map(|s| InlineStyle::parse(&s))
            .and_then(|style| style.get(&self.config.font_property).and_then(parse_scale))
            .filter(|scale| scale.is_finite() && *scale > 0.0)
            .unwrap_or(1.0)
    }

    fn step_font(&self, step: FontStep) -> f32 {
        let current = self.font_scale();
        let next = match step {
            FontStep::Up => current + self.config.font_step,
            FontStep::Down => (current - self.config.font_step).max(self.config.font_step),
        };
        let next = (next * 10_000.0).round() / 10_000.0;

        let mut style = self
            .container
            .get_attribute("style")
            .map(|s| InlineStyle::parse(&s))
            .unwrap_or_default();
        style.set(&self.config.font_property, &format!("{next}{}", self.config.font_unit));
        self.container.set_attribute("style", &style.to_css_string());
        log::debug!("font scale {} -> {}", current, next);
        next
    }

    fn listen(&self, key: &str) -> Result<Playback> {
        let text = if key.is_empty() {
            None
        } else {
            find_section(&self.container, key).map(|section| section.text_content())
        };
        let playback = self
            .speech
            .toggle(key, text.as_deref().unwrap_or(""), &self.config.speech_locale);
        if playback == Playback::Idle && text.is_none() {
            return Err(ApostilaError::SectionNotFound(key.to_string()));
        }
        Ok(playback)
    }

    fn state(&self) -> ViewerState {
        ViewerState {
            theme: if self.container.has_class(&self.config.theme_class) {
                Theme::Dark
            } else {
                Theme::Light
            },
            font_scale: self.font_scale(),
            playing: self.speech.playing(),
        }
    }
}

fn on_click(commands: &Commands, event: &mut Event) {
    let Some((role, element)) = commands.resolve_click(&event.target) else {
        return;
    };
    event.prevent_default();
    if role == ControlRole::SectionToggle {
        event.stop_propagation();
    }
    log::debug!("dispatching {:?}", role);
    commands.run(role, &element);
}

fn on_key_down(commands: &Commands, event: &mut Event) {
    let Some(heading) = TOGGLE_HEADING.closest(&event.target, &commands.container) else {
        return;
    };
    if matches!(event.key(), Some("Enter") | Some(" ")) {
        event.prevent_default();
        event.stop_propagation();
        commands.toggle_heading(&heading);
    }
}

fn on_touch_start(commands: &Commands, event: &mut Event) {
    let Some(heading) = TOGGLE_HEADING.closest(&event.target, &commands.container) else {
        return;
    };
    event.prevent_default();
    event.stop_propagation();
    commands.toggle_heading(&heading);
}

/// Stylesheet installed once per page for control buttons and font scaling
fn runtime_stylesheet(config: &RendererConfig) -> String {
    format!(
        ".controls button, button.ouvir {{ display: inline-flex; align-items: center; gap: 0.25rem; \
         background: #e5e7eb; color: #111827; border: 1px solid #d1d5db; padding: 0.25rem 0.5rem; \
         border-radius: 6px; cursor: pointer; }}\n\
         .controls button:hover, button.ouvir:hover {{ background: #dbe0e6; }}\n\
         {} {{ font-size: var({}, 1{}) !important; }}",
        config.container_selector(),
        config.font_property,
        config.font_unit
    )
}

/// Delegated handler set bound to one mount.
///
/// Dropping the controller removes its listeners.
pub struct InteractionController {
    mount: Rc<MountPoint>,
    commands: Rc<Commands>,
    listeners: Vec<ListenerId>,
}

impl InteractionController {
    /// Bind the click, key and touch listeners to `mount`
    pub fn attach(
        mount: Rc<MountPoint>,
        config: Rc<RendererConfig>,
        speech: SpeechChannel,
        styles: &mut StyleRegistry,
    ) -> Self {
        if styles.install(config.runtime_style_id.clone(), runtime_stylesheet(&config)) {
            log::debug!("runtime stylesheet installed");
        }

        let commands = Rc::new(Commands {
            container: mount.node().clone(),
            config,
            speech,
        });

        let mut listeners = Vec::with_capacity(3);
        {
            let mut events = mount.events_mut();
            let c = Rc::clone(&commands);
            listeners.push(events.add_listener(EventType::Click, Rc::new(move |e| on_click(&c, e)), true));
            let c = Rc::clone(&commands);
            listeners.push(events.add_listener(EventType::KeyDown, Rc::new(move |e| on_key_down(&c, e)), true));
            let c = Rc::clone(&commands);
            listeners.push(events.add_listener(
                EventType::TouchStart,
                Rc::new(move |e| on_touch_start(&c, e)),
                true,
            ));
        }
        log::debug!("interaction controller attached");

        Self {
            mount,
            commands,
            listeners,
        }
    }

    /// Remove the listeners; same as dropping
    pub fn detach(self) {}

    /// Toggle the section with the given key
    pub fn toggle_section(&self, key: &str) -> Result<CommandOutcome> {
        let heading = find_section(&self.commands.container, key)
            .and_then(|section| section_heading(&section))
            .ok_or_else(|| ApostilaError::SectionNotFound(key.to_string()))?;
        Ok(self.commands.toggle_heading(&heading))
    }

    pub fn toggle_theme(&self) -> Theme {
        self.commands.toggle_theme()
    }

    /// Step the font scale and return the new value
    pub fn step_font(&self, step: FontStep) -> f32 {
        self.commands.step_font(step)
    }

    /// Start or stop speaking the section with the given key
    pub fn listen(&self, key: &str) -> Result<Playback> {
        self.commands.listen(key)
    }

    /// Control role an element would trigger when clicked
    pub fn role_of(&self, target: &Handle) -> Option<ControlRole> {
        self.commands.resolve_click(target).map(|(role, _)| role)
    }

    pub fn state(&self) -> ViewerState {
        self.commands.state()
    }
}

impl Drop for InteractionController {
    fn drop(&mut self) {
        let mut events = self.mount.events_mut();
        for id in self.listeners.drain(..) {
            events.remove_listener(id);
        }
        log::debug!("interaction controller detached");
    }
}
