//! Speech playback over a single global channel
//!
//! At most one utterance exists at a time. A request while speaking stops
//! the current utterance and starts nothing; requests are never queued.

use std::cell::RefCell;
use std::rc::Rc;

/// Text-to-speech capability of the host platform
#[cfg_attr(test, mockall::automock)]
pub trait SpeechSynthesizer {
    /// Start speaking `text`
    fn speak(&self, text: &str, locale: &str);
    /// Stop the current utterance, if any
    fn cancel(&self);
    /// Whether an utterance is in progress
    fn is_speaking(&self) -> bool;
}

/// Synthesizer that only logs, for headless use.
///
/// Reports itself as speaking from `speak` until `cancel`.
#[derive(Debug, Default)]
pub struct LoggingSynthesizer {
    current: RefCell<Option<String>>,
}

impl LoggingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpeechSynthesizer for LoggingSynthesizer {
    fn speak(&self, text: &str, locale: &str) {
        log::info!("speaking {} chars ({})", text.chars().count(), locale);
        *self.current.borrow_mut() = Some(text.to_string());
    }

    fn cancel(&self) {
        if self.current.borrow_mut().take().is_some() {
            log::info!("speech cancelled");
        }
    }

    fn is_speaking(&self) -> bool {
        self.current.borrow().is_some()
    }
}

/// Outcome of a listen request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// A new utterance started for the section
    Started(String),
    /// The running utterance was cancelled
    Stopped,
    /// Nothing to say
    Idle,
}

struct ChannelState {
    synthesizer: Box<dyn SpeechSynthesizer>,
    section: Option<String>,
}

/// Cloneable handle to the one speech channel of the process
#[derive(Clone)]
pub struct SpeechChannel {
    inner: Rc<RefCell<ChannelState>>,
}

impl SpeechChannel {
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelState {
                synthesizer,
                section: None,
            })),
        }
    }

    /// Stop if speaking, otherwise speak `text` for `section`
    pub fn toggle(&self, section: &str, text: &str, locale: &str) -> Playback {
        let mut state = self.inner.borrow_mut();
        if state.synthesizer.is_speaking() {
            state.synthesizer.cancel();
            state.section = None;
            log::debug!("listen on {} stopped current playback", section);
            return Playback::Stopped;
        }
        if text.trim().is_empty() {
            state.section = None;
            return Playback::Idle;
        }
        state.synthesizer.speak(text, locale);
        state.section = Some(section.to_string());
        log::debug!("playing section {}", section);
        Playback::Started(section.to_string())
    }

    /// Section being played, if the synthesizer is still speaking
    pub fn playing(&self) -> Option<String> {
        let state = self.inner.borrow();
        if state.synthesizer.is_speaking() {
            state.section.clone()
        } else {
            None
        }
    }

    /// Cancel any running utterance
    pub fn stop(&self) {
        let mut state = self.inner.borrow_mut();
        if state.synthesizer.is_speaking() {
            state.synthesizer.cancel();
        }
        state.section = None;
    }
}
