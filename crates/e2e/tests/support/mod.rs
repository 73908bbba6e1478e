//! In-memory page used by the integration tests
//!
//! Elements are keyed by their exact descriptor. Visibility is a time window
//! measured on the tokio clock, so tests run under paused time. Successful
//! actions fire the effects registered for their target.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use pagesync_common::{Descriptor, Driver, DriverError, UiAction};

#[derive(Debug, Clone)]
pub struct Element {
    pub text: String,
    pub visible_from: Option<Duration>,
    pub hidden_from: Option<Duration>,
    pub checkable: bool,
    pub checked: bool,
    pub count: usize,
    /// Actions this element refuses, in display form (`click`, `check(force)`)
    pub rejects: Vec<&'static str>,
}

impl Element {
    pub fn visible(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible_from: Some(Duration::ZERO),
            hidden_from: None,
            checkable: false,
            checked: false,
            count: 1,
            rejects: vec![],
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible_from: None,
            ..Self::visible("")
        }
    }

    pub fn checkbox() -> Self {
        Self {
            checkable: true,
            ..Self::visible("")
        }
    }

    pub fn shown_after(mut self, at: Duration) -> Self {
        self.visible_from = Some(at);
        self
    }

    pub fn gone_after(mut self, at: Duration) -> Self {
        self.hidden_from = Some(at);
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn rejecting(mut self, action: &'static str) -> Self {
        self.rejects.push(action);
        self
    }

    fn shown_at(&self, t: Duration) -> bool {
        self.visible_from.map_or(false, |from| t >= from)
            && self.hidden_from.map_or(true, |until| t < until)
    }
}

#[derive(Debug, Clone)]
pub enum Effect {
    Goto(String),
    /// Show `target` after a delay counted from the action
    Reveal(Descriptor, Duration),
    Hide(Descriptor),
    SetText(Descriptor, String),
}

#[derive(Default)]
struct PageState {
    url: String,
    elements: Vec<(Descriptor, Element)>,
    effects: Vec<(Descriptor, Effect)>,
    performed: Vec<(Descriptor, UiAction)>,
}

impl PageState {
    fn index_of(&self, target: &Descriptor) -> Option<usize> {
        self.elements.iter().position(|(d, _)| d == target)
    }

    fn element_mut(&mut self, target: &Descriptor) -> &mut Element {
        match self.index_of(target) {
            Some(i) => &mut self.elements[i].1,
            None => {
                self.elements.push((target.clone(), Element::hidden()));
                let last = self.elements.len() - 1;
                &mut self.elements[last].1
            }
        }
    }
}

pub struct ScriptedDriver {
    state: Mutex<PageState>,
    start: Instant,
}

impl ScriptedDriver {
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(PageState {
                url: url.to_string(),
                ..Default::default()
            }),
            start: Instant::now(),
        }
    }

    pub fn with(self, target: Descriptor, element: Element) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            *state.element_mut(&target) = element;
        }
        self
    }

    pub fn on(self, target: Descriptor, effect: Effect) -> Self {
        self.state.lock().unwrap().effects.push((target, effect));
        self
    }

    pub fn performed(&self) -> Vec<(Descriptor, UiAction)> {
        self.state.lock().unwrap().performed.clone()
    }

    pub fn text_of(&self, target: &Descriptor) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.index_of(target).map(|i| state.elements[i].1.text.clone())
    }

    pub fn checked(&self, target: &Descriptor) -> bool {
        let state = self.state.lock().unwrap();
        state
            .index_of(target)
            .map_or(false, |i| state.elements[i].1.checked)
    }

    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    /// Registered descriptor that `target` resolves to. Union candidates go in
    /// priority order: the first visible one, else the first registered one.
    fn resolve(&self, state: &PageState, target: &Descriptor) -> Option<Descriptor> {
        if state.index_of(target).is_some() {
            return Some(target.clone());
        }
        match target {
            Descriptor::AnyOf { candidates } => candidates
                .iter()
                .find_map(|c| self.resolve(state, c).filter(|d| self.present(state, d)))
                .or_else(|| candidates.iter().find_map(|c| self.resolve(state, c))),
            Descriptor::Nth { inner, index: 0 } => self.resolve(state, inner),
            _ => None,
        }
    }

    fn present(&self, state: &PageState, target: &Descriptor) -> bool {
        state
            .index_of(target)
            .map_or(false, |i| state.elements[i].1.shown_at(self.now()))
    }

    fn shown(&self, target: &Descriptor) -> Option<(Descriptor, Element)> {
        let state = self.state.lock().unwrap();
        let resolved = self.resolve(&state, target)?;
        let element = state.elements[state.index_of(&resolved)?].1.clone();
        element.shown_at(self.now()).then_some((resolved, element))
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn is_visible(&self, target: &Descriptor) -> bool {
        self.shown(target).is_some()
    }

    async fn read_text(&self, target: &Descriptor) -> Result<String, DriverError> {
        self.shown(target)
            .map(|(_, e)| e.text)
            .ok_or_else(|| DriverError::NotFound(target.to_string()))
    }

    async fn count(&self, target: &Descriptor) -> Result<usize, DriverError> {
        Ok(self.shown(target).map_or(0, |(_, e)| e.count))
    }

    async fn is_checked(&self, target: &Descriptor) -> Result<bool, DriverError> {
        self.shown(target)
            .map(|(_, e)| e.checked)
            .ok_or_else(|| DriverError::NotFound(target.to_string()))
    }

    async fn perform(&self, target: &Descriptor, action: &UiAction) -> Result<(), DriverError> {
        let (resolved, element) = self
            .shown(target)
            .ok_or_else(|| DriverError::NotFound(target.to_string()))?;
        let shown_as = action.to_string();
        if element.rejects.iter().any(|r| *r == shown_as) {
            return Err(DriverError::ActionFailed {
                action: action.to_string(),
                target: target.to_string(),
                reason: "element rejected the action".to_string(),
            });
        }

        let now = self.now();
        let mut state = self.state.lock().unwrap();
        state.performed.push((target.clone(), action.clone()));
        {
            let el = state.element_mut(&resolved);
            match action {
                UiAction::Fill { text } => el.text = text.clone(),
                UiAction::Check { .. } => el.checked = true,
                UiAction::Uncheck { .. } => el.checked = false,
                UiAction::Click { .. } if el.checkable => el.checked = !el.checked,
                UiAction::ScrollIntoView => return Ok(()),
                _ => {}
            }
        }

        let effects: Vec<Effect> = state
            .effects
            .iter()
            .filter(|(d, _)| *d == resolved || d == target)
            .map(|(_, e)| e.clone())
            .collect();
        for effect in effects {
            match effect {
                Effect::Goto(url) => state.url = url,
                Effect::Reveal(d, delay) => {
                    let el = state.element_mut(&d);
                    el.visible_from = Some(now + delay);
                    el.hidden_from = None;
                }
                Effect::Hide(d) => state.element_mut(&d).hidden_from = Some(now),
                Effect::SetText(d, text) => state.element_mut(&d).text = text,
            }
        }
        Ok(())
    }

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().url.clone())
    }
}
