//! Scripted in-memory page.
//!
//! Elements are addressed by the exact selector strings and path expressions
//! listed in the fixture. Structural queries that look like path expressions
//! are rejected with a syntax error and vice versa, which mirrors how a real
//! selector engine and a path evaluator disagree about the same string.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::{DomEvent, ElementRef, PageDriver, PageError, PageErrorKind, ScrollAlign};

/// Serializable description of a fixture page.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FixtureSpec {
    #[serde(default = "default_url")]
    pub url: String,

    /// Time between a navigation request and the page reporting loaded.
    #[serde(default)]
    pub load_latency_ms: u64,

    /// When set, navigations never finish loading.
    #[serde(default)]
    pub stalls_navigation: bool,

    #[serde(default)]
    pub elements: Vec<FixtureElement>,
}

fn default_url() -> String {
    "about:blank".to_string()
}

impl FixtureSpec {
    pub fn from_yaml(source: &str) -> Result<Self, PageError> {
        serde_yaml::from_str(source).map_err(invalid_fixture)
    }

    pub fn from_json(source: &str) -> Result<Self, PageError> {
        serde_json::from_str(source).map_err(invalid_fixture)
    }
}

fn invalid_fixture(err: impl std::fmt::Display) -> PageError {
    PageError::new(PageErrorKind::Internal).with_hint(format!("invalid fixture: {err}"))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureElement {
    pub id: String,

    #[serde(default)]
    pub selectors: Vec<String>,

    #[serde(default)]
    pub paths: Vec<String>,

    #[serde(default)]
    pub value: String,

    /// Allowed values for select-like elements. Empty accepts anything.
    #[serde(default)]
    pub options: Vec<String>,

    /// Element only exists this long after the page was created.
    #[serde(default)]
    pub appears_after_ms: Option<u64>,

    #[serde(default)]
    pub disabled: bool,
}

impl FixtureElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selectors: Vec::new(),
            paths: Vec::new(),
            value: String::new(),
            options: Vec::new(),
            appears_after_ms: None,
            disabled: false,
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn appears_after_ms(mut self, ms: u64) -> Self {
        self.appears_after_ms = Some(ms);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Everything the engine did to the page, in order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageInteraction {
    Navigated { url: String },
    ValueSet { element: String, value: String },
    Event { element: String, event: DomEvent },
    Scrolled { element: String, align: ScrollAlign },
    Activated { element: String },
}

struct FixtureState {
    url: String,
    elements: Vec<FixtureElement>,
    loaded_at: Option<Instant>,
    interactions: Vec<PageInteraction>,
}

pub struct FixturePage {
    created_at: Instant,
    load_latency: Duration,
    stalls_navigation: bool,
    state: Mutex<FixtureState>,
}

impl FixturePage {
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_spec(FixtureSpec {
            url: url.into(),
            ..FixtureSpec::default()
        })
    }

    pub fn from_spec(spec: FixtureSpec) -> Self {
        let now = Instant::now();
        Self {
            created_at: now,
            load_latency: Duration::from_millis(spec.load_latency_ms),
            stalls_navigation: spec.stalls_navigation,
            state: Mutex::new(FixtureState {
                url: spec.url,
                elements: spec.elements,
                loaded_at: Some(now),
                interactions: Vec::new(),
            }),
        }
    }

    pub fn with_element(self, element: FixtureElement) -> Self {
        self.state.lock().elements.push(element);
        self
    }

    pub fn with_load_latency_ms(mut self, ms: u64) -> Self {
        self.load_latency = Duration::from_millis(ms);
        self
    }

    pub fn stalling_navigation(mut self) -> Self {
        self.stalls_navigation = true;
        self
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    pub fn interactions(&self) -> Vec<PageInteraction> {
        self.state.lock().interactions.clone()
    }

    pub fn value_of(&self, element_id: &str) -> Option<String> {
        self.state
            .lock()
            .elements
            .iter()
            .find(|el| el.id == element_id)
            .map(|el| el.value.clone())
    }

    pub fn activations(&self, element_id: &str) -> usize {
        self.state
            .lock()
            .interactions
            .iter()
            .filter(|i| matches!(i, PageInteraction::Activated { element } if element == element_id))
            .count()
    }

    pub fn events_for(&self, element_id: &str) -> Vec<DomEvent> {
        self.state
            .lock()
            .interactions
            .iter()
            .filter_map(|i| match i {
                PageInteraction::Event { element, event } if element == element_id => Some(*event),
                _ => None,
            })
            .collect()
    }

    fn is_present(&self, element: &FixtureElement) -> bool {
        match element.appears_after_ms {
            Some(ms) => self.created_at.elapsed() >= Duration::from_millis(ms),
            None => true,
        }
    }

    fn find<F>(&self, predicate: F) -> Option<ElementRef>
    where
        F: Fn(&FixtureElement) -> bool,
    {
        let state = self.state.lock();
        state
            .elements
            .iter()
            .filter(|el| self.is_present(el))
            .find(|el| predicate(el))
            .map(|el| ElementRef::new(el.id.clone()))
    }

    fn with_element_mut<T, F>(&self, element: &ElementRef, f: F) -> Result<T, PageError>
    where
        F: FnOnce(&mut FixtureElement) -> Result<T, PageError>,
    {
        let mut state = self.state.lock();
        let target = state
            .elements
            .iter_mut()
            .find(|el| el.id == element.node_id)
            .ok_or_else(|| {
                PageError::new(PageErrorKind::Detached).with_hint(element.node_id.clone())
            })?;
        f(target)
    }

    fn record(&self, interaction: PageInteraction) {
        self.state.lock().interactions.push(interaction);
    }
}

fn looks_like_path(expression: &str) -> bool {
    expression.starts_with('/') || expression.starts_with("./") || expression.starts_with('(')
}

fn has_balanced_brackets(selector: &str) -> bool {
    let mut depth: i32 = 0;
    for ch in selector.chars() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    depth == 0
}

#[async_trait]
impl PageDriver for FixturePage {
    async fn query_structural(&self, selector: &str) -> Result<Option<ElementRef>, PageError> {
        let selector = selector.trim();
        if selector.is_empty() || looks_like_path(selector) || !has_balanced_brackets(selector) {
            return Err(PageError::new(PageErrorKind::QuerySyntax)
                .with_hint(format!("'{selector}' is not a valid selector")));
        }
        Ok(self.find(|el| el.selectors.iter().any(|s| s == selector)))
    }

    async fn query_path(&self, expression: &str) -> Result<Option<ElementRef>, PageError> {
        let expression = expression.trim();
        if !looks_like_path(expression) {
            return Err(PageError::new(PageErrorKind::QuerySyntax)
                .with_hint(format!("'{expression}' is not a valid path expression")));
        }
        Ok(self.find(|el| el.paths.iter().any(|p| p == expression)))
    }

    async fn set_value(&self, element: &ElementRef, value: &str) -> Result<(), PageError> {
        self.with_element_mut(element, |el| {
            if el.disabled {
                return Err(PageError::new(PageErrorKind::NotInteractable)
                    .with_hint(format!("{} is disabled", el.id)));
            }
            if !el.options.is_empty() && !el.options.iter().any(|opt| opt == value) {
                return Err(PageError::new(PageErrorKind::NotInteractable)
                    .with_hint(format!("option '{}' not offered by {}", value, el.id)));
            }
            el.value = value.to_string();
            Ok(())
        })?;
        self.record(PageInteraction::ValueSet {
            element: element.node_id.clone(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn dispatch_event(
        &self,
        element: &ElementRef,
        event: DomEvent,
    ) -> Result<(), PageError> {
        self.with_element_mut(element, |_| Ok(()))?;
        self.record(PageInteraction::Event {
            element: element.node_id.clone(),
            event,
        });
        Ok(())
    }

    async fn scroll_into_view(
        &self,
        element: &ElementRef,
        align: ScrollAlign,
    ) -> Result<(), PageError> {
        self.with_element_mut(element, |_| Ok(()))?;
        self.record(PageInteraction::Scrolled {
            element: element.node_id.clone(),
            align,
        });
        Ok(())
    }

    async fn activate(&self, element: &ElementRef) -> Result<(), PageError> {
        self.with_element_mut(element, |el| {
            if el.disabled {
                Err(PageError::new(PageErrorKind::NotInteractable)
                    .with_hint(format!("{} is disabled", el.id)))
            } else {
                Ok(())
            }
        })?;
        self.record(PageInteraction::Activated {
            element: element.node_id.clone(),
        });
        Ok(())
    }

    async fn set_location(&self, url: &str) -> Result<(), PageError> {
        if url.trim().is_empty() {
            return Err(PageError::new(PageErrorKind::Navigation).with_hint("empty url"));
        }
        let mut state = self.state.lock();
        state.url = url.to_string();
        state.loaded_at = if self.stalls_navigation {
            None
        } else {
            Some(Instant::now() + self.load_latency)
        };
        state.interactions.push(PageInteraction::Navigated {
            url: url.to_string(),
        });
        debug!(url, "fixture navigation requested");
        Ok(())
    }

    async fn wait_until_loaded(&self) -> Result<(), PageError> {
        let loaded_at = self.state.lock().loaded_at;
        match loaded_at {
            Some(at) => {
                sleep_until(at).await;
                Ok(())
            }
            None => std::future::pending().await,
        }
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.url())
    }
}
