//! In-memory browser for tests and dry runs.
//!
//! [`MockBrowser`] keeps a stub DOM per URL and answers the same calls a
//! WebDriver session would:
//! - Locators are evaluated against stub elements (the CSS and XPath subset
//!   produced by the locator builders)
//! - Elements can appear after a number of lookups, go stale on click, or
//!   reveal other elements / navigate when clicked
//! - Ready state, pending request counters and page heights are scripted
//! - Screenshots are rendered from the visible elements' text
//!
//! The browser is a cheap handle over shared state, so a test can keep a
//! clone to inspect what the page object did after handing one to it.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{BrowserSession, ElementHandle, SessionError, SessionResult};
use crate::page::load::{PAGE_HEIGHT_SCRIPT, PENDING_REQUESTS_SCRIPT, READY_STATE_SCRIPT};
use crate::page::locator::{Locator, Strategy};
use crate::visual::Raster;

const DEFAULT_SCREENSHOT_SIZE: (u32, u32) = (320, 200);
const TEXT_LINE_HEIGHT: u32 = 12;

/// A stub DOM element
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    /// Current value of an editable element
    pub value: String,
    pub displayed: bool,
    pub enabled: bool,
    /// Lookups for which the element is still reported hidden
    pub hidden_lookups: u32,
    /// Lookups that matched this element so far
    pub lookups: u32,
    /// Clicks that still fail with a stale reference
    pub stale_clicks: u32,
    /// Successful clicks so far
    pub clicks: u32,
    /// Times the element was cleared
    pub clears: u32,
    /// Every `send_keys` payload, in order
    pub key_events: Vec<String>,
    on_click: Vec<ClickEffect>,
}

#[derive(Debug, Clone)]
enum ClickEffect {
    Navigate(String),
    Reveal(String),
}

impl MockElement {
    /// A displayed, enabled element with the given tag
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            displayed: true,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Report the element as hidden for the first `lookups` lookups
    pub fn appears_after(mut self, lookups: u32) -> Self {
        self.hidden_lookups = lookups;
        self
    }

    /// Fail the first `clicks` clicks with a stale element reference
    pub fn stale_on_click(mut self, clicks: u32) -> Self {
        self.stale_clicks = clicks;
        self
    }

    /// Clicking loads `url`
    pub fn navigates_to(mut self, url: &str) -> Self {
        self.on_click.push(ClickEffect::Navigate(url.to_string()));
        self
    }

    /// Clicking displays the element with DOM id `id`
    pub fn reveals(mut self, id: &str) -> Self {
        self.on_click.push(ClickEffect::Reveal(id.to_string()));
        self
    }

    fn is_visible(&self) -> bool {
        self.displayed && (self.hidden_lookups == 0 || self.lookups > self.hidden_lookups)
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "class" => (!self.classes.is_empty()).then(|| self.classes.join(" ")),
            "value" => Some(self.value.clone()),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// A stub page served for one URL
#[derive(Debug, Clone)]
pub struct MockPage {
    pub title: String,
    pub elements: Vec<MockElement>,
    /// URL reported after loading (for redirects)
    pub redirect: Option<String>,
    /// Successive `document.readyState` values; the last one sticks
    pub ready_states: VecDeque<String>,
    /// Successive pending-request counts (`None` = no tracker on the page)
    pub pending_requests: VecDeque<Option<i64>>,
    /// Successive page heights; the last one sticks
    pub heights: VecDeque<i64>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self {
            title: String::new(),
            elements: Vec::new(),
            redirect: None,
            ready_states: VecDeque::from(vec!["complete".to_string()]),
            pending_requests: VecDeque::from(vec![None]),
            heights: VecDeque::from(vec![800]),
        }
    }
}

impl MockPage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn redirect_to(mut self, url: &str) -> Self {
        self.redirect = Some(url.to_string());
        self
    }

    pub fn ready_states(mut self, states: &[&str]) -> Self {
        self.ready_states = states.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn pending_requests(mut self, counts: &[Option<i64>]) -> Self {
        self.pending_requests = counts.iter().copied().collect();
        self
    }

    pub fn heights(mut self, heights: &[i64]) -> Self {
        self.heights = heights.iter().copied().collect();
        self
    }
}

#[derive(Debug)]
struct MockState {
    pages: HashMap<String, MockPage>,
    url: String,
    page: MockPage,
    /// Bumped on every load/re-render; older handles are stale
    generation: u64,
    screenshot_size: (u32, u32),
    screenshot_override: Option<Vec<u8>>,
    navigations: Vec<String>,
    drags: Vec<(String, String)>,
    quit_calls: u32,
    closed: bool,
}

/// In-memory [`BrowserSession`]
#[derive(Debug, Clone)]
pub struct MockBrowser {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    /// A browser showing an empty `about:blank` page
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                pages: HashMap::new(),
                url: "about:blank".to_string(),
                page: MockPage::default(),
                generation: 0,
                screenshot_size: DEFAULT_SCREENSHOT_SIZE,
                screenshot_override: None,
                navigations: Vec::new(),
                drags: Vec::new(),
                quit_calls: 0,
                closed: false,
            })),
        }
    }

    /// Serve `page` when `url` is opened
    pub fn with_page(self, url: &str, page: MockPage) -> Self {
        self.lock().pages.insert(url.to_string(), page);
        self
    }

    /// Replace the current page without navigating
    pub fn with_current_page(self, url: &str, page: MockPage) -> Self {
        {
            let mut state = self.lock();
            state.url = url.to_string();
            state.page = page;
            state.generation += 1;
        }
        self
    }

    pub fn with_screenshot_size(self, width: u32, height: u32) -> Self {
        self.lock().screenshot_size = (width, height);
        self
    }

    /// Return these exact bytes from every screenshot
    pub fn with_screenshot(self, png: Vec<u8>) -> Self {
        self.lock().screenshot_override = Some(png);
        self
    }

    /// Simulate the page re-rendering: every existing handle goes stale
    pub fn rerender(&self) {
        self.lock().generation += 1;
    }

    /// Copy of the first current element matching `locator`
    pub fn element(&self, locator: &Locator) -> Option<MockElement> {
        let state = self.lock();
        state
            .page
            .elements
            .iter()
            .find(|el| matches(locator, el).unwrap_or(false))
            .cloned()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Dragged (source, target) element texts
    pub fn drags(&self) -> Vec<(String, String)> {
        self.lock().drags.clone()
    }

    pub fn quit_calls(&self) -> u32 {
        self.lock().quit_calls
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic in another test thread must not cascade into this one
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self) -> SessionResult<MutexGuard<'_, MockState>> {
        let state = self.lock();
        if state.closed {
            return Err(SessionError::Connection("session already closed".into()));
        }
        Ok(state)
    }
}

impl MockState {
    fn load(&mut self, url: &str) {
        self.page = self.pages.get(url).cloned().unwrap_or_default();
        self.url = self.page.redirect.clone().unwrap_or_else(|| url.to_string());
        self.generation += 1;
        self.navigations.push(url.to_string());
    }

    fn resolve(&self, handle: &ElementHandle) -> SessionResult<usize> {
        let (generation, index) = handle
            .id()
            .split_once('-')
            .and_then(|(g, i)| Some((g.parse::<u64>().ok()?, i.parse::<usize>().ok()?)))
            .ok_or_else(|| SessionError::NoSuchElement(handle.to_string()))?;

        if generation != self.generation {
            return Err(SessionError::StaleElement(handle.to_string()));
        }
        if index >= self.page.elements.len() {
            return Err(SessionError::NoSuchElement(handle.to_string()));
        }
        Ok(index)
    }

    fn element_mut(&mut self, handle: &ElementHandle) -> SessionResult<&mut MockElement> {
        let index = self.resolve(handle)?;
        Ok(&mut self.page.elements[index])
    }

    fn render(&self) -> SessionResult<Vec<u8>> {
        if let Some(png) = &self.screenshot_override {
            return Ok(png.clone());
        }
        let (width, height) = self.screenshot_size;
        let mut raster = Raster::with_color(width, height, [255, 255, 255]);
        raster.draw_text(4, 4, &self.page.title, [0, 0, 128], [255, 255, 255]);
        let visible = self.page.elements.iter().filter(|el| el.is_visible());
        for (row, element) in visible.enumerate() {
            let y = 4 + TEXT_LINE_HEIGHT * (row as u32 + 1);
            let label = if element.value.is_empty() {
                &element.text
            } else {
                &element.value
            };
            raster.draw_text(4, y, label, [0, 0, 0], [255, 255, 255]);
        }
        raster
            .to_png()
            .map_err(|err| SessionError::Protocol(format!("screenshot encoding failed: {}", err)))
    }
}

/// Pop the front of a scripted sequence, keeping the last value
fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl BrowserSession for MockBrowser {
    fn source_type(&self) -> &str {
        "mock"
    }

    fn navigate(&mut self, url: &str) -> SessionResult<()> {
        let mut state = self.open()?;
        debug!("mock navigate to {}", url);
        state.load(url);
        Ok(())
    }

    fn current_url(&mut self) -> SessionResult<String> {
        Ok(self.open()?.url.clone())
    }

    fn title(&mut self) -> SessionResult<String> {
        Ok(self.open()?.page.title.clone())
    }

    fn find_elements(&mut self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let mut state = self.open()?;
        let generation = state.generation;
        let mut found = Vec::new();
        for (index, element) in state.page.elements.iter_mut().enumerate() {
            if matches(locator, element)? {
                element.lookups += 1;
                found.push(ElementHandle::new(format!("{}-{}", generation, index)));
            }
        }
        Ok(found)
    }

    fn is_displayed(&mut self, element: &ElementHandle) -> SessionResult<bool> {
        let state = self.open()?;
        let index = state.resolve(element)?;
        Ok(state.page.elements[index].is_visible())
    }

    fn is_enabled(&mut self, element: &ElementHandle) -> SessionResult<bool> {
        let state = self.open()?;
        let index = state.resolve(element)?;
        Ok(state.page.elements[index].enabled)
    }

    fn click(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let mut state = self.open()?;
        let target = state.element_mut(element)?;
        if target.stale_clicks > 0 {
            target.stale_clicks -= 1;
            return Err(SessionError::StaleElement(element.to_string()));
        }
        if !target.is_visible() || !target.enabled {
            return Err(SessionError::Protocol(format!(
                "element not interactable: {}",
                element
            )));
        }
        target.clicks += 1;
        let effects = target.on_click.clone();

        for effect in effects {
            match effect {
                ClickEffect::Reveal(id) => {
                    for el in state.page.elements.iter_mut() {
                        if el.id.as_deref() == Some(id.as_str()) {
                            el.displayed = true;
                        }
                    }
                }
                ClickEffect::Navigate(url) => state.load(&url),
            }
        }
        Ok(())
    }

    fn clear(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let mut state = self.open()?;
        let target = state.element_mut(element)?;
        target.value.clear();
        target.clears += 1;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> SessionResult<()> {
        let mut state = self.open()?;
        let target = state.element_mut(element)?;
        if !target.enabled {
            return Err(SessionError::Protocol(format!(
                "element not interactable: {}",
                element
            )));
        }
        target.value.push_str(text);
        target.key_events.push(text.to_string());
        Ok(())
    }

    fn drag_and_drop(
        &mut self,
        source: &ElementHandle,
        target: &ElementHandle,
    ) -> SessionResult<()> {
        let mut state = self.open()?;
        let source = state.resolve(source)?;
        let target = state.resolve(target)?;
        let texts = (
            state.page.elements[source].text.clone(),
            state.page.elements[target].text.clone(),
        );
        state.drags.push(texts);
        Ok(())
    }

    fn execute_script(&mut self, script: &str) -> SessionResult<serde_json::Value> {
        let mut state = self.open()?;
        if script == READY_STATE_SCRIPT {
            let ready = next_scripted(&mut state.page.ready_states).unwrap_or_default();
            Ok(serde_json::Value::String(ready))
        } else if script == PENDING_REQUESTS_SCRIPT {
            let pending = next_scripted(&mut state.page.pending_requests).flatten();
            Ok(pending.map_or(serde_json::Value::Null, serde_json::Value::from))
        } else if script == PAGE_HEIGHT_SCRIPT {
            let height = next_scripted(&mut state.page.heights).unwrap_or_default();
            Ok(serde_json::Value::from(height))
        } else {
            Err(SessionError::Script(format!(
                "mock browser cannot evaluate script: {}",
                script.lines().next().unwrap_or_default()
            )))
        }
    }

    fn screenshot(&mut self) -> SessionResult<Vec<u8>> {
        self.open()?.render()
    }

    fn quit(&mut self) -> SessionResult<()> {
        let mut state = self.lock();
        state.quit_calls += 1;
        state.closed = true;
        Ok(())
    }
}

// =============================================================================
// Selector evaluation
// =============================================================================

fn matches(locator: &Locator, element: &MockElement) -> SessionResult<bool> {
    let selector = locator.selector.as_str();
    let invalid = || SessionError::Protocol(format!("invalid selector: {}", locator));

    match locator.strategy {
        Strategy::Id => Ok(element.id.as_deref() == Some(selector)),
        Strategy::ClassName => Ok(element.classes.iter().any(|c| c == selector)),
        Strategy::TagName => Ok(element.tag.eq_ignore_ascii_case(selector)),
        Strategy::Css => {
            let groups = parse_css(selector).ok_or_else(invalid)?;
            Ok(groups.iter().any(|group| group.matches(element)))
        }
        Strategy::XPath => {
            let query = XPathParser::new(selector).parse().ok_or_else(invalid)?;
            Ok(query.matches(element))
        }
    }
}

/// One compound CSS selector: `tag#id.class[attr="v"]`
#[derive(Debug, Default)]
struct CssCompound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

impl CssCompound {
    fn matches(&self, el: &MockElement) -> bool {
        self.tag.as_ref().is_none_or(|t| el.tag.eq_ignore_ascii_case(t))
            && self.ids.iter().all(|id| el.id.as_deref() == Some(id.as_str()))
            && self.classes.iter().all(|c| el.classes.contains(c))
            && self.attributes.iter().all(|(name, value)| match value {
                Some(value) => el.attribute(name).as_deref() == Some(value.as_str()),
                None => el.attribute(name).is_some(),
            })
    }
}

/// Parse a comma-separated list of compound selectors (no combinators)
fn parse_css(selector: &str) -> Option<Vec<CssCompound>> {
    selector.split(',').map(|part| parse_css_compound(part.trim())).collect()
}

fn parse_css_compound(input: &str) -> Option<CssCompound> {
    let chars: Vec<char> = input.chars().collect();
    let mut compound = CssCompound::default();
    let mut pos = 0;

    let ident = |pos: &mut usize| -> String {
        let start = *pos;
        while *pos < chars.len() && (chars[*pos].is_alphanumeric() || "-_".contains(chars[*pos])) {
            *pos += 1;
        }
        chars[start..*pos].iter().collect()
    };

    if pos < chars.len() && chars[pos] == '*' {
        pos += 1;
    } else {
        let tag = ident(&mut pos);
        if !tag.is_empty() {
            compound.tag = Some(tag);
        }
    }

    while pos < chars.len() {
        match chars[pos] {
            '#' => {
                pos += 1;
                compound.ids.push(ident(&mut pos));
            }
            '.' => {
                pos += 1;
                compound.classes.push(ident(&mut pos));
            }
            '[' => {
                pos += 1;
                let name = ident(&mut pos);
                if name.is_empty() {
                    return None;
                }
                match chars.get(pos)? {
                    ']' => {
                        pos += 1;
                        compound.attributes.push((name, None));
                    }
                    '=' => {
                        pos += 1;
                        let quote = *chars.get(pos)?;
                        if quote != '"' && quote != '\'' {
                            return None;
                        }
                        pos += 1;
                        let mut value = String::new();
                        loop {
                            let ch = *chars.get(pos)?;
                            pos += 1;
                            match ch {
                                '\\' => {
                                    value.push(*chars.get(pos)?);
                                    pos += 1;
                                }
                                c if c == quote => break,
                                c => value.push(c),
                            }
                        }
                        if chars.get(pos) != Some(&']') {
                            return None;
                        }
                        pos += 1;
                        compound.attributes.push((name, Some(value)));
                    }
                    _ => return None,
                }
            }
            _ => return None,
        }
    }
    Some(compound)
}

#[derive(Debug)]
struct XPathQuery {
    tag: Option<String>,
    predicate: Option<XPathExpr>,
}

impl XPathQuery {
    fn matches(&self, el: &MockElement) -> bool {
        self.tag.as_ref().is_none_or(|t| el.tag.eq_ignore_ascii_case(t))
            && self.predicate.as_ref().is_none_or(|p| p.eval(el))
    }
}

#[derive(Debug)]
enum XPathValue {
    Text,
    Attr(String),
    Literal(String),
}

impl XPathValue {
    fn resolve(&self, el: &MockElement) -> Option<String> {
        match self {
            XPathValue::Text => Some(el.text.clone()),
            XPathValue::Attr(name) => el.attribute(name),
            XPathValue::Literal(s) => Some(s.clone()),
        }
    }
}

#[derive(Debug)]
enum XPathExpr {
    And(Box<XPathExpr>, Box<XPathExpr>),
    Or(Box<XPathExpr>, Box<XPathExpr>),
    Contains(XPathValue, XPathValue),
    Equals(XPathValue, XPathValue),
    SelfTag(String),
}

impl XPathExpr {
    fn eval(&self, el: &MockElement) -> bool {
        match self {
            XPathExpr::And(a, b) => a.eval(el) && b.eval(el),
            XPathExpr::Or(a, b) => a.eval(el) || b.eval(el),
            XPathExpr::Contains(a, b) => match (a.resolve(el), b.resolve(el)) {
                (Some(a), Some(b)) => a.contains(&b),
                _ => false,
            },
            XPathExpr::Equals(a, b) => match (a.resolve(el), b.resolve(el)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            XPathExpr::SelfTag(tag) => el.tag.eq_ignore_ascii_case(tag),
        }
    }
}

/// Recursive-descent parser for `//tag[predicate]` expressions
struct XPathParser {
    chars: Vec<char>,
    pos: usize,
}

impl XPathParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.trim().chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Option<XPathQuery> {
        if !self.eat("//") {
            return None;
        }
        let tag = if self.eat("*") {
            None
        } else {
            Some(self.name()?)
        };
        let predicate = if self.eat("[") {
            let expr = self.or_expr()?;
            self.expect("]")?;
            Some(expr)
        } else {
            None
        };
        self.skip_ws();
        (self.pos == self.chars.len()).then_some(XPathQuery { tag, predicate })
    }

    fn or_expr(&mut self) -> Option<XPathExpr> {
        let mut left = self.and_expr()?;
        while self.keyword("or") {
            let right = self.and_expr()?;
            left = XPathExpr::Or(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn and_expr(&mut self) -> Option<XPathExpr> {
        let mut left = self.term()?;
        while self.keyword("and") {
            let right = self.term()?;
            left = XPathExpr::And(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn term(&mut self) -> Option<XPathExpr> {
        if self.eat("(") {
            let expr = self.or_expr()?;
            self.expect(")")?;
            return Some(expr);
        }
        if self.eat("contains(") {
            let haystack = self.value()?;
            self.expect(",")?;
            let needle = self.value()?;
            self.expect(")")?;
            return Some(XPathExpr::Contains(haystack, needle));
        }
        if self.eat("self::") {
            return Some(XPathExpr::SelfTag(self.name()?));
        }
        let left = self.value()?;
        self.expect("=")?;
        let right = self.value()?;
        Some(XPathExpr::Equals(left, right))
    }

    fn value(&mut self) -> Option<XPathValue> {
        if self.eat("text()") {
            return Some(XPathValue::Text);
        }
        if self.eat("@") {
            return Some(XPathValue::Attr(self.name()?));
        }
        if self.eat("concat(") {
            let mut joined = self.literal()?;
            while self.eat(",") {
                joined.push_str(&self.literal()?);
            }
            self.expect(")")?;
            return Some(XPathValue::Literal(joined));
        }
        self.literal().map(XPathValue::Literal)
    }

    fn literal(&mut self) -> Option<String> {
        self.skip_ws();
        let quote = *self.chars.get(self.pos)?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let start = self.pos + 1;
        let end = start + self.chars[start..].iter().position(|&c| c == quote)?;
        self.pos = end + 1;
        Some(self.chars[start..end].iter().collect())
    }

    fn name(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.chars.len()
            && (self.chars[self.pos].is_alphanumeric() || "-_".contains(self.chars[self.pos]))
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn keyword(&mut self, word: &str) -> bool {
        let saved = self.pos;
        self.skip_ws();
        if self.eat(word) {
            let boundary = self
                .chars
                .get(self.pos)
                .is_none_or(|c| c.is_whitespace() || *c == '(');
            if boundary {
                return true;
            }
        }
        self.pos = saved;
        false
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        let token: Vec<char> = token.chars().collect();
        if self.chars[self.pos..].starts_with(&token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Option<()> {
        self.eat(token).then_some(())
    }

    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }
}
