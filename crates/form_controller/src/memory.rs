//! Headless [`Document`] used by the demo binary and the test-suite.
//!
//! Elements live in an arena; handles are indices into it. Selectors support
//! type, `.class`, `[attr]` and `[attr="value"]` compounds joined by the
//! descendant combinator.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

use shared::domain::{ElementRef, FieldKey, FormKind};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{settings::FormSettings, Document, FormAction};

const FORM_CONTROLS: [&str; 3] = ["input", "textarea", "select"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector in {0:?}")]
    Empty(String),
    #[error("unexpected {found:?} at offset {offset} in selector {selector:?}")]
    Unexpected {
        selector: String,
        offset: usize,
        found: char,
    },
    #[error("selector {0:?} ends unexpectedly")]
    UnexpectedEnd(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn merge(mut self, other: Compound) -> Compound {
        if other.tag.is_some() {
            self.tag = other.tag;
        }
        for class in other.classes {
            if !self.classes.contains(&class) {
                self.classes.push(class);
            }
        }
        self.attrs.extend(other.attrs);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    chain: Vec<Compound>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        Parser {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
        .parse()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> SelectorError {
        match self.chars.get(self.pos) {
            Some(&(offset, found)) => SelectorError::Unexpected {
                selector: self.source.to_string(),
                offset,
                found,
            },
            None => SelectorError::UnexpectedEnd(self.source.to_string()),
        }
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        let mut chain = Vec::new();

        self.skip_whitespace();
        while self.peek().is_some() {
            chain.push(self.compound()?);
            self.skip_whitespace();
        }

        if chain.is_empty() {
            return Err(SelectorError::Empty(self.source.to_string()));
        }
        Ok(Selector { chain })
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.pos += 1;
        }
        if out.is_empty() {
            return Err(self.unexpected());
        }
        Ok(out)
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();

        if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> Result<(String, Option<String>), SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        match self.peek() {
            Some(']') => {
                self.bump();
                return Ok((name, None));
            }
            Some('=') => {
                self.bump();
            }
            _ => return Err(self.unexpected()),
        }

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(c) => value.push(c),
                        None => return Err(SelectorError::UnexpectedEnd(self.source.to_string())),
                    }
                }
                value
            }
            _ => self.ident()?,
        };
        self.skip_whitespace();

        match self.peek() {
            Some(']') => {
                self.bump();
                Ok((name, Some(value)))
            }
            _ => Err(self.unexpected()),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<usize>,
    children: Vec<usize>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    value: String,
    inner_html: String,
}

#[derive(Debug)]
struct Dom {
    nodes: Vec<Node>,
    listeners: HashMap<ElementRef, FormAction>,
    submissions: Vec<ElementRef>,
}

impl Dom {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "#document".to_string(),
                parent: None,
                children: Vec::new(),
                classes: Vec::new(),
                attrs: BTreeMap::new(),
                value: String::new(),
                inner_html: String::new(),
            }],
            listeners: HashMap::new(),
            submissions: Vec::new(),
        }
    }

    fn node(&self, element: ElementRef) -> Option<&Node> {
        self.nodes.get(element.0)
    }

    fn node_mut(&mut self, element: ElementRef) -> Option<&mut Node> {
        self.nodes.get_mut(element.0)
    }

    fn create(&mut self, parent: ElementRef, compound: &Compound, default_tag: &str) -> ElementRef {
        let id = self.nodes.len();
        let mut attrs = BTreeMap::new();
        for (name, value) in &compound.attrs {
            attrs.insert(name.clone(), value.clone().unwrap_or_default());
        }
        let value = attrs.get("value").cloned().unwrap_or_default();

        self.nodes.push(Node {
            tag: compound
                .tag
                .clone()
                .unwrap_or_else(|| default_tag.to_string()),
            parent: Some(parent.0),
            children: Vec::new(),
            classes: compound.classes.clone(),
            attrs,
            value,
            inner_html: String::new(),
        });
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.push(id);
        }
        ElementRef(id)
    }

    fn descendants(&self, scope: ElementRef) -> Vec<ElementRef> {
        let mut out = Vec::new();
        let Some(node) = self.node(scope) else {
            return out;
        };
        let mut stack: Vec<usize> = node.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(ElementRef(id));
            if let Some(child) = self.nodes.get(id) {
                stack.extend(child.children.iter().rev().copied());
            }
        }
        out
    }

    fn matches_compound(&self, id: usize, compound: &Compound) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if node.tag.starts_with('#') {
            return false;
        }
        if compound.tag.as_ref().is_some_and(|tag| *tag != node.tag) {
            return false;
        }
        if !compound.classes.iter().all(|class| node.classes.contains(class)) {
            return false;
        }
        compound.attrs.iter().all(|(name, expected)| {
            let actual = if name == "class" {
                (!node.classes.is_empty()).then(|| node.classes.join(" "))
            } else {
                node.attrs.get(name).cloned()
            };
            match (actual, expected) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == *expected,
                (None, _) => false,
            }
        })
    }

    fn matches_chain(&self, id: usize, chain: &[Compound]) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        if !self.matches_compound(id, last) {
            return false;
        }

        let mut cursor = self.nodes.get(id).and_then(|node| node.parent);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(current) = cursor else {
                    return false;
                };
                cursor = self.nodes.get(current).and_then(|node| node.parent);
                if self.matches_compound(current, compound) {
                    break;
                }
            }
        }
        true
    }

    fn matches(&self, element: ElementRef, selector: &Selector) -> bool {
        self.matches_chain(element.0, &selector.chain)
    }
}

/// In-memory page. All mutation goes through an internal lock so the document
/// can be shared with the controller behind an `Arc`.
pub struct MemoryDocument {
    dom: Mutex<Dom>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            dom: Mutex::new(Dom::new()),
        }
    }

    fn dom(&self) -> MutexGuard<'_, Dom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn root(&self) -> ElementRef {
        ElementRef(0)
    }

    /// Appends an element; a `class` attribute is split into the class list.
    pub fn create_element(
        &self,
        parent: ElementRef,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> ElementRef {
        let mut compound = Compound {
            tag: Some(tag.to_ascii_lowercase()),
            ..Compound::default()
        };
        for (name, value) in attrs {
            if *name == "class" {
                compound
                    .classes
                    .extend(value.split_whitespace().map(str::to_string));
            } else {
                compound
                    .attrs
                    .push((name.to_ascii_lowercase(), Some(value.to_string())));
            }
        }
        self.dom().create(parent, &compound, tag)
    }

    /// Builds the element chain described by `selector` under `parent` and
    /// returns the innermost element.
    fn materialize(
        &self,
        parent: ElementRef,
        selector: &str,
        default_tag: &str,
    ) -> Result<ElementRef, SelectorError> {
        let selector = Selector::parse(selector)?;
        let mut dom = self.dom();
        let mut current = parent;
        let chain = &selector.chain;
        for (index, compound) in chain.iter().enumerate() {
            let tag = if index + 1 == chain.len() {
                default_tag
            } else {
                "div"
            };
            current = dom.create(current, compound, tag);
        }
        Ok(current)
    }

    /// Like [`materialize`](Self::materialize) for `container_selector`, with
    /// the innermost element also satisfying the last compound of
    /// `element_selector` and carrying `name`.
    fn materialize_input(
        &self,
        parent: ElementRef,
        container_selector: &str,
        element_selector: &str,
        name: &str,
    ) -> Result<ElementRef, SelectorError> {
        let container = Selector::parse(container_selector)?;
        let element = Selector::parse(element_selector)?;
        let mut chain = container.chain;
        let own = element.chain.last().cloned().unwrap_or_default();
        let last = chain.pop().unwrap_or_default().merge(own);

        let mut dom = self.dom();
        let mut current = parent;
        for compound in &chain {
            current = dom.create(current, compound, "div");
        }
        let input = dom.create(current, &last, "input");
        if let Some(node) = dom.node_mut(input) {
            node.attrs.insert("name".to_string(), name.to_string());
            node.attrs
                .entry("type".to_string())
                .or_insert_with(|| "text".to_string());
        }
        Ok(input)
    }

    /// Standard two-form markup for `settings`. Returns the document and the
    /// shared container element.
    pub fn login_page(settings: &FormSettings) -> Result<(Self, ElementRef), SelectorError> {
        let document = Self::new();
        let container =
            document.create_element(document.root(), "div", &[("class", "login-form-wrapper")]);

        let login = document.materialize(container, &settings.login.form_element, "form")?;
        document.add_class(login, &settings.visible_class);
        let namespace = &settings.login.form_namespace;
        document.field_block(
            login,
            settings,
            &settings.login.email_element,
            &FieldKey::new(namespace, "email"),
            &[settings.login.email_error.as_str()],
        )?;
        document.field_block(
            login,
            settings,
            &settings.login.password_element,
            &FieldKey::new(namespace, "password"),
            &[settings.login.password_error.as_str()],
        )?;
        document.materialize(login, &settings.login.submit_element, "button")?;
        document.materialize(login, settings.switch_element(FormKind::Login), "a")?;

        let recovery = document.materialize(container, &settings.recovery.form_element, "form")?;
        document.add_class(recovery, &settings.hidden_class);
        document.field_block(
            recovery,
            settings,
            &settings.recovery.email_element,
            &FieldKey::new(&settings.recovery.form_namespace, "email"),
            &[
                settings.recovery.email_error.as_str(),
                settings.recovery.email_success.as_str(),
            ],
        )?;
        document.materialize(recovery, &settings.recovery.submit_element, "button")?;
        document.materialize(recovery, settings.switch_element(FormKind::Recovery), "a")?;

        debug!(elements = document.dom().nodes.len(), "memory: built login page");
        Ok((document, container))
    }

    fn field_block(
        &self,
        form: ElementRef,
        settings: &FormSettings,
        input_selector: &str,
        key: &FieldKey,
        slots: &[&str],
    ) -> Result<ElementRef, SelectorError> {
        let item = self.materialize(form, &settings.field_container, "div")?;
        let input =
            self.materialize_input(item, &settings.field_element, input_selector, key.as_str())?;
        for slot in slots {
            self.materialize(item, slot, "div")?;
        }
        Ok(input)
    }

    pub fn set_attribute(&self, element: ElementRef, name: &str, value: &str) {
        if let Some(node) = self.dom().node_mut(element) {
            node.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    pub fn remove_attribute(&self, element: ElementRef, name: &str) {
        if let Some(node) = self.dom().node_mut(element) {
            node.attrs.remove(&name.to_ascii_lowercase());
        }
    }

    pub fn inner_html(&self, element: ElementRef) -> String {
        self.dom()
            .node(element)
            .map(|node| node.inner_html.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, element: ElementRef, class: &str) -> bool {
        self.dom()
            .node(element)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    pub fn submissions(&self) -> Vec<ElementRef> {
        self.dom().submissions.clone()
    }

    /// Action registered for a click on `element`, if any.
    pub fn click(&self, element: ElementRef) -> Option<FormAction> {
        self.dom().listeners.get(&element).copied()
    }

    pub fn listeners(&self) -> Vec<(ElementRef, FormAction)> {
        let mut listeners: Vec<_> = self
            .dom()
            .listeners
            .iter()
            .map(|(element, action)| (*element, *action))
            .collect();
        listeners.sort_by_key(|(element, _)| *element);
        listeners
    }

    fn select(&self, scope: ElementRef, selector: &str, first_only: bool) -> Vec<ElementRef> {
        let selector = match Selector::parse(selector) {
            Ok(selector) => selector,
            Err(err) => {
                warn!(error = %err, "memory: invalid selector");
                return Vec::new();
            }
        };

        let dom = self.dom();
        let mut out = Vec::new();
        for element in dom.descendants(scope) {
            if dom.matches(element, &selector) {
                out.push(element);
                if first_only {
                    break;
                }
            }
        }
        out
    }
}

impl Document for MemoryDocument {
    fn query_selector(&self, scope: ElementRef, selector: &str) -> Option<ElementRef> {
        self.select(scope, selector, true).into_iter().next()
    }

    fn query_selector_all(&self, scope: ElementRef, selector: &str) -> Vec<ElementRef> {
        self.select(scope, selector, false)
    }

    fn attribute(&self, element: ElementRef, name: &str) -> Option<String> {
        let dom = self.dom();
        let node = dom.node(element)?;
        if name.eq_ignore_ascii_case("class") {
            return (!node.classes.is_empty()).then(|| node.classes.join(" "));
        }
        node.attrs.get(&name.to_ascii_lowercase()).cloned()
    }

    fn value(&self, element: ElementRef) -> String {
        self.dom()
            .node(element)
            .map(|node| node.value.clone())
            .unwrap_or_default()
    }

    fn set_value(&self, element: ElementRef, value: &str) {
        if let Some(node) = self.dom().node_mut(element) {
            node.value = value.to_string();
        }
    }

    fn set_inner_html(&self, element: ElementRef, html: &str) {
        if let Some(node) = self.dom().node_mut(element) {
            node.inner_html = html.to_string();
        }
    }

    fn add_class(&self, element: ElementRef, class: &str) {
        if let Some(node) = self.dom().node_mut(element) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn remove_class(&self, element: ElementRef, class: &str) {
        if let Some(node) = self.dom().node_mut(element) {
            node.classes.retain(|c| c != class);
        }
    }

    fn form_data(&self, form: ElementRef) -> Vec<(String, String)> {
        let dom = self.dom();
        dom.descendants(form)
            .into_iter()
            .filter_map(|element| dom.node(element))
            .filter(|node| FORM_CONTROLS.contains(&node.tag.as_str()))
            .filter(|node| !node.attrs.contains_key("disabled"))
            .filter_map(|node| {
                let name = node.attrs.get("name").filter(|name| !name.is_empty())?;
                Some((name.clone(), node.value.clone()))
            })
            .collect()
    }

    fn submit(&self, form: ElementRef) {
        info!(form = form.0, "memory: form submitted");
        self.dom().submissions.push(form);
    }

    fn add_click_listener(&self, element: ElementRef, action: FormAction) {
        self.dom().listeners.insert(element, action);
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
