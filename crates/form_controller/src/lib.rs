//! Client-side controller for a paired login / password-recovery form.
//!
//! The controller mirrors field values into a registry, posts each form to its
//! validation endpoint, and maps the endpoint's verdict back onto per-field
//! message slots. The host page, the network and navigation are reached through
//! the [`Document`], [`Transport`] and [`Navigator`] traits.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shared::{domain::ElementRef, protocol::FormRequest};
use url::Url;

mod controller;
mod display;
pub mod error;
pub mod memory;
mod navigation;
mod outcome;
mod registry;
pub mod settings;
pub mod transport;

pub use controller::{FormController, FormDescriptor};
pub use display::ErrorDisplay;
pub use error::ControllerError;
pub use memory::MemoryDocument;
pub use navigation::{absolutize_redirect, MemoryNavigator};
pub use outcome::{SubmitOutcome, ValidationOutcome};
pub use registry::{FieldDescriptor, FieldRegistry};
pub use settings::{load_settings, FormSettings};
pub use transport::HttpTransport;

/// Click targets the controller listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormAction {
    SubmitLogin,
    SubmitRecovery,
    ShowRecovery,
    ShowLogin,
}

/// Host rendering tree. Handles are non-owning; the host keeps the elements
/// alive for the lifetime of the page.
pub trait Document: Send + Sync {
    fn query_selector(&self, scope: ElementRef, selector: &str) -> Option<ElementRef>;
    fn query_selector_all(&self, scope: ElementRef, selector: &str) -> Vec<ElementRef>;
    fn attribute(&self, element: ElementRef, name: &str) -> Option<String>;
    fn value(&self, element: ElementRef) -> String;
    fn set_value(&self, element: ElementRef, value: &str);
    fn set_inner_html(&self, element: ElementRef, html: &str);
    fn add_class(&self, element: ElementRef, class: &str);
    fn remove_class(&self, element: ElementRef, class: &str);
    /// Every named, enabled control of `form` with its current value.
    fn form_data(&self, form: ElementRef) -> Vec<(String, String)>;
    /// Real (navigating) submission of `form`.
    fn submit(&self, form: ElementRef);
    fn add_click_listener(&self, element: ElementRef, action: FormAction);
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: FormRequest) -> Result<Value>;
}

pub trait Navigator: Send + Sync {
    fn location(&self) -> Url;
    fn navigate(&self, url: &str);
}
