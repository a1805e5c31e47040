use std::sync::{Mutex, PoisonError};

use tracing::info;
use url::Url;

use crate::Navigator;

/// Host markers that identify an already absolute canonical URL.
const CANONICAL_HOST_MARKERS: [&str; 2] = ["//www.", "//m."];

/// Turns a redirect target into an absolute URL on the current origin unless
/// it already points at a canonical host.
pub fn absolutize_redirect(location: &Url, target: &str) -> String {
    if CANONICAL_HOST_MARKERS
        .iter()
        .any(|marker| target.contains(marker))
    {
        return target.to_string();
    }

    let mut origin = format!("{}://", location.scheme());
    origin.push_str(location.host_str().unwrap_or_default());
    if let Some(port) = location.port() {
        origin.push_str(&format!(":{port}"));
    }

    if target.starts_with('/') {
        format!("{origin}{target}")
    } else {
        format!("{origin}/{target}")
    }
}

/// Navigator that records visits instead of leaving the page.
#[derive(Debug)]
pub struct MemoryNavigator {
    location: Url,
    visits: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(location: Url) -> Self {
        Self {
            location,
            visits: Mutex::new(Vec::new()),
        }
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for MemoryNavigator {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn navigate(&self, url: &str) {
        info!(url, "navigation: leaving page");
        self.visits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
    }
}
