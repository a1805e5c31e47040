use shared::domain::ElementRef;
use tracing::debug;

use crate::Document;

/// Owns the "last rendered slot" so at most one message stays on screen.
#[derive(Debug, Clone, Default)]
pub struct ErrorDisplay {
    last: Option<ElementRef>,
}

impl ErrorDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_slot(&self) -> Option<ElementRef> {
        self.last
    }

    // The previous slot is cleared even when it is `slot` itself.
    pub fn show(&mut self, document: &dyn Document, slot: ElementRef, message: &str) {
        if let Some(previous) = self.last.replace(slot) {
            document.set_inner_html(previous, "");
        }
        debug!(slot = slot.0, "display: rendering message");
        document.set_inner_html(slot, message);
    }

    pub fn clear(&mut self, document: &dyn Document) {
        if let Some(previous) = self.last.take() {
            document.set_inner_html(previous, "");
        }
    }
}
