use std::collections::HashMap;

use shared::domain::{ElementRef, FieldKey, FormKind};
use tracing::debug;

use crate::{error::ControllerError, settings::FormSettings, Document};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub element: ElementRef,
    // `None` until the first sync, so an unsynced field always counts as changed.
    pub value: Option<String>,
    pub error_slot: Option<ElementRef>,
    pub success_slot: Option<ElementRef>,
}

impl FieldDescriptor {
    fn new(element: ElementRef) -> Self {
        Self {
            element,
            value: None,
            error_slot: None,
            success_slot: None,
        }
    }
}

/// Field identifier to descriptor map. The key set is fixed at construction;
/// only stored values change afterwards.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<FieldKey, FieldDescriptor>,
}

struct FieldSpec<'a> {
    element: &'a str,
    error: Option<&'a str>,
    success: Option<&'a str>,
}

impl FieldRegistry {
    pub fn build(
        document: &dyn Document,
        settings: &FormSettings,
        login_root: ElementRef,
        recovery_root: ElementRef,
    ) -> Result<Self, ControllerError> {
        let mut registry = Self::default();

        let login = &settings.login;
        registry.register(
            document,
            FormKind::Login,
            login_root,
            FieldSpec {
                element: &login.email_element,
                error: Some(&login.email_error),
                success: None,
            },
        )?;
        registry.register(
            document,
            FormKind::Login,
            login_root,
            FieldSpec {
                element: &login.password_element,
                error: Some(&login.password_error),
                success: None,
            },
        )?;

        let recovery = &settings.recovery;
        registry.register(
            document,
            FormKind::Recovery,
            recovery_root,
            FieldSpec {
                element: &recovery.email_element,
                error: Some(&recovery.email_error),
                success: Some(&recovery.email_success),
            },
        )?;

        for kind in [FormKind::Login, FormKind::Recovery] {
            let key = FieldKey::new(settings.selectors(kind).namespace, "email");
            if !registry.fields.contains_key(&key) {
                return Err(ControllerError::MissingField { key });
            }
        }

        Ok(registry)
    }

    fn register(
        &mut self,
        document: &dyn Document,
        form: FormKind,
        root: ElementRef,
        spec: FieldSpec<'_>,
    ) -> Result<(), ControllerError> {
        let element = document
            .query_selector(root, spec.element)
            .ok_or_else(|| ControllerError::missing_in_form(form, spec.element))?;
        let name = document
            .attribute(element, "name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ControllerError::MissingName {
                form,
                selector: spec.element.to_string(),
            })?;
        let key = FieldKey::from_name(name);
        if self.fields.contains_key(&key) {
            return Err(ControllerError::DuplicateField { key });
        }

        let mut descriptor = FieldDescriptor::new(element);
        descriptor.error_slot = spec
            .error
            .and_then(|selector| document.query_selector(root, selector));
        descriptor.success_slot = spec
            .success
            .and_then(|selector| document.query_selector(root, selector));
        if descriptor.error_slot.is_none() {
            debug!(%form, key = %key, "registry: field has no error slot");
        }

        self.fields.insert(key, descriptor);
        Ok(())
    }

    pub fn get(&self, key: &FieldKey) -> Option<&FieldDescriptor> {
        self.fields.get(key)
    }

    pub fn descriptor(&self, key: &FieldKey) -> Result<&FieldDescriptor, ControllerError> {
        self.fields
            .get(key)
            .ok_or_else(|| ControllerError::UnknownField { key: key.clone() })
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.keys()
    }

    // Unnamed or unregistered fields are lookup failures.
    fn live_values(
        &self,
        document: &dyn Document,
        form: ElementRef,
        field_selector: &str,
    ) -> Result<Vec<(FieldKey, String)>, ControllerError> {
        document
            .query_selector_all(form, field_selector)
            .into_iter()
            .map(|element| {
                let name = document.attribute(element, "name").unwrap_or_default();
                let key = FieldKey::from_name(name);
                if !self.fields.contains_key(&key) {
                    return Err(ControllerError::UnknownField { key });
                }
                Ok((key, document.value(element)))
            })
            .collect()
    }

    pub fn sync_from_form(
        &mut self,
        document: &dyn Document,
        form: ElementRef,
        field_selector: &str,
    ) -> Result<(), ControllerError> {
        for (key, value) in self.live_values(document, form, field_selector)? {
            if let Some(descriptor) = self.fields.get_mut(&key) {
                descriptor.value = Some(value);
            }
        }
        Ok(())
    }

    /// True when every field in `form` still holds the value stored by the
    /// previous sync. Vacuously true for a form with no matching fields.
    pub fn has_unchanged_values(
        &self,
        document: &dyn Document,
        form: ElementRef,
        field_selector: &str,
    ) -> Result<bool, ControllerError> {
        let live = self.live_values(document, form, field_selector)?;
        Ok(live.iter().all(|(key, value)| {
            self.fields
                .get(key)
                .is_some_and(|descriptor| descriptor.value.as_deref() == Some(value.as_str()))
        }))
    }

    pub fn ensure_covers(
        &self,
        document: &dyn Document,
        form: ElementRef,
        field_selector: &str,
    ) -> Result<(), ControllerError> {
        self.live_values(document, form, field_selector).map(|_| ())
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
