use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{ElementRef, FieldKey, FormKind},
    protocol::{FieldMessages, FormRequest, ResponseStatus, ValidationResponse},
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    display::ErrorDisplay,
    error::ControllerError,
    navigation::absolutize_redirect,
    outcome::{SubmitOutcome, ValidationOutcome},
    registry::FieldRegistry,
    settings::FormSettings,
    Document, FormAction, Navigator, Transport,
};

/// Structural handles of one form, resolved once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDescriptor {
    pub kind: FormKind,
    pub namespace: String,
    pub action_url: String,
    pub root: ElementRef,
    pub submit: ElementRef,
    pub switch: ElementRef,
}

impl FormDescriptor {
    fn resolve(
        document: &dyn Document,
        settings: &FormSettings,
        container: ElementRef,
        kind: FormKind,
    ) -> Result<Self, ControllerError> {
        let selectors = settings.selectors(kind);
        let root = document
            .query_selector(container, selectors.form_element)
            .ok_or_else(|| ControllerError::missing_in_container(selectors.form_element))?;
        let submit = document
            .query_selector(root, selectors.submit_element)
            .ok_or_else(|| ControllerError::missing_in_form(kind, selectors.submit_element))?;
        let switch_selector = settings.switch_element(kind);
        let switch = document
            .query_selector(container, switch_selector)
            .ok_or_else(|| ControllerError::missing_in_container(switch_selector))?;

        Ok(Self {
            kind,
            namespace: selectors.namespace.to_string(),
            action_url: selectors.action_url.to_string(),
            root,
            submit,
            switch,
        })
    }

    fn email_key(&self) -> FieldKey {
        FieldKey::new(&self.namespace, "email")
    }
}

struct ControllerState {
    registry: FieldRegistry,
    display: ErrorDisplay,
    error_list: Vec<FieldKey>,
    // one-shot, never reset
    submitted: bool,
}

/// Holds the recovery in-flight flag; cleared on drop, including when the
/// submitting future is cancelled mid-request.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Coordinates the login and recovery forms inside one container. The state
/// lock is never held across a transport await.
pub struct FormController {
    document: Arc<dyn Document>,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    settings: FormSettings,
    login: FormDescriptor,
    recovery: FormDescriptor,
    recovery_in_flight: AtomicBool,
    inner: Mutex<ControllerState>,
}

impl FormController {
    pub fn new(
        container: ElementRef,
        settings: FormSettings,
        document: Arc<dyn Document>,
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Arc<Self>, ControllerError> {
        let login =
            FormDescriptor::resolve(document.as_ref(), &settings, container, FormKind::Login)?;
        let recovery = FormDescriptor::resolve(
            document.as_ref(),
            &settings,
            container,
            FormKind::Recovery,
        )?;

        let registry =
            FieldRegistry::build(document.as_ref(), &settings, login.root, recovery.root)?;
        for form in [&login, &recovery] {
            registry.ensure_covers(document.as_ref(), form.root, &settings.field_element)?;
        }
        debug!(
            fields = ?registry.keys().map(FieldKey::as_str).collect::<Vec<_>>(),
            "form: registry initialised"
        );

        document.add_click_listener(login.submit, FormAction::SubmitLogin);
        document.add_click_listener(recovery.submit, FormAction::SubmitRecovery);
        document.add_click_listener(login.switch, FormAction::ShowRecovery);
        document.add_click_listener(recovery.switch, FormAction::ShowLogin);

        Ok(Arc::new(Self {
            document,
            transport,
            navigator,
            settings,
            login,
            recovery,
            recovery_in_flight: AtomicBool::new(false),
            inner: Mutex::new(ControllerState {
                registry,
                display: ErrorDisplay::new(),
                error_list: Vec::new(),
                submitted: false,
            }),
        }))
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    pub fn form(&self, kind: FormKind) -> &FormDescriptor {
        match kind {
            FormKind::Login => &self.login,
            FormKind::Recovery => &self.recovery,
        }
    }

    /// Value stored by the last sync of `key`, `None` before the first one.
    pub async fn stored_value(&self, key: &FieldKey) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.registry.get(key).and_then(|field| field.value.clone())
    }

    pub async fn error_list(&self) -> Vec<FieldKey> {
        self.inner.lock().await.error_list.clone()
    }

    pub async fn is_submitted(&self) -> bool {
        self.inner.lock().await.submitted
    }

    pub async fn last_message_slot(&self) -> Option<ElementRef> {
        self.inner.lock().await.display.last_slot()
    }

    pub async fn clear_messages(&self) {
        let mut inner = self.inner.lock().await;
        inner.display.clear(self.document.as_ref());
    }

    pub async fn dispatch(&self, action: FormAction) -> Result<SubmitOutcome, ControllerError> {
        match action {
            FormAction::SubmitLogin => self.submit_clicked(FormKind::Login).await,
            FormAction::SubmitRecovery => self.submit_clicked(FormKind::Recovery).await,
            FormAction::ShowRecovery => self.switch_to(FormKind::Login, FormKind::Recovery).await,
            FormAction::ShowLogin => self.switch_to(FormKind::Recovery, FormKind::Login).await,
        }
    }

    pub async fn submit_clicked(&self, kind: FormKind) -> Result<SubmitOutcome, ControllerError> {
        let form = self.form(kind);
        let unchanged = self.inner.lock().await.registry.has_unchanged_values(
            self.document.as_ref(),
            form.root,
            &self.settings.field_element,
        )?;
        if unchanged {
            debug!(form = %kind, "form: values unchanged, skipping request");
            return Ok(SubmitOutcome::Unchanged);
        }

        match kind {
            FormKind::Login => self.submit_login().await,
            FormKind::Recovery => self.submit_recovery().await,
        }
    }

    /// The guard is checked again after the await so overlapping calls submit
    /// at most once.
    pub async fn submit_login(&self) -> Result<SubmitOutcome, ControllerError> {
        if self.inner.lock().await.submitted {
            debug!("form: login already submitted");
            return Ok(SubmitOutcome::AlreadySubmitted);
        }

        let outcome = self.validate(FormKind::Login).await?;
        if !outcome.is_cleared() {
            return Ok(SubmitOutcome::Validated(outcome));
        }

        {
            let mut inner = self.inner.lock().await;
            if inner.submitted {
                debug!("form: login submitted by a concurrent call");
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            inner.submitted = true;
        }

        info!(url = %self.login.action_url, "form: login cleared, submitting");
        self.document.submit(self.login.root);
        Ok(SubmitOutcome::Submitted)
    }

    /// Never submits and never touches the login guard.
    pub async fn submit_recovery(&self) -> Result<SubmitOutcome, ControllerError> {
        let Some(_guard) = InFlightGuard::acquire(&self.recovery_in_flight) else {
            debug!("form: recovery request already pending");
            return Ok(SubmitOutcome::InFlight);
        };

        let outcome = self.validate(FormKind::Recovery).await?;
        Ok(SubmitOutcome::Validated(outcome))
    }

    pub async fn validate(&self, kind: FormKind) -> Result<ValidationOutcome, ControllerError> {
        let form = self.form(kind);
        let request = {
            let mut inner = self.inner.lock().await;
            if let Err(err) = inner.registry.sync_from_form(
                self.document.as_ref(),
                form.root,
                &self.settings.field_element,
            ) {
                error!(
                    form = %kind,
                    code = err.code().as_str(),
                    error = %err,
                    "form: sync failed"
                );
                return Err(err);
            }
            FormRequest::post(form.action_url.clone(), self.document.form_data(form.root))
        };

        info!(form = %kind, url = %request.url, "form: validating");
        let response = match self.transport.send(request).await.and_then(|body| {
            ValidationResponse::from_value(body).map_err(anyhow::Error::from)
        }) {
            Ok(response) => response,
            Err(err) => {
                error!(form = %kind, error = %err, "form: validation request failed");
                return Ok(ValidationOutcome::TransportFailed);
            }
        };

        let outcome = self.apply_response(kind, response).await?;
        debug!(
            form = %kind,
            code = ?outcome.code().map(|code| code.as_str()),
            "form: validation finished"
        );
        Ok(outcome)
    }

    async fn apply_response(
        &self,
        kind: FormKind,
        response: ValidationResponse,
    ) -> Result<ValidationOutcome, ControllerError> {
        if let Some(target) = response.rate_limit_redirect() {
            let target = absolutize_redirect(&self.navigator.location(), target);
            warn!(form = %kind, target = %target, "form: throttled by endpoint, redirecting");
            self.navigator.navigate(&target);
            return Ok(ValidationOutcome::Redirected { target });
        }

        let mut inner = self.inner.lock().await;
        match response.status {
            ResponseStatus::Error => {
                match response.meta.and_then(|meta| meta.description) {
                    Some(description) => self.render_messages(&mut inner, &description)?,
                    None => warn!(form = %kind, "form: rejection without description"),
                }
                Ok(ValidationOutcome::Rejected {
                    errors: inner.error_list.clone(),
                })
            }
            ResponseStatus::Success => {
                let data = response.data.unwrap_or_default();
                if data.is_valid() {
                    self.render_messages(&mut inner, &data)?;
                    return Ok(ValidationOutcome::Notice {
                        errors: inner.error_list.clone(),
                    });
                }
                inner.error_list.clear();
                Ok(ValidationOutcome::Cleared)
            }
        }
    }

    // The three checks are independent; each render clears the last shown slot.
    fn render_messages(
        &self,
        state: &mut ControllerState,
        messages: &FieldMessages,
    ) -> Result<(), ControllerError> {
        let document = self.document.as_ref();

        if let Some(field) = messages.field_kind() {
            let key = FieldKey::new(&self.login.namespace, field);
            match state.registry.get(&key) {
                Some(descriptor) => {
                    if let Some(slot) = descriptor.error_slot {
                        state.display.show(document, slot, messages.message_text());
                    } else {
                        warn!(key = %key, "form: rejected field has no error slot");
                    }
                    state.error_list.push(key);
                }
                None => warn!(key = %key, "form: endpoint rejected an unknown field"),
            }
        }

        let recovery_email = state.registry.descriptor(&self.recovery.email_key())?.clone();

        if let Some(message) = messages.email_message() {
            match recovery_email.error_slot {
                Some(slot) => state.display.show(document, slot, message),
                None => warn!("form: recovery email has no error slot"),
            }
        }

        if messages.is_valid() {
            match recovery_email.success_slot {
                Some(slot) => state.display.show(document, slot, messages.message_text()),
                None => warn!("form: recovery email has no success slot"),
            }
        }

        Ok(())
    }

    pub async fn switch_to(
        &self,
        from: FormKind,
        to: FormKind,
    ) -> Result<SubmitOutcome, ControllerError> {
        let source = self.form(from);
        let target = self.form(to);
        let document = self.document.as_ref();

        document.remove_class(source.root, &self.settings.visible_class);
        document.add_class(source.root, &self.settings.hidden_class);
        document.remove_class(target.root, &self.settings.hidden_class);
        document.add_class(target.root, &self.settings.visible_class);

        let (source_email, target_email) = {
            let inner = self.inner.lock().await;
            (
                inner.registry.descriptor(&source.email_key())?.element,
                inner.registry.descriptor(&target.email_key())?.element,
            )
        };
        let email = document.value(source_email);
        document.set_value(target_email, &email);
        info!(%from, %to, "form: switched forms");

        self.submit_clicked(to).await
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
