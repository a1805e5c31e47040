use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::domain::FormKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSettings {
    pub form_namespace: String,
    pub action_url: String,
    pub form_element: String,
    pub email_element: String,
    pub email_error: String,
    pub password_element: String,
    pub password_error: String,
    pub submit_element: String,
}

impl Default for LoginSettings {
    fn default() -> Self {
        Self {
            form_namespace: "LoginForm".into(),
            action_url: "/site/checkLogin".into(),
            form_element: ".login-form".into(),
            email_element: ".login-email-field".into(),
            email_error: "[data-error-name=\"email\"]".into(),
            password_element: ".login-password-field".into(),
            password_error: "[data-error-name=\"password\"]".into(),
            submit_element: ".login-form-submit".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    pub form_namespace: String,
    pub action_url: String,
    pub form_element: String,
    pub email_element: String,
    pub email_error: String,
    pub email_success: String,
    pub submit_element: String,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            form_namespace: "RecoveryForm".into(),
            action_url: "/account/remindPassword".into(),
            form_element: ".recovery-form".into(),
            email_element: ".recovery-email-field".into(),
            email_error: "[data-error-name=\"email\"]".into(),
            email_success: "[data-success-name=\"email\"]".into(),
            submit_element: ".recovery-form-submit".into(),
        }
    }
}

/// Fully populated controller configuration. Every level is `#[serde(default)]`,
/// so a partial TOML document only overrides the keys it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    pub login: LoginSettings,
    pub recovery: RecoverySettings,
    pub field_container: String,
    pub field_element: String,
    /// Field-state classes for hosts that style them; the controller itself
    /// never toggles these.
    pub error_class: String,
    pub valid_class: String,
    pub visible_class: String,
    pub hidden_class: String,
    /// Control on the login side that opens the recovery form.
    pub recovery_switch_element: String,
    /// Control on the recovery side that returns to the login form.
    pub login_switch_element: String,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            login: LoginSettings::default(),
            recovery: RecoverySettings::default(),
            field_container: ".form-item".into(),
            field_element: ".form-input input".into(),
            error_class: "error-field".into(),
            valid_class: "valid-field".into(),
            visible_class: "visible".into(),
            hidden_class: "hidden".into(),
            recovery_switch_element: ".recovery-password-btn".into(),
            login_switch_element: ".login-switch-btn".into(),
        }
    }
}

/// Per-form view over the selectors both forms share.
#[derive(Debug, Clone, Copy)]
pub struct FormSelectors<'a> {
    pub namespace: &'a str,
    pub action_url: &'a str,
    pub form_element: &'a str,
    pub email_element: &'a str,
    pub submit_element: &'a str,
}

impl FormSettings {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        toml::from_str(raw).context("failed to parse form settings")
    }

    pub fn selectors(&self, kind: FormKind) -> FormSelectors<'_> {
        match kind {
            FormKind::Login => FormSelectors {
                namespace: &self.login.form_namespace,
                action_url: &self.login.action_url,
                form_element: &self.login.form_element,
                email_element: &self.login.email_element,
                submit_element: &self.login.submit_element,
            },
            FormKind::Recovery => FormSelectors {
                namespace: &self.recovery.form_namespace,
                action_url: &self.recovery.action_url,
                form_element: &self.recovery.form_element,
                email_element: &self.recovery.email_element,
                submit_element: &self.recovery.submit_element,
            },
        }
    }

    /// Selector of the control that switches away from `kind`.
    pub fn switch_element(&self, kind: FormKind) -> &str {
        match kind {
            FormKind::Login => &self.recovery_switch_element,
            FormKind::Recovery => &self.login_switch_element,
        }
    }
}

/// Loads settings from an optional TOML file layered over the defaults.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<FormSettings> {
    let Some(path) = path else {
        return Ok(FormSettings::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read form settings '{}'", path.display()))?;
    FormSettings::from_toml_str(&raw)
        .with_context(|| format!("invalid form settings in '{}'", path.display()))
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
