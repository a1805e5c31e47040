use shared::{
    domain::{FieldKey, FormKind},
    error::ErrorCode,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no element matches {selector:?} in the {scope}")]
    MissingElement { scope: String, selector: String },
    #[error("field matched by {selector:?} in the {form} form has no name attribute")]
    MissingName { form: FormKind, selector: String },
    #[error("field {key} is registered twice")]
    DuplicateField { key: FieldKey },
    #[error("required field {key} is not present in the page")]
    MissingField { key: FieldKey },
    #[error("field {key} is not registered")]
    UnknownField { key: FieldKey },
}

impl ControllerError {
    /// Every variant is a broken page/registry contract.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::LookupFailure
    }

    pub(crate) fn missing_in_form(form: FormKind, selector: &str) -> Self {
        Self::MissingElement {
            scope: format!("{form} form"),
            selector: selector.to_string(),
        }
    }

    pub(crate) fn missing_in_container(selector: &str) -> Self {
        Self::MissingElement {
            scope: "form container".to_string(),
            selector: selector.to_string(),
        }
    }
}
