use super::*;
use crate::memory::MemoryDocument;
use shared::error::ErrorCode;

struct Page {
    document: MemoryDocument,
    settings: FormSettings,
    login: ElementRef,
    recovery: ElementRef,
}

fn page() -> Page {
    let settings = FormSettings::default();
    let (document, container) = MemoryDocument::login_page(&settings).expect("page");
    let login = document
        .query_selector(container, &settings.login.form_element)
        .expect("login form");
    let recovery = document
        .query_selector(container, &settings.recovery.form_element)
        .expect("recovery form");
    Page {
        document,
        settings,
        login,
        recovery,
    }
}

fn key(name: &str) -> FieldKey {
    FieldKey::from_name(name)
}

#[test]
fn registers_all_three_fields_with_slots() {
    let page = page();
    let registry =
        FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
            .expect("registry");

    assert_eq!(registry.keys().count(), 3);
    let password = registry.get(&key("LoginForm[password]")).expect("password");
    assert!(password.error_slot.is_some());
    assert!(password.success_slot.is_none());
    assert_eq!(password.value, None);

    let recovery_email = registry.get(&key("RecoveryForm[email]")).expect("email");
    assert!(recovery_email.error_slot.is_some());
    assert!(recovery_email.success_slot.is_some());
    assert_ne!(recovery_email.error_slot, recovery_email.success_slot);
}

#[test]
fn missing_input_is_a_configuration_error() {
    let page = page();
    let mut settings = page.settings.clone();
    settings.login.password_element = ".no-such-field".into();

    let err = FieldRegistry::build(&page.document, &settings, page.login, page.recovery)
        .expect_err("missing element");
    assert!(matches!(
        err,
        ControllerError::MissingElement { ref selector, .. } if selector == ".no-such-field"
    ));
}

#[test]
fn unnamed_input_is_a_configuration_error() {
    let page = page();
    let email = page
        .document
        .query_selector(page.login, &page.settings.login.email_element)
        .expect("email");
    page.document.remove_attribute(email, "name");

    let err = FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
        .expect_err("unnamed");
    assert!(matches!(
        err,
        ControllerError::MissingName {
            form: FormKind::Login,
            ..
        }
    ));
}

#[test]
fn email_name_outside_namespace_is_rejected() {
    let page = page();
    let email = page
        .document
        .query_selector(page.recovery, &page.settings.recovery.email_element)
        .expect("email");
    page.document.set_attribute(email, "name", "email");

    let err = FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
        .expect_err("missing namespaced email");
    assert!(matches!(
        err,
        ControllerError::MissingField { ref key } if key.as_str() == "RecoveryForm[email]"
    ));
}

#[test]
fn first_check_never_short_circuits_even_for_empty_inputs() {
    let page = page();
    let registry =
        FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
            .expect("registry");

    assert!(!registry
        .has_unchanged_values(&page.document, page.login, &page.settings.field_element)
        .expect("check"));
}

#[test]
fn sync_then_compare_detects_edits() {
    let page = page();
    let mut registry =
        FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
            .expect("registry");
    let field_selector = page.settings.field_element.clone();
    let email = registry
        .descriptor(&key("LoginForm[email]"))
        .expect("email")
        .element;
    page.document.set_value(email, "a@b.c");

    registry
        .sync_from_form(&page.document, page.login, &field_selector)
        .expect("sync");
    assert_eq!(
        registry.get(&key("LoginForm[email]")).and_then(|f| f.value.as_deref()),
        Some("a@b.c")
    );
    assert_eq!(
        registry
            .get(&key("LoginForm[password]"))
            .and_then(|f| f.value.as_deref()),
        Some("")
    );
    assert_eq!(registry.get(&key("RecoveryForm[email]")).and_then(|f| f.value.clone()), None);
    assert!(registry
        .has_unchanged_values(&page.document, page.login, &field_selector)
        .expect("check"));

    page.document.set_value(email, "x@y.z");
    assert!(!registry
        .has_unchanged_values(&page.document, page.login, &field_selector)
        .expect("check"));
}

#[test]
fn unregistered_field_is_a_lookup_failure() {
    let page = page();
    let mut registry =
        FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
            .expect("registry");
    let item = page
        .document
        .query_selector(page.login, &page.settings.field_container)
        .expect("item");
    let wrapper = page
        .document
        .create_element(item, "div", &[("class", "form-input")]);
    page.document
        .create_element(wrapper, "input", &[("name", "LoginForm[remember]")]);

    let err = registry
        .sync_from_form(&page.document, page.login, &page.settings.field_element)
        .expect_err("lookup");
    assert!(matches!(
        err,
        ControllerError::UnknownField { ref key } if key.as_str() == "LoginForm[remember]"
    ));
    assert_eq!(err.code(), ErrorCode::LookupFailure);
    assert!(registry
        .ensure_covers(&page.document, page.login, &page.settings.field_element)
        .is_err());
    assert!(registry
        .ensure_covers(&page.document, page.recovery, &page.settings.field_element)
        .is_ok());
}

#[test]
fn form_without_matching_fields_counts_as_unchanged() {
    let page = page();
    let registry =
        FieldRegistry::build(&page.document, &page.settings, page.login, page.recovery)
            .expect("registry");

    assert!(registry
        .has_unchanged_values(&page.document, page.login, ".nothing-matches")
        .expect("check"));
}
