use super::*;

fn sample_form() -> (MemoryDocument, ElementRef) {
    let document = MemoryDocument::new();
    let form = document.create_element(document.root(), "form", &[("class", "login-form visible")]);
    let item = document.create_element(form, "div", &[("class", "form-item")]);
    let wrapper = document.create_element(item, "div", &[("class", "form-input")]);
    document.create_element(
        wrapper,
        "input",
        &[("name", "LoginForm[email]"), ("value", "a@b.c")],
    );
    document.create_element(item, "div", &[("data-error-name", "email")]);
    (document, form)
}

#[test]
fn parses_compound_and_descendant_selectors() {
    let selector = Selector::parse(".form-input input").expect("parse");
    assert_eq!(selector.chain.len(), 2);
    assert_eq!(selector.chain[0].classes, vec!["form-input".to_string()]);
    assert_eq!(selector.chain[1].tag.as_deref(), Some("input"));

    let selector = Selector::parse("input.field[data-error-name=\"email\"]").expect("parse");
    let field = &selector.chain[0];
    assert_eq!(field.tag.as_deref(), Some("input"));
    assert_eq!(field.classes, vec!["field".to_string()]);
    assert_eq!(
        field.attrs,
        vec![("data-error-name".to_string(), Some("email".to_string()))]
    );
}

#[test]
fn rejects_unsupported_selector_syntax() {
    assert!(matches!(Selector::parse("   "), Err(SelectorError::Empty(_))));
    assert!(matches!(
        Selector::parse(".a > .b"),
        Err(SelectorError::Unexpected { found: '>', .. })
    ));
    assert!(matches!(
        Selector::parse(".a, .b"),
        Err(SelectorError::Unexpected { found: ',', .. })
    ));
    assert!(matches!(
        Selector::parse("#id"),
        Err(SelectorError::Unexpected { found: '#', .. })
    ));
    assert!(matches!(
        Selector::parse("[name=\"x"),
        Err(SelectorError::UnexpectedEnd(_))
    ));
}

#[test]
fn queries_are_scoped_to_descendants() {
    let (document, form) = sample_form();
    let other = document.create_element(document.root(), "form", &[("class", "recovery-form")]);
    let other_input = document.create_element(other, "input", &[("name", "RecoveryForm[email]")]);

    let inputs = document.query_selector_all(form, "input");
    assert_eq!(inputs.len(), 1);
    assert_eq!(
        document.attribute(inputs[0], "name").as_deref(),
        Some("LoginForm[email]")
    );
    assert_eq!(document.query_selector(form, ".recovery-form"), None);
    assert_eq!(
        document.query_selector(document.root(), ".recovery-form input"),
        Some(other_input)
    );
}

#[test]
fn descendant_combinator_may_match_ancestors_outside_scope() {
    let (document, form) = sample_form();
    let item = document
        .query_selector(form, ".form-item")
        .expect("form item");

    assert_eq!(document.query_selector_all(item, ".form-input input").len(), 1);
    assert_eq!(document.query_selector_all(item, ".login-form input").len(), 1);
}

#[test]
fn attribute_selector_matches_quoted_value() {
    let (document, form) = sample_form();
    let slot = document
        .query_selector(form, "[data-error-name=\"email\"]")
        .expect("slot");
    assert_eq!(document.query_selector(form, "[data-error-name='email']"), Some(slot));
    assert_eq!(document.query_selector(form, "[data-error-name=password]"), None);
    assert_eq!(document.query_selector(form, "[data-error-name]"), Some(slot));
}

#[test]
fn invalid_selector_matches_nothing() {
    let (document, form) = sample_form();
    assert_eq!(document.query_selector(form, "input >"), None);
    assert!(document.query_selector_all(form, "").is_empty());
}

#[test]
fn form_data_lists_named_enabled_controls() {
    let (document, form) = sample_form();
    document.create_element(form, "input", &[("value", "unnamed")]);
    document.create_element(
        form,
        "input",
        &[("name", "LoginForm[remember]"), ("disabled", "")],
    );
    let note = document.create_element(form, "textarea", &[("name", "LoginForm[note]")]);
    document.set_value(note, "hi");

    assert_eq!(
        document.form_data(form),
        vec![
            ("LoginForm[email]".to_string(), "a@b.c".to_string()),
            ("LoginForm[note]".to_string(), "hi".to_string()),
        ]
    );
}

#[test]
fn class_and_content_mutations() {
    let (document, form) = sample_form();
    document.remove_class(form, "visible");
    document.add_class(form, "hidden");
    document.add_class(form, "hidden");

    assert!(!document.has_class(form, "visible"));
    assert_eq!(
        document.attribute(form, "class").as_deref(),
        Some("login-form hidden")
    );

    document.set_inner_html(form, "<b>hi</b>");
    assert_eq!(document.inner_html(form), "<b>hi</b>");
}

#[test]
fn records_listeners_and_submissions() {
    let (document, form) = sample_form();
    let button = document.create_element(form, "button", &[("class", "login-form-submit")]);

    document.add_click_listener(button, FormAction::SubmitLogin);
    document.submit(form);

    assert_eq!(document.click(button), Some(FormAction::SubmitLogin));
    assert_eq!(document.click(form), None);
    assert_eq!(document.submissions(), vec![form]);
}

#[test]
fn login_page_satisfies_default_selectors() {
    let settings = FormSettings::default();
    let (document, container) = MemoryDocument::login_page(&settings).expect("page");

    let login = document
        .query_selector(container, &settings.login.form_element)
        .expect("login form");
    let recovery = document
        .query_selector(container, &settings.recovery.form_element)
        .expect("recovery form");
    assert!(document.has_class(login, "visible"));
    assert!(document.has_class(recovery, "hidden"));

    let login_fields = document.query_selector_all(login, &settings.field_element);
    let names: Vec<_> = login_fields
        .iter()
        .filter_map(|field| document.attribute(*field, "name"))
        .collect();
    assert_eq!(names, vec!["LoginForm[email]", "LoginForm[password]"]);

    let email = document
        .query_selector(login, &settings.login.email_element)
        .expect("email");
    assert_eq!(login_fields[0], email);
    assert!(document
        .query_selector(login, &settings.login.password_error)
        .is_some());
    assert!(document
        .query_selector(recovery, &settings.recovery.email_success)
        .is_some());
    assert!(document
        .query_selector(container, &settings.recovery_switch_element)
        .is_some());
    assert!(document
        .query_selector(container, &settings.login_switch_element)
        .is_some());
    assert_eq!(
        document.form_data(recovery),
        vec![("RecoveryForm[email]".to_string(), String::new())]
    );
}
