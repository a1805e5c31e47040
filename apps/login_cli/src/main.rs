use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use form_controller::{
    load_settings, Document, FormAction, FormController, HttpTransport, MemoryDocument,
    MemoryNavigator, SubmitOutcome,
};
use shared::domain::FieldKey;
use tracing::info;
use url::Url;

/// Drives the login / recovery forms of an in-memory page against a live
/// validation endpoint.
#[derive(Parser, Debug)]
struct Args {
    /// Page URL the forms are served from; action URLs resolve against it.
    #[arg(long)]
    base_url: Url,
    /// TOML file overriding the default selectors and endpoints.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    password: String,
    /// Switch to the recovery form instead of submitting the login form.
    #[arg(long)]
    recover: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let settings = load_settings(args.config.as_deref())?;
    let (document, container) =
        MemoryDocument::login_page(&settings).context("failed to build page from settings")?;
    let document = Arc::new(document);
    let navigator = Arc::new(MemoryNavigator::new(args.base_url.clone()));
    let transport = Arc::new(HttpTransport::new(args.base_url));

    let login_namespace = settings.login.form_namespace.clone();
    let recovery_namespace = settings.recovery.form_namespace.clone();
    let controller = FormController::new(
        container,
        settings,
        document.clone(),
        transport,
        navigator.clone(),
    )?;

    let fill = |key: FieldKey, value: &str| -> Result<()> {
        let element = document
            .query_selector(document.root(), &format!("[name=\"{key}\"]"))
            .with_context(|| format!("field {key} missing from page"))?;
        document.set_value(element, value);
        Ok(())
    };
    fill(FieldKey::new(&login_namespace, "email"), &args.email)?;
    fill(FieldKey::new(&login_namespace, "password"), &args.password)?;

    let action = if args.recover {
        FormAction::ShowRecovery
    } else {
        FormAction::SubmitLogin
    };
    info!(?action, "dispatching");
    let outcome = controller.dispatch(action).await?;
    println!("Outcome: {outcome:?}");

    if let Some(slot) = controller.last_message_slot().await {
        println!("Message: {}", document.inner_html(slot));
    }
    for url in navigator.visits() {
        println!("Navigated to {url}");
    }
    if outcome == SubmitOutcome::Submitted {
        println!(
            "Login form submitted ({} submission(s) recorded)",
            document.submissions().len()
        );
    }
    if args.recover {
        if let Some(email) = controller
            .stored_value(&FieldKey::new(&recovery_namespace, "email"))
            .await
        {
            println!("Recovery requested for {email}");
        }
    }

    Ok(())
}
