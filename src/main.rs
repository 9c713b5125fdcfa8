use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use bbscart::api::{HttpApi, OnboardingApi};
use bbscart::attachments::{FilePicker, PathQueuePicker};
use bbscart::config::ClientConfig;
use bbscart::onboarding::{ApplicationKind, OnboardingStep, OnboardingWizard, StepPayload};
use bbscart::session::AuthSession;
use bbscart::store::{KeyValueStore, LibSqlStore};

/// Application answers read from disk.
#[derive(Debug, Deserialize)]
struct ApplicationFile {
    kind: ApplicationKind,
    #[serde(default)]
    steps: BTreeMap<OnboardingStep, StepPayload>,
    /// Document to upload for each step.
    #[serde(default)]
    attachments: BTreeMap<OnboardingStep, PathBuf>,
}

fn usage() -> ! {
    eprintln!("Usage: bbscart-onboard <application.json> [--new]");
    eprintln!("  --new   discard any draft on this device and start over");
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut path = None;
    let mut start_new = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--new" => start_new = true,
            "-h" | "--help" => usage(),
            other if path.is_none() => path = Some(PathBuf::from(other)),
            _ => usage(),
        }
    }
    let Some(path) = path else { usage() };

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let application: ApplicationFile =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let config = ClientConfig::from_env();
    eprintln!("bbscart onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    eprintln!("   Store: {}", config.db_path.display());
    eprintln!("   Application: {}", application.kind);

    let store: Arc<dyn KeyValueStore> = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    let session = Arc::new(AuthSession::init(Arc::clone(&store)).await?);
    if !session.is_authenticated().await {
        eprintln!("   Warning: not signed in; the backend may refuse the application");
    }
    let api: Arc<dyn OnboardingApi> = Arc::new(HttpApi::new(config)?.with_session(session));
    let picker = Arc::new(PathQueuePicker::new());

    let wizard = OnboardingWizard::new(
        application.kind,
        api,
        store,
        Arc::clone(&picker) as Arc<dyn FilePicker>,
    );

    if let Some(id) = wizard.init().await? {
        if start_new {
            wizard.start_new_application().await?;
            eprintln!("   Discarded draft {id}");
        } else {
            eprintln!("   Continuing draft {id}");
        }
    }

    if let Err(e) = run(&wizard, &picker, &application).await {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }

    eprintln!("Application submitted.");
    Ok(())
}

async fn run(
    wizard: &OnboardingWizard,
    picker: &PathQueuePicker,
    application: &ApplicationFile,
) -> Result<(), bbscart::error::OnboardingError> {
    for step in OnboardingStep::FORM_STEPS {
        if let Some(fields) = application.steps.get(&step) {
            wizard.set_fields(step, fields).await?;
        }
        if let Some(doc) = application.attachments.get(&step) {
            picker.push(doc.clone()).await;
            wizard.pick_and_upload(step).await?;
        }
        let id = wizard.save_step_and_advance().await?;
        eprintln!("   [{}/5] {step} saved (draft {id})", step.number());
    }
    wizard.submit_application().await
}
