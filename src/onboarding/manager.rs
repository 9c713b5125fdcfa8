//! OnboardingWizard: coordinates step state, uploads, step saves, the
//! persisted draft id, and the final submit.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::api::OnboardingApi;
use crate::attachments::{FilePicker, LocalFile};
use crate::error::{FALLBACK_MESSAGE, OnboardingError};
use crate::store::KeyValueStore;

use super::model::{ApplicationForm, ApplicationKind, DraftId, StepPayload, attachment_field};
use super::state::OnboardingStep;
use super::validation::validate_step;

/// In-memory wizard state.
#[derive(Debug, Clone, Default)]
struct WizardState {
    step: OnboardingStep,
    draft_id: Option<DraftId>,
    form: ApplicationForm,
    /// The outlet step was saved; submit is now allowed.
    outlet_saved: bool,
    /// Bumped whenever the wizard is reset. Replies to requests sent under
    /// an older value are dropped.
    epoch: u64,
}

/// Point-in-time view of the wizard for status display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardSnapshot {
    pub kind: ApplicationKind,
    pub step: OnboardingStep,
    pub step_number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<DraftId>,
    pub outlet_saved: bool,
}

/// Drives one vendor or franchisee application through its steps.
///
/// No lock is held while a request is in flight. State only changes after
/// the backend answers `ok: true`, and only if the wizard was not reset in
/// the meantime (a step save also requires the wizard to still be on the
/// step it sent). A stale reply is dropped with
/// [`OnboardingError::Superseded`].
pub struct OnboardingWizard {
    kind: ApplicationKind,
    api: Arc<dyn OnboardingApi>,
    store: Arc<dyn KeyValueStore>,
    picker: Arc<dyn FilePicker>,
    state: RwLock<WizardState>,
}

impl OnboardingWizard {
    pub fn new(
        kind: ApplicationKind,
        api: Arc<dyn OnboardingApi>,
        store: Arc<dyn KeyValueStore>,
        picker: Arc<dyn FilePicker>,
    ) -> Self {
        Self {
            kind,
            api,
            store,
            picker,
            state: RwLock::new(WizardState::default()),
        }
    }

    pub fn kind(&self) -> ApplicationKind {
        self.kind
    }

    /// Load the draft id left by a previous run.
    ///
    /// The wizard still opens at the first step; the id is reused by every
    /// later save so the backend keeps appending to the same draft.
    pub async fn init(&self) -> Result<Option<DraftId>, OnboardingError> {
        let persisted = self
            .store
            .get(self.kind.draft_key())
            .await?
            .and_then(DraftId::new);

        let mut state = self.state.write().await;
        state.step = OnboardingStep::Identity;
        state.draft_id = persisted.clone();
        state.outlet_saved = false;
        state.epoch = state.epoch.wrapping_add(1);

        match &persisted {
            Some(id) => tracing::info!(kind = %self.kind, draft_id = %id, "Resuming draft application"),
            None => tracing::debug!(kind = %self.kind, "No draft application on device"),
        }
        Ok(persisted)
    }

    pub async fn current_step(&self) -> OnboardingStep {
        self.state.read().await.step
    }

    pub async fn draft_id(&self) -> Option<DraftId> {
        self.state.read().await.draft_id.clone()
    }

    /// Field values entered so far for `step`.
    pub async fn fields(&self, step: OnboardingStep) -> StepPayload {
        self.state.read().await.form.step(step)
    }

    pub async fn snapshot(&self) -> WizardSnapshot {
        let state = self.state.read().await;
        WizardSnapshot {
            kind: self.kind,
            step: state.step,
            step_number: state.step.number(),
            draft_id: state.draft_id.clone(),
            outlet_saved: state.outlet_saved,
        }
    }

    /// Set one field of a form step.
    pub async fn set_field(
        &self,
        step: OnboardingStep,
        key: &str,
        value: &str,
    ) -> Result<(), OnboardingError> {
        if step.is_terminal() {
            return Err(OnboardingError::AlreadySubmitted);
        }
        let mut state = self.state.write().await;
        if state.step.is_terminal() {
            return Err(OnboardingError::AlreadySubmitted);
        }
        state.form.step_mut(step).set(key, value);
        if step == OnboardingStep::OutletLocation {
            state.outlet_saved = false;
        }
        Ok(())
    }

    /// Merge several fields into a form step.
    pub async fn set_fields(
        &self,
        step: OnboardingStep,
        fields: &StepPayload,
    ) -> Result<(), OnboardingError> {
        for (key, value) in fields.iter() {
            self.set_field(step, key, value).await?;
        }
        Ok(())
    }

    /// Ask the file picker for a document and upload it for `step`.
    ///
    /// Returns `Ok(None)` when the user cancels the picker; nothing changes.
    pub async fn pick_and_upload(
        &self,
        step: OnboardingStep,
    ) -> Result<Option<String>, OnboardingError> {
        match self.picker.pick().await {
            Some(file) => self.upload_attachment(step, &file).await.map(Some),
            None => {
                tracing::debug!(%step, "File picker cancelled");
                Ok(None)
            }
        }
    }

    /// Upload `file` as the attachment of `step` and record its URL.
    ///
    /// On any failure the step's attachment field is left exactly as it was.
    pub async fn upload_attachment(
        &self,
        step: OnboardingStep,
        file: &LocalFile,
    ) -> Result<String, OnboardingError> {
        let spec = attachment_field(step).ok_or(OnboardingError::AlreadySubmitted)?;
        let epoch = {
            let state = self.state.read().await;
            if state.step.is_terminal() {
                return Err(OnboardingError::AlreadySubmitted);
            }
            state.epoch
        };

        let url = match self.api.upload(file).await {
            Ok(resp) if resp.ok => match resp.data.map(|d| d.url).filter(|u| !u.trim().is_empty()) {
                Some(url) => url,
                None => {
                    tracing::warn!(%step, file = %file.name, "Upload succeeded without a URL");
                    return Err(OnboardingError::Upload(FALLBACK_MESSAGE.to_string()));
                }
            },
            Ok(resp) => {
                let message = resp.message_or(FALLBACK_MESSAGE);
                tracing::warn!(%step, file = %file.name, "Upload rejected: {}", message);
                return Err(OnboardingError::Upload(message));
            }
            Err(e) => {
                tracing::warn!(%step, file = %file.name, "Upload failed: {}", e);
                return Err(OnboardingError::Upload(FALLBACK_MESSAGE.to_string()));
            }
        };

        let mut state = self.state.write().await;
        if state.epoch != epoch || state.step.is_terminal() {
            tracing::warn!(%step, file = %file.name, "Wizard moved on during upload; dropping URL");
            return Err(OnboardingError::Superseded);
        }
        state.form.step_mut(step).set(spec.key, url.clone());
        if step == OnboardingStep::OutletLocation {
            state.outlet_saved = false;
        }
        tracing::info!(%step, field = spec.key, "Attachment attached");
        Ok(url)
    }

    /// Validate the current step's fields locally.
    pub async fn validate_current(&self) -> Result<(), OnboardingError> {
        let state = self.state.read().await;
        if state.step.is_terminal() {
            return Err(OnboardingError::AlreadySubmitted);
        }
        validate_step(state.step, &state.form.step(state.step))
    }

    /// Validate and save the current step, then move to the next one.
    ///
    /// The first successful save of the application captures the draft id
    /// and persists it. At the outlet step the wizard stays put and only
    /// [`Self::submit_application`] moves it on.
    pub async fn save_step_and_advance(&self) -> Result<DraftId, OnboardingError> {
        let (step, draft_id, payload, epoch) = {
            let state = self.state.read().await;
            if state.step.is_terminal() {
                return Err(OnboardingError::AlreadySubmitted);
            }
            let payload = state.form.step(state.step);
            validate_step(state.step, &payload)?;
            (state.step, state.draft_id.clone(), payload, state.epoch)
        };

        let resp = match self
            .api
            .save_step(self.kind, step, draft_id.as_ref(), &payload)
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(kind = %self.kind, %step, "Step save failed: {}", e);
                return Err(OnboardingError::StepSave(FALLBACK_MESSAGE.to_string()));
            }
        };

        if !resp.ok {
            let message = resp.message_or(FALLBACK_MESSAGE);
            tracing::warn!(kind = %self.kind, %step, "Step save rejected: {}", message);
            return Err(OnboardingError::StepSave(message));
        }

        let returned = resp.data.and_then(|d| DraftId::new(d.id));

        let mut state = self.state.write().await;
        if state.epoch != epoch || state.step != step {
            tracing::warn!(
                kind = %self.kind,
                %step,
                now = %state.step,
                "Wizard moved on during step save; dropping reply"
            );
            return Err(OnboardingError::Superseded);
        }

        let id = match (state.draft_id.clone(), returned) {
            (Some(held), Some(returned)) if held != returned => {
                tracing::warn!(
                    kind = %self.kind,
                    draft_id = %held,
                    returned = %returned,
                    "Backend returned a different draft id; keeping the original"
                );
                held
            }
            (Some(held), _) => held,
            (None, Some(returned)) => {
                self.store
                    .set(self.kind.draft_key(), returned.as_str())
                    .await?;
                tracing::info!(kind = %self.kind, draft_id = %returned, "Draft application created");
                returned
            }
            (None, None) => {
                tracing::warn!(kind = %self.kind, %step, "First step save returned no draft id");
                return Err(OnboardingError::StepSave(FALLBACK_MESSAGE.to_string()));
            }
        };

        state.draft_id = Some(id.clone());
        if step == OnboardingStep::OutletLocation {
            // Edits made while the save ran still need saving.
            state.outlet_saved = state.form.step(step) == payload;
            tracing::info!(kind = %self.kind, draft_id = %id, "Outlet step saved; ready to submit");
        } else if let Some(next) = step.next().filter(|n| step.can_transition_to(*n)) {
            state.step = next;
            tracing::info!(kind = %self.kind, from = %step, to = %next, "Step saved");
        }
        Ok(id)
    }

    /// Finalize the application.
    ///
    /// On success the persisted draft id is removed and the wizard becomes
    /// `Submitted`. On failure nothing changes, so the user can retry.
    pub async fn submit_application(&self) -> Result<(), OnboardingError> {
        let (draft_id, epoch) = {
            let state = self.state.read().await;
            match state.step {
                OnboardingStep::Submitted => return Err(OnboardingError::AlreadySubmitted),
                OnboardingStep::OutletLocation if state.outlet_saved => {}
                other => {
                    return Err(OnboardingError::InvalidTransition {
                        from: other.to_string(),
                        to: OnboardingStep::Submitted.to_string(),
                    });
                }
            }
            (state.draft_id.clone().ok_or(OnboardingError::NoDraft)?, state.epoch)
        };

        match self.api.submit(self.kind, &draft_id).await {
            Ok(resp) if resp.ok => {}
            Ok(resp) => {
                let message = resp.message_or(FALLBACK_MESSAGE);
                tracing::warn!(kind = %self.kind, draft_id = %draft_id, "Submit rejected: {}", message);
                return Err(OnboardingError::Submit(message));
            }
            Err(e) => {
                tracing::warn!(kind = %self.kind, draft_id = %draft_id, "Submit failed: {}", e);
                return Err(OnboardingError::Submit(FALLBACK_MESSAGE.to_string()));
            }
        }

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            tracing::warn!(kind = %self.kind, draft_id = %draft_id, "Wizard was reset during submit; dropping reply");
            return Err(OnboardingError::Superseded);
        }

        // The backend has accepted it; losing the local id only costs resumability.
        if let Err(e) = self.store.remove(self.kind.draft_key()).await {
            tracing::warn!(kind = %self.kind, "Failed to clear persisted draft id: {}", e);
        }

        state.step = OnboardingStep::Submitted;
        state.draft_id = None;
        state.form.clear();
        state.outlet_saved = false;
        tracing::info!(kind = %self.kind, draft_id = %draft_id, "Application submitted");
        Ok(())
    }

    /// Go back one step without revalidating. No-op on the first step.
    pub async fn back(&self) -> Result<OnboardingStep, OnboardingError> {
        let mut state = self.state.write().await;
        if state.step.is_terminal() {
            return Err(OnboardingError::AlreadySubmitted);
        }
        if let Some(prev) = state.step.previous() {
            tracing::debug!(from = %state.step, to = %prev, "Step back");
            state.step = prev;
        }
        Ok(state.step)
    }

    /// Forget the current draft and start over from the first step.
    pub async fn start_new_application(&self) -> Result<(), OnboardingError> {
        let mut state = self.state.write().await;
        self.store.remove(self.kind.draft_key()).await?;
        *state = WizardState {
            epoch: state.epoch.wrapping_add(1),
            ..WizardState::default()
        };
        tracing::info!(kind = %self.kind, "Started a new application");
        Ok(())
    }
}
