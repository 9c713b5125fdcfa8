//! Local required-field checks, run before any network call.

use crate::error::OnboardingError;

use super::model::{StepPayload, required_fields};
use super::state::OnboardingStep;

/// Check that every required field of `step` is filled.
///
/// Short-circuits: the first missing field, in [`required_fields`] order,
/// is the only one reported.
pub fn validate_step(step: OnboardingStep, payload: &StepPayload) -> Result<(), OnboardingError> {
    match required_fields(step)
        .iter()
        .find(|spec| !payload.is_filled(spec.key))
    {
        Some(spec) => Err(OnboardingError::Validation {
            field: spec.key.to_string(),
            message: spec.missing_message(),
        }),
        None => Ok(()),
    }
}

/// `false` iff at least one required field of `step` is empty.
pub fn is_step_valid(step: OnboardingStep, payload: &StepPayload) -> bool {
    validate_step(step, payload).is_ok()
}
