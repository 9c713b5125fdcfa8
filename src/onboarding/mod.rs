//! Vendor / franchisee onboarding wizard.
//!
//! The applicant walks a fixed sequence of steps (identity, address proof,
//! tax registration, banking, outlet). Each step uploads one document and
//! saves its fields to the backend; the first successful save creates a
//! draft application whose id is kept on the device until the final submit.

pub mod manager;
pub mod model;
pub mod state;
pub mod validation;

pub use manager::{OnboardingWizard, WizardSnapshot};
pub use model::{
    ApplicationForm, ApplicationKind, DraftId, FieldKind, FieldSpec, StepPayload,
    attachment_field, required_fields,
};
pub use state::OnboardingStep;
pub use validation::{is_step_valid, validate_step};
