//! Onboarding state machine: tracks which step the applicant is on.

use serde::{Deserialize, Serialize};

/// The steps of the onboarding wizard.
///
/// Progresses linearly: Identity → AddressProof → TaxRegistration →
/// Banking → OutletLocation → Submitted. Every non-terminal step except the
/// first can also go back one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Identity,
    AddressProof,
    TaxRegistration,
    Banking,
    OutletLocation,
    Submitted,
}

impl OnboardingStep {
    /// The five form steps, in order.
    pub const FORM_STEPS: [OnboardingStep; 5] = [
        Self::Identity,
        Self::AddressProof,
        Self::TaxRegistration,
        Self::Banking,
        Self::OutletLocation,
    ];

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Identity, AddressProof)
                | (AddressProof, TaxRegistration)
                | (TaxRegistration, Banking)
                | (Banking, OutletLocation)
                | (OutletLocation, Submitted)
                // back
                | (AddressProof, Identity)
                | (TaxRegistration, AddressProof)
                | (Banking, TaxRegistration)
                | (OutletLocation, Banking)
        )
    }

    /// Whether this step is terminal (application is submitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Submitted)
    }

    /// Next step in the forward progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Identity => Some(AddressProof),
            AddressProof => Some(TaxRegistration),
            TaxRegistration => Some(Banking),
            Banking => Some(OutletLocation),
            OutletLocation => Some(Submitted),
            Submitted => None,
        }
    }

    /// Previous form step. `None` for the first step and for `Submitted`.
    pub fn previous(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            AddressProof => Some(Identity),
            TaxRegistration => Some(AddressProof),
            Banking => Some(TaxRegistration),
            OutletLocation => Some(Banking),
            Identity | Submitted => None,
        }
    }

    /// 1-based position shown in the progress header. `Submitted` is 6.
    pub fn number(&self) -> u8 {
        match self {
            Self::Identity => 1,
            Self::AddressProof => 2,
            Self::TaxRegistration => 3,
            Self::Banking => 4,
            Self::OutletLocation => 5,
            Self::Submitted => 6,
        }
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::Identity
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identity => "identity",
            Self::AddressProof => "address_proof",
            Self::TaxRegistration => "tax_registration",
            Self::Banking => "banking",
            Self::OutletLocation => "outlet_location",
            Self::Submitted => "submitted",
        };
        write!(f, "{s}")
    }
}
