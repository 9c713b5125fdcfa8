//! Application form data: kinds, per-step field sets, payloads, draft ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::keys;

use super::state::OnboardingStep;

/// Which registration flow is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    Franchisee,
    Vendor,
}

impl ApplicationKind {
    /// Endpoint prefix on the backend.
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Franchisee => "franchisees",
            Self::Vendor => "vendors",
        }
    }

    /// Key under which the draft id is persisted locally, and under which
    /// it is sent in JSON step bodies.
    pub fn draft_key(&self) -> &'static str {
        match self {
            Self::Franchisee => keys::FRANCHISEE_ID,
            Self::Vendor => keys::VENDOR_ID,
        }
    }
}

impl std::fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Franchisee => write!(f, "franchisee"),
            Self::Vendor => write!(f, "vendor"),
        }
    }
}

/// Whether a required field is typed in or uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Holds the URL returned by the upload endpoint.
    Attachment,
}

/// A required field of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn text(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Text,
        }
    }

    const fn attachment(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            kind: FieldKind::Attachment,
        }
    }

    /// Alert text shown when this field is the first one missing.
    pub fn missing_message(&self) -> String {
        match self.kind {
            FieldKind::Text => format!("Please enter {}", self.label),
            FieldKind::Attachment => format!("Please upload {}", self.label),
        }
    }
}

const IDENTITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("firstName", "first name"),
    FieldSpec::text("lastName", "last name"),
    FieldSpec::text("dob", "date of birth"),
    FieldSpec::text("panNumber", "PAN number"),
    FieldSpec::attachment("panImage", "PAN card image"),
];

const ADDRESS_PROOF_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("addressLine1", "address"),
    FieldSpec::text("city", "city"),
    FieldSpec::text("state", "state"),
    FieldSpec::text("pincode", "pincode"),
    FieldSpec::text("aadhaarNumber", "Aadhaar number"),
    FieldSpec::attachment("aadhaarImage", "Aadhaar card image"),
];

const TAX_REGISTRATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("gstNumber", "GST number"),
    FieldSpec::text("legalName", "legal business name"),
    FieldSpec::attachment("gstCertificate", "GST certificate"),
];

const BANKING_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("accountHolderName", "account holder name"),
    FieldSpec::text("accountNumber", "account number"),
    FieldSpec::text("ifscCode", "IFSC code"),
    FieldSpec::text("bankName", "bank name"),
    FieldSpec::text("branchName", "branch name"),
    FieldSpec::attachment("cancelledCheque", "cancelled cheque"),
];

const OUTLET_LOCATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("outletName", "outlet name"),
    FieldSpec::text("managerName", "manager name"),
    FieldSpec::text("managerMobile", "manager mobile number"),
    FieldSpec::text("street", "street"),
    FieldSpec::text("city", "city"),
    FieldSpec::text("state", "state"),
    FieldSpec::text("pincode", "pincode"),
    FieldSpec::attachment("outletImage", "outlet photo"),
];

/// Required fields of a step, in the order they are checked. Text fields
/// come first and the single attachment last. `Submitted` has none.
pub fn required_fields(step: OnboardingStep) -> &'static [FieldSpec] {
    match step {
        OnboardingStep::Identity => IDENTITY_FIELDS,
        OnboardingStep::AddressProof => ADDRESS_PROOF_FIELDS,
        OnboardingStep::TaxRegistration => TAX_REGISTRATION_FIELDS,
        OnboardingStep::Banking => BANKING_FIELDS,
        OnboardingStep::OutletLocation => OUTLET_LOCATION_FIELDS,
        OnboardingStep::Submitted => &[],
    }
}

/// The attachment field of a step.
pub fn attachment_field(step: OnboardingStep) -> Option<&'static FieldSpec> {
    required_fields(step)
        .iter()
        .find(|f| f.kind == FieldKind::Attachment)
}

/// Named field values of one step, sent wholesale on save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepPayload(BTreeMap<String, String>);

impl StepPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Present and not just whitespace.
    pub fn is_filled(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object view for request bodies.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StepPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// In-memory field values for every step of one application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationForm {
    steps: BTreeMap<OnboardingStep, StepPayload>,
}

impl ApplicationForm {
    pub fn step(&self, step: OnboardingStep) -> StepPayload {
        self.steps.get(&step).cloned().unwrap_or_default()
    }

    pub fn step_mut(&mut self, step: OnboardingStep) -> &mut StepPayload {
        self.steps.entry(step).or_default()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

/// Server-assigned id of a draft application. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DraftId(String);

impl DraftId {
    /// `None` for empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DraftId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "draft id must not be empty".to_string())
    }
}

impl From<DraftId> for String {
    fn from(id: DraftId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_form_step_has_exactly_one_attachment_last() {
        for step in OnboardingStep::FORM_STEPS {
            let fields = required_fields(step);
            let attachments: Vec<_> = fields
                .iter()
                .filter(|f| f.kind == FieldKind::Attachment)
                .collect();
            assert_eq!(attachments.len(), 1, "{step} should have one attachment");
            assert_eq!(fields.last().map(|f| f.kind), Some(FieldKind::Attachment));
        }
        assert!(required_fields(OnboardingStep::Submitted).is_empty());
    }

    #[test]
    fn kind_keys() {
        assert_eq!(ApplicationKind::Franchisee.draft_key(), "franchiseeId");
        assert_eq!(ApplicationKind::Vendor.draft_key(), "vendorId");
        assert_eq!(ApplicationKind::Vendor.resource(), "vendors");
    }

    #[test]
    fn whitespace_is_not_filled() {
        let payload = StepPayload::new().with("firstName", "   ").with("lastName", "B");
        assert!(!payload.is_filled("firstName"));
        assert!(payload.is_filled("lastName"));
        assert!(!payload.is_filled("dob"));
    }

    #[test]
    fn payload_serializes_as_flat_object() {
        let payload = StepPayload::new().with("gstNumber", "29ABCDE1234F1Z5");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"gstNumber": "29ABCDE1234F1Z5"}));
        assert_eq!(payload.to_json(), json);
    }

    #[test]
    fn draft_id_rejects_empty() {
        assert!(DraftId::new("").is_none());
        assert!(DraftId::new("  ").is_none());
        assert_eq!(DraftId::new(" f123 ").unwrap().as_str(), "f123");
        assert!(serde_json::from_str::<DraftId>("\"\"").is_err());
    }

    #[test]
    fn form_steps_are_independent() {
        let mut form = ApplicationForm::default();
        form.step_mut(OnboardingStep::Identity).set("city", "Pune");
        assert!(form.step(OnboardingStep::OutletLocation).is_empty());
        form.clear();
        assert!(form.step(OnboardingStep::Identity).is_empty());
    }

    #[test]
    fn missing_messages() {
        let spec = attachment_field(OnboardingStep::Identity).unwrap();
        assert_eq!(spec.missing_message(), "Please upload PAN card image");
        assert_eq!(
            IDENTITY_FIELDS[0].missing_message(),
            "Please enter first name"
        );
    }
}
