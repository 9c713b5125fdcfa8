//! `reqwest` implementation of the backend traits.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::attachments::LocalFile;
use crate::cart::CartLine;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::normalize;
use crate::onboarding::{ApplicationKind, DraftId, OnboardingStep, StepPayload};
use crate::session::AuthSession;

use super::types::{ApiResponse, DraftRef, UploadedFile};
use super::{OnboardingApi, StorefrontApi};

/// How a step's fields travel to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StepRoute {
    /// `POST /{kind}/step` with `{ <draftKey>?, stepKey, data }`.
    Json { path: String },
    /// `PUT` multipart text fields against an existing draft.
    Multipart { path: String },
}

/// HTTP client for the bbscart backend.
pub struct HttpApi {
    config: ClientConfig,
    client: reqwest::Client,
    session: Option<Arc<AuthSession>>,
}

impl HttpApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("bbscart/{}", env!("CARGO_PKG_VERSION")));
        let client = builder
            .user_agent(user_agent)
            .build()
            .map_err(|e| ApiError::RequestFailed {
                endpoint: config.api_base_url.clone(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            client,
            session: None,
        })
    }

    /// Attach the signed-in session; its token is sent as a bearer token.
    pub fn with_session(mut self, session: Arc<AuthSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.config.endpoint(path));
        match &self.session {
            Some(session) => match session.token().await {
                Some(token) => builder.bearer_auth(token.expose_secret()),
                None => builder,
            },
            None => builder,
        }
    }

    /// Send and decode the `{ ok, data, message }` envelope.
    ///
    /// A non-2xx status always yields `ok: false`, keeping the server's
    /// message when the body carries one.
    async fn send_envelope<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        let resp = request.send().await.map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if status.is_success() {
            let envelope = serde_json::from_str::<ApiResponse<T>>(&body).map_err(|e| {
                ApiError::InvalidResponse {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            })?;
            return Ok(envelope);
        }

        tracing::warn!(endpoint, status = %status, "Backend returned an error status");
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| normalize::first_string(&v, &["message", "error"]));
        Ok(ApiResponse {
            ok: false,
            data: None,
            message,
        })
    }

    /// Send and return the raw JSON body, for list endpoints.
    async fn fetch_json(&self, endpoint: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        let resp = request.send().await.map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                endpoint: endpoint.to_string(),
                reason: format!("status {status}"),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| ApiError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        let request = self.request(Method::GET, path).await;
        let body = self.fetch_json(path, request).await?;
        Ok(normalize::list(&body))
    }
}

fn step_route(
    kind: ApplicationKind,
    step: OnboardingStep,
    draft_id: Option<&DraftId>,
) -> Result<StepRoute, ApiError> {
    let resource = kind.resource();
    let multipart = |suffix: &str| match draft_id {
        Some(id) => Ok(StepRoute::Multipart {
            path: format!("{resource}/{id}/{suffix}"),
        }),
        None => Err(ApiError::MissingDraftId {
            endpoint: format!("{resource}/:id/{suffix}"),
        }),
    };

    match step {
        OnboardingStep::Identity | OnboardingStep::AddressProof => Ok(StepRoute::Json {
            path: format!("{resource}/step"),
        }),
        OnboardingStep::TaxRegistration => multipart("gst"),
        OnboardingStep::Banking => multipart("bank-details"),
        OnboardingStep::OutletLocation => multipart("outlet"),
        OnboardingStep::Submitted => Err(ApiError::RequestFailed {
            endpoint: format!("{resource}/step"),
            reason: "a submitted application has no step to save".into(),
        }),
    }
}

fn json_step_body(
    kind: ApplicationKind,
    step: OnboardingStep,
    draft_id: Option<&DraftId>,
    payload: &StepPayload,
) -> Value {
    let mut body = json!({
        "stepKey": step.to_string(),
        "data": payload.to_json(),
    });
    if let (Some(id), Some(obj)) = (draft_id, body.as_object_mut()) {
        obj.insert(kind.draft_key().to_string(), Value::String(id.to_string()));
    }
    body
}

fn multipart_fields(payload: &StepPayload) -> Form {
    payload.iter().fold(Form::new(), |form, (key, value)| {
        form.text(key.to_string(), value.to_string())
    })
}

#[async_trait]
impl OnboardingApi for HttpApi {
    async fn upload(&self, file: &LocalFile) -> Result<ApiResponse<UploadedFile>, ApiError> {
        const ENDPOINT: &str = "upload";

        let bytes = file.read_bytes().await?;
        let part = Part::bytes(bytes)
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| ApiError::Attachment {
                name: file.name.clone(),
                reason: e.to_string(),
            })?;
        let form = Form::new().part("file", part);

        let request = self.request(Method::POST, ENDPOINT).await.multipart(form);
        let resp: ApiResponse<Value> = self.send_envelope(ENDPOINT, request).await?;
        if !resp.ok {
            return Ok(ApiResponse {
                ok: false,
                data: None,
                message: resp.message,
            });
        }

        let url = resp
            .data
            .as_ref()
            .and_then(|data| normalize::first_string(data, normalize::FILE_URL_KEYS))
            .ok_or_else(|| ApiError::InvalidResponse {
                endpoint: ENDPOINT.to_string(),
                reason: "upload response has no file URL".into(),
            })?;

        tracing::debug!(file = %file.name, %url, "Attachment uploaded");
        Ok(ApiResponse {
            ok: true,
            data: Some(UploadedFile { url }),
            message: resp.message,
        })
    }

    async fn save_step(
        &self,
        kind: ApplicationKind,
        step: OnboardingStep,
        draft_id: Option<&DraftId>,
        payload: &StepPayload,
    ) -> Result<ApiResponse<DraftRef>, ApiError> {
        match step_route(kind, step, draft_id)? {
            StepRoute::Json { path } => {
                let body = json_step_body(kind, step, draft_id, payload);
                let request = self.request(Method::POST, &path).await.json(&body);
                self.send_envelope(&path, request).await
            }
            StepRoute::Multipart { path } => {
                let request = self
                    .request(Method::PUT, &path)
                    .await
                    .multipart(multipart_fields(payload));
                self.send_envelope(&path, request).await
            }
        }
    }

    async fn submit(
        &self,
        kind: ApplicationKind,
        draft_id: &DraftId,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let path = format!("{}/{}/submit", kind.resource(), draft_id);
        let request = self.request(Method::POST, &path).await.json(&json!({}));
        self.send_envelope(&path, request).await
    }
}

#[async_trait]
impl StorefrontApi for HttpApi {
    async fn fetch_categories(&self) -> Result<Vec<Value>, ApiError> {
        self.fetch_list("categories").await
    }

    async fn fetch_subcategories(&self) -> Result<Vec<Value>, ApiError> {
        self.fetch_list("subcategories").await
    }

    async fn fetch_groups(&self) -> Result<Vec<Value>, ApiError> {
        self.fetch_list("groups").await
    }

    async fn fetch_products(&self, group_id: &str) -> Result<Vec<Value>, ApiError> {
        const ENDPOINT: &str = "products";
        let request = self
            .request(Method::GET, ENDPOINT)
            .await
            .query(&[("group", group_id)]);
        let body = self.fetch_json(ENDPOINT, request).await?;
        Ok(normalize::list(&body))
    }

    async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        let items = self.fetch_list("cart").await?;
        Ok(items.iter().filter_map(CartLine::from_json).collect())
    }

    async fn add_to_cart(
        &self,
        product_id: &str,
        quantity: u32,
    ) -> Result<ApiResponse<Value>, ApiError> {
        const ENDPOINT: &str = "cart/add";
        let request = self
            .request(Method::POST, ENDPOINT)
            .await
            .json(&json!({ "productId": product_id, "quantity": quantity }));
        self.send_envelope(ENDPOINT, request).await
    }

    async fn update_cart_item(
        &self,
        product_id: &str,
        quantity: u32,
    ) -> Result<ApiResponse<Value>, ApiError> {
        const ENDPOINT: &str = "cart/update";
        let request = self
            .request(Method::PUT, ENDPOINT)
            .await
            .json(&json!({ "productId": product_id, "quantity": quantity }));
        self.send_envelope(ENDPOINT, request).await
    }

    async fn remove_from_cart(&self, product_id: &str) -> Result<ApiResponse<Value>, ApiError> {
        let path = format!("cart/remove/{product_id}");
        let request = self.request(Method::DELETE, &path).await;
        self.send_envelope(&path, request).await
    }

    async fn fetch_wishlist(&self) -> Result<Vec<String>, ApiError> {
        let items = self.fetch_list("wishlist").await?;
        Ok(items
            .iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id.clone()),
                other => normalize::first_string(other, normalize::PRODUCT_ID_KEYS),
            })
            .collect())
    }

    async fn add_to_wishlist(&self, product_id: &str) -> Result<ApiResponse<Value>, ApiError> {
        const ENDPOINT: &str = "wishlist/add";
        let request = self
            .request(Method::POST, ENDPOINT)
            .await
            .json(&json!({ "productId": product_id }));
        self.send_envelope(ENDPOINT, request).await
    }

    async fn remove_from_wishlist(
        &self,
        product_id: &str,
    ) -> Result<ApiResponse<Value>, ApiError> {
        let path = format!("wishlist/remove/{product_id}");
        let request = self.request(Method::DELETE, &path).await;
        self.send_envelope(&path, request).await
    }
}
