//! Integration tests for the onboarding wizard and storefront mirrors over
//! real HTTP.
//!
//! Each test spins up an Axum fake backend on a random port and points
//! `HttpApi` at it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use bbscart::api::{HttpApi, OnboardingApi, StorefrontApi};
use bbscart::attachments::{FilePicker, LocalFile, PathQueuePicker};
use bbscart::cart::{CartLine, CartState, WishlistState};
use bbscart::catalog::CatalogMenu;
use bbscart::config::ClientConfig;
use bbscart::error::{FALLBACK_MESSAGE, OnboardingError};
use bbscart::onboarding::{
    ApplicationKind, FieldKind, OnboardingStep, OnboardingWizard, required_fields,
};
use bbscart::session::AuthSession;
use bbscart::store::{KeyValueStore, MemoryStore, keys};

/// A request the fake backend received.
#[derive(Debug, Clone)]
struct Recorded {
    method: &'static str,
    path: String,
    auth: Option<String>,
    body: Value,
}

#[derive(Default)]
struct Backend {
    requests: Mutex<Vec<Recorded>>,
    /// Submit attempts left to reject.
    reject_submits: Mutex<u32>,
    cart: Mutex<Vec<Value>>,
}

type Shared = Arc<Backend>;

impl Backend {
    fn record(&self, method: &'static str, path: String, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            auth,
            body,
        });
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read text fields and file names of a multipart body into JSON.
async fn multipart_to_json(mut multipart: Multipart) -> Value {
    let mut fields = serde_json::Map::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await.map(|b| b.len()).unwrap_or(0);
                fields.insert(name, json!({ "fileName": file_name, "size": bytes }));
            }
            None => {
                let text = field.text().await.unwrap_or_default();
                fields.insert(name, Value::String(text));
            }
        }
    }
    Value::Object(fields)
}

async fn upload(State(b): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Json<Value> {
    let body = multipart_to_json(multipart).await;
    let file_name = body["file"]["fileName"].as_str().unwrap_or("blob").to_string();
    b.record("POST", "/upload".into(), &headers, body);
    Json(json!({ "ok": true, "data": { "fileUrl": format!("https://cdn.test/{file_name}") } }))
}

async fn json_step(
    State(b): State<Shared>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    b.record("POST", format!("/{resource}/step"), &headers, body.clone());

    if body["data"]["firstName"] == "REJECT" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "ok": false, "message": "PAN already registered" })),
        );
    }

    let id_key = if resource == "vendors" { "vendorId" } else { "franchiseeId" };
    let id = body[id_key].as_str().unwrap_or("f123").to_string();
    (StatusCode::OK, Json(json!({ "ok": true, "data": { "_id": id } })))
}

async fn multipart_step(
    State(b): State<Shared>,
    Path((resource, id, section)): Path<(String, String, String)>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Json<Value> {
    let body = multipart_to_json(multipart).await;
    b.record("PUT", format!("/{resource}/{id}/{section}"), &headers, body);
    Json(json!({ "ok": true, "data": { "_id": id } }))
}

async fn submit(
    State(b): State<Shared>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    b.record("POST", format!("/{resource}/{id}/submit"), &headers, Value::Null);
    let mut left = b.reject_submits.lock().unwrap();
    if *left > 0 {
        *left -= 1;
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "message": "validation failed" })),
        );
    }
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn categories() -> Json<Value> {
    Json(json!({ "ok": true, "data": [
        { "_id": "c1", "name": "Fruits" },
        { "_id": "c2", "name": "Dairy" }
    ]}))
}

async fn subcategories() -> Json<Value> {
    Json(json!([
        { "_id": "s1", "name": "Mangoes", "category": { "_id": "c1" } },
        { "_id": "s2", "name": "Milk", "catId": "c2" }
    ]))
}

async fn groups() -> Json<Value> {
    Json(json!({ "data": { "items": [
        { "_id": "g1", "name": "Alphonso", "subCategoryId": "s1" }
    ]}}))
}

async fn products() -> Json<Value> {
    Json(json!({ "products": [
        { "_id": "p1", "name": "Alphonso 1kg", "price": 450, "group": "g1" }
    ]}))
}

async fn get_cart(State(b): State<Shared>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if headers.get("authorization").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false })));
    }
    let items = b.cart.lock().unwrap().clone();
    (StatusCode::OK, Json(json!({ "ok": true, "data": items })))
}

async fn add_cart(
    State(b): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    b.record("POST", "/cart/add".into(), &headers, body.clone());
    if body["productId"] == "sold-out" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "ok": false, "message": "Out of stock" })),
        );
    }
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn wishlist() -> Json<Value> {
    Json(json!({ "ok": true, "data": [ "p7", { "product": { "_id": "p8" } } ] }))
}

async fn wishlist_remove(Path(id): Path<String>) -> Json<Value> {
    Json(json!({ "ok": true, "data": { "removed": id } }))
}

async fn start_backend(backend: Shared) -> String {
    let app = Router::new()
        .route("/api/upload", post(upload))
        .route("/api/{resource}/step", post(json_step))
        .route("/api/{resource}/{id}/submit", post(submit))
        .route("/api/{resource}/{id}/{section}", put(multipart_step))
        .route("/api/categories", get(categories))
        .route("/api/subcategories", get(subcategories))
        .route("/api/groups", get(groups))
        .route("/api/products", get(products))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_cart))
        .route("/api/wishlist", get(wishlist))
        .route("/api/wishlist/remove/{id}", delete(wishlist_remove))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}/api")
}

struct Client {
    api: Arc<HttpApi>,
    store: Arc<MemoryStore>,
}

async fn client(base: &str, token: Option<&str>) -> Client {
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(
        AuthSession::init(Arc::clone(&store) as Arc<dyn KeyValueStore>)
            .await
            .unwrap(),
    );
    if let Some(token) = token {
        session.login(token, None).await.unwrap();
    }
    let config = ClientConfig::default().with_api_base(base).unwrap();
    let api = Arc::new(HttpApi::new(config).unwrap().with_session(session));
    Client { api, store }
}

fn wizard(client: &Client, kind: ApplicationKind) -> OnboardingWizard {
    OnboardingWizard::new(
        kind,
        Arc::clone(&client.api) as Arc<dyn OnboardingApi>,
        Arc::clone(&client.store) as Arc<dyn KeyValueStore>,
        Arc::new(PathQueuePicker::new()) as Arc<dyn FilePicker>,
    )
}

/// Write a small document for every form step.
fn documents(dir: &tempfile::TempDir) -> BTreeMap<OnboardingStep, PathBuf> {
    OnboardingStep::FORM_STEPS
        .iter()
        .map(|step| {
            let path = dir.path().join(format!("{step}.jpg"));
            std::fs::write(&path, b"\xFF\xD8\xFF fake jpeg").unwrap();
            (*step, path)
        })
        .collect()
}

/// Fill the text fields and upload the document of `step`.
async fn fill(wizard: &OnboardingWizard, step: OnboardingStep, doc: &PathBuf) {
    for spec in required_fields(step) {
        if spec.kind == FieldKind::Text {
            wizard
                .set_field(step, spec.key, &format!("{} value", spec.key))
                .await
                .unwrap();
        }
    }
    wizard
        .upload_attachment(step, &LocalFile::from_path(doc))
        .await
        .unwrap();
}

#[tokio::test]
async fn full_franchisee_application() {
    let backend: Shared = Arc::new(Backend::default());
    let base = start_backend(Arc::clone(&backend)).await;
    let client = client(&base, Some("tok-abc")).await;
    let wizard = wizard(&client, ApplicationKind::Franchisee);
    wizard.init().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let docs = documents(&dir);

    for step in OnboardingStep::FORM_STEPS {
        fill(&wizard, step, &docs[&step]).await;
        let id = wizard.save_step_and_advance().await.unwrap();
        assert_eq!(id.as_str(), "f123", "{step}");
    }
    assert_eq!(
        client.store.get(keys::FRANCHISEE_ID).await.unwrap().as_deref(),
        Some("f123")
    );

    wizard.submit_application().await.unwrap();
    assert_eq!(wizard.current_step().await, OnboardingStep::Submitted);
    assert!(client.store.get(keys::FRANCHISEE_ID).await.unwrap().is_none());

    let requests = backend.requests();
    let paths: Vec<_> = requests
        .iter()
        .filter(|r| r.path != "/upload")
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    assert_eq!(
        paths,
        vec![
            "POST /franchisees/step",
            "POST /franchisees/step",
            "PUT /franchisees/f123/gst",
            "PUT /franchisees/f123/bank-details",
            "PUT /franchisees/f123/outlet",
            "POST /franchisees/f123/submit",
        ]
    );
    assert!(requests.iter().all(|r| r.auth.as_deref() == Some("Bearer tok-abc")));

    let steps: Vec<_> = requests.iter().filter(|r| r.path == "/franchisees/step").collect();
    assert!(steps[0].body.get("franchiseeId").is_none());
    assert_eq!(steps[0].body["stepKey"], "identity");
    assert_eq!(steps[0].body["data"]["panImage"], "https://cdn.test/identity.jpg");
    assert_eq!(steps[1].body["franchiseeId"], "f123");

    let gst = requests
        .iter()
        .find(|r| r.path.ends_with("/gst"))
        .unwrap();
    assert_eq!(gst.body["gstCertificate"], "https://cdn.test/tax_registration.jpg");
    assert_eq!(gst.body["gstNumber"], "gstNumber value");

    let uploads: Vec<_> = requests.iter().filter(|r| r.path == "/upload").collect();
    assert_eq!(uploads.len(), 5);
    assert_eq!(uploads[0].body["file"]["fileName"], "identity.jpg");
}

#[tokio::test]
async fn server_rejection_keeps_wizard_in_place() {
    let backend: Shared = Arc::new(Backend::default());
    let base = start_backend(Arc::clone(&backend)).await;
    let client = client(&base, None).await;
    let wizard = wizard(&client, ApplicationKind::Franchisee);
    wizard.init().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let docs = documents(&dir);
    fill(&wizard, OnboardingStep::Identity, &docs[&OnboardingStep::Identity]).await;
    wizard
        .set_field(OnboardingStep::Identity, "firstName", "REJECT")
        .await
        .unwrap();

    let err = wizard.save_step_and_advance().await.unwrap_err();
    assert_eq!(err, OnboardingError::StepSave("PAN already registered".into()));
    assert_eq!(wizard.current_step().await, OnboardingStep::Identity);
    assert!(wizard.draft_id().await.is_none());
    assert!(backend.requests().iter().all(|r| r.auth.is_none()));
}

#[tokio::test]
async fn failed_submit_can_be_retried() {
    let backend: Shared = Arc::new(Backend::default());
    *backend.reject_submits.lock().unwrap() = 1;
    let base = start_backend(Arc::clone(&backend)).await;
    let client = client(&base, Some("tok")).await;
    let wizard = wizard(&client, ApplicationKind::Vendor);
    wizard.init().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let docs = documents(&dir);
    for step in OnboardingStep::FORM_STEPS {
        fill(&wizard, step, &docs[&step]).await;
        wizard.save_step_and_advance().await.unwrap();
    }

    let err = wizard.submit_application().await.unwrap_err();
    assert_eq!(err.user_message(), "validation failed");
    assert_eq!(wizard.current_step().await, OnboardingStep::OutletLocation);
    assert_eq!(
        client.store.get(keys::VENDOR_ID).await.unwrap().as_deref(),
        Some("f123")
    );

    wizard.submit_application().await.unwrap();
    let submits = backend
        .requests()
        .iter()
        .filter(|r| r.path.ends_with("/submit"))
        .count();
    assert_eq!(submits, 2);
}

#[tokio::test]
async fn unreachable_backend_uses_fallback_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = client(&format!("http://127.0.0.1:{port}/api"), None).await;
    let wizard = wizard(&client, ApplicationKind::Franchisee);
    wizard.init().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("pan.png");
    std::fs::write(&doc, b"png").unwrap();

    let err = wizard
        .upload_attachment(OnboardingStep::Identity, &LocalFile::from_path(&doc))
        .await
        .unwrap_err();
    assert_eq!(err, OnboardingError::Upload(FALLBACK_MESSAGE.into()));
    assert!(wizard.fields(OnboardingStep::Identity).await.get("panImage").is_none());
}

#[tokio::test]
async fn storefront_catalog_cart_and_wishlist() {
    let backend: Shared = Arc::new(Backend::default());
    backend
        .cart
        .lock()
        .unwrap()
        .push(json!({ "product": { "_id": "p1", "name": "Alphonso 1kg", "price": 450 }, "quantity": 2 }));
    let base = start_backend(Arc::clone(&backend)).await;
    let client = client(&base, Some("tok")).await;
    let api = Arc::clone(&client.api) as Arc<dyn StorefrontApi>;

    let menu = CatalogMenu::load(Arc::clone(&api)).await.unwrap();
    assert_eq!(menu.categories().len(), 2);
    assert_eq!(menu.subcategories_of("c1")[0].id, "s1");
    assert_eq!(menu.subcategories_of("c2")[0].name, "Milk");
    assert_eq!(menu.groups_of("s1")[0].id, "g1");
    let products = menu.products_in_group("g1").await.unwrap();
    assert_eq!(products[0].price, Some(450.0));

    let cart = CartState::new(Arc::clone(&api));
    cart.refresh().await.unwrap();
    assert_eq!(cart.subtotal().await, 900.0);

    cart.add(CartLine::new("p2", "Milk 1L", 60.0, 1)).await.unwrap();
    assert_eq!(cart.item_count().await, 3);

    let err = cart
        .add(CartLine::new("sold-out", "Ghost", 1.0, 1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Out of stock"));
    assert_eq!(cart.quantity_of("sold-out").await, 0);

    let wishlist = WishlistState::new(api);
    wishlist.refresh().await.unwrap();
    assert_eq!(wishlist.product_ids().await, vec!["p7".to_string(), "p8".to_string()]);
    assert!(!wishlist.toggle("p7").await.unwrap());
}

#[tokio::test]
async fn cart_refresh_without_token_fails() {
    let backend: Shared = Arc::new(Backend::default());
    let base = start_backend(backend).await;
    let client = client(&base, None).await;

    let cart = CartState::new(Arc::clone(&client.api) as Arc<dyn StorefrontApi>);
    assert!(cart.refresh().await.is_err());
    assert!(cart.lines().await.is_empty());
}
