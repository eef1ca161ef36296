use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};
use stardust_auth::{JwtClaims, Role};
use stardust_core::UserId;
use stardust_infra::config::ServerConfig;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port.
        let config = ServerConfig::from_lookup(|name| match name {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "SMTP_FROM" => Some("purchasing@stardust.test".to_string()),
            _ => None,
        })
        .unwrap();
        let app = stardust_api::app::build_app(&config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, token, None).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::PUT, path, token, Some(body)).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: UserId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

struct Cast {
    admin: String,
    buyer: String,
    coo: String,
    md: String,
    vendor: String,
    vendor_id: String,
}

/// Registers a vendor plus one user per role and returns their tokens.
async fn cast(srv: &TestServer) -> Cast {
    let admin = mint_jwt(UserId::new(), vec![Role::ADMIN]);

    let (status, body) = srv
        .post("/admin/vendors", &admin, json!({ "name": "Acme", "email": "sales@acme.test" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let vendor_id = body["id"].as_str().unwrap().to_string();

    let mut tokens = Vec::new();
    for (name, role, vendor) in [
        ("Bea Buyer", Role::PROCUREMENT, None),
        ("Chief Ops", Role::COO, None),
        ("Managing Director", Role::MD, None),
        ("Acme Portal", Role::VENDOR, Some(vendor_id.clone())),
    ] {
        let user_id = UserId::new();
        let (status, _) = srv
            .put(
                &format!("/admin/users/{user_id}"),
                &admin,
                json!({ "name": name, "email": format!("{}@stardust.test", name.to_lowercase().replace(' ', ".")), "vendor_id": vendor }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        tokens.push(mint_jwt(user_id, vec![role]));
    }

    let mut tokens = tokens.into_iter();
    Cast {
        admin,
        buyer: tokens.next().unwrap(),
        coo: tokens.next().unwrap(),
        md: tokens.next().unwrap(),
        vendor: tokens.next().unwrap(),
        vendor_id,
    }
}

async fn create_order(srv: &TestServer, c: &Cast, unit_price: &str) -> String {
    let (status, body) = srv
        .post(
            "/purchases/orders",
            &c.buyer,
            json!({ "vendor_id": c.vendor_id, "currency": "USD" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(
            &format!("/purchases/orders/{id}/lines"),
            &c.buyer,
            json!({ "description": "Laptop", "quantity": 2, "unit_price": unit_price }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    id
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn whoami_reflects_token_and_directory() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;

    let (status, body) = srv.get("/whoami", &c.vendor).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Portal");
    assert_eq!(body["vendor_id"], c.vendor_id.as_str());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "portal.vendor"));
}

#[tokio::test]
async fn coo_branch_end_to_end() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;
    let id = create_order(&srv, &c, "600").await;

    let (status, body) = srv.post(&format!("/purchases/orders/{id}/confirm"), &c.coo, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["approval_state"], "coo_confirmed");

    let (status, body) = srv
        .post(&format!("/purchases/orders/{id}/approve"), &c.coo, json!({ "role": "coo" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "purchase");
    assert_eq!(body["approval_state"], "coo_approved");

    let (_, outbox) = srv.get("/admin/outbox", &c.admin).await;
    let mails = outbox["items"].as_array().unwrap();
    assert_eq!(mails.len(), 1);
    assert_eq!(mails[0]["to"], "sales@acme.test");
    assert_eq!(mails[0]["subject"], format!("New PO is created {}", body["name"].as_str().unwrap()));

    let (status, audit) = srv.get(&format!("/purchases/orders/{id}/audit"), &c.buyer).await;
    assert_eq!(status, StatusCode::OK);
    let notes = audit["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["note"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        notes[1..],
        [
            "Confirmed by COO. MD approval not required.",
            "COO approved. Finalizing purchase order.",
            "Purchase order confirmed.",
        ]
    );

    let (status, words) = srv.get(&format!("/purchases/orders/{id}/amount-in-words"), &c.buyer).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(words["amount_in_words"], "One Thousand, Two Hundred Dollars, Zero Cents");
}

#[tokio::test]
async fn md_branch_rejects_coo_and_accepts_md() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;
    let id = create_order(&srv, &c, "60000").await;

    let (_, body) = srv.post(&format!("/purchases/orders/{id}/confirm"), &c.coo, json!({})).await;
    assert_eq!(body["approval_state"], "md_waiting");
    assert_eq!(body["requires_md_approval"], true);

    let (status, body) = srv
        .post(&format!("/purchases/orders/{id}/approve"), &c.coo, json!({ "role": "coo" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "approval_not_required_for_role");

    let (status, body) = srv
        .post(&format!("/purchases/orders/{id}/approve"), &c.md, json!({ "role": "md" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["approval_state"], "md_approved");
}

#[tokio::test]
async fn roles_are_enforced() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;

    let (status, body) = srv
        .post(
            "/purchases/orders",
            &c.coo,
            json!({ "vendor_id": c.vendor_id, "currency": "USD" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");

    let id = create_order(&srv, &c, "10").await;
    let (status, _) = srv.post(&format!("/purchases/orders/{id}/confirm"), &c.buyer, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = srv.get("/admin/outbox", &c.buyer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn gate_and_bad_input_map_to_http_errors() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;
    let id = create_order(&srv, &c, "10").await;

    let (status, body) = srv.post(&format!("/purchases/orders/{id}/finalize"), &c.coo, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "coo_approval_required");

    let (status, body) = srv.get("/purchases/orders/not-a-uuid", &c.buyer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, _) = srv
        .get(&format!("/purchases/orders/{}", UserId::new()), &c.buyer)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv
        .put(&format!("/purchases/orders/{id}/lines/1/price"), &c.buyer, json!({ "unit_price": "lots" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");
}

#[tokio::test]
async fn threshold_parameter_changes_the_branch() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;

    let (status, _) = srv
        .put(
            "/admin/params/purchasing.md_approval_threshold",
            &c.admin,
            json!({ "value": "100" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let id = create_order(&srv, &c, "150").await;
    let (_, body) = srv.get(&format!("/purchases/orders/{id}"), &c.buyer).await;
    assert_eq!(body["requires_md_approval"], true);

    let (status, _) = srv
        .put("/admin/params/purchasing.md_approval_threshold", &c.admin, json!({ "value": "abc" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn portal_lists_only_confirmed_orders_of_the_vendor() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;

    for price in ["10", "20", "30", "40", "50", "60"] {
        let id = create_order(&srv, &c, price).await;
        srv.post(&format!("/purchases/orders/{id}/confirm"), &c.coo, json!({})).await;
        let (status, _) = srv
            .post(&format!("/purchases/orders/{id}/approve"), &c.coo, json!({ "role": "coo" }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let draft = create_order(&srv, &c, "70").await;

    let (status, first) = srv.get("/my/purchase-orders?sortby=price", &c.vendor).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["items"].as_array().unwrap().len(), 5);
    assert_eq!(first["pager"]["total"], 6);
    assert_eq!(first["pager"]["page_count"], 2);
    assert_eq!(first["items"][0]["amount_total"], "20.00");

    let (_, second) = srv.get("/my/purchase-orders/page/2?sortby=price", &c.vendor).await;
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["items"][0]["amount_total"], "120.00");
    assert_eq!(second["query"]["page"], 2);

    let (status, _) = srv.get(&format!("/my/purchase-orders/{draft}"), &c.vendor).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv.get("/my/purchase-orders?sortby=newest", &c.vendor).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_query");

    let (status, _) = srv.get("/my/purchase-orders", &c.buyer).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn printed_order_shows_company_signatures_once_signed() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;

    let (status, body) = srv
        .put(
            "/admin/company",
            &c.admin,
            json!({ "name": "Stardust Trading", "coo_signature": "Y29v", "md_signature": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["md_signature"], Value::Null);

    let (status, _) = srv.put("/admin/company", &c.buyer, json!({ "name": "Nope" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let id = create_order(&srv, &c, "600").await;
    let (status, body) = srv.get(&format!("/purchases/orders/{id}/print"), &c.buyer).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["company_name"], "Stardust Trading");
    assert_eq!(body["vendor_name"], "Acme");
    assert_eq!(body["amount_in_words"], "One Thousand, Two Hundred Dollars, Zero Cents");
    assert_eq!(body["coo_signature"], Value::Null);

    srv.post(&format!("/purchases/orders/{id}/confirm"), &c.coo, json!({})).await;
    let (_, body) = srv.get(&format!("/purchases/orders/{id}/print"), &c.buyer).await;
    assert_eq!(body["order"]["approval_state"], "coo_confirmed");
    assert_eq!(body["coo_signature"], "Y29v");
    assert_eq!(body["md_signature"], Value::Null);
}

#[tokio::test]
async fn duplicate_order_names_conflict() {
    let srv = TestServer::spawn().await;
    let c = cast(&srv).await;
    let order = json!({ "name": "PO-2024-001", "vendor_id": c.vendor_id, "currency": "USD" });

    let (status, _) = srv.post("/purchases/orders", &c.buyer, order.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = srv.post("/purchases/orders", &c.buyer, order).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}
