//! End-to-end tests driving the router in-process.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use duka_api::{app, session, AppConfig, AppState};
use duka_db::{Database, DbConfig};

// =============================================================================
// Harness
// =============================================================================

struct TestApp {
    router: Router,
}

struct Response {
    status: StatusCode,
    body: Value,
    cookie: Option<String>,
}

async fn spawn_app(allow_self_registration: bool) -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let mut config = AppConfig::from_toml("").unwrap();
    config.allow_self_registration = allow_self_registration;

    let store = session::store(&db).await.unwrap();
    TestApp {
        router: app(AppState::new(db, config), store),
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        Response {
            status,
            body,
            cookie,
        }
    }

    async fn get(&self, uri: &str, cookie: &str) -> Response {
        self.send(Method::GET, uri, Some(cookie), None).await
    }

    async fn post(&self, uri: &str, cookie: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(cookie), Some(body)).await
    }

    /// Registers the bootstrap admin and returns its session cookie.
    async fn admin(&self) -> String {
        let res = self
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": "owner",
                    "password": "secret123",
                    "fullName": "Shop Owner"
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.cookie.unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> Response {
        self.send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Creates a category pair and a product; returns the product id.
    async fn product(&self, admin: &str, code: &str) -> String {
        let main = self
            .post("/api/categories/main", admin, json!({ "name": "Groceries" }))
            .await;
        assert_eq!(main.status, StatusCode::CREATED, "{}", main.body);

        let sub = self
            .post(
                "/api/categories/sub",
                admin,
                json!({ "mainCategoryId": main.body["id"], "name": "Dry goods" }),
            )
            .await;
        assert_eq!(sub.status, StatusCode::CREATED, "{}", sub.body);

        let product = self
            .post(
                "/api/products",
                admin,
                json!({
                    "code": code,
                    "name": "Sugar 1kg",
                    "subCategoryId": sub.body["id"],
                    "price": 50000,
                    "lowStockThreshold": 3
                }),
            )
            .await;
        assert_eq!(product.status, StatusCode::CREATED, "{}", product.body);
        product.body["id"].as_str().unwrap().to_string()
    }

    async fn purchase(&self, cookie: &str, product_id: &str, quantity: i64) -> Response {
        self.post(
            "/api/purchases",
            cookie,
            json!({ "productId": product_id, "quantity": quantity, "costPerUnit": 100000 }),
        )
        .await
    }

    async fn sale(&self, cookie: &str, product_id: &str, quantity: i64) -> Response {
        self.post(
            "/api/sales",
            cookie,
            json!({ "productId": product_id, "quantity": quantity }),
        )
        .await
    }

    /// Creates an employee with `permissions` and returns its session cookie.
    async fn employee(&self, admin: &str, username: &str, permissions: Value) -> String {
        let res = self
            .post(
                "/api/employees",
                admin,
                json!({
                    "username": username,
                    "password": "clerk123",
                    "fullName": "Shop Clerk",
                    "permissions": permissions
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);

        let login = self.login(username, "clerk123").await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);
        login.cookie.unwrap()
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = spawn_app(false).await;

    let live = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body["status"], "ok");

    let ready = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["status"], "ready");
    assert_eq!(ready.body["database"], true);
}

// =============================================================================
// Auth
// =============================================================================

#[tokio::test]
async fn test_first_registration_bootstraps_admin_then_closes() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;

    let me = app.get("/api/auth/user", &admin).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "owner");
    assert_eq!(me.body["role"], "admin");
    assert_eq!(me.body["permissions"].as_array().unwrap().len(), 5);
    assert!(me.body.get("passwordHash").is_none());

    let second = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "walkin", "password": "secret123", "fullName": "Walk In" })),
        )
        .await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert_eq!(second.body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_self_registration_creates_employee_without_capabilities() {
    let app = spawn_app(true).await;
    app.admin().await;

    let res = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "username": "walkin", "password": "secret123", "fullName": "Walk In" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["role"], "employee");
    assert_eq!(res.body["permissions"], json!([]));

    let sale = app.get("/api/sales", &res.cookie.unwrap()).await;
    assert_eq!(sale.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = spawn_app(false).await;
    app.admin().await;

    let wrong = app.login("owner", "not-the-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid username or password");

    let unknown = app.login("nobody", "secret123").await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.body["message"], wrong.body["message"]);

    let ok = app.login("OWNER", "secret123").await;
    assert_eq!(ok.status, StatusCode::OK);
    let cookie = ok.cookie.unwrap();
    assert_eq!(app.get("/api/auth/user", &cookie).await.status, StatusCode::OK);

    let out = app
        .send(Method::POST, "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(out.status, StatusCode::NO_CONTENT);

    let after = app.get("/api/auth/user", &cookie).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_requests_without_session_are_unauthorized() {
    let app = spawn_app(false).await;

    let res = app.send(Method::GET, "/api/products", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["code"], "UNAUTHORIZED");
}

// =============================================================================
// Permission gate
// =============================================================================

#[tokio::test]
async fn test_sales_require_capability_but_never_block_admin() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let product = app.product(&admin, "SUG-1").await;
    assert_eq!(app.purchase(&admin, &product, 20).await.status, StatusCode::CREATED);

    let clerk = app
        .employee(&admin, "clerk", json!(["purchases"]))
        .await;

    let refused = app.sale(&clerk, &product, 1).await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
    assert_eq!(refused.body["code"], "FORBIDDEN");

    let sold = app.sale(&admin, &product, 5).await;
    assert_eq!(sold.status, StatusCode::CREATED);
    assert_eq!(sold.body["totalAmount"], 250000);

    // Granting the capability applies to the existing session.
    let me = app.get("/api/auth/user", &clerk).await;
    let clerk_id = me.body["id"].as_str().unwrap().to_string();
    let updated = app
        .send(
            Method::PUT,
            &format!("/api/employees/{}", clerk_id),
            Some(&admin),
            Some(json!({ "permissions": ["sales"] })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK, "{}", updated.body);

    assert_eq!(app.sale(&clerk, &product, 1).await.status, StatusCode::CREATED);
    assert_eq!(app.purchase(&clerk, &product, 1).await.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_routes_refuse_employees() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let clerk = app
        .employee(&admin, "clerk", json!(["sales", "reports", "dashboard"]))
        .await;

    let res = app
        .post("/api/categories/main", &clerk, json!({ "name": "Snacks" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/api/employees", &clerk).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/api/audit-logs", &clerk).await.status, StatusCode::FORBIDDEN);

    assert_eq!(app.get("/api/dashboard/stats", &clerk).await.status, StatusCode::OK);
    assert_eq!(app.get("/api/reports/inventory", &clerk).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_deactivated_employee_loses_session() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let clerk = app.employee(&admin, "clerk", json!(["sales"])).await;
    let clerk_id = app.get("/api/auth/user", &clerk).await.body["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = app
        .send(
            Method::POST,
            &format!("/api/employees/{}/deactivate", clerk_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["isActive"], false);

    assert_eq!(app.get("/api/auth/user", &clerk).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.login("clerk", "clerk123").await.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_validation_errors_list_every_field() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;

    let res = app
        .post(
            "/api/products",
            &admin,
            json!({ "code": "", "name": " ", "subCategoryId": "nope", "price": -5 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");

    let fields: Vec<&str> = res.body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["code", "name", "subCategoryId", "price"]);
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;

    let res = app
        .post("/api/sales", &admin, json!({ "productId": 42 }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_oversized_sale_is_rejected_and_stock_kept() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let product = app.product(&admin, "SUG-1").await;
    app.purchase(&admin, &product, 10).await;

    let res = app.sale(&admin, &product, 11).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["code"], "INSUFFICIENT_STOCK");
    assert!(res.body["message"].as_str().unwrap().contains("available 10"));

    let stored = app.get(&format!("/api/products/{}", product), &admin).await;
    assert_eq!(stored.body["stockQuantity"], 10);
    assert_eq!(app.get("/api/sales", &admin).await.body, json!([]));
}

#[tokio::test]
async fn test_product_with_history_cannot_be_deleted() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let product = app.product(&admin, "SUG-1").await;
    app.purchase(&admin, &product, 1).await;

    let res = app
        .send(Method::DELETE, &format!("/api/products/{}", product), Some(&admin), None)
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["code"], "CONFLICT");

    let missing = app
        .get("/api/products/00000000-0000-4000-8000-000000000000", &admin)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_product_code_is_a_conflict() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let product = app.product(&admin, "SUG-1").await;
    let stored = app.get(&format!("/api/products/{}", product), &admin).await;
    let sub = stored.body["subCategoryId"].clone();

    let res = app
        .post(
            "/api/products",
            &admin,
            json!({ "code": "SUG-1", "name": "Other", "subCategoryId": sub, "price": 100 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["fields"][0]["field"], "code");
}

// =============================================================================
// Notifications
// =============================================================================

#[tokio::test]
async fn test_marking_read_twice_is_idempotent() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let product = app.product(&admin, "SUG-1").await;
    app.purchase(&admin, &product, 5).await;
    app.sale(&admin, &product, 3).await;

    let feed = app.get("/api/notifications", &admin).await;
    assert_eq!(feed.status, StatusCode::OK);
    let kinds: Vec<&str> = feed.body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["low_stock", "new_sale", "new_purchase"]);

    let before = app.get("/api/notifications/unread-count", &admin).await.body["count"]
        .as_i64()
        .unwrap();
    assert_eq!(before, 3);

    let id = feed.body[0]["id"].as_str().unwrap().to_string();
    for _ in 0..2 {
        let res = app
            .send(
                Method::POST,
                &format!("/api/notifications/{}/read", id),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["isRead"], true);
    }
    let after = app.get("/api/notifications/unread-count", &admin).await;
    assert_eq!(after.body["count"], 2);

    let action = app
        .send(
            Method::POST,
            &format!("/api/notifications/{}/execute", id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(action.body["action"], "restock");

    let all = app
        .send(Method::POST, "/api/notifications/read-all", Some(&admin), None)
        .await;
    assert_eq!(all.body["updated"], 2);

    let unknown = app
        .send(Method::POST, "/api/notifications/nope/read", Some(&admin), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Reports & search
// =============================================================================

#[tokio::test]
async fn test_sales_report_and_search() {
    let app = spawn_app(false).await;
    let admin = app.admin().await;
    let product = app.product(&admin, "SUG-1").await;
    app.purchase(&admin, &product, 20).await;
    app.sale(&admin, &product, 5).await;

    let report = app.get("/api/reports/sales", &admin).await;
    assert_eq!(report.status, StatusCode::OK);
    assert_eq!(report.body["unitsSold"], 5);
    assert_eq!(report.body["totalAmount"], 250000);

    let bad = app.get("/api/reports/sales?from=someday", &admin).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["fields"][0]["field"], "from");

    let hits = app.get("/api/search?q=sugar", &admin).await;
    assert_eq!(hits.status, StatusCode::OK);
    assert_eq!(hits.body["products"][0]["code"], "SUG-1");

    let empty = app.get("/api/search?q=", &admin).await;
    assert_eq!(empty.body["products"], json!([]));
}
