use axum::routing::get;
use axum::{Json, Router};
use credit_registry::{
    credit_app, directory_app, CreditLifecycle, CreditStore, CustomerDirectory, CustomerStore,
    Environment, HttpClientVerifier, ServiceConfig,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn config(environment: Environment) -> ServiceConfig {
    ServiceConfig {
        environment,
        ..ServiceConfig::default()
    }
}

async fn spawn_directory() -> TestServer {
    let store = CustomerStore::open_in_memory().unwrap();
    TestServer::spawn(directory_app(
        CustomerDirectory::new(store),
        &config(Environment::Development),
    ))
    .await
}

/// Credit service talking to the directory API at `directory_api`.
async fn spawn_credit_service(directory_api: &str, timeout: Duration) -> TestServer {
    let store = CreditStore::open_in_memory().unwrap();
    let verifier = HttpClientVerifier::new(directory_api, timeout).unwrap();
    let lifecycle = CreditLifecycle::new(store, Arc::new(verifier));
    TestServer::spawn(credit_app(lifecycle, &config(Environment::Production))).await
}

/// Both services, wired together.
async fn spawn_pair() -> (TestServer, TestServer) {
    let directory = spawn_directory().await;
    let credits = spawn_credit_service(&directory.url("/api"), Duration::from_secs(5)).await;
    (directory, credits)
}

async fn register_customer(client: &reqwest::Client, directory: &TestServer) -> i64 {
    let res = client
        .post(directory.url("/api/customers"))
        .json(&json!({
            "identity_number": "1020304050",
            "first_name": "Camila",
            "last_name": "Herrera",
            "email": "Camila.Herrera@Example.com",
            "phone": "3009876543"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = res.json().await.unwrap();
    body["data"]["id"].as_i64().unwrap()
}

async fn create_credit(
    client: &reqwest::Client,
    credits: &TestServer,
    customer_id: i64,
    amount: i64,
    term_months: i64,
) -> reqwest::Response {
    client
        .post(credits.url("/api/credits"))
        .json(&json!({
            "customer_id": customer_id,
            "requested_amount": amount,
            "term_months": term_months,
            "interest_rate": 1.9
        }))
        .send()
        .await
        .unwrap()
}

async fn credit_count(client: &reqwest::Client, credits: &TestServer) -> i64 {
    let body: Value = client
        .get(credits.url("/api/credits"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["count"].as_i64().unwrap()
}

#[tokio::test]
async fn create_approve_and_refuse_second_transition() {
    let (directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    let res = create_credit(&client, &credits, customer_id, 3_000_000, 24).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["rejection_reason"], Value::Null);
    assert_eq!(body["data"]["customer"]["name"], "Camila Herrera");
    assert_eq!(body["data"]["customer"]["identity_number"], "1020304050");
    let credit_id = body["data"]["id"].as_i64().unwrap();

    let listed: Value = client
        .get(credits.url("/api/credits"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["data"][0]["customer_name"], "Camila Herrera");

    let res = client
        .put(credits.url(&format!("/api/credits/{}/approve", credit_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "approved");

    let res = client
        .put(credits.url(&format!("/api/credits/{}/approve", credit_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("already approved"));

    let res = client
        .delete(credits.url(&format!("/api/credits/{}", credit_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_customer_is_a_client_error_and_persists_nothing() {
    let (_directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();

    let res = create_credit(&client, &credits, 4242, 500_000, 12).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("4242"));
    assert_eq!(credit_count(&client, &credits).await, 0);
}

#[tokio::test]
async fn unreachable_directory_answers_503_and_persists_nothing() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = format!("http://{}/api", listener.local_addr().unwrap());
    drop(listener);

    let credits = spawn_credit_service(&closed, Duration::from_secs(5)).await;
    let client = reqwest::Client::new();

    let res = create_credit(&client, &credits, 1, 500_000, 12).await;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(credit_count(&client, &credits).await, 0);

    let res = client
        .get(credits.url("/api/credits/customer/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn slow_directory_times_out_into_503() {
    let slow = TestServer::spawn(Router::new().route(
        "/api/customers/:id",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "success": true, "data": null }))
        }),
    ))
    .await;
    let credits = spawn_credit_service(&slow.url("/api"), Duration::from_millis(200)).await;
    let client = reqwest::Client::new();

    let res = create_credit(&client, &credits, 1, 500_000, 12).await;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn amount_and_term_boundaries_over_http() {
    let (directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    for (amount, term, status) in [
        (99_999, 12, StatusCode::BAD_REQUEST),
        (50_000_001, 12, StatusCode::BAD_REQUEST),
        (100_000, 12, StatusCode::CREATED),
        (50_000_000, 12, StatusCode::CREATED),
        (500_000, 5, StatusCode::BAD_REQUEST),
        (500_000, 61, StatusCode::BAD_REQUEST),
        (500_000, 6, StatusCode::CREATED),
        (500_000, 60, StatusCode::CREATED),
    ] {
        let res = create_credit(&client, &credits, customer_id, amount, term).await;
        assert_eq!(res.status(), status, "amount {} term {}", amount, term);
    }

    assert_eq!(credit_count(&client, &credits).await, 4);
}

#[tokio::test]
async fn amounts_and_rates_are_held_to_two_decimals() {
    let (directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    let submit = |amount: &'static str, rate: &'static str| {
        client
            .post(credits.url("/api/credits"))
            .json(&json!({
                "customer_id": customer_id,
                "requested_amount": amount,
                "term_months": 12,
                "interest_rate": rate
            }))
            .send()
    };

    let res = submit("100000.00", "1.75").await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = submit("100000.001", "1.75").await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = submit("150000.123456789", "1.75").await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = submit("150000", "1.987654321").await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("interest_rate"));

    assert_eq!(credit_count(&client, &credits).await, 1);
}

#[tokio::test]
async fn reject_requires_reason_and_stores_it_verbatim() {
    let (directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    let body: Value = create_credit(&client, &credits, customer_id, 800_000, 18)
        .await
        .json()
        .await
        .unwrap();
    let reject_url = credits.url(&format!("/api/credits/{}/reject", body["data"]["id"]));

    let res = client.put(&reject_url).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "a rejection reason is required");

    let res = client.put(&reject_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "a rejection reason is required");

    let res = client
        .put(&reject_url)
        .json(&json!({ "reason": "insufficient income history" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["rejection_reason"], "insufficient income history");

    let res = client
        .put(&reject_url)
        .json(&json!({ "reason": "insufficient income history" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_pending_then_gone() {
    let (directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    let body: Value = create_credit(&client, &credits, customer_id, 250_000, 6)
        .await
        .json()
        .await
        .unwrap();
    let credit_url = credits.url(&format!("/api/credits/{}", body["data"]["id"]));

    let res = client.delete(&credit_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(&credit_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.delete(&credit_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn customer_listing_verifies_customer_first() {
    let (directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    let res = client
        .get(credits.url(&format!("/api/credits/customer/{}", customer_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["customer"]["name"], "Camila Herrera");

    let res = client
        .get(credits.url("/api/credits/customer/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_input_stays_in_the_envelope() {
    let (_directory, credits) = spawn_pair().await;
    let client = reqwest::Client::new();

    let res = client
        .post(credits.url("/api/credits"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);

    let res = client
        .post(credits.url("/api/credits"))
        .json(&json!({
            "customer_id": 1,
            "requested_amount": 500000,
            "term_months": 12,
            "interest_rate": 150
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(credits.url("/api/credits/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(credits.url("/api/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "endpoint not found");
}

#[tokio::test]
async fn directory_refuses_duplicate_identity_numbers() {
    let directory = spawn_directory().await;
    let client = reqwest::Client::new();
    register_customer(&client, &directory).await;

    let res = client
        .post(directory.url("/api/customers"))
        .json(&json!({
            "identity_number": "1020304050",
            "first_name": "Otra",
            "last_name": "Persona",
            "email": "otra@example.com"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(directory.url("/api/customers"))
        .json(&json!({
            "identity_number": "12",
            "first_name": "X",
            "last_name": "Persona",
            "email": "bad"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["details"].as_array().unwrap().len(), 3);

    let listed: Value = client
        .get(directory.url("/api/customers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["data"][0]["email"], "camila.herrera@example.com");
}

#[tokio::test]
async fn directory_update_normalizes_like_registration() {
    let directory = spawn_directory().await;
    let client = reqwest::Client::new();
    let customer_id = register_customer(&client, &directory).await;

    let res = client
        .put(directory.url(&format!("/api/customers/{}", customer_id)))
        .json(&json!({
            "email": "  Camila.NUEVO@Example.com ",
            "last_name": " Herrera Gil "
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email"], "camila.nuevo@example.com");
    assert_eq!(body["data"]["last_name"], "Herrera Gil");
    assert_eq!(body["data"]["identity_number"], "1020304050");
}
