use std::path::Path;

use orcamento::{
    front::{self, template::Template, AppState},
    ledger::Ledger,
    migration,
};
use reqwest::StatusCode;
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    ledger: Ledger,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over an in-memory ledger on an ephemeral port.
        let ledger = Ledger::open("sqlite::memory:").await.unwrap();
        migration::migrate(ledger.pool(), Path::new("./migrations"))
            .await
            .unwrap();
        let t = Template::new(Path::new("./src/front/templates")).unwrap();
        let app = front::router(
            AppState {
                ledger: ledger.clone(),
                t,
            },
            Path::new("./src/front/public"),
        );

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
            ledger,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let res = reqwest::get(self.url(path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        res.json().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn add_scenario(server: &TestServer) {
    for body in [
        json!({"type": "receita", "category": "Salary", "amount": 1000, "date": "2024-01-05"}),
        json!({"type": "despesa", "category": "Food", "amount": 200, "date": "2024-01-10"}),
        json!({"type": "despesa", "category": "Food", "amount": 50, "date": "2024-02-01"}),
    ] {
        let res = server.post_json("/add_transaction", body).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn add_transaction_round_trips() {
    let server = TestServer::spawn().await;

    let res = server
        .post_json(
            "/add_transaction",
            json!({
                "type": "despesa",
                "category": "Notebook",
                "amount": 3500,
                "date": "2024-06-15",
                "installment_count": 10,
                "interest": 1.5
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Transaction added successfully");
    let id = body["id"].as_str().unwrap().to_string();

    let list = server.get_json("/get_transactions").await;
    assert_eq!(
        list,
        json!([{
            "id": id,
            "type": "despesa",
            "category": "Notebook",
            "amount": 3500,
            "date": "2024-06-15",
            "installment_count": 10,
            "interest": 1.5
        }])
    );
}

#[tokio::test]
async fn scenario_aggregates() {
    let server = TestServer::spawn().await;
    add_scenario(&server).await;

    assert_eq!(
        server.get_json("/get_daily_balance").await,
        json!([
            {"date": "2024-01-05", "balance": 1000},
            {"date": "2024-01-10", "balance": 800},
            {"date": "2024-02-01", "balance": 750},
        ])
    );
    assert_eq!(
        server.get_json("/get_monthly_balance").await,
        json!([
            {"month": "2024-01", "balance": 800},
            {"month": "2024-02", "balance": 750},
        ])
    );
    assert_eq!(
        server.get_json("/get_summary").await,
        json!([
            {"category": "Salary", "receita_total": 1000, "despesa_total": 0},
            {"category": "Food", "receita_total": 0, "despesa_total": 250},
        ])
    );
}

#[tokio::test]
async fn queries_are_idempotent() {
    let server = TestServer::spawn().await;
    add_scenario(&server).await;

    for path in [
        "/get_transactions",
        "/get_daily_balance",
        "/get_monthly_balance",
        "/get_summary",
    ] {
        assert_eq!(server.get_json(path).await, server.get_json(path).await);
    }
}

#[tokio::test]
async fn invalid_transactions_are_rejected() {
    let server = TestServer::spawn().await;

    for body in [
        json!({"type": "transfer", "category": "x", "amount": 1, "date": "2024-01-01"}),
        json!({"type": "receita", "amount": 1, "date": "2024-01-01"}),
        json!({"type": "receita", "category": "x", "date": "2024-01-01"}),
        json!({"type": "receita", "category": "x", "amount": 1, "date": "01/01/2024"}),
        json!({"type": "receita", "category": "x", "amount": "lots", "date": "2024-01-01"}),
    ] {
        let res = server.post_json("/add_transaction", body).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "validation_error");
    }

    assert_eq!(server.get_json("/get_transactions").await, json!([]));
}

#[tokio::test]
async fn transactions_can_be_filtered() {
    let server = TestServer::spawn().await;
    add_scenario(&server).await;

    let food = server.get_json("/get_transactions?category=Food").await;
    assert_eq!(food.as_array().unwrap().len(), 2);

    let january = server
        .get_json("/get_transactions?type=despesa&start_date=2024-01-01&end_date=2024-01-31")
        .await;
    let january = january.as_array().unwrap();
    assert_eq!(january.len(), 1);
    assert_eq!(january[0]["amount"], 200);

    let res = reqwest::get(server.url("/get_transactions?type=gift"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn csv_import_is_all_or_nothing() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let bad = "type,category,amount,date\nreceita,Salary,1000,2024-01-05\nreceita,Bonus,abc,2024-01-06\n";
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::text(bad).file_name("bad.csv"),
    );
    let res = client
        .post(server.url("/api/import"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.get_json("/get_transactions").await, json!([]));

    let good = "type,category,amount,date,installment_count,interest\nreceita,Salary,1000,2024-01-05,,\ndespesa,Food,200,2024-01-10,,\n";
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::text(good).file_name("good.csv"),
    );
    let res = client
        .post(server.url("/api/import"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["imported"], 2);

    assert_eq!(
        server.get_json("/get_daily_balance").await,
        json!([
            {"date": "2024-01-05", "balance": 1000},
            {"date": "2024-01-10", "balance": 800},
        ])
    );
}

#[tokio::test]
async fn dashboard_form_adds_and_renders() {
    let server = TestServer::spawn().await;

    // the redirect back to the dashboard is followed
    let res = reqwest::Client::new()
        .post(server.url("/transactions/new"))
        .form(&[
            ("type", "receita"),
            ("category", "Freelance"),
            ("amount", "450.5"),
            ("date", "2024-03-03"),
            ("installment_count", ""),
            ("interest", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("Freelance"));
    assert!(html.contains("450.50"));

    let list = server.get_json("/get_transactions").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert!(list[0]["installment_count"].is_null());

    let res = reqwest::Client::new()
        .post(server.url("/transactions/new"))
        .form(&[("type", "receita"), ("category", "Freelance")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn static_assets_are_served() {
    let server = TestServer::spawn().await;
    let res = reqwest::get(server.url("/public/style.css")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn out_of_range_amounts_are_rejected() {
    let server = TestServer::spawn().await;

    for body in [
        json!({"type": "receita", "category": "x", "amount": "1e400", "date": "2024-01-01"}),
        json!({"type": "receita", "category": "x", "amount": "1e999999999", "date": "2024-01-01"}),
        json!({"type": "receita", "category": "x", "amount": 1, "date": "2024-01-01", "interest": "1e400"}),
    ] {
        let res = server.post_json("/add_transaction", body).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "validation_error");
    }

    let res = reqwest::Client::new()
        .post(server.url("/transactions/new"))
        .form(&[
            ("type", "receita"),
            ("category", "x"),
            ("amount", "1e400"),
            ("date", "2024-01-01"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // nothing was stored, so every read still works
    assert_eq!(server.get_json("/get_transactions").await, json!([]));
    assert_eq!(server.get_json("/get_daily_balance").await, json!([]));
    assert_eq!(server.get_json("/get_summary").await, json!([]));
    let res = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn storage_failure_is_a_json_server_error() {
    let server = TestServer::spawn().await;
    server.ledger.close().await;

    for path in ["/get_transactions", "/get_daily_balance", "/get_summary"] {
        let res = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "store_error");
        assert!(err["message"].is_string());
    }
}

#[tokio::test]
async fn padded_category_matches_filter() {
    let server = TestServer::spawn().await;

    let res = server
        .post_json(
            "/add_transaction",
            json!({"type": " despesa ", "category": " Food ", "amount": 20, "date": "2024-01-01"}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let food = server.get_json("/get_transactions?category=Food").await;
    let food = food.as_array().unwrap();
    assert_eq!(food.len(), 1);
    assert_eq!(food[0]["category"], "Food");
    assert_eq!(food[0]["type"], "despesa");
}

#[tokio::test]
async fn dashboard_import_returns_to_dashboard() {
    let server = TestServer::spawn().await;

    let csv = "type,category,amount,date\nreceita,Royalties,75,2024-04-04\n";
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::text(csv).file_name("royalties.csv"),
    );
    let res = reqwest::Client::new()
        .post(server.url("/transactions/import"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let html = res.text().await.unwrap();
    assert!(html.contains("<h1>Controle Orçamentário</h1>"));
    assert!(html.contains("Royalties"));

    let list = server.get_json("/get_transactions").await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}
