use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;

const SPREADSHEET_ID: &str = "test-sheet";
const SHEETS_KEY: &str = "test-key";
const OPENAI_KEY: &str = "sk-test";

#[derive(Debug, Deserialize)]
struct Budget {
    data: String,
    sequencia: String,
    valor: f64,
    status: String,
    faixa: String,
    ultimo_follow_up: Option<String>,
    historico: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Group {
    quantidade: u64,
    valor: f64,
}

#[derive(Debug, Deserialize)]
struct Stats {
    total: Group,
    por_status: BTreeMap<String, Group>,
    sem_follow_up: u64,
}

#[derive(Debug, Clone)]
struct Recorded {
    target: &'static str,
    content_type: String,
    body: String,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

struct Upstream {
    base_url: String,
    log: Log,
}

impl Upstream {
    fn recorded(&self, target: &str) -> Vec<Recorded> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.target == target)
            .cloned()
            .collect()
    }
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn sheet_rows(sheet: &str) -> Option<Value> {
    let rows = match sheet {
        "Vendedor" => json!([
            ["Código", "Nome", "Email"],
            ["V1", "Ana", "ana@example.com"],
            ["V2", "Bruno"]
        ]),
        "Orçamentos" => json!([
            ["Data", "Sequência", "Cliente", "Valor", "Cód.", "Vendedor", "Contato", "Email"],
            [45306, "101", "ACME Ltda", "R$ 2.500,00", "V1", "Ana", "11 99999-0000"],
            ["20/02/2024", "102", "Beta SA", "1200", "V2", "Bruno"],
            ["2024-03-01", "103", "Gama ME", "300,50", "V1", "Ana"]
        ]),
        "Historico" => json!([
            ["Sequência", "Data", "Status", "Observações", "Cód.", "Vendedor"],
            ["101", "25/01/2024 15:00:00", "Fechado", "assinou", "V1", "Ana"],
            ["101", "18/01/2024 09:30", "Em negociação", "pediu desconto", "V1", "Ana"],
            ["102", "2024-02-22T10:00:00", "Perdido", "", "V2", "Bruno"]
        ]),
        "ConfigIA" => json!([
            ["Chave", "Valor"],
            ["modelo", "gpt-test"],
            ["temperatura", "0,2"],
            ["prompt_sistema", "Você é o assistente comercial."]
        ]),
        _ => return None,
    };
    Some(rows)
}

async fn sheet_values(
    Path((_id, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if query.get("key").map(String::as_str) != Some(SHEETS_KEY) {
        let body = json!({ "error": { "code": 400, "message": "API key not valid" } });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let sheet = range.split('!').next().unwrap_or_default();
    match sheet_rows(sheet) {
        Some(values) => {
            Json(json!({ "range": range, "majorDimension": "ROWS", "values": values }))
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn apps_script(State(log): State<Log>, headers: HeaderMap, body: String) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let is_json = content_type.starts_with("application/json");
    log.lock().unwrap().push(Recorded {
        target: "apps_script",
        content_type,
        body,
    });

    if is_json {
        Json(json!({ "success": true, "message": "Follow-up registrado" })).into_response()
    } else {
        Html("<html><body>Dados salvos</body></html>").into_response()
    }
}

async fn completions(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let expected = format!("Bearer {OPENAI_KEY}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        let body = json!({ "error": { "message": "Incorrect API key provided" } });
        return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
    }

    let last = body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|message| message["content"].as_str())
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push(Recorded {
        target: "chat",
        content_type: "application/json".to_string(),
        body: body.to_string(),
    });

    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": format!("eco: {last}") } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14 }
    }))
    .into_response()
}

async fn start_upstream() -> Upstream {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v4/spreadsheets/:id/values/:range", get(sheet_values))
        .route("/exec", post(apps_script))
        .route("/v1/chat/completions", post(completions))
        .with_state(Arc::clone(&log));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind upstream");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("upstream server");
    });

    Upstream {
        base_url: format!("http://{addr}"),
        log,
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("followup_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(upstream: &Upstream, configured: bool) -> TestServer {
    let port = pick_free_port();
    let mut command = Command::new(env!("CARGO_BIN_EXE_followup-crystal"));
    command
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", unique_data_path())
        .env("RUST_LOG", "info")
        .env("SHEETS_API_BASE", &upstream.base_url)
        .env("OPENAI_BASE_URL", format!("{}/v1", upstream.base_url))
        .env_remove("APPS_SCRIPT_MODE")
        .env_remove("OPENAI_MODEL")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    if configured {
        command
            .env("SHEETS_SPREADSHEET_ID", SPREADSHEET_ID)
            .env("SHEETS_API_KEY", SHEETS_KEY)
            .env("APPS_SCRIPT_URL", format!("{}/exec", upstream.base_url))
            .env("OPENAI_API_KEY", OPENAI_KEY);
    } else {
        command
            .env_remove("SHEETS_SPREADSHEET_ID")
            .env_remove("SHEETS_API_KEY")
            .env_remove("APPS_SCRIPT_URL")
            .env_remove("OPENAI_API_KEY");
    }

    let child = command.spawn().expect("failed to spawn server");
    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

fn form_field(body: &str, name: &str) -> Option<String> {
    let url = Url::parse(&format!("http://form.local/?{body}")).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[tokio::test]
async fn http_budgets_are_assembled_from_sheets() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let budgets: Vec<Budget> = client
        .get(format!("{}/api/budgets", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(budgets.len(), 3);

    let acme = budgets.iter().find(|b| b.sequencia == "101").unwrap();
    assert_eq!(acme.data, "2024-01-15");
    assert_eq!(acme.valor, 2500.0);
    assert_eq!(acme.status, "Fechado");
    assert_eq!(acme.ultimo_follow_up.as_deref(), Some("2024-01-25T15:00:00"));
    assert_eq!(acme.historico.len(), 2);
    assert_eq!(acme.faixa, "60+ dias");

    let gama = budgets.iter().find(|b| b.sequencia == "103").unwrap();
    assert_eq!(gama.status, "Pendente");
    assert_eq!(gama.valor, 300.5);

    let filtered: Vec<Budget> = client
        .get(format!("{}/api/budgets?vendedor=V2", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].status, "Perdido");

    let missing = client
        .get(format!("{}/api/budgets/999", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_stats_match_budget_list() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let stats: Stats = client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats.total.quantidade, 3);
    assert!((stats.total.valor - 4000.5).abs() < 1e-9);
    assert_eq!(stats.sem_follow_up, 1);
    let counted: u64 = stats.por_status.values().map(|g| g.quantidade).sum();
    assert_eq!(counted, stats.total.quantidade);

    let ana: Stats = client
        .get(format!("{}/api/stats?vendedor=ana", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ana.total.quantidade, 2);
    assert!((ana.total.valor - 2800.5).abs() < 1e-9);
}

#[tokio::test]
async fn http_follow_up_is_posted_as_form_json_data() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/budgets/102/follow-up", server.base_url))
        .json(&json!({ "status": "Em negociação", "observacoes": "retomar contato" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["registrado"], true);
    assert_eq!(body["item"]["sequencia"], "102");

    let writes = upstream.recorded("apps_script");
    assert_eq!(writes.len(), 1);
    assert!(writes[0].content_type.starts_with("application/x-www-form-urlencoded"));
    let json_data = form_field(&writes[0].body, "json_data").expect("json_data field");
    let payload: Value = serde_json::from_str(&json_data).unwrap();
    assert_eq!(payload["action"], "addFollowUp");
    assert_eq!(payload["sequencia"], "102");
    assert_eq!(payload["status"], "Em negociação");
    assert_eq!(payload["observacoes"], "retomar contato");

    let blank = client
        .post(format!("{}/api/budgets/102/follow-up", server.base_url))
        .json(&json!({ "status": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), reqwest::StatusCode::BAD_REQUEST);

    let unknown = client
        .post(format!("{}/api/budgets/999/follow-up", server.base_url))
        .json(&json!({ "status": "Enviado" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(upstream.recorded("apps_script").len(), 1);
}

#[tokio::test]
async fn http_settings_override_environment() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let view: Value = client
        .put(format!("{}/api/settings", server.base_url))
        .json(&json!({
            "sheets_api_key": "AIzaWrongKey9876",
            "apps_script_mode": "json",
            "usuario": { "codigo": "V1", "nome": "Ana", "email": "" }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["sheets_api_key"], "****9876");
    assert_eq!(view["apps_script_mode"], "json");

    let rejected = client
        .get(format!("{}/api/budgets", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_GATEWAY);
    let error: Value = rejected.json().await.unwrap();
    assert!(error["error"].as_str().unwrap().contains("API key not valid"));

    client
        .put(format!("{}/api/settings", server.base_url))
        .json(&json!({ "sheets_api_key": "" }))
        .send()
        .await
        .unwrap();

    let body: Value = client
        .post(format!("{}/api/budgets/101/follow-up", server.base_url))
        .json(&json!({ "status": "Pós-venda" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["mensagem"], "Follow-up registrado");
    assert_eq!(body["item"]["vendedor"], "Ana");

    let writes = upstream.recorded("apps_script");
    assert!(writes[0].content_type.starts_with("application/json"));
    let payload: Value = serde_json::from_str(&writes[0].body).unwrap();
    assert_eq!(payload["codigoVendedor"], "V1");
}

#[tokio::test]
async fn http_chat_uses_sheet_config() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let reply: Value = client
        .post(format!("{}/api/chat", server.base_url))
        .json(&json!({ "message": "Quem devo ligar hoje?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["content"], "eco: Quem devo ligar hoje?");
    assert_eq!(reply["response"], reply["content"]);
    assert_eq!(reply["usage"]["total_tokens"], 14);

    let calls = upstream.recorded("chat");
    let sent: Value = serde_json::from_str(&calls[0].body).unwrap();
    assert_eq!(sent["model"], "gpt-test");
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][0]["content"], "Você é o assistente comercial.");

    let analysis: Value = client
        .post(format!("{}/api/analysis", server.base_url))
        .json(&json!({ "pergunta": "Onde focar?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let content = analysis["content"].as_str().unwrap();
    assert!(content.starts_with("eco: Resumo da carteira"));
    assert!(content.contains("Pergunta: Onde focar?"));
}

#[tokio::test]
async fn http_missing_configuration_is_503() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, false).await;
    let client = Client::new();

    for path in ["/api/budgets", "/api/stats", "/api/vendedores"] {
        let response = client
            .get(format!("{}{path}", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE, "{path}");
    }

    let chat = client
        .post(format!("{}/api/chat", server.base_url))
        .json(&json!({ "message": "oi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(chat.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    let index = client.get(&server.base_url).send().await.unwrap();
    assert!(index.status().is_success());
    assert!(index.text().await.unwrap().contains("Follow-up Crystal"));
}

#[tokio::test]
async fn http_partial_config_update_keeps_sheet_values() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let loaded: Value = client
        .get(format!("{}/api/config-ia", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(loaded["modelo"], "gpt-test");

    let updated: Value = client
        .put(format!("{}/api/config-ia", server.base_url))
        .json(&json!({ "modelo": "gpt-novo" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["modelo"], "gpt-novo");
    assert_eq!(updated["prompt_sistema"], "Você é o assistente comercial.");
    assert!((updated["temperatura"].as_f64().unwrap() - 0.2).abs() < 1e-6);

    let writes = upstream.recorded("apps_script");
    assert_eq!(writes.len(), 1);
    let json_data = form_field(&writes[0].body, "json_data").expect("json_data field");
    let payload: Value = serde_json::from_str(&json_data).unwrap();
    assert_eq!(payload["action"], "updateConfigIA");
    assert_eq!(payload["config"], json!({ "modelo": "gpt-novo" }));

    client
        .post(format!("{}/api/chat", server.base_url))
        .json(&json!({ "message": "oi" }))
        .send()
        .await
        .unwrap();
    let calls = upstream.recorded("chat");
    let sent: Value = serde_json::from_str(&calls[0].body).unwrap();
    assert_eq!(sent["model"], "gpt-novo");
    assert!((sent["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(sent["messages"][0]["role"], "system");

    let rejected = client
        .put(format!("{}/api/config-ia", server.base_url))
        .json(&json!({ "temperatura": 2.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(upstream.recorded("apps_script").len(), 1);
}

#[tokio::test]
async fn http_config_falls_back_to_cache_when_sheet_fails() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let fresh = client
        .get(format!("{}/api/config-ia", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(fresh.status().is_success());

    client
        .put(format!("{}/api/settings", server.base_url))
        .json(&json!({ "sheets_api_key": "AIzaWrongKey9876" }))
        .send()
        .await
        .unwrap();

    let cached = client
        .get(format!("{}/api/config-ia", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(cached.status(), reqwest::StatusCode::OK);
    let config: Value = cached.json().await.unwrap();
    assert_eq!(config["modelo"], "gpt-test");
    assert_eq!(config["prompt_sistema"], "Você é o assistente comercial.");
}

#[tokio::test]
async fn http_vendedores_are_listed() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let vendedores: Vec<Value> = client
        .get(format!("{}/api/vendedores", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(vendedores.len(), 2);
    assert_eq!(
        vendedores[0],
        json!({ "codigo": "V1", "nome": "Ana", "email": "ana@example.com" })
    );
    assert_eq!(vendedores[1]["nome"], "Bruno");
    assert_eq!(vendedores[1]["email"], "");
}

#[tokio::test]
async fn http_chat_rejects_out_of_range_temperature() {
    let upstream = start_upstream().await;
    let server = spawn_server(&upstream, true).await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/chat", server.base_url))
        .json(&json!({ "message": "oi", "temperature": 3.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(upstream.recorded("chat").is_empty());
}
