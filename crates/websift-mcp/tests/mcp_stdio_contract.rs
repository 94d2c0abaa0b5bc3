use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Json, Router,
};
use rmcp::{
    model::{CallToolRequestParam, CallToolResult},
    service::{RoleClient, RunningService, ServiceExt},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// One local server standing in for SearxNG, Tavily and the Bedrock runtime.
fn backends() -> Router {
    Router::new()
        .route(
            "/search",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let query = q.get("q").cloned().unwrap_or_default();
                if query.contains("broken") {
                    // Missing `score`: a shape violation, not an empty result.
                    return Json(serde_json::json!({
                        "results": [{"url": "https://b.example", "title": "B", "content": "beta"}]
                    }));
                }
                Json(serde_json::json!({
                    "results": [
                        {"url": "a.com", "title": "Paris", "content": "Paris is the capital...", "score": 0.9},
                        {"url": "b.com", "title": "Lyon", "content": "Lyon is a city.", "score": 0.4}
                    ]
                }))
            }),
        )
        .route(
            "/extract",
            post(|Json(body): Json<serde_json::Value>| async move {
                let url = body["urls"][0].as_str().unwrap_or_default().to_string();
                if url.contains("fail") {
                    return Json(serde_json::json!({
                        "results": [],
                        "failed_results": [{"url": url, "error": "blocked"}]
                    }));
                }
                Json(serde_json::json!({
                    "results": [{"url": url, "raw_content": "Intro. Y has 42 inhabitants. Outro."}],
                    "failed_results": []
                }))
            }),
        )
        .route(
            "/model/:model_id/invoke",
            post(|Path(model_id): Path<String>| async move {
                assert!(model_id.starts_with("anthropic."));
                Json(serde_json::json!({
                    "content": [{"type": "text", "text": "Y has 42 inhabitants."}]
                }))
            }),
        )
}

async fn spawn_server(addr: SocketAddr) -> RunningService<RoleClient, ()> {
    let endpoint = format!("http://{addr}");
    let bin = assert_cmd::cargo::cargo_bin!("websift");
    ()
        .serve(
            TokioChildProcess::new(tokio::process::Command::new(bin).configure(|cmd| {
                cmd.args(["mcp-stdio"]);
                cmd.env_remove("WEBSIFT_ENV_FILE");
                cmd.env_remove("WEBSIFT_RERANK_SEARCH");
                cmd.env_remove("WEBSIFT_SEARCH_PROVIDER");
                cmd.env_remove("SUMMARIZER_MODEL_ID");
                cmd.env_remove("WEBSIFT_SUMMARIZER_MODEL_ID");
                cmd.env("RUST_LOG", "warn");
                cmd.env("WEBSIFT_SEARXNG_INSTANCE", &endpoint);
                cmd.env("WEBSIFT_TAVILY_API_KEY", "tvly-test");
                cmd.env("WEBSIFT_TAVILY_ENDPOINT", &endpoint);
                cmd.env("WEBSIFT_AWS_REGION", "us-east-1");
                cmd.env("WEBSIFT_BEDROCK_API_KEY", "br-test");
                cmd.env("WEBSIFT_BEDROCK_ENDPOINT", &endpoint);
            }))
            .expect("spawn mcp child"),
        )
        .await
        .expect("serve mcp child")
}

async fn call(
    service: &RunningService<RoleClient, ()>,
    name: &'static str,
    args: serde_json::Value,
) -> CallToolResult {
    service
        .call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(args.as_object().cloned().unwrap()),
        })
        .await
        .expect("call_tool")
}

fn text(r: &CallToolResult) -> String {
    r.content
        .first()
        .and_then(|c| c.as_text())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn stdio_server_search_and_extract_contract() {
    let addr = serve(backends()).await;
    let service = spawn_server(addr).await;

    let tools = service.list_tools(Default::default()).await.expect("list_tools");
    let names: BTreeSet<String> = tools
        .tools
        .iter()
        .map(|t| t.name.clone().into_owned())
        .collect();
    for must_have in ["search_web", "extract_webpage"] {
        assert!(names.contains(must_have), "missing tool {must_have}");
    }

    let r = call(
        &service,
        "search_web",
        serde_json::json!({"query": "capital of France", "lang": "en"}),
    )
    .await;
    assert_ne!(r.is_error, Some(true));
    let s = text(&r);
    assert!(s.starts_with("Search results:\n----\n"), "got: {s}");
    assert!(s.contains("Url: a.com"));
    assert!(s.contains("Title: Paris"));
    assert!(s.find("Url: a.com").unwrap() < s.find("Url: b.com").unwrap());

    let r = call(
        &service,
        "search_web",
        serde_json::json!({"query": "broken shape", "lang": "en"}),
    )
    .await;
    assert_eq!(r.is_error, Some(true));
    assert!(text(&r).starts_with("error[malformed_response]"));

    let r = call(
        &service,
        "extract_webpage",
        serde_json::json!({"url": "https://ok.example/page", "query": "population of Y"}),
    )
    .await;
    assert_ne!(r.is_error, Some(true));
    assert_eq!(text(&r), "Y has 42 inhabitants.");

    let r = call(
        &service,
        "extract_webpage",
        serde_json::json!({"url": "https://fail.example/page", "query": "population of Y"}),
    )
    .await;
    assert_eq!(text(&r), "No data can be extracted from provided URL.");

    service.cancel().await.expect("cancel");
}
