use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use websift_local::{SearchBackendKind, Settings};

mod mcp;

#[derive(Parser, Debug)]
#[command(name = "websift")]
#[command(about = "Web search + webpage extraction tools for MCP clients", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / MCP clients).
    McpStdio,
    /// Run as an MCP streamable-HTTP server.
    McpHttp(McpHttpCmd),
    /// Diagnose configuration issues (json; no secrets).
    Doctor,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct McpHttpCmd {
    /// Address to listen on.
    #[arg(long, env = "WEBSIFT_BIND", default_value = "0.0.0.0:4200")]
    bind: SocketAddr,
    /// Path the MCP endpoint is mounted at.
    #[arg(long, env = "WEBSIFT_HTTP_PATH", default_value = "/mcp")]
    path: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    // stdout belongs to the stdio transport; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the shared pipeline once. Missing configuration aborts startup.
fn build_search() -> Result<Arc<websift_core::WebSearch>> {
    let settings = Settings::from_env().context("loading settings")?;
    let svc = websift_local::web_search_from_settings(&settings).context("configuring backends")?;
    tracing::info!(
        provider = svc.search_provider(),
        rerank_search = svc.reranks_search(),
        summarizer_model = %settings.summarizer_model_id,
        "pipeline configured"
    );
    Ok(Arc::new(svc))
}

fn doctor() -> serde_json::Value {
    let t0 = std::time::Instant::now();
    let mut checks: Vec<serde_json::Value> = Vec::new();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            return serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "ok": false,
                "error": e.to_string(),
                "elapsed_ms": t0.elapsed().as_millis(),
            });
        }
    };

    // Only booleans and names, never values.
    let searxng_needed = settings.search_provider == SearchBackendKind::Searxng;
    checks.push(serde_json::json!({
        "name": "searxng_instance",
        "required": searxng_needed,
        "present": settings.searxng_instance.is_some(),
    }));
    checks.push(serde_json::json!({
        "name": "tavily_api_key",
        "required": true,
        "present": settings.tavily_api_key.is_some(),
    }));
    checks.push(serde_json::json!({
        "name": "aws_region",
        "required": true,
        "present": settings.aws_region.is_some(),
    }));
    let access_keys =
        settings.aws_access_key_id.is_some() && settings.aws_secret_access_key.is_some();
    checks.push(serde_json::json!({
        "name": "bedrock_api_key",
        "required": !access_keys,
        "present": settings.bedrock_api_key.is_some(),
    }));
    checks.push(serde_json::json!({
        "name": "aws_access_keys",
        "required": settings.bedrock_api_key.is_none(),
        "present": access_keys,
    }));

    let pipeline = websift_local::web_search_from_settings(&settings);
    serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": pipeline.is_ok(),
        "error": pipeline.as_ref().err().map(|e| e.to_string()),
        "search_provider": match settings.search_provider {
            SearchBackendKind::Searxng => "searxng",
            SearchBackendKind::Tavily => "tavily",
        },
        "summarizer_model_id": settings.summarizer_model_id,
        "rerank_model_id": settings.rerank_model_id,
        "rerank_search": settings.rerank_search,
        "search_limit": settings.search_limit,
        "checks": checks,
        "elapsed_ms": t0.elapsed().as_millis(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    websift_local::config::load_env_file_from_env();

    let cli = Cli::parse();

    match cli.command {
        Commands::McpStdio => {
            init_tracing();
            let search = build_search()?;
            mcp::serve_stdio(search)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::McpHttp(args) => {
            init_tracing();
            let search = build_search()?;
            mcp::serve_http(search, args.bind, &args.path).await?;
        }
        Commands::Doctor => {
            println!("{}", doctor());
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "websift",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("websift {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}
