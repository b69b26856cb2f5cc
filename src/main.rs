//!
//! groupgate server binary
//! -----------------------
//! Command-line entry point for starting the groupgate HTTP gateway. Supports
//! configuration via CLI flags and environment variables.

use anyhow::Result;
use std::env;

use groupgate::server::ResponsePolicy;

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag
            && i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("groupgate Server\n\nUSAGE:\n  groupgate [--http-port N] [--data-folder PATH] [--policy hard|soft]\n\nOPTIONS:\n  --http-port N       HTTP API port (env: GROUPGATE_HTTP_PORT, default 7979)\n  --data-folder PATH  Data root folder (env: GROUPGATE_DATA_FOLDER, default data)\n  --policy MODE       Deny response policy: 'hard' rejects with 403, 'soft' reports the decision in headers only (env: GROUPGATE_POLICY, default hard)\n");
        return Ok(());
    }

    // Defaults
    let default_http: u16 = 7979;
    let default_root: &str = "data";

    // Environment variables
    let env_http = parse_port_env("GROUPGATE_HTTP_PORT");
    let env_root = env::var("GROUPGATE_DATA_FOLDER").ok();
    let env_policy = env::var("GROUPGATE_POLICY").ok().and_then(|s| ResponsePolicy::parse(&s));

    // CLI arguments override environment
    let arg_http = parse_value_arg(&args, "--http-port").and_then(|s| s.parse::<u16>().ok());
    let arg_root = parse_value_arg(&args, "--data-folder");
    let arg_policy = match parse_value_arg(&args, "--policy") {
        Some(raw) => match ResponsePolicy::parse(&raw) {
            Some(p) => Some(p),
            None => {
                anyhow::bail!("--policy expects 'hard' or 'soft', got '{}'", raw);
            }
        },
        None => None,
    };

    let http_port = arg_http.or(env_http).unwrap_or(default_http);
    let data_root = arg_root.or(env_root).unwrap_or_else(|| default_root.to_string());
    let policy = arg_policy.or(env_policy).unwrap_or(ResponsePolicy::Hard);

    println!(
        "groupgate starting: http={}, data_root={}, policy={}",
        http_port, data_root, policy.as_str()
    );
    tracing::info!("Using port: http={}, data_root={}, policy={}", http_port, data_root, policy.as_str());

    groupgate::server::run_with_config(http_port, &data_root, policy).await
}
