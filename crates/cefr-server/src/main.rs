use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use cefr_analyzer::{DictionaryEngine, EngineConfig};
use cefr_dict::LoadMode;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use cefr_server::rate_limit::RateLimiterLayer;
use cefr_server::{AppState, DEFAULT_MAX_TEXT_BYTES, router};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_RATE_LIMIT_RPS: u32 = 5;
const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config()?;
    info!("binding to {}:{}", config.host, config.port);
    match &config.engine.dict_dir {
        Some(dir) => info!(
            "using dictionary at {} (mode: {:?})",
            dir.display(),
            config.engine.load_mode
        ),
        None => info!("no dictionary configured; lookups will return 503"),
    }
    info!(
        "rate limit: {} req/s (burst {})",
        config.rate_limit_rps, config.rate_limit_burst
    );

    let engine = tokio::task::spawn_blocking(move || DictionaryEngine::initialize(config.engine))
        .await
        .context("engine initialization panicked")?
        .context("failed to initialize analysis engine")?;

    let state = AppState {
        engine: Arc::new(engine),
        max_text_bytes: config.max_text_bytes,
    };

    let rate_limiter = RateLimiterLayer::new(config.rate_limit_rps, config.rate_limit_burst);
    let app = router(state)
        .layer(rate_limiter)
        .layer(TraceLayer::new_for_http());
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Clone)]
struct Config {
    host: String,
    port: u16,
    engine: EngineConfig,
    rate_limit_rps: u32,
    rate_limit_burst: u32,
    max_text_bytes: usize,
}

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    dict_dir: Option<PathBuf>,
    dict_mode: Option<LoadMode>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dict-dir" => {
                let path = args.next().context("--dict-dir requires a path")?;
                cli.dict_dir = Some(PathBuf::from(path));
            }
            "--dict-mode" => {
                let mode = args.next().context("--dict-mode requires a value")?;
                cli.dict_mode = Some(parse_load_mode("--dict-mode", &mode)?);
            }
            _ => {
                if let Some(path) = arg.strip_prefix("--dict-dir=") {
                    cli.dict_dir = Some(PathBuf::from(path));
                } else if let Some(mode) = arg.strip_prefix("--dict-mode=") {
                    cli.dict_mode = Some(parse_load_mode("--dict-mode", mode)?);
                }
            }
        }
    }
    Ok(cli)
}

fn parse_load_mode(source: &str, value: &str) -> anyhow::Result<LoadMode> {
    value.parse().map_err(|err: String| anyhow!("{source}: {err}"))
}

fn load_config() -> anyhow::Result<Config> {
    let cli = parse_args(env::args().skip(1))?;
    let env_mode = match env::var("CEFR_DICT_LOAD_MODE") {
        Ok(value) => Some(parse_load_mode("CEFR_DICT_LOAD_MODE", &value)?),
        Err(_) => None,
    };

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port = env_parse("PORT").unwrap_or(DEFAULT_PORT);
    let dict_dir = cli
        .dict_dir
        .or_else(|| env::var("CEFR_DICT_DIR").ok().map(PathBuf::from));
    let load_mode = cli.dict_mode.or(env_mode).unwrap_or_default();
    let engine = EngineConfig {
        lexicon_path: env::var("CEFR_LEXICON_PATH").ok().map(PathBuf::from),
        exceptions_dir: env::var("CEFR_EXCEPTIONS_DIR").ok().map(PathBuf::from),
        dict_dir,
        load_mode,
        ..EngineConfig::default()
    };
    let rate_limit_rps = env_parse::<u32>("RATE_LIMIT_RPS")
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_RPS);
    let rate_limit_burst = env_parse::<u32>("RATE_LIMIT_BURST")
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_BURST);
    let max_text_bytes = env_parse::<usize>("MAX_TEXT_BYTES")
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_TEXT_BYTES);

    Ok(Config {
        host,
        port,
        engine,
        rate_limit_rps,
        rate_limit_burst,
        max_text_bytes,
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
