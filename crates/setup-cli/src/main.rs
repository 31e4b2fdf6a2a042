//! Position setup command line.
//!
//! Validates, analyzes and shares 5x4 setup positions. Boards are given as a
//! JSON array of rows, a preset name, or a placement string like `k3/4/4/4/3K`.
//!
//! Usage:
//!   position-setup validate <board>
//!   position-setup analyze <board>
//!   position-setup share <board> [--base <url>]
//!   position-setup decode <code-or-url>
//!   position-setup presets
//!   position-setup search <query...>
//!   position-setup similar <board> [--threshold <0..1>]

use std::sync::Arc;

use anyhow::{bail, Context};
use board_core::share_code::{code_from_query, share_url};
use board_core::{compress, decode_position, encode_position, preset, Board, PRESETS};
use history_cache::{CacheConfig, HistoryCache, InMemorySource, Metadata, SystemClock, TracingMonitor};
use position_engine::{analyze_wire, validate_wire};
use serde_json::{json, Value};
use tracing::{debug, info};

const DEFAULT_SHARE_BASE: &str = "https://example.org/setup";
const DEFAULT_SIMILARITY: f64 = 0.75;

/// Board argument as wire JSON. Anything JSON-shaped is passed through
/// untouched so the validator can report it as malformed.
fn board_arg(raw: &str) -> anyhow::Result<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed == "null" {
        return serde_json::from_str(trimmed).context("board argument is not valid JSON");
    }
    if let Some(board) = preset(trimmed) {
        return Ok(board.to_wire());
    }
    let board = Board::from_placement(trimmed)
        .with_context(|| format!("'{trimmed}' is not a preset, placement or JSON board"))?;
    Ok(board.to_wire())
}

fn typed_board(raw: &str) -> anyhow::Result<Board> {
    let wire = board_arg(raw)?;
    Ok(Board::from_wire(&wire)?)
}

/// Value following `--flag`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn preset_metadata(name: &str, description: &str, tags: &[&str]) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("name".to_string(), json!(name));
    meta.insert("description".to_string(), json!(description));
    meta.insert("tags".to_string(), json!(tags));
    meta
}

/// A cache over the preset list, fully loaded.
fn preset_cache() -> anyhow::Result<HistoryCache> {
    let mut source = InMemorySource::default();
    for p in PRESETS {
        let board = p
            .board()
            .with_context(|| format!("preset '{}' has a bad placement", p.name))?;
        source.push(board, preset_metadata(p.name, p.description, p.tags));
    }

    let config = CacheConfig::from_env()?;
    let mut cache = HistoryCache::new(
        config,
        Arc::new(SystemClock),
        Box::new(source),
        Box::new(TracingMonitor::default()),
    )?;
    let loaded = cache.warm_up();
    debug!(loaded, "Preset cache ready");
    Ok(cache)
}

fn run(args: &[String]) -> anyhow::Result<()> {
    let Some(command) = args.first() else {
        bail!("usage: position-setup <validate|analyze|share|decode|presets|search|similar> ...");
    };
    let operand = args.get(1).map(String::as_str);

    match (command.as_str(), operand) {
        ("validate", Some(raw)) => {
            let result = validate_wire(&board_arg(raw)?);
            info!(valid = result.valid, errors = result.errors.len(), "Validated position");
            print_json(&serde_json::to_value(&result)?)
        }
        ("analyze", Some(raw)) => match analyze_wire(&board_arg(raw)?) {
            Ok(analysis) => print_json(&serde_json::to_value(&analysis)?),
            Err(e) => print_json(&e.to_report()),
        },
        ("share", Some(raw)) => {
            let board = typed_board(raw)?;
            let base = flag_value(args, "--base").unwrap_or(DEFAULT_SHARE_BASE);
            let blob = compress(&board);
            print_json(&json!({
                "code": encode_position(&board),
                "url": share_url(base, &board),
                "compressed_size": blob.compressed_size,
                "original_size": blob.original_size,
            }))
        }
        ("decode", Some(raw)) => {
            let code = code_from_query(raw).unwrap_or(raw);
            let board = decode_position(code)?;
            print_json(&json!({
                "code": code,
                "placement": board.to_placement(),
                "board": board.to_wire(),
            }))
        }
        ("presets", _) => {
            let list: Vec<Value> = PRESETS
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "description": p.description,
                        "tags": p.tags,
                        "placement": p.placement,
                    })
                })
                .collect();
            print_json(&Value::Array(list))
        }
        ("search", Some(_)) => {
            let query = args[1..].join(" ");
            let cache = preset_cache()?;
            let hits = cache.search_positions(&query);
            info!(query = %query, hits = hits.len(), "Searched presets");
            print_json(&serde_json::to_value(&hits)?)
        }
        ("similar", Some(raw)) => {
            let target = typed_board(raw)?;
            let threshold = match flag_value(args, "--threshold") {
                Some(t) => t.parse().context("--threshold must be a number")?,
                None => DEFAULT_SIMILARITY,
            };
            let cache = preset_cache()?;
            let found = cache.find_similar_positions(&target, threshold);
            print_json(&serde_json::to_value(&found)?)
        }
        (other @ ("validate" | "analyze" | "share" | "decode" | "search" | "similar"), None) => {
            bail!("'{other}' needs an argument")
        }
        (other, _) => bail!("unknown command '{other}'"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    run(&args)
}
