//! # Route Quote
//!
//! One-shot command line quote: routes a single request against a JSON-RPC node (or a
//! liquidity snapshot) and prints the routing result and transaction path as JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin route_quote -- \
//!     --chain-id 1 \
//!     --token-in 0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE \
//!     --token-out 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 --decimals-out 6 \
//!     --amount 1.5
//! ```

use amm_route_sdk::{
    chain_reader::ChainReader,
    metrics,
    registry::ChainContractData,
    settings::{LogFormat, Settings},
    types::conversions::{decimal_str_to_u256, string_to_address},
    Direction, EthersChainReader, InMemoryChain, RouteEngine, RouteRequest, Token, REGISTRY,
};
use anyhow::{Context, Result};
use clap::Parser;
use ethers::types::Address;
use serde_json::json;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "route_quote", about = "Best swap route for a token pair")]
struct Args {
    #[arg(long)]
    chain_id: u64,
    #[arg(long)]
    token_in: String,
    #[arg(long)]
    token_out: String,
    /// Human-readable amount; input amount, or desired output with --reverse
    #[arg(long)]
    amount: String,
    #[arg(long)]
    reverse: bool,
    #[arg(long)]
    decimals_in: Option<u8>,
    #[arg(long)]
    decimals_out: Option<u8>,
    #[arg(long, default_value = "Config.toml")]
    config: String,
    /// Quote against a liquidity snapshot (JSON) instead of the RPC node
    #[arg(long)]
    snapshot: Option<String>,
    #[arg(long)]
    recipient: Option<String>,
}

/// Known tokens keep their registry symbol and decimals unless overridden.
fn resolve_token(chain: &ChainContractData, raw: &str, decimals: Option<u8>) -> Result<Token> {
    let address = string_to_address(raw)?;
    let known = std::iter::once(&chain.native)
        .chain(chain.bridge_tokens.iter())
        .find(|t| t.address == address);
    let mut token = match known {
        Some(t) => t.clone(),
        None => Token::new(chain.chain_id, address, 18, format!("{:#x}", address)),
    };
    if let Some(d) = decimals {
        token.decimals = d;
    }
    Ok(token)
}

fn init_logging(settings: &Settings) {
    #[cfg(feature = "observability")]
    {
        let builder = tracing_subscriber::fmt().with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log.level)),
        );
        let _ = match settings.log.format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.try_init(),
        };
    }
    #[cfg(not(feature = "observability"))]
    {
        if settings.log.format == LogFormat::Json {
            eprintln!("log.format = \"json\" needs the observability feature; using env_logger");
        }
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log.level)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let settings = Settings::from_file(&args.config).context("loading settings")?;
    init_logging(&settings);

    #[cfg(feature = "observability")]
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    metrics::describe_metrics();

    let chain = REGISTRY.lookup(args.chain_id)?;
    let token_in = resolve_token(chain, &args.token_in, args.decimals_in)?;
    let token_out = resolve_token(chain, &args.token_out, args.decimals_out)?;
    let direction = if args.reverse { Direction::Reverse } else { Direction::Forward };
    let fixed_decimals = match direction {
        Direction::Forward => token_in.decimals,
        Direction::Reverse => token_out.decimals,
    };
    let amount = decimal_str_to_u256(&args.amount, fixed_decimals)?;

    let reader: Arc<dyn ChainReader> = match &args.snapshot {
        Some(path) => Arc::new(InMemoryChain::from_json_file(path)?),
        None => Arc::new(EthersChainReader::from_http(&settings.rpc.http_url)?),
    };
    let engine = RouteEngine::from_settings(reader, &settings);

    let request = RouteRequest {
        chain_id: args.chain_id,
        token_in,
        token_out,
        amount,
        direction,
    };
    let result = engine.route(&request).await?;

    let recipient = match &args.recipient {
        Some(raw) => string_to_address(raw)?,
        None => Address::zero(),
    };
    let path = engine.build_path(&result, recipient)?;

    let output = json!({
        "amount_in": result.token_in.format_amount(result.amount_in)?.to_string(),
        "amount_out": result.token_out.format_amount(result.amount_out)?.to_string(),
        "routing_result": result,
        "transaction_path": path,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    #[cfg(feature = "observability")]
    eprintln!("{}", prometheus.render());

    Ok(())
}
