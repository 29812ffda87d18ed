use anyhow::Context;
use clap::{Parser, Subcommand};
use raydium_v4_swap::raydium::RaydiumPoolSource;
use raydium_v4_swap::rpc::{KeypairSigner, RpcBalanceSource, RpcBroadcaster};
use raydium_v4_swap::{ClientConfig, SwapClient, SwapOrder};
use rust_decimal::Decimal;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Swap against Raydium AMM V4 pools.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Order(OrderCommand),
    /// Print the quote for an order without sending it.
    Quote {
        #[command(subcommand)]
        order: OrderCommand,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum OrderCommand {
    /// Buy the token of a pool, spending SOL.
    Buy {
        #[arg(long)]
        pair: Pubkey,
        /// SOL to spend, in whole SOL.
        #[arg(long)]
        sol_in: Decimal,
        #[arg(long, default_value = "5")]
        slippage: Decimal,
    },
    /// Buy a token through its deepest SOL pool.
    BuyByToken {
        #[arg(long)]
        mint: Pubkey,
        #[arg(long)]
        sol_in: Decimal,
        #[arg(long, default_value = "5")]
        slippage: Decimal,
    },
    /// Sell a share of the held token of a pool for SOL.
    Sell {
        #[arg(long)]
        pair: Pubkey,
        /// Percent of the held balance, 100 sells everything.
        #[arg(long, default_value = "100")]
        percentage: Decimal,
        #[arg(long, default_value = "5")]
        slippage: Decimal,
    },
    /// Sell a share of a held token through its deepest SOL pool.
    SellByToken {
        #[arg(long)]
        mint: Pubkey,
        #[arg(long, default_value = "100")]
        percentage: Decimal,
        #[arg(long, default_value = "5")]
        slippage: Decimal,
    },
}

impl From<OrderCommand> for SwapOrder {
    fn from(command: OrderCommand) -> Self {
        match command {
            OrderCommand::Buy {
                pair,
                sol_in,
                slippage,
            } => SwapOrder::BuyByPair {
                pair,
                sol_in,
                slippage,
            },
            OrderCommand::BuyByToken {
                mint,
                sol_in,
                slippage,
            } => SwapOrder::BuyByMint {
                mint,
                sol_in,
                slippage,
            },
            OrderCommand::Sell {
                pair,
                percentage,
                slippage,
            } => SwapOrder::SellByPair {
                pair,
                percentage,
                slippage,
            },
            OrderCommand::SellByToken {
                mint,
                percentage,
                slippage,
            } => SwapOrder::SellByMint {
                mint,
                percentage,
                slippage,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?;
    info!("Using {:?}", config);

    let keypair = config.keypair()?;
    let quote_mint = config.quote_mint()?;
    info!("Owner address {}", keypair.pubkey());

    let rpc_client = Arc::new(RpcClient::new(config.rpc_url.clone()));
    let client = SwapClient::new(
        Arc::new(RaydiumPoolSource::new(
            rpc_client.clone(),
            &config.raydium_api_url,
            quote_mint,
        )),
        Arc::new(KeypairSigner::new(
            keypair,
            rpc_client.clone(),
            config.compute_budget,
        )),
        Arc::new(RpcBroadcaster::new(rpc_client.clone())),
        Arc::new(RpcBalanceSource::new(rpc_client)),
        quote_mint,
    )
    .with_staleness(config.staleness());

    match cli.command {
        Command::Order(order) => {
            let result = client.execute(order.into()).await.map_err(|e| {
                if e.is_delegated() {
                    anyhow::Error::new(e).context("swap was handed off and may have landed")
                } else {
                    anyhow::Error::new(e).context("swap aborted before submission")
                }
            })?;
            info!(
                "Swapped {} for at least {} (expected {}), signature {}",
                result.quote.amount_in,
                result.quote.min_amount_out,
                result.quote.amount_out,
                result.signature
            );
            println!("{}", result.signature);
        }
        Command::Quote { order } => {
            let quote = client
                .quote(order.into())
                .await
                .context("quote failed")?;
            println!("pair:            {}", quote.pair);
            println!("amount in:       {}", quote.amount_in);
            println!("expected out:    {}", quote.amount_out);
            println!("minimum out:     {}", quote.min_amount_out);
            println!("fee:             {}", quote.fee);
            println!(
                "price impact:    {}%",
                (quote.price_impact * Decimal::ONE_HUNDRED).round_dp(4)
            );
            println!("current price:   {}", quote.current_price);
            println!("execution price: {}", quote.execution_price);
        }
    }
    Ok(())
}
