//! Solana RPC backed signer, broadcaster and balance source.

use crate::builder::{ComputeBudget, SwapRequest};
use crate::client::{BalanceSource, Broadcaster, SignedSwap, SwapSigner};
use crate::error::{Result, SwapError};
use crate::raydium::token_account_amount;
use crate::util::associated_token_address;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use tracing::{debug, info};

/// Signs swap transactions with a local keypair against the latest blockhash.
pub struct KeypairSigner {
    keypair: Keypair,
    rpc_client: Arc<RpcClient>,
    budget: ComputeBudget,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair, rpc_client: Arc<RpcClient>, budget: ComputeBudget) -> Self {
        Self {
            keypair,
            rpc_client,
            budget,
        }
    }
}

#[async_trait]
impl SwapSigner for KeypairSigner {
    fn payer(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign(&self, request: &SwapRequest) -> Result<SignedSwap> {
        if request.payer != self.keypair.pubkey() {
            return Err(SwapError::Signing(format!(
                "request payer {} is not the signing key {}",
                request.payer,
                self.keypair.pubkey()
            )));
        }
        let instructions = request
            .instructions(&self.budget)
            .map_err(|e| SwapError::Signing(format!("{e:#}")))?;
        let recent_blockhash = self
            .rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| SwapError::Signing(format!("latest blockhash: {e}")))?;

        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&request.payer),
            &[&self.keypair],
            recent_blockhash,
        );
        let signature = transaction.signatures[0];
        debug!("Signed swap {} with {} instructions", signature, instructions.len());
        Ok(SignedSwap {
            transaction,
            signature,
        })
    }
}

/// Sends a signed swap and waits for confirmation.
pub struct RpcBroadcaster {
    rpc_client: Arc<RpcClient>,
}

impl RpcBroadcaster {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }
}

#[async_trait]
impl Broadcaster for RpcBroadcaster {
    async fn submit(&self, signed: &SignedSwap) -> Result<Signature> {
        info!("Sending transaction {}", signed.signature);
        let sig = self
            .rpc_client
            .send_and_confirm_transaction(&signed.transaction)
            .await
            .map_err(|e| SwapError::Submission(format!("{}: {e}", signed.signature)))?;
        info!("Executed with Signature {sig}");
        Ok(sig)
    }
}

/// Reads balances from the owner's associated token accounts.
pub struct RpcBalanceSource {
    rpc_client: Arc<RpcClient>,
}

impl RpcBalanceSource {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }
}

#[async_trait]
impl BalanceSource for RpcBalanceSource {
    async fn get_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<u64> {
        let ata = associated_token_address(owner, mint);
        let account = self
            .rpc_client
            .get_account_with_commitment(&ata, CommitmentConfig::confirmed())
            .await
            .map_err(|e| SwapError::transport(format!("token account {ata}: {e}")))?
            .value;
        let Some(account) = account else {
            debug!("No token account {} for mint {}", ata, mint);
            return Ok(0);
        };
        token_account_amount(&account.data).map_err(|e| SwapError::transport(format!("{e:#}")))
    }
}
