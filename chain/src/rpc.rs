//! JSON-RPC ledger client over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use checkin_types::{Address, Lamports, TxSignature};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::LedgerError;
use crate::ledger::{
    BlockhashContext, Commitment, Confirmation, LedgerClient, LedgerFut, SignatureStatus,
};
use crate::transaction::Blockhash;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const MAX_ERROR_BODY_CHARS: usize = 2 * 1024;

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    context: SlotContext,
    value: T,
}

#[derive(Debug, Deserialize)]
struct SlotContext {
    slot: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusValue {
    err: Option<Value>,
    confirmation_status: Option<Commitment>,
}

#[derive(Debug, Deserialize)]
struct SignatureInfo {
    signature: String,
}

#[derive(Debug)]
pub struct RpcLedgerClient {
    client: reqwest::Client,
    url: String,
    commitment: Commitment,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(
        url: impl Into<String>,
        commitment: Commitment,
        poll_interval: Duration,
    ) -> Result<Self, LedgerError> {
        let client = base_client_builder()
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            commitment,
            poll_interval,
            next_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(method, id, "RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(LedgerError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))?;
        match (parsed.result, parsed.error) {
            (_, Some(err)) => Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(LedgerError::InvalidResponse(format!(
                "{method}: neither result nor error"
            ))),
        }
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment.as_str() })
    }

    async fn current_block_height(&self) -> Result<u64, LedgerError> {
        self.call("getBlockHeight", json!([self.commitment_config()]))
            .await
    }

    async fn status_of(&self, signature: TxSignature) -> Result<SignatureStatus, LedgerError> {
        let response: WithContext<Vec<Option<StatusValue>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(SignatureStatus::Unknown);
        };
        if let Some(err) = status.err {
            return Ok(SignatureStatus::Failed(err.to_string()));
        }
        Ok(match status.confirmation_status {
            Some(reached) if self.commitment.is_met_by(reached) => SignatureStatus::Confirmed,
            _ => SignatureStatus::Pending,
        })
    }
}

impl LedgerClient for RpcLedgerClient {
    fn latest_blockhash(&self) -> LedgerFut<'_, BlockhashContext> {
        Box::pin(async move {
            let response: WithContext<BlockhashValue> = self
                .call("getLatestBlockhash", json!([self.commitment_config()]))
                .await?;
            let blockhash: Blockhash = response.value.blockhash.parse().map_err(|e| {
                LedgerError::InvalidResponse(format!("getLatestBlockhash: {e}"))
            })?;
            Ok(BlockhashContext {
                blockhash,
                last_valid_block_height: response.value.last_valid_block_height,
                slot: response.context.slot,
            })
        })
    }

    fn minimum_balance_for_rent_exemption(&self, space: u64) -> LedgerFut<'_, Lamports> {
        Box::pin(async move {
            let lamports: u64 = self
                .call("getMinimumBalanceForRentExemption", json!([space]))
                .await?;
            Ok(Lamports::new(lamports))
        })
    }

    fn balance(&self, address: Address) -> LedgerFut<'_, Lamports> {
        Box::pin(async move {
            let response: WithContext<u64> = self
                .call(
                    "getBalance",
                    json!([address.to_string(), self.commitment_config()]),
                )
                .await?;
            Ok(Lamports::new(response.value))
        })
    }

    fn submit_transaction<'a>(
        &'a self,
        wire: &'a [u8],
        min_context_slot: u64,
    ) -> LedgerFut<'a, TxSignature> {
        Box::pin(async move {
            let encoded = STANDARD.encode(wire);
            let text: String = self
                .call(
                    "sendTransaction",
                    json!([encoded, {
                        "encoding": "base64",
                        "preflightCommitment": self.commitment.as_str(),
                        "minContextSlot": min_context_slot,
                    }]),
                )
                .await?;
            text.parse()
                .map_err(|e| LedgerError::InvalidResponse(format!("sendTransaction: {e}")))
        })
    }

    fn confirm_transaction(
        &self,
        signature: TxSignature,
        context: BlockhashContext,
    ) -> LedgerFut<'_, Confirmation> {
        Box::pin(async move {
            loop {
                match self.status_of(signature).await? {
                    SignatureStatus::Confirmed => return Ok(Confirmation::Confirmed),
                    SignatureStatus::Failed(reason) => return Ok(Confirmation::Failed(reason)),
                    SignatureStatus::Pending | SignatureStatus::Unknown => {}
                }
                let height = self.current_block_height().await?;
                if height > context.last_valid_block_height {
                    // It may have landed between the status read and the height read.
                    match self.status_of(signature).await? {
                        SignatureStatus::Confirmed => return Ok(Confirmation::Confirmed),
                        SignatureStatus::Failed(reason) => {
                            return Ok(Confirmation::Failed(reason));
                        }
                        SignatureStatus::Pending => {}
                        SignatureStatus::Unknown => {
                            debug!(%signature, height, "Blockhash expired before confirmation");
                            return Ok(Confirmation::Expired);
                        }
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        })
    }

    fn signature_status(&self, signature: TxSignature) -> LedgerFut<'_, SignatureStatus> {
        Box::pin(self.status_of(signature))
    }

    fn block_height(&self) -> LedgerFut<'_, u64> {
        Box::pin(self.current_block_height())
    }

    fn signature_for_address(&self, address: Address) -> LedgerFut<'_, Option<TxSignature>> {
        Box::pin(async move {
            // History lookups reject `processed`.
            let commitment = match self.commitment {
                Commitment::Finalized => Commitment::Finalized,
                Commitment::Processed | Commitment::Confirmed => Commitment::Confirmed,
            };
            let entries: Vec<SignatureInfo> = self
                .call(
                    "getSignaturesForAddress",
                    json!([address.to_string(), {
                        "limit": 1,
                        "commitment": commitment.as_str(),
                    }]),
                )
                .await?;
            entries
                .into_iter()
                .next()
                .map(|entry| entry.signature.parse())
                .transpose()
                .map_err(|e| {
                    LedgerError::InvalidResponse(format!("getSignaturesForAddress: {e}"))
                })
        })
    }
}
