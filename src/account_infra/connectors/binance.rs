use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use crate::account_infra::connectors::AccountSource;
use crate::account_infra::connectors::normalize::parse_amount;
use crate::account_infra::connectors::rest::{self, RestFailure};
use crate::account_infra::connectors::signing::{canonical_query, sign_hex};
use crate::account_infra::{ConnectorKind, Credentials, RawAccountData, RawPosition};
use crate::error::{ConnectionError, FetchError};
use crate::types::AccountBalance;
use crate::utils::helper::current_timestamp_ms;
use crate::QUOTE_ASSET;

const BALANCE_PATH: &str = "/fapi/v2/balance";
const POSITION_RISK_PATH: &str = "/fapi/v2/positionRisk";

// Error codes Binance uses for bad keys, signatures and permissions
const AUTH_ERROR_CODES: [i64; 3] = [-1022, -2014, -2015];

/// USDT-margined futures account on Binance.
pub struct BinanceConnector {
    credentials: Credentials,
    base_url: String,
    recv_window_ms: u64,
    client: Client,
}

impl BinanceConnector {
    pub fn new(credentials: Credentials, base_url: &str, recv_window_ms: u64) -> Self {
        BinanceConnector {
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            recv_window_ms,
            client: Client::new(),
        }
    }

    fn signed_url(&self, path: &str) -> String {
        let query = canonical_query(&[
            ("recvWindow", self.recv_window_ms.to_string()),
            ("timestamp", current_timestamp_ms().to_string()),
        ]);
        let signature = sign_hex(self.credentials.api_secret(), &query);
        format!("{}{}?{}&signature={}", self.base_url, path, query, signature)
    }

    async fn signed_get(&self, path: &str) -> Result<String, RestFailure> {
        let url = self.signed_url(path);
        let headers = [("X-MBX-APIKEY", self.credentials.api_key().to_string())];
        let (status, body) = rest::get_text(&self.client, &url, &headers).await?;

        if (200..300).contains(&status) {
            return Ok(body);
        }

        Err(classify_error(status, &body))
    }

    async fn fetch_balance(&self) -> Result<AccountBalance, RestFailure> {
        let body = self.signed_get(BALANCE_PATH).await?;
        let assets: Vec<BinanceAssetBalance> = rest::parse_json("balance", &body)?;

        let quote = assets
            .iter()
            .find(|a| a.asset == QUOTE_ASSET)
            .ok_or_else(|| RestFailure::Malformed(format!("{} balance missing", QUOTE_ASSET)))?;

        quote.to_balance().map_err(|e| RestFailure::Malformed(e.to_string()))
    }

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, RestFailure> {
        let body = self.signed_get(POSITION_RISK_PATH).await?;
        let entries: Vec<BinancePositionRisk> = rest::parse_json("positionRisk", &body)?;

        let mut positions = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.to_raw() {
                Ok(raw) => positions.push(raw),
                Err(e) => tracing::warn!(symbol = %entry.symbol, "Skipping unparsable Binance position: {}", e),
            }
        }
        Ok(positions)
    }
}

#[async_trait]
impl AccountSource for BinanceConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Binance
    }

    async fn probe(&self, source_name: &str) -> Result<(), ConnectionError> {
        self.fetch_balance()
            .await
            .map_err(|failure| failure.into_connection_error(source_name))?;
        tracing::info!(source = source_name, "Binance connected successfully");
        Ok(())
    }

    async fn fetch(&self) -> Result<RawAccountData, FetchError> {
        let (balance, positions) = tokio::try_join!(self.fetch_balance(), self.fetch_positions())?;
        Ok(RawAccountData { balance, positions })
    }
}

fn classify_error(status: u16, body: &str) -> RestFailure {
    let parsed: Option<BinanceErrorBody> = serde_json::from_str(body).ok();
    let (code, message) = match parsed {
        Some(err) => (err.code, err.msg),
        None => (i64::from(status), body.chars().take(200).collect()),
    };

    if status == 401 || status == 403 || AUTH_ERROR_CODES.contains(&code) {
        RestFailure::Rejected { code, message }
    } else {
        RestFailure::Api { code, message }
    }
}

#[derive(Deserialize)]
struct BinanceErrorBody {
    code: i64,
    msg: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceAssetBalance {
    asset: String,
    #[serde(default)]
    balance: String,
    #[serde(default)]
    available_balance: String,
    #[serde(default)]
    cross_un_pnl: String,
}

impl BinanceAssetBalance {
    fn to_balance(&self) -> Result<AccountBalance, FetchError> {
        Ok(AccountBalance {
            total: parse_amount("balance", &self.balance)?,
            available: parse_amount("availableBalance", &self.available_balance)?,
            unrealized_pnl: parse_amount("crossUnPnl", &self.cross_un_pnl)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinancePositionRisk {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    position_amt: String,
    #[serde(default)]
    entry_price: String,
    #[serde(default)]
    mark_price: String,
    #[serde(default)]
    un_realized_profit: String,
    position_side: Option<String>,  // LONG/SHORT in hedge mode, BOTH otherwise
}

impl BinancePositionRisk {
    fn to_raw(&self) -> Result<RawPosition, FetchError> {
        Ok(RawPosition {
            symbol: self.symbol.clone(),
            side_token: self.position_side.clone(),
            quantity: parse_amount("positionAmt", &self.position_amt)?,
            entry_price: parse_amount("entryPrice", &self.entry_price)?,
            mark_price: parse_amount("markPrice", &self.mark_price)?,
            unrealized_pnl: parse_amount("unRealizedProfit", &self.un_realized_profit)?,
        })
    }
}
