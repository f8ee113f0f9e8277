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

const WALLET_BALANCE_PATH: &str = "/v5/account/wallet-balance";
const POSITION_LIST_PATH: &str = "/v5/position/list";
const POSITION_PAGE_LIMIT: u32 = 200;
const MAX_POSITION_PAGES: usize = 20;

// Invalid key, bad signature, no permission, auth failed, key expired
const AUTH_RET_CODES: [i64; 5] = [10003, 10004, 10005, 10007, 33004];

/// Unified trading account (linear USDT contracts) on Bybit v5.
pub struct BybitConnector {
    credentials: Credentials,
    base_url: String,
    recv_window_ms: u64,
    client: Client,
}

impl BybitConnector {
    pub fn new(credentials: Credentials, base_url: &str, recv_window_ms: u64) -> Self {
        BybitConnector {
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            recv_window_ms,
            client: Client::new(),
        }
    }

    fn auth_headers(&self, query: &str) -> Vec<(&'static str, String)> {
        let timestamp = current_timestamp_ms().to_string();
        let recv_window = self.recv_window_ms.to_string();
        let payload = format!("{}{}{}{}", timestamp, self.credentials.api_key(), recv_window, query);
        let signature = sign_hex(self.credentials.api_secret(), &payload);

        vec![
            ("X-BAPI-API-KEY", self.credentials.api_key().to_string()),
            ("X-BAPI-SIGN", signature),
            ("X-BAPI-SIGN-TYPE", "2".to_string()),
            ("X-BAPI-TIMESTAMP", timestamp),
            ("X-BAPI-RECV-WINDOW", recv_window),
        ]
    }

    async fn signed_get<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T, RestFailure>
    where
        T: serde::de::DeserializeOwned,
    {
        let query = canonical_query(params);
        let headers = self.auth_headers(&query);
        let url = format!("{}{}?{}", self.base_url, path, query);
        let (status, body) = rest::get_text(&self.client, &url, &headers).await?;

        if status == 401 || status == 403 {
            return Err(RestFailure::Rejected {
                code: i64::from(status),
                message: body.chars().take(200).collect(),
            });
        }
        if !(200..300).contains(&status) {
            return Err(RestFailure::Api {
                code: i64::from(status),
                message: body.chars().take(200).collect(),
            });
        }

        let envelope: BybitEnvelope<T> = rest::parse_json(path, &body)?;
        if envelope.ret_code != 0 {
            return Err(if AUTH_RET_CODES.contains(&envelope.ret_code) {
                RestFailure::Rejected { code: envelope.ret_code, message: envelope.ret_msg }
            } else {
                RestFailure::Api { code: envelope.ret_code, message: envelope.ret_msg }
            });
        }

        envelope
            .result
            .ok_or_else(|| RestFailure::Malformed(format!("{} response has no result", path)))
    }

    async fn fetch_balance(&self) -> Result<AccountBalance, RestFailure> {
        let result: BybitList<BybitWallet> = self
            .signed_get(
                WALLET_BALANCE_PATH,
                &[("accountType", "UNIFIED".to_string()), ("coin", QUOTE_ASSET.to_string())],
            )
            .await?;

        let coin = result
            .list
            .first()
            .and_then(|wallet| wallet.coin.iter().find(|c| c.coin == QUOTE_ASSET))
            .ok_or_else(|| RestFailure::Malformed(format!("{} wallet missing", QUOTE_ASSET)))?;

        coin.to_balance().map_err(|e| RestFailure::Malformed(e.to_string()))
    }

    async fn fetch_positions(&self) -> Result<Vec<RawPosition>, RestFailure> {
        let mut positions = Vec::new();
        let mut cursor = String::new();

        for _ in 0..MAX_POSITION_PAGES {
            let mut params = vec![
                ("category", "linear".to_string()),
                ("settleCoin", QUOTE_ASSET.to_string()),
                ("limit", POSITION_PAGE_LIMIT.to_string()),
            ];
            if !cursor.is_empty() {
                params.push(("cursor", cursor.clone()));
            }

            let page: BybitList<BybitPosition> = self.signed_get(POSITION_LIST_PATH, &params).await?;
            for entry in page.list {
                match entry.to_raw() {
                    Ok(raw) => positions.push(raw),
                    Err(e) => tracing::warn!(symbol = %entry.symbol, "Skipping unparsable Bybit position: {}", e),
                }
            }

            if page.next_page_cursor.is_empty() || page.next_page_cursor == cursor {
                return Ok(positions);
            }
            cursor = page.next_page_cursor;
        }

        tracing::warn!(pages = MAX_POSITION_PAGES, "Bybit position list truncated");
        Ok(positions)
    }
}

#[async_trait]
impl AccountSource for BybitConnector {
    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Bybit
    }

    async fn probe(&self, source_name: &str) -> Result<(), ConnectionError> {
        self.fetch_balance()
            .await
            .map_err(|failure| failure.into_connection_error(source_name))?;
        tracing::info!(source = source_name, "Bybit connected successfully");
        Ok(())
    }

    async fn fetch(&self) -> Result<RawAccountData, FetchError> {
        let (balance, positions) = tokio::try_join!(self.fetch_balance(), self.fetch_positions())?;
        Ok(RawAccountData { balance, positions })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitEnvelope<T> {
    ret_code: i64,
    #[serde(default)]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitList<T> {
    #[serde(default = "Vec::new")]
    list: Vec<T>,
    #[serde(default)]
    next_page_cursor: String,
}

#[derive(Deserialize)]
struct BybitWallet {
    #[serde(default)]
    coin: Vec<BybitCoin>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitCoin {
    coin: String,
    #[serde(default)]
    wallet_balance: String,
    #[serde(default)]
    available_to_withdraw: String,
    #[serde(default)]
    unrealised_pnl: String,
}

impl BybitCoin {
    fn to_balance(&self) -> Result<AccountBalance, FetchError> {
        Ok(AccountBalance {
            total: parse_amount("walletBalance", &self.wallet_balance)?,
            available: parse_amount("availableToWithdraw", &self.available_to_withdraw)?,
            unrealized_pnl: parse_amount("unrealisedPnl", &self.unrealised_pnl)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitPosition {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    side: String,  // "Buy", "Sell", or "" when flat
    #[serde(default)]
    size: String,
    #[serde(default)]
    avg_price: String,
    #[serde(default)]
    mark_price: String,
    #[serde(default)]
    unrealised_pnl: String,
}

impl BybitPosition {
    fn to_raw(&self) -> Result<RawPosition, FetchError> {
        Ok(RawPosition {
            symbol: self.symbol.clone(),
            side_token: Some(self.side.clone()),
            quantity: parse_amount("size", &self.size)?,
            entry_price: parse_amount("avgPrice", &self.avg_price)?,
            mark_price: parse_amount("markPrice", &self.mark_price)?,
            unrealized_pnl: parse_amount("unrealisedPnl", &self.unrealised_pnl)?,
        })
    }
}
