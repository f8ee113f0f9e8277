use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub binance_url: String,
    pub bybit_url: String,
    pub recv_window_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            binance_url: "https://fapi.binance.com".to_string(),
            bybit_url: "https://api.bybit.com".to_string(),
            recv_window_ms: 5_000,
        }
    }
}
