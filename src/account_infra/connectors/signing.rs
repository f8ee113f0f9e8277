use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `payload` keyed by `secret`.
pub fn sign_hex(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `k=v&k=v` in the given order, percent-encoding anything outside the
/// unreserved set.
pub fn canonical_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(raw: &str) -> String {
    raw.bytes()
        .map(|b| {
            let c = b as char;
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                format!("%{:02X}", b)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_binance_documented_example() {
        // Example request from the Binance API signing documentation
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            sign_hex(secret, query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn any_key_length_signs() {
        let long_secret = "k".repeat(200);
        assert_eq!(sign_hex("", "payload").len(), 64);
        assert_eq!(sign_hex(&long_secret, "payload").len(), 64);
        assert_ne!(sign_hex("a", "payload"), sign_hex("b", "payload"));
    }

    #[test]
    fn canonical_query_keeps_order_and_encodes() {
        let query = canonical_query(&[
            ("timestamp", "123".to_string()),
            ("note", "a b&c".to_string()),
        ]);
        assert_eq!(query, "timestamp=123&note=a%20b%26c");
    }
}
