//! Normalized Quote Type
//!
//! The canonical quote shape delivered to websocket clients. One value is
//! produced per instrument per poll cycle and serialized as a single JSON
//! text frame; nothing is retained after delivery.
//!
//! Price and volume fields are relayed as strings exactly as the upstream
//! API reports them. The relay performs no arithmetic on them, so no
//! numeric parse happens on the hot path and upstream formatting survives
//! intact (trailing zeros, `-0.00`, and the like).

use serde::{Deserialize, Serialize};

/// A last-traded-price update for one instrument.
///
/// # Wire Format (JSON)
/// ```json
/// {"tk": "11536", "lp": "101.5", "pc": "0.5", "v": "200"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedQuote {
    /// Exchange token identifying the instrument.
    #[serde(rename = "tk")]
    pub exchange_token: String,

    /// Last traded price.
    #[serde(rename = "lp")]
    pub last_price: String,

    /// Percent change since previous close.
    #[serde(rename = "pc")]
    pub percent_change: String,

    /// Volume at last trade.
    #[serde(rename = "v")]
    pub last_volume: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_short_field_names() {
        let quote = NormalizedQuote {
            exchange_token: "123".to_string(),
            last_price: "101.5".to_string(),
            percent_change: "0.5".to_string(),
            last_volume: "200".to_string(),
        };

        let json = serde_json::to_string(&quote).unwrap();
        assert_eq!(json, r#"{"tk":"123","lp":"101.5","pc":"0.5","v":"200"}"#);
    }

    #[test]
    fn round_trips_through_json() {
        let quote = NormalizedQuote {
            exchange_token: "26000".to_string(),
            last_price: "0".to_string(),
            percent_change: "-1.25".to_string(),
            last_volume: "0".to_string(),
        };

        let json = serde_json::to_string(&quote).unwrap();
        let back: NormalizedQuote = serde_json::from_str(&json).unwrap();
        assert_eq!(back, quote);
    }
}
