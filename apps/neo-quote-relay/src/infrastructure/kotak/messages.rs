//! Kotak Neo Wire Message Types
//!
//! Wire format types for deserializing responses from the credential
//! source and the Kotak Neo quotes REST API.
//!
//! Both endpoints are loosely typed on the wire: fields come and go while
//! a login is in flight, and numeric quote fields arrive as JSON strings
//! from some gateway versions and as numbers from others. These types
//! absorb that slack so everything past this module is strictly shaped.

use serde::{Deserialize, Deserializer};

use crate::domain::quote::NormalizedQuote;

// =============================================================================
// Credential Source
// =============================================================================

/// Response from the credential source endpoint.
///
/// Every field is optional on the wire; the backend serves the same shape
/// before and after the external login completes, with empty or missing
/// values beforehand.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "usersession": "eyJhbGciOi...",
///   "sid": "d3f9c1b2-...",
///   "userid": "AB1234",
///   "baseUrl": "https://gw-napi.kotaksecurities.com"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialResponse {
    /// Session token used as the `Authorization` header value.
    #[serde(default)]
    pub usersession: Option<String>,

    /// Server-assigned session id.
    #[serde(default)]
    pub sid: Option<String>,

    /// Trading account user id.
    #[serde(default)]
    pub userid: Option<String>,

    /// Base URL of the quotes API for this session.
    #[serde(rename = "baseUrl", default)]
    pub base_url: Option<String>,
}

// =============================================================================
// Quotes API
// =============================================================================

/// One element of the LTP quotes response array.
///
/// Missing or null fields are normal; they default at normalization time
/// rather than failing the batch.
///
/// # Wire Format (JSON)
/// ```json
/// [
///   {"exchange_token": "11536", "ltp": "101.5", "per_change": "0.5", "last_volume": "200"},
///   {"exchange_token": "26000", "ltp": 22415.05, "per_change": -0.12, "last_volume": 0}
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LtpQuoteMessage {
    /// Exchange token identifying the instrument.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub exchange_token: Option<String>,

    /// Last traded price.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub ltp: Option<String>,

    /// Percent change since previous close.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub per_change: Option<String>,

    /// Volume at last trade.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub last_volume: Option<String>,
}

impl LtpQuoteMessage {
    /// Normalize the wire element into the quote delivered to clients.
    ///
    /// Missing fields default to `"0"`, except the exchange token which
    /// defaults to the empty string.
    #[must_use]
    pub fn into_quote(self) -> NormalizedQuote {
        NormalizedQuote {
            exchange_token: self.exchange_token.unwrap_or_default(),
            last_price: self.ltp.unwrap_or_else(|| "0".to_string()),
            percent_change: self.per_change.unwrap_or_else(|| "0".to_string()),
            last_volume: self.last_volume.unwrap_or_else(|| "0".to_string()),
        }
    }
}

/// Accept a JSON string or number and normalize it to a string.
///
/// Null deserializes to `None` so per-field defaults apply uniformly to
/// missing and null values.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "quote field must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_response_full() {
        let json = r#"{
            "usersession": "tok-123",
            "sid": "sid-456",
            "userid": "AB1234",
            "baseUrl": "https://gw.example.com"
        }"#;
        let response: CredentialResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.usersession.as_deref(), Some("tok-123"));
        assert_eq!(response.base_url.as_deref(), Some("https://gw.example.com"));
    }

    #[test]
    fn credential_response_tolerates_missing_and_null_fields() {
        let response: CredentialResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response, CredentialResponse::default());

        let response: CredentialResponse =
            serde_json::from_str(r#"{"usersession": null, "baseUrl": null}"#).unwrap();
        assert!(response.usersession.is_none());
        assert!(response.base_url.is_none());
    }

    #[test]
    fn ltp_message_with_string_fields() {
        let json = r#"{"exchange_token":"123","ltp":"101.5","per_change":"0.5","last_volume":"200"}"#;
        let msg: LtpQuoteMessage = serde_json::from_str(json).unwrap();

        let quote = msg.into_quote();
        assert_eq!(quote.exchange_token, "123");
        assert_eq!(quote.last_price, "101.5");
        assert_eq!(quote.percent_change, "0.5");
        assert_eq!(quote.last_volume, "200");
    }

    #[test]
    fn ltp_message_with_numeric_fields() {
        let json = r#"{"exchange_token":11536,"ltp":22415.05,"per_change":-0.12,"last_volume":0}"#;
        let msg: LtpQuoteMessage = serde_json::from_str(json).unwrap();

        let quote = msg.into_quote();
        assert_eq!(quote.exchange_token, "11536");
        assert_eq!(quote.last_price, "22415.05");
        assert_eq!(quote.percent_change, "-0.12");
        assert_eq!(quote.last_volume, "0");
    }

    #[test]
    fn ltp_message_defaults_missing_fields() {
        let msg: LtpQuoteMessage = serde_json::from_str("{}").unwrap();

        let quote = msg.into_quote();
        assert_eq!(quote.exchange_token, "");
        assert_eq!(quote.last_price, "0");
        assert_eq!(quote.percent_change, "0");
        assert_eq!(quote.last_volume, "0");
    }

    #[test]
    fn ltp_message_defaults_null_fields() {
        let json = r#"{"exchange_token":null,"ltp":null}"#;
        let msg: LtpQuoteMessage = serde_json::from_str(json).unwrap();

        let quote = msg.into_quote();
        assert_eq!(quote.exchange_token, "");
        assert_eq!(quote.last_price, "0");
    }

    #[test]
    fn ltp_message_rejects_non_scalar_fields() {
        let json = r#"{"ltp": {"nested": true}}"#;
        let result: Result<LtpQuoteMessage, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn ltp_array_decodes_in_order() {
        let json = r#"[
            {"exchange_token":"1","ltp":"10"},
            {"exchange_token":"2","ltp":"20"}
        ]"#;
        let messages: Vec<LtpQuoteMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].exchange_token.as_deref(), Some("1"));
        assert_eq!(messages[1].exchange_token.as_deref(), Some("2"));
    }
}
