//! Instrument Identity Types
//!
//! Domain types for identifying tradeable instruments across the Kotak Neo
//! exchange segments, plus parsing of the raw symbol strings clients send.
//!
//! # Design
//!
//! Clients address instruments as `EXCHANGE|TOKEN` (or `EXCHANGE TOKEN` with
//! a single space). The upstream quotes API addresses the same instrument as
//! `segment|token`, where the segment is the lowercase internal name of the
//! exchange (e.g. `NSE` becomes `nse_cm`). Parsing happens once, at
//! subscription time; everything downstream works with [`InstrumentKey`].

use thiserror::Error;

// =============================================================================
// Exchange Segments
// =============================================================================

/// Exchange segment recognized by the upstream quotes API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeSegment {
    /// NSE cash market.
    NseCm,
    /// NSE futures and options.
    NseFo,
    /// BSE cash market.
    BseCm,
    /// BSE futures and options.
    BseFo,
}

impl ExchangeSegment {
    /// Segment name as the upstream API expects it in query paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NseCm => "nse_cm",
            Self::NseFo => "nse_fo",
            Self::BseCm => "bse_cm",
            Self::BseFo => "bse_fo",
        }
    }

    /// Map a client-facing exchange name to its segment.
    ///
    /// Only the four exchanges the relay serves are recognized; anything
    /// else returns `None` and the symbol is dropped by the caller.
    #[must_use]
    pub fn from_exchange(exchange: &str) -> Option<Self> {
        match exchange {
            "NSE" => Some(Self::NseCm),
            "NFO" => Some(Self::NseFo),
            "BSE" => Some(Self::BseCm),
            "BFO" => Some(Self::BseFo),
            _ => None,
        }
    }
}

// =============================================================================
// Instrument Key
// =============================================================================

/// Identity of one subscribable instrument: (segment, token).
///
/// Equal pairs are the same instrument regardless of how many clients
/// asked for them or in which order; the registry dedupes on this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstrumentKey {
    /// Exchange segment the instrument trades on.
    pub segment: ExchangeSegment,
    /// Exchange-assigned instrument token (opaque, not numeric-validated).
    pub token: String,
}

impl InstrumentKey {
    /// Parse a raw client symbol into an instrument key.
    ///
    /// The separator is `|` when present, otherwise a single space. The
    /// symbol must split into exactly two fields, `EXCHANGE` and `TOKEN`.
    ///
    /// # Errors
    ///
    /// [`SymbolParseError::Malformed`] when the field count is not two,
    /// [`SymbolParseError::UnknownExchange`] when the exchange is not one
    /// of NSE/NFO/BSE/BFO.
    pub fn parse(raw: &str) -> Result<Self, SymbolParseError> {
        let separator = if raw.contains('|') { '|' } else { ' ' };
        let mut fields = raw.split(separator);

        let (Some(exchange), Some(token), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(SymbolParseError::Malformed {
                symbol: raw.to_string(),
            });
        };

        let segment = ExchangeSegment::from_exchange(exchange).ok_or_else(|| {
            SymbolParseError::UnknownExchange {
                exchange: exchange.to_string(),
            }
        })?;

        Ok(Self {
            segment,
            token: token.to_string(),
        })
    }

    /// Render the key as one `segment|token` fragment of an upstream query.
    #[must_use]
    pub fn query_fragment(&self) -> String {
        format!("{}|{}", self.segment.as_str(), self.token)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Why a raw client symbol could not become an [`InstrumentKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolParseError {
    /// The symbol did not split into exactly `EXCHANGE` and `TOKEN`.
    #[error("symbol `{symbol}` does not split into exchange and token")]
    Malformed {
        /// The raw symbol as received.
        symbol: String,
    },

    /// The exchange field is not one the relay serves.
    #[error("unrecognized exchange `{exchange}`")]
    UnknownExchange {
        /// The offending exchange field.
        exchange: String,
    },
}

// =============================================================================
// Tests
// =============================================================================
