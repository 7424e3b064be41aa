//! Validated ticker symbols

use crate::error::{PredictError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_SYMBOL_LEN: usize = 15;

/// An upper-cased ticker such as `AAPL`, `BRK.B` or `BTC-USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Validate and normalize a ticker.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PredictError::InvalidSymbol("empty symbol".to_string()));
        }
        if trimmed.len() > MAX_SYMBOL_LEN {
            return Err(PredictError::InvalidSymbol(format!(
                "{trimmed} is longer than {MAX_SYMBOL_LEN} characters"
            )));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/')))
        {
            return Err(PredictError::InvalidSymbol(format!(
                "{trimmed} contains '{bad}'"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Symbol {
    type Error = PredictError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let symbol = Symbol::parse("  aapl ").unwrap();
        assert_eq!(symbol.as_str(), "AAPL");
        assert_eq!(symbol.to_string(), "AAPL");
    }

    #[test]
    fn test_accepts_share_classes_and_pairs() {
        assert!(Symbol::parse("BRK.B").is_ok());
        assert!(Symbol::parse("btc-usd").is_ok());
        assert!(Symbol::parse("ETH/USD").is_ok());
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("   ").is_err());
        assert!(Symbol::parse("AA PL").is_err());
        assert!(Symbol::parse("DROP;TABLE").is_err());
        assert!(Symbol::parse("ABCDEFGHIJKLMNOP").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let symbol: Symbol = serde_json::from_str("\"tsla\"").unwrap();
        assert_eq!(symbol.as_str(), "TSLA");
        assert_eq!(serde_json::to_string(&symbol).unwrap(), "\"TSLA\"");
        assert!(serde_json::from_str::<Symbol>("\"no way\"").is_err());
    }
}
