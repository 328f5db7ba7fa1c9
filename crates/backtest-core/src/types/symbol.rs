//! 거래 심볼 정의.
//!
//! 이 모듈은 시뮬레이션 시장에서 거래 가능한 페어를 나타내는
//! `Symbol` 타입을 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 거래 가능한 페어를 나타내는 심볼.
///
/// 심볼은 기준 자산과 호가 자산으로 구성됩니다. 예: BTC/USDT.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// 기준 자산 (예: BTC)
    pub base: String,
    /// 호가 자산 (예: USDT)
    pub quote: String,
}

impl Symbol {
    /// 새 심볼을 생성합니다.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
        }
    }

    /// 거래소 페어 문자열(예: "BTCUSDT")에서 심볼을 파싱합니다.
    ///
    /// 페어가 주어진 호가 자산으로 끝나지 않으면 `None`을 반환합니다.
    pub fn from_pair(pair: &str, quote: &str) -> Option<Self> {
        let pair = pair.to_uppercase();
        let quote = quote.to_uppercase();
        let base = pair.strip_suffix(quote.as_str())?;
        if base.is_empty() {
            return None;
        }
        Some(Self {
            base: base.to_string(),
            quote,
        })
    }

    /// 구분자 없는 거래소 페어 형식을 반환합니다 (예: "BTCUSDT").
    pub fn pair(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_creation() {
        let symbol = Symbol::new("btc", "usdt");
        assert_eq!(symbol.base, "BTC");
        assert_eq!(symbol.quote, "USDT");
        assert_eq!(symbol.pair(), "BTCUSDT");
    }

    #[test]
    fn test_symbol_display() {
        let symbol = Symbol::new("BTC", "USDT");
        assert_eq!(symbol.to_string(), "BTC/USDT");
    }

    #[test]
    fn test_symbol_from_pair() {
        let symbol = Symbol::from_pair("ETHUSDT", "USDT").unwrap();
        assert_eq!(symbol.base, "ETH");
        assert_eq!(symbol.quote, "USDT");

        assert!(Symbol::from_pair("ETHBTC", "USDT").is_none());
        assert!(Symbol::from_pair("USDT", "USDT").is_none());
    }
}
