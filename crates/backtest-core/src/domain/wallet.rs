//! 지갑 및 잔고 타입.
//!
//! 이 모듈은 시뮬레이션 계좌의 지갑 관련 타입을 정의합니다:
//! - `WalletCurrency` - 단일 자산 지갑 (총 잔고 / 사용 가능 잔고)
//! - `Wallets` - 자산 이름으로 조회하는 지갑 모음
//! - `BalanceUsd` - 호가 통화 기준 평가 잔고

use crate::types::{Price, Quantity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 단일 자산 지갑.
///
/// `available`은 미체결 주문에 예약된 자금을 제외한 잔고이며,
/// 항상 `balance` 이하입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletCurrency {
    /// 자산 이름 (예: BTC, USDT)
    pub name: String,
    /// 총 잔고
    pub balance: Quantity,
    /// 사용 가능 잔고
    pub available: Quantity,
}

impl WalletCurrency {
    /// 새 지갑을 생성합니다. 전체 잔고가 사용 가능 상태로 시작합니다.
    pub fn new(name: impl Into<String>, balance: Quantity) -> Self {
        Self {
            name: name.into().to_uppercase(),
            balance,
            available: balance,
        }
    }

    /// 잔고가 없는 빈 지갑을 생성합니다.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Quantity::ZERO)
    }

    /// 미체결 주문에 예약된 수량을 반환합니다.
    pub fn reserved(&self) -> Quantity {
        self.balance - self.available
    }
}

/// 자산 이름으로 조회하는 지갑 모음.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallets {
    wallets: HashMap<String, WalletCurrency>,
}

impl Wallets {
    /// 빈 지갑 모음을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 잔고 목록으로 지갑 모음을 생성합니다.
    pub fn with_balances(balances: impl IntoIterator<Item = (String, Quantity)>) -> Self {
        let mut rs = Self::new();
        for (name, balance) in balances {
            rs.update(WalletCurrency::new(name, balance));
        }
        rs
    }

    /// 자산 이름으로 지갑을 조회합니다.
    pub fn get(&self, name: &str) -> Option<&WalletCurrency> {
        self.wallets.get(&name.to_uppercase())
    }

    /// 지갑을 조회하거나, 없으면 빈 지갑을 반환합니다.
    pub fn get_or_empty(&self, name: &str) -> WalletCurrency {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| WalletCurrency::empty(name))
    }

    /// 지갑을 갱신하거나 추가합니다.
    pub fn update(&mut self, wallet: WalletCurrency) {
        self.wallets.insert(wallet.name.clone(), wallet);
    }

    /// 모든 지갑을 반환합니다.
    pub fn all(&self) -> impl Iterator<Item = &WalletCurrency> {
        self.wallets.values()
    }

    /// 지갑 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    /// 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

/// 호가 통화 기준 평가 잔고.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceUsd {
    /// 호가 통화 지갑의 총 잔고
    pub total: Price,
    /// 모든 보유 자산을 현재 시세로 평가한 순자산
    pub net_worth: Price,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wallet_reserved() {
        let mut wallet = WalletCurrency::new("usdt", dec!(1000));
        assert_eq!(wallet.name, "USDT");
        assert_eq!(wallet.reserved(), dec!(0));

        wallet.available = dec!(999);
        assert_eq!(wallet.reserved(), dec!(1));
    }

    #[test]
    fn test_wallets_lookup() {
        let wallets =
            Wallets::with_balances([("USDT".to_string(), dec!(1000)), ("BTC".to_string(), dec!(2))]);

        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets.get("usdt").unwrap().balance, dec!(1000));
        assert!(wallets.get("ETH").is_none());

        let empty = wallets.get_or_empty("ETH");
        assert_eq!(empty.balance, dec!(0));
        assert_eq!(empty.available, dec!(0));
    }
}
