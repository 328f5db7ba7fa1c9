//! 주문 타입 및 주문 관리.
//!
//! 이 모듈은 주문 관련 타입을 정의합니다:
//! - `OrderType` - 주문 유형 (지정가, 시장가, 스탑)
//! - `OrderRequest` - 주문 제출 요청
//! - `Order` - 체결 엔진에 등록된 주문
//!
//! 수량은 부호를 가집니다: 양수는 매수, 음수는 매도입니다.

use crate::types::{Price, Quantity, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// 지정가 주문
    Limit,
    /// 시장가 주문
    Market,
    /// 스탑 주문
    Stop,
}

impl OrderType {
    /// 제출 시 가격 지정이 필요한 주문 유형인지 확인합니다.
    pub fn requires_price(&self) -> bool {
        !matches!(self, OrderType::Market)
    }
}

/// 주문 제출 요청.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 수량 (음수 = 매도)
    pub amount: Quantity,
    /// 주문 가격 (시장가 주문에서는 무시)
    pub price: Price,
    /// 스탑 가격 (스탑 주문용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Price>,
    /// 마진 주문 여부
    #[serde(default)]
    pub margin: bool,
    /// 호출자 측 내부 식별자
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
}

impl OrderRequest {
    /// 지정가 주문 요청을 생성합니다.
    pub fn limit(symbol: Symbol, amount: Quantity, price: Price) -> Self {
        Self {
            symbol,
            order_type: OrderType::Limit,
            amount,
            price,
            stop_price: None,
            margin: false,
            internal_id: None,
        }
    }

    /// 시장가 주문 요청을 생성합니다.
    pub fn market(symbol: Symbol, amount: Quantity) -> Self {
        Self {
            symbol,
            order_type: OrderType::Market,
            amount,
            price: Price::ZERO,
            stop_price: None,
            margin: false,
            internal_id: None,
        }
    }

    /// 스탑 주문 요청을 생성합니다.
    pub fn stop(symbol: Symbol, amount: Quantity, price: Price, stop_price: Price) -> Self {
        Self {
            symbol,
            order_type: OrderType::Stop,
            amount,
            price,
            stop_price: Some(stop_price),
            margin: false,
            internal_id: None,
        }
    }

    /// 내부 식별자를 설정합니다.
    pub fn with_internal_id(mut self, id: impl Into<String>) -> Self {
        self.internal_id = Some(id.into());
        self
    }

    /// 매도 주문인지 확인합니다.
    pub fn is_sell(&self) -> bool {
        self.amount < Quantity::ZERO
    }
}

/// 체결 엔진에 등록된 주문.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 주문 식별자
    pub id: Uuid,
    /// 호출자 측 내부 식별자
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_id: Option<String>,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 가격
    pub price: Price,
    /// 평균 체결 가격 (체결 전 0)
    pub price_avg: Price,
    /// 스탑 가격
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Price>,
    /// 원래 주문 수량 (음수 = 매도)
    pub amount_original: Quantity,
    /// 미체결 잔여 수량
    pub amount_current: Quantity,
    /// 주문 생성 시각 (시뮬레이션 시간)
    pub created_at: DateTime<Utc>,
    /// 마지막 갱신 시각 (시뮬레이션 시간)
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 요청으로부터 새 주문을 생성합니다.
    pub fn from_request(request: &OrderRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            internal_id: request.internal_id.clone(),
            symbol: request.symbol.clone(),
            order_type: request.order_type,
            price: request.price,
            price_avg: Price::ZERO,
            stop_price: request.stop_price,
            amount_original: request.amount,
            amount_current: request.amount,
            created_at: now,
            updated_at: now,
        }
    }

    /// 매도 주문인지 확인합니다.
    pub fn is_sell(&self) -> bool {
        self.amount_original < Quantity::ZERO
    }

    /// 완전히 체결되었는지 확인합니다.
    pub fn is_filled(&self) -> bool {
        self.amount_current.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_request_side() {
        let symbol = Symbol::new("BTC", "USDT");
        assert!(!OrderRequest::limit(symbol.clone(), dec!(0.01), dec!(100)).is_sell());
        assert!(OrderRequest::limit(symbol, dec!(-0.01), dec!(100)).is_sell());
    }

    #[test]
    fn test_order_from_request() {
        let now = "2020-11-27T10:00:00Z".parse().unwrap();
        let request = OrderRequest::stop(Symbol::new("BTC", "USDT"), dec!(-0.5), dec!(90), dec!(95));
        let order = Order::from_request(&request, now);

        assert!(order.is_sell());
        assert!(!order.is_filled());
        assert_eq!(order.amount_current, dec!(-0.5));
        assert_eq!(order.stop_price, Some(dec!(95)));
        assert_eq!(order.created_at, now);
    }
}
