//! 시장 데이터 구독 정의.

use crate::types::{Symbol, Timeframe};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 구독 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionKind {
    /// 시세 구독
    Ticker,
    /// 캔들 구독
    Candle,
}

/// 시장 데이터 구독.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// 구독 식별자
    pub id: Uuid,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 구독 종류
    pub kind: SubscriptionKind,
    /// 캔들 구독의 타임프레임
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
}

impl Subscription {
    /// 시세 구독을 생성합니다.
    pub fn ticker(symbol: Symbol) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            kind: SubscriptionKind::Ticker,
            timeframe: None,
        }
    }

    /// 캔들 구독을 생성합니다.
    pub fn candle(symbol: Symbol, timeframe: Timeframe) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            kind: SubscriptionKind::Candle,
            timeframe: Some(timeframe),
        }
    }
}
