//! 포지션 타입.
//!
//! 마진 거래는 시뮬레이션 엔진에서 아직 지원되지 않습니다. 이 타입은
//! 조회 API의 반환 형태를 고정하기 위해 정의되어 있으며, 현재는 항상
//! 빈 목록으로만 반환됩니다.

use crate::types::{Price, Quantity, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 오픈 포지션.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// 포지션 식별자
    pub id: Uuid,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 포지션 수량 (음수 = 숏)
    pub amount: Quantity,
    /// 진입 가격
    pub base_price: Price,
    /// 레버리지
    pub leverage: u8,
    /// 포지션 생성 시각 (시뮬레이션 시간)
    pub created_at: DateTime<Utc>,
}
