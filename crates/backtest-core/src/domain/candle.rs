//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 시장 데이터 관련 타입을 정의합니다:
//! - `Candle` - OHLCV 캔들스틱 데이터
//! - `CandleSeries` - 동일 심볼/타임프레임의 연속 캔들
//! - `Ticker` - 시뮬레이션된 시세 데이터

use crate::types::{Price, Quantity, Symbol, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV 캔들스틱 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량 (기준 자산 단위)
    pub volume: Quantity,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        symbol: Symbol,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// 동일 심볼/타임프레임의 연속 캔들 시퀀스.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    /// 캔들 목록 (시간 오름차순)
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    /// 새 캔들 시퀀스를 생성합니다.
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }

    /// 캔들 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// 마지막 캔들을 반환합니다.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// 주어진 시각이 속한 캔들을 반환합니다.
    ///
    /// `t` 이전(포함)에 시작한 마지막 캔들을 선택합니다. `t`가 `None`이면
    /// 마지막 캔들을 반환합니다.
    pub fn candle_at(&self, t: Option<DateTime<Utc>>) -> Option<&Candle> {
        let t = match t {
            Some(t) => t,
            None => return self.candles.last(),
        };

        self.candles.iter().rev().find(|c| c.open_time <= t)
    }
}

/// 일중 시세 상태 (당일 고가/저가/거래량 및 호가 규모).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerState {
    /// 당일 고가
    pub high: Price,
    /// 당일 저가
    pub low: Price,
    /// 당일 거래량
    pub volume: Quantity,
    /// 매수 호가 잔량
    pub bid_size: Quantity,
    /// 매도 호가 잔량
    pub ask_size: Quantity,
}

/// 시뮬레이션된 시세 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 현재가
    pub price: Price,
    /// 최우선 매수 호가
    pub bid: Price,
    /// 최우선 매도 호가
    pub ask: Price,
    /// 시세 시각 (시뮬레이션 시간)
    pub time: DateTime<Utc>,
    /// 일중 상태
    pub state: TickerState,
}
