//! 캔들 로더 추상화.
//!
//! 캐시는 누락된 범위를 `CandleLoader`를 통해 내려받습니다. 로더는
//! 생성 시점에 주입되며, 실제 데이터 소스(거래소 API, 파일 등)와
//! 테스트용 정적 소스를 같은 트레이트로 다룹니다.

use crate::error::{DataError, DataResult};
use async_trait::async_trait;
use backtest_core::{Candle, CandleSeries, Symbol, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 캔들 데이터 소스.
///
/// 구현은 `open_time`이 `[from, to]` 범위 안에 있는 닫힌 캔들을
/// 시간 오름차순으로 반환해야 합니다.
#[async_trait]
pub trait CandleLoader: Send + Sync {
    /// 주어진 범위의 캔들을 내려받습니다.
    async fn load(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> DataResult<CandleSeries>;
}

/// 메모리에 보관된 시리즈에서 캔들을 제공하는 정적 로더.
///
/// 시뮬레이션과 테스트에서 결정적인 데이터 소스로 사용됩니다.
/// `load` 호출 횟수를 기록하므로 캐시 적중 여부를 검증할 수 있습니다.
#[derive(Default)]
pub struct StaticCandleLoader {
    series: HashMap<(String, Timeframe), CandleSeries>,
    calls: AtomicUsize,
}

impl StaticCandleLoader {
    /// 빈 로더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼/타임프레임의 전체 시리즈를 등록합니다.
    pub fn with_series(mut self, symbol: &Symbol, timeframe: Timeframe, series: CandleSeries) -> Self {
        self.series.insert((symbol.pair(), timeframe), series);
        self
    }

    /// 지금까지의 `load` 호출 횟수를 반환합니다.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleLoader for StaticCandleLoader {
    async fn load(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> DataResult<CandleSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let series = self
            .series
            .get(&(symbol.pair(), timeframe))
            .ok_or_else(|| DataError::Loader(format!("no data for {} {}", symbol, timeframe)))?;

        let candles = series
            .candles
            .iter()
            .filter(|c| c.open_time >= from && c.open_time <= to)
            .cloned()
            .collect();

        Ok(CandleSeries::new(candles))
    }
}

/// 주어진 범위를 덮는 결정적인 캔들 시리즈를 생성합니다.
///
/// 가격은 봉 인덱스에 따른 삼각파로 만들어져 실행마다 동일합니다.
/// 테스트와 데모 시나리오에서 사용됩니다.
pub fn generate_series(
    symbol: &Symbol,
    timeframe: Timeframe,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    base_price: Decimal,
) -> CandleSeries {
    let mut candles = Vec::new();
    let mut open_time = timeframe.floor(from);
    let mut index: i64 = 0;

    while open_time <= to {
        // 0..=19를 오르내리는 삼각파
        let phase = index.rem_euclid(40);
        let step = if phase < 20 { phase } else { 40 - phase };
        let open = base_price + Decimal::from(step);
        let close = base_price + Decimal::from(if phase + 1 < 20 { phase + 1 } else { 39 - phase });
        let high = open.max(close) + Decimal::ONE;
        let low = open.min(close) - Decimal::ONE;

        candles.push(Candle::new(
            symbol.clone(),
            timeframe,
            open_time,
            open,
            high,
            low,
            close,
            Decimal::from(100 + phase),
        ));

        open_time = timeframe.step_forward(open_time);
        index += 1;
    }

    CandleSeries::new(candles)
}
