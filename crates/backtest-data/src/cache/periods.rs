//! 캐시된 캔들 구간과 구간 병합.
//!
//! 구간(`Period`)은 검증된 연속 캔들 범위입니다. 새 구간을 추가할 때
//! 겹치는 구간은 고정점에 도달할 때까지 반복적으로 병합되어,
//! 구간 집합은 항상 서로 겹치지 않는 상태를 유지합니다.

use backtest_core::{Candle, CandleSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 연속된 캔들 범위.
///
/// `from`/`to`는 첫/마지막 캔들의 시작 시각입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// 첫 캔들의 시작 시각
    pub from: DateTime<Utc>,
    /// 마지막 캔들의 시작 시각
    pub to: DateTime<Utc>,
    /// 구간의 캔들 (시간 오름차순)
    pub candles: Vec<Candle>,
}

impl Period {
    /// 캔들 시퀀스로부터 구간을 생성합니다.
    ///
    /// 시퀀스가 비어있으면 `None`을 반환합니다.
    pub fn new(candles: Vec<Candle>) -> Option<Self> {
        let from = candles.first()?.open_time;
        let to = candles.last()?.open_time;
        Some(Self { from, to, candles })
    }

    /// `[from, to]` 범위에 속하는 캔들 부분 시퀀스를 반환합니다.
    pub fn part(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CandleSeries {
        CandleSeries::new(
            self.candles
                .iter()
                .filter(|c| c.open_time >= from && c.open_time <= to)
                .cloned()
                .collect(),
        )
    }

    /// 두 구간의 범위가 겹치는지 확인합니다 (경계 포함).
    ///
    /// 캔들 하나 간격으로 인접하기만 한 구간은 겹치지 않으므로
    /// 병합되지 않습니다.
    pub fn overlaps(&self, other: &Period) -> bool {
        self.to >= other.from && self.from <= other.to
    }

    /// 겹치는 두 구간을 하나로 병합합니다.
    ///
    /// 먼저 시작하는 구간의 캔들을 모두 유지하고, 나중 구간에서는
    /// 그 이후의 캔들만 이어 붙입니다. 중복 시각의 캔들은 먼저
    /// 시작한 구간의 것이 남습니다.
    pub fn combine(self, other: Period) -> Period {
        let (first, second) = if self.from <= other.from {
            (self, other)
        } else {
            (other, self)
        };

        let from = first.from;
        let to = first.to.max(second.to);

        let last = first.to;
        let mut candles = first.candles;
        candles.extend(second.candles.into_iter().filter(|c| c.open_time > last));

        Period { from, to, candles }
    }
}

/// 서로 겹치지 않는 구간의 집합.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSet {
    /// 구간 목록 (시작 시각 오름차순)
    pub periods: Vec<Period>,
}

impl PeriodSet {
    /// 빈 구간 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `[from, to]` 범위를 완전히 덮는 구간을 찾아 해당 부분을 반환합니다.
    pub fn get(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<CandleSeries> {
        self.periods
            .iter()
            .find(|p| p.from <= from && p.to >= to)
            .map(|p| p.part(from, to))
    }

    /// 새 구간을 추가하고 겹치는 구간을 고정점까지 병합합니다.
    pub fn insert(&mut self, period: Period) {
        self.periods.push(period);

        loop {
            let mut merged = false;

            'search: for i in 0..self.periods.len() {
                for j in (i + 1)..self.periods.len() {
                    if self.periods[i].overlaps(&self.periods[j]) {
                        let b = self.periods.swap_remove(j);
                        let a = self.periods.swap_remove(i);
                        self.periods.push(a.combine(b));
                        merged = true;
                        break 'search;
                    }
                }
            }

            if !merged {
                break;
            }
        }

        self.periods.sort_by_key(|p| p.from);
    }

    /// 구간 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}
