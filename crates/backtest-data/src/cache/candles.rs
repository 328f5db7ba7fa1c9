//! 캔들 캐시.
//!
//! 내려받은 캔들을 시장/타임프레임/심볼 키 아래 구간으로 캐싱하고
//! JSON 파일로 영속화합니다. 요청 범위가 캐시에 없으면 주입된
//! 로더로 내려받아 기존 구간과 병합합니다.
//!
//! 키 단위 배타 락으로 같은 키에 대한 동시 요청이 중복 다운로드를
//! 일으키지 않도록 합니다.

use crate::cache::periods::{Period, PeriodSet};
use crate::error::{DataError, DataResult};
use crate::loader::CandleLoader;
use backtest_core::{CandleSeries, Symbol, Timeframe};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace, warn};

/// 영속화 형식 버전. 버전이 다른 파일은 무시되고 빈 캐시로 시작합니다.
const VERSION: &str = "v1";

type Store = Arc<RwLock<HashMap<String, PeriodSet>>>;

/// 키 단위 배타 락 레지스트리.
///
/// 락은 키 최초 사용 시 생성되며 제거되지 않습니다. 키 공간은
/// 시장/타임프레임/심볼 조합으로 유한합니다.
type FetchLockMap = Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>;

/// 디스크 파일의 최상위 구조.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    items: HashMap<String, CacheItem>,
}

/// 키 하나의 저장 항목.
#[derive(Debug, Serialize, Deserialize)]
struct CacheItem {
    periods: Vec<Period>,
    /// TTL 만료 시각. 현재는 사용되지 않으며 항상 0으로 기록됩니다.
    #[serde(default)]
    expiration: i64,
}

/// 영속화되는 캔들 캐시.
pub struct CandleCache {
    store: Store,
    locks: FetchLockMap,
    file_path: PathBuf,
}

impl CandleCache {
    /// 파일에서 캐시를 로드하거나, 파일이 없으면 새로 만듭니다.
    pub fn new<P: AsRef<Path>>(file_path: P) -> DataResult<Self> {
        let file_path = file_path.as_ref().to_path_buf();

        let mut items = HashMap::new();
        if file_path.exists() {
            let raw = std::fs::read(&file_path)?;
            if !raw.is_empty() {
                let data: CacheFile = serde_json::from_slice(&raw)?;
                if data.version == VERSION {
                    items = data
                        .items
                        .into_iter()
                        .map(|(key, item)| (key, PeriodSet { periods: item.periods }))
                        .collect();
                } else {
                    debug!(
                        found = %data.version,
                        expected = %VERSION,
                        "cache version mismatch, starting empty"
                    );
                }
            }
        } else {
            std::fs::write(&file_path, b"")?;
        }

        debug!(path = %file_path.display(), keys = items.len(), "cache loaded");

        Ok(Self {
            store: Arc::new(RwLock::new(items)),
            locks: Arc::new(RwLock::new(HashMap::new())),
            file_path,
        })
    }

    /// 캐시 전체를 디스크에 저장합니다.
    pub async fn save(&self) -> DataResult<()> {
        let store = self.store.read().await;

        let data = CacheFile {
            version: VERSION.to_string(),
            items: store
                .iter()
                .map(|(key, set)| {
                    (
                        key.clone(),
                        CacheItem {
                            periods: set.periods.clone(),
                            expiration: 0,
                        },
                    )
                })
                .collect(),
        };

        let raw = serde_json::to_vec(&data)?;
        std::fs::write(&self.file_path, raw)?;

        debug!(path = %self.file_path.display(), "cache saved");

        Ok(())
    }

    /// 시장 이름과 로더를 묶은 시장별 캐시 뷰를 생성합니다.
    ///
    /// 저장소와 키 락 레지스트리는 모든 시장 뷰가 공유하므로, 같은 키에
    /// 대한 요청은 어느 뷰를 거치든 직렬화됩니다.
    pub fn market(&self, name: impl Into<String>, loader: Arc<dyn CandleLoader>) -> MarketCandleCache {
        let name = name.into();
        debug!(market = %name, "cache get market");
        MarketCandleCache {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            market: name,
            loader,
        }
    }
}

/// 특정 시장의 캔들을 제공하는 캐시 뷰.
pub struct MarketCandleCache {
    store: Store,
    locks: FetchLockMap,
    market: String,
    loader: Arc<dyn CandleLoader>,
}

impl MarketCandleCache {
    /// `[from, to]` 범위의 캔들을 반환합니다.
    ///
    /// 범위는 타임프레임 경계로 정규화됩니다. 정규화된 끝이 `now` 이후면
    /// 마지막 봉은 아직 닫히지 않은 것이므로 캐시를 거치지 않고 새로
    /// 내려받아 결과 끝에 덧붙이며, 캐시에는 저장하지 않습니다.
    pub async fn get(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        symbol: &Symbol,
        timeframe: Timeframe,
        now: DateTime<Utc>,
    ) -> DataResult<CandleSeries> {
        let key = self.make_key(symbol, timeframe);
        trace!(key = %key, %from, %to, "get candles");

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        let start = timeframe.floor(from);
        let mut end = timeframe.range_end(to);
        if start > end {
            return Err(DataError::InvalidRange(format!("{} > {}", from, to)));
        }

        let mut last_candle = None;

        if end >= now {
            // 마지막 봉이 아직 닫히지 않음. 닫히지 않은 봉은 캐시하면
            // 안 되므로 항상 새로 내려받는다.
            trace!(key = %key, "download open trailing bar");

            let fresh = self
                .loader
                .load(timeframe.step_back(now), now, symbol, timeframe)
                .await?;

            let candle = fresh
                .candles
                .last()
                .cloned()
                .ok_or(DataError::OpenBarUnavailable)?;
            last_candle = Some(candle);

            // 닫힌 부분은 현재 봉 직전까지로 제한한다. `to`가 현재 봉을
            // 지나 미래에 있어도 미래 봉을 내려받거나 캐시하지 않는다.
            end = timeframe.floor(now) - Duration::seconds(1);
        }

        let mut rs = if start <= end {
            self.closed_range(&key, start, end, symbol, timeframe).await?
        } else {
            // 요청이 열린 봉 하나만 덮는 경우
            CandleSeries::default()
        };

        if let Some(candle) = last_candle {
            trace!(key = %key, "append open trailing bar");
            rs.candles.push(candle);
        }

        verify_series(&rs, timeframe)?;

        Ok(rs)
    }

    /// 닫힌 봉 범위를 캐시에서 조회하거나 내려받아 병합합니다.
    ///
    /// 호출자는 해당 키의 배타 락을 잡고 있어야 합니다.
    async fn closed_range(
        &self,
        key: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> DataResult<CandleSeries> {
        let mut collection = {
            let store = self.store.read().await;
            store.get(key).cloned().unwrap_or_default()
        };

        // 덮는 구간 탐색은 봉 시작 시각 기준
        let end_bar = timeframe.floor(end);

        if let Some(series) = collection.get(start, end_bar) {
            trace!(key = %key, "cached candles for this period found");
            return Ok(series);
        }

        // 직전 봉 하나를 더 내려받아 이전 구간과 병합될 수 있게 한다
        let start_ex = timeframe.step_back(start);
        trace!(key = %key, %start_ex, %end, "period not cached, download");

        let fetched = self.loader.load(start_ex, end, symbol, timeframe).await?;
        let period =
            Period::new(fetched.candles).ok_or_else(|| DataError::EmptyFetch(key.to_string()))?;

        let rs = period.part(start, end);
        collection.insert(period);

        trace!(key = %key, "update cache");
        let mut store = self.store.write().await;
        store.insert(key.to_string(), collection);

        Ok(rs)
    }

    fn make_key(&self, symbol: &Symbol, timeframe: Timeframe) -> String {
        format!("{}_{}_{}", self.market, timeframe, symbol.pair())
    }

    /// 키의 배타 락을 가져오거나 생성합니다.
    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(key) {
                return Arc::clone(lock);
            }
        }

        let mut locks = self.locks.write().await;
        Arc::clone(
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// 캔들 시퀀스의 일관성을 검증합니다.
///
/// 시퀀스는 시간 오름차순이어야 하고, 모든 캔들의 심볼이 같아야 하며,
/// 인접 캔들의 간격이 정확히 타임프레임 한 칸이어야 합니다. 위반은
/// 수리하지 않고 에러로 반환합니다.
pub fn verify_series(series: &CandleSeries, timeframe: Timeframe) -> DataResult<()> {
    for w in series.candles.windows(2) {
        let (prev, next) = (&w[0], &w[1]);

        if prev.open_time > next.open_time {
            return Err(DataError::UnsortedSeries);
        }
        if prev.symbol != next.symbol {
            warn!(prev = %prev.symbol, next = %next.symbol, "symbol mismatch in series");
            return Err(DataError::InconsistentSeries(format!(
                "symbol mismatch: {} / {}",
                prev.symbol, next.symbol
            )));
        }
        if timeframe.step_forward(prev.open_time) != next.open_time {
            return Err(DataError::InconsistentSeries(format!(
                "gap between {} and {} is not one {} step",
                prev.open_time, next.open_time, timeframe
            )));
        }
    }
    Ok(())
}
