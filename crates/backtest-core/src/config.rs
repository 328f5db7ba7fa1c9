//! 설정 관리.
//!
//! 이 모듈은 시뮬레이션 설정을 정의하고 관리합니다.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 시뮬레이션 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// 시뮬레이션 구간
    pub time: TimeRangeConfig,
    /// 가상 시계 설정
    pub clock: ClockConfig,
    /// 계좌 설정
    pub account: AccountConfig,
    /// 캔들 캐시 설정
    pub cache: CacheConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time: TimeRangeConfig::default(),
            clock: ClockConfig::default(),
            account: AccountConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// 시뮬레이션 시간 구간 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeRangeConfig {
    /// 시작 시각
    pub from: DateTime<Utc>,
    /// 종료 시각
    pub to: DateTime<Utc>,
}

impl Default for TimeRangeConfig {
    fn default() -> Self {
        Self {
            from: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2020, 12, 31, 23, 59, 59).unwrap(),
        }
    }
}

/// 가상 시계 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClockConfig {
    /// 실제 틱 간격 (밀리초). 틱마다 시뮬레이션 시간이 1분 진행됩니다.
    pub tick_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
        }
    }
}

/// 계좌 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    /// 호가 통화 (예: USDT)
    pub quote_currency: String,
    /// 자산별 초기 잔고
    pub initial_balances: HashMap<String, Decimal>,
}

impl Default for AccountConfig {
    fn default() -> Self {
        let mut initial_balances = HashMap::new();
        initial_balances.insert("USDT".to_string(), Decimal::from(10000));

        Self {
            quote_currency: "USDT".to_string(),
            initial_balances,
        }
    }
}

/// 캔들 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// 캐시 영속화 파일 경로
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "./data/candle_cache.json".to_string(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl SimulationConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("clock.tick_interval_ms", 100)?
            .set_default("account.quote_currency", "USDT")?
            .set_default("cache.path", "./data/candle_cache.json")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("BACKTEST")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert_eq!(config.account.quote_currency, "USDT");
        assert_eq!(config.clock.tick_interval_ms, 100);
        assert!(config.time.from < config.time.to);
    }
}
