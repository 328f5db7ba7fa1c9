//! 데이터 계층의 에러 타입.

use thiserror::Error;

/// 데이터 계층 에러.
#[derive(Debug, Error)]
pub enum DataError {
    /// 캔들이 시간 오름차순이 아님
    #[error("Candles not sorted old > new")]
    UnsortedSeries,

    /// 캔들 시퀀스가 일관되지 않음 (심볼 불일치 또는 간격 오류)
    #[error("Candles are not consistent: {0}")]
    InconsistentSeries(String),

    /// 열린 마지막 봉을 다운로드하지 못함
    #[error("Last candle not downloaded")]
    OpenBarUnavailable,

    /// 로더가 닫힌 범위에 대해 빈 결과를 반환함
    #[error("Loader returned no candles for {0}")]
    EmptyFetch(String),

    /// 잘못된 요청 범위
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// 입출력 에러
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 로더 에러
    #[error("Loader error: {0}")]
    Loader(String),
}

/// 데이터 작업을 위한 Result 타입.
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// 일시적인 에러로 재시도할 수 있는지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Loader(_) | DataError::OpenBarUnavailable)
    }
}
