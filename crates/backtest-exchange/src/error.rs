//! 시뮬레이션 거래소의 에러 타입.

use backtest_data::DataError;
use thiserror::Error;
use uuid::Uuid;

/// 거래소 작업 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 시뮬레이션 구간이 모두 소진된 시계를 다시 시작하려 함
    #[error("Simulation clock finished")]
    ClockFinished,

    /// 주문 수량이 0
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// 시장가가 아닌 주문에 가격이 없음
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// 스탑 주문에 스탑 가격이 없음
    #[error("Stop price not specified for order {0}")]
    MissingStopPrice(Uuid),

    /// 잔고 부족
    #[error("Insufficient {0} balance")]
    InsufficientBalance(String),

    /// 구독을 찾을 수 없음
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(Uuid),

    /// 잘못된 요청 파라미터
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 요청 범위에 데이터가 없음
    #[error("No data available: {0}")]
    NoData(String),

    /// 지원하지 않는 기능
    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    /// 데이터 계층 에러
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// 내부 에러
    #[error("Internal error: {0}")]
    Internal(String),
}

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

impl ExchangeError {
    /// 기능 미지원 에러인지 확인합니다.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, ExchangeError::Unimplemented(_))
    }

    /// 일시적인 에러로 재시도할 수 있는지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExchangeError::Data(e) if e.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ExchangeError::Unimplemented("margin orders").is_unimplemented());
        assert!(!ExchangeError::ClockFinished.is_unimplemented());
        assert!(ExchangeError::Data(DataError::OpenBarUnavailable).is_retryable());
    }
}
