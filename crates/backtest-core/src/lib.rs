//! # Backtest Core
//!
//! 백테스팅 엔진의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시뮬레이션 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 캔들 및 시세 데이터 구조체
//! - 주문 및 지갑 타입
//! - 구독 정의
//! - 심볼 및 타임프레임 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
