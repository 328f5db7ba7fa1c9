//! 시뮬레이션 거래의 핵심 도메인 모델.

mod candle;
mod order;
mod position;
mod subscription;
mod wallet;

pub use candle::*;
pub use order::*;
pub use position::*;
pub use subscription::*;
pub use wallet::*;
