//! 정밀한 금융 계산을 위한 Decimal 타입 별칭.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
///
/// 수량은 부호를 가질 수 있습니다: 음수 수량은 매도 주문을 의미합니다.
pub type Quantity = Decimal;
