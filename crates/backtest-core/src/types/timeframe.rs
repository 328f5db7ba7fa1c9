//! 캔들스틱 데이터를 위한 타임프레임 정의.
//!
//! 이 모듈은 다양한 시간 간격을 나타내는 타임프레임 타입과
//! 타임프레임 경계 정렬 유틸리티를 정의합니다.

use chrono::{DateTime, Datelike, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 캔들스틱 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    /// 1분봉
    M1,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 3시간봉
    H3,
    /// 6시간봉
    H6,
    /// 12시간봉
    H12,
    /// 일봉
    D1,
    /// 주봉
    W1,
    /// 월봉 (달력 기준, 가변 길이)
    MN1,
}

impl Timeframe {
    /// 지원하는 모든 타임프레임.
    pub const ALL: [Timeframe; 11] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H3,
        Timeframe::H6,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    ///
    /// 월봉은 달력 기준이므로 30일 근사값을 반환합니다. 경계 계산에는
    /// [`Timeframe::floor`] 같은 달력 인식 메서드를 사용해야 합니다.
    pub fn as_secs(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H3 => 3 * 60 * 60,
            Timeframe::H6 => 6 * 60 * 60,
            Timeframe::H12 => 12 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
            Timeframe::W1 => 7 * 24 * 60 * 60,
            Timeframe::MN1 => 30 * 24 * 60 * 60,
        }
    }

    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.as_secs())
    }

    /// 달력 기준 타임프레임인지 확인합니다.
    pub fn is_calendar(&self) -> bool {
        matches!(self, Timeframe::MN1)
    }

    /// 주어진 시각을 포함하는 봉의 시작 시각을 반환합니다.
    ///
    /// 고정 길이 타임프레임은 에포크 초 그리드로 내림하고, 월봉은
    /// 해당 월의 1일 00:00:00 UTC로 내림합니다. 이미 경계에 있는
    /// 시각은 그대로 반환됩니다 (멱등).
    pub fn floor(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if self.is_calendar() {
            // 월 초로 내림
            Utc.with_ymd_and_hms(t.year(), t.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(t)
        } else {
            let ts = t.timestamp();
            let d = self.as_secs();
            DateTime::from_timestamp(ts - ts.rem_euclid(d), 0).unwrap_or(t)
        }
    }

    /// 주어진 시각을 포함하는 봉의 마지막 초를 반환합니다.
    ///
    /// 다음 봉 시작 1초 전으로, [`Timeframe::floor`]와 함께 폐구간
    /// `[start, end]` 범위를 구성합니다.
    pub fn range_end(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.step_forward(self.floor(t)) - Duration::seconds(1)
    }

    /// 봉 시작 시각을 한 봉 앞으로 이동합니다.
    pub fn step_back(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if self.is_calendar() {
            t - Months::new(1)
        } else {
            t - self.duration()
        }
    }

    /// 봉 시작 시각을 한 봉 뒤로 이동합니다.
    pub fn step_forward(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if self.is_calendar() {
            t + Months::new(1)
        } else {
            t + self.duration()
        }
    }

    /// 주어진 시각이 이 타임프레임의 봉 경계인지 확인합니다.
    pub fn is_boundary(&self, t: DateTime<Utc>) -> bool {
        self.floor(t) == t
    }

    /// 간격 문자열로 변환합니다.
    pub fn to_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H3 => "3h",
            Timeframe::H6 => "6h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1D",
            Timeframe::W1 => "1W",
            Timeframe::MN1 => "1M",
        }
    }

    /// 간격 문자열에서 파싱합니다.
    pub fn from_interval(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Timeframe::M1),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "30m" => Some(Timeframe::M30),
            "1h" => Some(Timeframe::H1),
            "3h" => Some(Timeframe::H3),
            "6h" => Some(Timeframe::H6),
            "12h" => Some(Timeframe::H12),
            "1D" => Some(Timeframe::D1),
            "1W" => Some(Timeframe::W1),
            "1M" => Some(Timeframe::MN1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_interval())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_interval(s).ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.to_interval().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::M1.as_secs(), 60);
        assert_eq!(Timeframe::H1.as_secs(), 3600);
        assert_eq!(Timeframe::D1.as_secs(), 86400);
    }

    #[test]
    fn test_timeframe_interval() {
        assert_eq!(Timeframe::M15.to_interval(), "15m");
        assert_eq!(Timeframe::from_interval("3h"), Some(Timeframe::H3));
        assert_eq!(Timeframe::from_interval("1M"), Some(Timeframe::MN1));
        assert_eq!(Timeframe::from_interval("4h"), None);
    }

    #[test]
    fn test_floor_fixed() {
        let t = at("2020-11-27T10:37:42Z");
        assert_eq!(Timeframe::M5.floor(t), at("2020-11-27T10:35:00Z"));
        assert_eq!(Timeframe::H1.floor(t), at("2020-11-27T10:00:00Z"));
        assert_eq!(Timeframe::D1.floor(t), at("2020-11-27T00:00:00Z"));
    }

    #[test]
    fn test_floor_idempotent() {
        for tf in Timeframe::ALL {
            let aligned = tf.floor(at("2021-03-15T13:21:09Z"));
            assert_eq!(tf.floor(aligned), aligned, "{} not idempotent", tf);
        }
    }

    #[test]
    fn test_floor_month() {
        let t = at("2020-11-27T10:37:42Z");
        assert_eq!(Timeframe::MN1.floor(t), at("2020-11-01T00:00:00Z"));
        assert_eq!(
            Timeframe::MN1.range_end(t),
            at("2020-11-30T23:59:59Z")
        );
    }

    #[test]
    fn test_range_end() {
        let t = at("2020-11-27T10:37:42Z");
        assert_eq!(Timeframe::D1.range_end(t), at("2020-11-27T23:59:59Z"));
        assert_eq!(Timeframe::M5.range_end(t), at("2020-11-27T10:39:59Z"));
    }

    #[test]
    fn test_is_boundary() {
        assert!(Timeframe::M5.is_boundary(at("2020-11-27T10:35:00Z")));
        assert!(!Timeframe::M5.is_boundary(at("2020-11-27T10:36:00Z")));
        assert!(Timeframe::MN1.is_boundary(at("2020-12-01T00:00:00Z")));
        assert!(!Timeframe::MN1.is_boundary(at("2020-12-02T00:00:00Z")));
    }

    proptest::proptest! {
        // 임의의 시각에 대해 floor는 시각을 포함하는 봉의 시작이어야 한다
        #[test]
        fn prop_floor_brackets_input(
            // 2001-09-09 ~ 2033-05-18 구간의 에포크 초
            ts in 1_000_000_000i64..2_000_000_000
        ) {
            let t = DateTime::from_timestamp(ts, 0).unwrap();
            for tf in Timeframe::ALL {
                let start = tf.floor(t);
                proptest::prop_assert!(start <= t);
                proptest::prop_assert!(t < tf.step_forward(start));
                proptest::prop_assert_eq!(tf.floor(start), start);
            }
        }
    }
}
