//! 时间戳类型, 用于表示数据包在流中的时间点.
//!
//! 与 FFmpeg 用 `AV_NOPTS_VALUE` 哨兵值表示"未知"不同, 这里用显式的枚举,
//! 未知时间戳无法参与算术运算.

use crate::rational::Rational;
use std::fmt;

/// 显示/解码时间戳 (以流的 time_base 为单位)
///
/// 一旦变为 `Unknown`, [`Pts::advance`] 不会再把它恢复为已知值,
/// 只有调用方重新初始化 (打开或 seek) 才能得到新的已知时间戳.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Pts {
    /// 已知时间戳
    Known(i64),
    /// 未知时间戳
    #[default]
    Unknown,
}

impl Pts {
    /// 零时间戳
    pub const ZERO: Self = Self::Known(0);

    /// 取出时间戳数值
    pub const fn value(self) -> Option<i64> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// 是否为已知时间戳
    pub const fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// 按数据包时长推进时间戳
    ///
    /// 时长无法计算 (`None` 或非正数) 时变为 `Unknown`, 并保持不变.
    pub fn advance(self, duration: Option<i64>) -> Self {
        match (self, duration) {
            (Self::Known(pts), Some(d)) if d > 0 => match pts.checked_add(d) {
                Some(next) => Self::Known(next),
                None => Self::Unknown,
            },
            _ => Self::Unknown,
        }
    }

    /// 按时间基转换为秒
    pub fn to_seconds(self, time_base: Rational) -> Option<f64> {
        match self {
            Self::Known(v) if time_base.is_valid() => Some(v as f64 * time_base.to_f64()),
            _ => None,
        }
    }
}

impl From<i64> for Pts {
    fn from(v: i64) -> Self {
        Self::Known(v)
    }
}

impl fmt::Display for Pts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{v}"),
            Self::Unknown => write!(f, "NOPTS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pts_推进() {
        assert_eq!(Pts::ZERO.advance(Some(100)), Pts::Known(100));
        assert_eq!(Pts::Known(100).advance(Some(28)), Pts::Known(128));
    }

    #[test]
    fn test_pts_未知状态保持() {
        let pts = Pts::Known(10).advance(None);
        assert_eq!(pts, Pts::Unknown);
        assert_eq!(pts.advance(Some(100)), Pts::Unknown);
        assert_eq!(Pts::Known(10).advance(Some(0)), Pts::Unknown);
    }

    #[test]
    fn test_pts_转换为秒() {
        let secs = Pts::Known(8000).to_seconds(Rational::new(1, 8000));
        assert_eq!(secs, Some(1.0));
        assert_eq!(Pts::Unknown.to_seconds(Rational::new(1, 8000)), None);
        assert_eq!(Pts::Known(1).to_seconds(Rational::UNDEFINED), None);
    }

    #[test]
    fn test_pts_显示() {
        assert_eq!(Pts::Known(42).to_string(), "42");
        assert_eq!(Pts::Unknown.to_string(), "NOPTS");
    }
}
