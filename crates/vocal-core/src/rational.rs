//! 有理数类型, 用于时间基 (time_base).
//!
//! 对标 FFmpeg 的 `AVRational`.

use std::fmt;

/// 有理数, 由分子和分母组成
///
/// 音频流的时间基通常为 `1/sample_rate`, 时间戳以采样点为单位.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 由采样率构造时间基 `1/sample_rate`
    ///
    /// 采样率为 0 或超出 i32 范围时返回 `None`.
    pub fn from_sample_rate(sample_rate: u32) -> Option<Self> {
        let den = i32::try_from(sample_rate).ok().filter(|&d| d > 0)?;
        Some(Self { num: 1, den })
    }

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 转换为 f64 浮点数
    ///
    /// 如果分母为 0, 返回 `f64::NAN`.
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }

    /// 对有理数进行约分
    pub fn reduce(self) -> Self {
        if self.den == 0 {
            return self;
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs());
        if g == 0 {
            return self;
        }
        let g = g as i32;
        let sign = if self.den < 0 { -1 } else { 1 };
        Self {
            num: sign * self.num / g,
            den: sign * self.den / g,
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// 求最大公约数 (欧几里得算法)
fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_由采样率构造() {
        assert_eq!(
            Rational::from_sample_rate(22050),
            Some(Rational::new(1, 22050))
        );
        assert_eq!(Rational::from_sample_rate(0), None);
        assert_eq!(Rational::from_sample_rate(u32::MAX), None);
    }

    #[test]
    fn test_rational_to_float() {
        let r = Rational::new(1, 4);
        assert!((r.to_f64() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rational_reduce() {
        assert_eq!(Rational::new(30, 60).reduce(), Rational::new(1, 2));
        assert_eq!(Rational::new(4, -8).reduce(), Rational::new(-1, 2));
    }

    #[test]
    fn test_rational_invalid_value() {
        let r = Rational::UNDEFINED;
        assert!(!r.is_valid());
        assert!(r.to_f64().is_nan());
    }

    #[test]
    fn test_rational_display() {
        assert_eq!(format!("{}", Rational::new(1, 8000)), "1/8000");
    }
}
