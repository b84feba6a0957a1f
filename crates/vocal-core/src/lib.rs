//! # vocal-core
//!
//! Vocal 核心库, 提供基础类型定义、错误处理和时间戳工具.
//!
//! 本 crate 对标 FFmpeg 的 libavutil 中与音频容器相关的最小子集.

pub mod channel_layout;
pub mod error;
pub mod media_type;
pub mod rational;
pub mod sample_format;
pub mod timestamp;

// 重导出常用类型
pub use channel_layout::ChannelLayout;
pub use error::{VocalError, VocalResult};
pub use media_type::MediaType;
pub use rational::Rational;
pub use sample_format::SampleFormat;
pub use timestamp::Pts;
