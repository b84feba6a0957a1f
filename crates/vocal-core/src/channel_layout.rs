//! 音频声道布局定义.
//!
//! 对标 FFmpeg 的 `AVChannelLayout`. VOC 文件只声明声道数,
//! 单声道/立体声之外的布局没有扬声器位置信息.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 声道位掩码, 每个位代表一个扬声器位置
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelMask: u64 {
        /// 前方左声道
        const FRONT_LEFT   = 1 << 0;
        /// 前方右声道
        const FRONT_RIGHT  = 1 << 1;
        /// 前方中央声道
        const FRONT_CENTER = 1 << 2;
    }
}

/// 声道布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelLayout {
    /// 声道数量 (0 表示尚未确定)
    pub channels: u32,
    /// 声道位掩码 (非标准布局为空)
    pub mask: ChannelMask,
}

impl ChannelLayout {
    /// 尚未确定的布局
    pub const UNSPECIFIED: Self = Self {
        channels: 0,
        mask: ChannelMask::empty(),
    };

    /// 单声道
    pub const MONO: Self = Self {
        channels: 1,
        mask: ChannelMask::FRONT_CENTER,
    };

    /// 立体声 (左右)
    pub const STEREO: Self = Self {
        channels: 2,
        mask: ChannelMask::FRONT_LEFT.union(ChannelMask::FRONT_RIGHT),
    };

    /// 根据声道数创建默认布局
    pub fn from_channels(channels: u32) -> Self {
        match channels {
            0 => Self::UNSPECIFIED,
            1 => Self::MONO,
            2 => Self::STEREO,
            n => Self {
                channels: n,
                mask: ChannelMask::empty(),
            },
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNSPECIFIED => write!(f, "unknown"),
            Self::MONO => write!(f, "mono"),
            Self::STEREO => write!(f, "stereo"),
            _ => write!(f, "{}ch", self.channels),
        }
    }
}
