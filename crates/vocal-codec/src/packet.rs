//! 压缩数据包 (Packet).
//!
//! 对标 FFmpeg 的 `AVPacket`, 表示从容器格式中读取的一段编码数据.

use bytes::Bytes;
use vocal_core::{Pts, Rational};

/// 压缩数据包
///
/// 对 VOC 而言, 一个 Packet 是某个数据块负载的一段连续字节.
#[derive(Debug, Clone)]
pub struct Packet {
    /// 编码数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: Pts,
    /// 解码时间戳 (DTS)
    pub dts: Pts,
    /// 数据包时长 (以 time_base 为单位, 0 表示未知)
    pub duration: i64,
    /// 时间基
    pub time_base: Rational,
    /// 所属流的索引
    pub stream_index: usize,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 在容器中的字节偏移量 (-1 表示未知)
    pub pos: i64,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: Pts::Unknown,
            dts: Pts::Unknown,
            duration: 0,
            time_base: Rational::UNDEFINED,
            stream_index: 0,
            is_keyframe: false,
            pos: -1,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_从数据创建() {
        let pkt = Packet::from_data(vec![1u8, 2, 3]);
        assert_eq!(pkt.size(), 3);
        assert!(!pkt.is_empty());
        assert_eq!(pkt.pts, Pts::Unknown);
        assert_eq!(pkt.pos, -1);
        assert!(Packet::empty().is_empty());
    }
}
