//! Creative Voice File (VOC) 公共定义.
//!
//! 解封装器与封装器共用的魔数、文件头常量、数据块类型和编码标签表.
//!
//! 文件结构:
//! ```text
//! 文件头:  "Creative Voice File\x1A" (20) + header_size u16 (=26)
//!          + version u16 + check u16 (= !version + 0x1234)
//! 数据块:  type u8 + length u24 (小端) + 类型相关头部 + 负载
//! 结束:    type = 0 (无长度字段)
//! ```

use vocal_codec::CodecId;

/// 文件魔数
pub const VOC_MAGIC: &[u8; 20] = b"Creative Voice File\x1A";

/// 标准文件头长度
pub const VOC_HEADER_SIZE: u16 = 26;

/// 封装器写入的版本号 (1.20)
pub const VOC_VERSION: u16 = 0x0114;

/// 由版本号计算文件头校验字段
pub const fn header_check(version: u16) -> u16 {
    (!version).wrapping_add(0x1234)
}

/// 数据块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    /// 结束标记 (没有长度字段)
    Eof = 0,
    /// 声音数据 (单字节采样率码 + 编码标签)
    VoiceData = 1,
    /// 声音数据续块 (沿用之前的参数)
    VoiceDataCont = 2,
    /// 静音
    Silence = 3,
    /// 标记
    Marker = 4,
    /// ASCII 文本
    Ascii = 5,
    /// 循环开始
    RepetitionStart = 6,
    /// 循环结束
    RepetitionEnd = 7,
    /// 扩展参数 (影响紧随其后的声音数据块)
    Extended = 8,
    /// 新格式声音数据 (显式采样率/位深/声道数)
    NewVoiceData = 9,
}

impl BlockType {
    /// 由类型字节解析, 未定义的类型返回 `None`
    pub const fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Eof,
            1 => Self::VoiceData,
            2 => Self::VoiceDataCont,
            3 => Self::Silence,
            4 => Self::Marker,
            5 => Self::Ascii,
            6 => Self::RepetitionStart,
            7 => Self::RepetitionEnd,
            8 => Self::Extended,
            9 => Self::NewVoiceData,
            _ => return None,
        })
    }
}

/// VOC 编码标签表
const CODEC_TAGS: &[(u16, CodecId)] = &[
    (0x0000, CodecId::PcmU8),
    (0x0001, CodecId::AdpcmSbpro4),
    (0x0002, CodecId::AdpcmSbpro3),
    (0x0003, CodecId::AdpcmSbpro2),
    (0x0004, CodecId::PcmS16le),
    (0x0006, CodecId::PcmAlaw),
    (0x0007, CodecId::PcmMulaw),
    (0x0200, CodecId::AdpcmCt),
];

/// 由编码标签查找编解码器, 未知标签返回 `CodecId::None`
pub fn codec_from_tag(tag: u16) -> CodecId {
    CODEC_TAGS
        .iter()
        .find(|(t, _)| *t == tag)
        .map_or(CodecId::None, |(_, id)| *id)
}

/// 由编解码器查找编码标签
pub fn tag_from_codec(codec_id: CodecId) -> Option<u16> {
    CODEC_TAGS
        .iter()
        .find(|(_, id)| *id == codec_id)
        .map(|(t, _)| *t)
}
