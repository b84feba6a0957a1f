//! 编解码器标识符.
//!
//! 对标 FFmpeg 的 `AVCodecID`, 只收录 VOC 容器能够声明的音频编码.

use std::fmt;
use vocal_core::{MediaType, SampleFormat};

/// 编解码器标识符
///
/// 唯一标识一种编码算法, 与容器格式无关.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,
    /// PCM 无符号 8 位
    PcmU8,
    /// PCM 有符号 16 位小端
    PcmS16le,
    /// G.711 A-law
    PcmAlaw,
    /// G.711 µ-law
    PcmMulaw,
    /// Sound Blaster Pro 4 位 ADPCM
    AdpcmSbpro4,
    /// Sound Blaster Pro 2.6 位 ADPCM
    AdpcmSbpro3,
    /// Sound Blaster Pro 2 位 ADPCM
    AdpcmSbpro2,
    /// Creative Technology 4 位 ADPCM
    AdpcmCt,
}

impl CodecId {
    /// 所有已知的编解码器 (不含 `None`)
    pub const ALL: &[CodecId] = &[
        Self::PcmU8,
        Self::PcmS16le,
        Self::PcmAlaw,
        Self::PcmMulaw,
        Self::AdpcmSbpro4,
        Self::AdpcmSbpro3,
        Self::AdpcmSbpro2,
        Self::AdpcmCt,
    ];

    /// 获取编解码器对应的媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::None => MediaType::Data,
            _ => MediaType::Audio,
        }
    }

    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PcmU8 => "pcm_u8",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmAlaw => "pcm_alaw",
            Self::PcmMulaw => "pcm_mulaw",
            Self::AdpcmSbpro4 => "adpcm_sbpro_4",
            Self::AdpcmSbpro3 => "adpcm_sbpro_3",
            Self::AdpcmSbpro2 => "adpcm_sbpro_2",
            Self::AdpcmCt => "adpcm_ct",
        }
    }

    /// 按名称查找编解码器
    pub fn from_name(name: &str) -> Option<CodecId> {
        Self::ALL.iter().find(|id| id.name() == name).copied()
    }

    /// 每个采样点的编码位数
    ///
    /// 对标 `av_get_bits_per_sample`, 未知编码返回 0.
    pub const fn bits_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::PcmU8 | Self::PcmAlaw | Self::PcmMulaw => 8,
            Self::PcmS16le => 16,
            Self::AdpcmSbpro4 | Self::AdpcmCt => 4,
            Self::AdpcmSbpro3 => 3,
            Self::AdpcmSbpro2 => 2,
        }
    }

    /// 解码后的采样格式
    pub const fn sample_format(&self) -> SampleFormat {
        match self {
            Self::None => SampleFormat::None,
            Self::PcmU8 => SampleFormat::U8,
            _ => SampleFormat::S16,
        }
    }

    /// 由数据字节数推算包含的采样数 (每声道)
    ///
    /// 对标 `av_get_audio_frame_duration2`. 无法计算时返回 `None`.
    ///
    /// SB Pro ADPCM 每个声道以 1 字节参考采样开头, 其余字节分别携带
    /// 2 (4 位), 3 (2.6 位), 4 (2 位) 个采样.
    pub fn frame_duration(&self, frame_bytes: usize, channels: u32) -> Option<i64> {
        if channels == 0 || frame_bytes == 0 {
            return None;
        }
        let bytes = frame_bytes as i64;
        let ch = i64::from(channels);
        let samples = match self {
            Self::None => return None,
            Self::PcmU8 | Self::PcmS16le | Self::PcmAlaw | Self::PcmMulaw | Self::AdpcmCt => {
                let bps = i64::from(self.bits_per_sample());
                bytes * 8 / (bps * ch)
            }
            Self::AdpcmSbpro4 => bytes.checked_sub(ch)? * 2 / ch,
            Self::AdpcmSbpro3 => bytes.checked_sub(ch)? * 3 / ch,
            Self::AdpcmSbpro2 => bytes.checked_sub(ch)? * 4 / ch,
        };
        (samples > 0).then_some(samples)
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
