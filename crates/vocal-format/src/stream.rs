//! 流信息定义.
//!
//! 对标 FFmpeg 的 `AVStream` + `AVCodecParameters`, 描述容器中的一条音频流.
//! VOC 的流参数在读取第一个携带负载的数据块时才确定, 因此各字段在
//! 打开文件后可能仍处于"未设置"状态 (采样率为 0, 编解码器为 `None`).

use vocal_codec::CodecId;
use vocal_core::{ChannelLayout, MediaType, Rational, SampleFormat};

use crate::index::StreamIndex;

/// 流信息
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (在容器中的位置, 从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识 (`CodecId::None` 表示尚未确定)
    pub codec_id: CodecId,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, -1 表示未知)
    pub duration: i64,
    /// 起始时间 (以 time_base 为单位)
    pub start_time: i64,
    /// 流特定参数
    pub params: StreamParams,
    /// 元数据 (注释等)
    pub metadata: Vec<(String, String)>,
    /// Seek 索引
    pub seek_index: StreamIndex,
}

/// 流特定参数
#[derive(Debug, Clone)]
pub enum StreamParams {
    /// 音频流参数
    Audio(AudioStreamParams),
    /// 其他
    Other,
}

/// 音频流参数
#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    /// 采样率 (Hz, 0 表示尚未确定)
    pub sample_rate: u32,
    /// 声道布局
    pub channel_layout: ChannelLayout,
    /// 采样格式
    pub sample_format: SampleFormat,
    /// 每个采样的编码位数
    pub bits_per_coded_sample: u32,
    /// 码率 (bps, 0 表示未知)
    pub bit_rate: u64,
}

impl AudioStreamParams {
    /// 所有参数都未设置的音频参数
    pub const fn unset() -> Self {
        Self {
            sample_rate: 0,
            channel_layout: ChannelLayout::UNSPECIFIED,
            sample_format: SampleFormat::None,
            bits_per_coded_sample: 0,
            bit_rate: 0,
        }
    }

    /// 按 采样率 × 声道数 × 位深 重新计算码率
    pub fn update_bit_rate(&mut self) {
        self.bit_rate = u64::from(self.sample_rate)
            * u64::from(self.channel_layout.channels)
            * u64::from(self.bits_per_coded_sample);
    }
}

impl Stream {
    /// 创建参数未定的音频流
    pub fn new_audio(index: usize) -> Self {
        Self {
            index,
            media_type: MediaType::Audio,
            codec_id: CodecId::None,
            time_base: Rational::UNDEFINED,
            duration: -1,
            start_time: 0,
            params: StreamParams::Audio(AudioStreamParams::unset()),
            metadata: Vec::new(),
            seek_index: StreamIndex::default(),
        }
    }

    /// 获取音频参数 (如果是音频流)
    pub fn audio(&self) -> Option<&AudioStreamParams> {
        match &self.params {
            StreamParams::Audio(a) => Some(a),
            StreamParams::Other => None,
        }
    }

    /// 获取可修改的音频参数 (如果是音频流)
    pub fn audio_mut(&mut self) -> Option<&mut AudioStreamParams> {
        match &mut self.params {
            StreamParams::Audio(a) => Some(a),
            StreamParams::Other => None,
        }
    }
}
