//! VOC 数据包提取状态机.
//!
//! 对标 FFmpeg 的 `ff_voc_get_packet`. 会话在调用之间只保存两项状态:
//! 当前数据块尚未输出的负载字节数, 以及下一个数据包的时间戳.
//! 负载耗尽时读取下一个块头, 在第一个携带负载的块上确定流参数,
//! 之后的块只能产生警告, 不会改写已确定的参数.

use log::{debug, error, warn};
use vocal_codec::{CodecId, Packet};
use vocal_core::{ChannelLayout, Pts, Rational, VocalError, VocalResult};

use super::block::{self, Block, ExtendedOverride, NewVoiceParams};
use crate::index::IndexEntry;
use crate::io::IoContext;
use crate::stream::{AudioStreamParams, Stream, StreamParams};
use crate::voc::{self, BlockType};

/// 块头部耗尽数据包预算时使用的数据包大小
pub const DEFAULT_PACKET_SIZE: i64 = 2048;

/// 类型字节 + 24 位长度
const BLOCK_PREFIX_LEN: i64 = 4;

/// VOC 读取会话
///
/// 每个打开的流一份, 打开或 seek 时重置.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocSession {
    /// 当前数据块尚未输出的负载字节数, 0 表示下一步需要读取块头
    remaining_size: u64,
    /// 下一个数据包的时间戳
    pts: Pts,
}

impl Default for VocSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VocSession {
    /// 创建新会话 (位于块边界, 时间戳为 0)
    pub fn new() -> Self {
        Self {
            remaining_size: 0,
            pts: Pts::ZERO,
        }
    }

    /// 当前数据块尚未输出的负载字节数
    pub fn remaining_size(&self) -> u64 {
        self.remaining_size
    }

    /// 下一个数据包的时间戳
    pub fn pts(&self) -> Pts {
        self.pts
    }

    /// 恢复到索引记录的边界
    pub(crate) fn restore(&mut self, entry: &IndexEntry) {
        self.remaining_size = entry.size;
        self.pts = Pts::Known(entry.timestamp);
    }

    /// 读取下一个数据包
    ///
    /// # 参数
    /// - `stream`: 音频流, 其参数在第一个携带负载的块上确定
    /// - `fallback_codec`: 编码标签未知时使用的编解码器
    /// - `max_size`: 单个数据包的字节上限, 块头部会从中扣除;
    ///   扣除后不大于 0 时使用 [`DEFAULT_PACKET_SIZE`]
    ///
    /// # 返回
    /// - `Err(VocalError::Eof)`: 遇到结束块或数据耗尽
    /// - `Err(VocalError::InvalidData)`: 块长度或采样率无效
    /// - `Err(VocalError::CodecNotFound)`: 编码标签未知且没有后备编解码器
    /// - `Err(VocalError::Io)`: 底层读取/seek 失败
    pub fn get_packet(
        &mut self,
        io: &mut IoContext,
        stream: &mut Stream,
        fallback_codec: Option<CodecId>,
        max_size: i64,
    ) -> VocalResult<Packet> {
        if let Pts::Known(timestamp) = self.pts {
            stream.seek_index.add(IndexEntry {
                pos: io.position()?,
                timestamp,
                size: self.remaining_size,
                is_keyframe: true,
            });
        }

        let StreamParams::Audio(audio) = &mut stream.params else {
            return Err(VocalError::InvalidArgument("VOC 流必须是音频流".into()));
        };

        let mut budget = max_size;
        let mut pending: Option<ExtendedOverride> = None;
        let mut codec_tag: Option<u16> = None;

        while self.remaining_size == 0 {
            let block_type = io.read_u8()?;
            if block_type == BlockType::Eof as u8 {
                return Err(VocalError::Eof);
            }
            let size = match io.read_u24_le()? {
                0 => size_to_end(io)?,
                n => u64::from(n),
            };
            budget -= BLOCK_PREFIX_LEN;

            let parsed = block::read_block(io, block_type, size)?;
            budget -= parsed.budget_cost;
            self.remaining_size = parsed.payload_size;

            match parsed.block {
                Block::VoiceData {
                    rate_code,
                    codec_tag: tag,
                } => {
                    let extended = pending.take();
                    let sample_rate =
                        extended.map_or_else(|| block::rate_from_code(rate_code), |e| e.sample_rate);
                    let channels = extended.map_or(1, |e| e.channels);
                    if audio.sample_rate == 0 {
                        let codec = resolve_tag(u16::from(tag), fallback_codec);
                        establish_rate(audio, &mut stream.time_base, sample_rate);
                        audio.channel_layout = ChannelLayout::from_channels(channels);
                        audio.bits_per_coded_sample = codec.bits_per_sample();
                    } else if sample_rate != audio.sample_rate
                        || channels != audio.channel_layout.channels
                    {
                        warn!(
                            "忽略流中途的参数变化: {} Hz/{} 声道 -> {} Hz/{} 声道",
                            audio.sample_rate, audio.channel_layout.channels, sample_rate, channels
                        );
                    }
                    codec_tag = Some(u16::from(tag));
                }
                Block::VoiceDataCont => {}
                Block::Extended(params) => {
                    debug!(
                        "扩展参数块: {} Hz, {} 声道",
                        params.sample_rate, params.channels
                    );
                    pending = Some(params);
                }
                Block::NewVoiceData(params) => {
                    if audio.sample_rate == 0 {
                        establish_rate(audio, &mut stream.time_base, params.sample_rate);
                        audio.bits_per_coded_sample = u32::from(params.bits_per_sample);
                        audio.channel_layout =
                            ChannelLayout::from_channels(u32::from(params.channels));
                    } else {
                        warn_if_changed(audio, &params);
                    }
                    codec_tag = Some(params.codec_tag);
                }
                Block::Text(text) => {
                    debug!("VOC 文本块: {}", text);
                    let entry = ("comment".to_string(), text);
                    if !stream.metadata.contains(&entry) {
                        stream.metadata.push(entry);
                    }
                }
                Block::Skipped(_) => {}
            }
        }

        if audio.sample_rate == 0 {
            error!("无效的采样率 {}", audio.sample_rate);
            return Err(VocalError::InvalidData(format!(
                "无效的采样率 {}",
                audio.sample_rate
            )));
        }
        if audio.channel_layout.channels == 0 {
            return Err(VocalError::InvalidData("声道数为 0".into()));
        }

        if let Some(tag) = codec_tag {
            let resolved = voc::codec_from_tag(tag);
            if stream.codec_id == CodecId::None {
                stream.codec_id = resolved;
            } else if stream.codec_id != resolved {
                warn!(
                    "忽略流中途的编解码器变化: {} -> 标签 0x{:04X}",
                    stream.codec_id, tag
                );
            }
            if stream.codec_id == CodecId::None {
                let Some(fallback) = fallback_codec else {
                    error!("未知的编码标签 0x{:04X}", tag);
                    return Err(VocalError::CodecNotFound(format!(
                        "未知的 VOC 编码标签 0x{:04X}",
                        tag
                    )));
                };
                warn!("未知的编码标签 0x{:04X}, 使用后备编解码器 {}", tag, fallback);
                stream.codec_id = fallback;
            }
            audio.sample_format = stream.codec_id.sample_format();
        }

        audio.update_bit_rate();

        let budget = if budget <= 0 {
            DEFAULT_PACKET_SIZE
        } else {
            budget
        };
        let size = self.remaining_size.min(budget as u64);
        self.remaining_size -= size;

        let pos = io.position()?;
        let data = io.read_up_to(size as usize)?;
        let duration = stream
            .codec_id
            .frame_duration(data.len(), audio.channel_layout.channels);

        let mut pkt = Packet::from_data(data);
        pkt.pts = self.pts;
        pkt.dts = self.pts;
        pkt.duration = duration.unwrap_or(0);
        pkt.time_base = stream.time_base;
        pkt.stream_index = stream.index;
        pkt.is_keyframe = true;
        pkt.pos = pos as i64;

        self.pts = self.pts.advance(duration);
        Ok(pkt)
    }
}

/// 块长度字段为 0 时, 把流剩余的全部数据视为该块
///
/// 只有可 seek (总大小已知) 的输入才能这样处理.
fn size_to_end(io: &mut IoContext) -> VocalResult<u64> {
    if !io.is_seekable() {
        return Err(VocalError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "长度为 0 的 VOC 数据块需要可 seek 的输入",
        )));
    }
    let total = io.size().ok_or_else(|| {
        VocalError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "无法获取输入总大小",
        ))
    })?;
    Ok(total.saturating_sub(io.position()?))
}

/// 确定采样率与时间基 (仅在尚未确定时调用)
///
/// 无法作为时间基的采样率 (0 或超出范围) 保持未设置, 由调用方统一报错.
fn establish_rate(audio: &mut AudioStreamParams, time_base: &mut Rational, sample_rate: u32) {
    match Rational::from_sample_rate(sample_rate) {
        Some(tb) => {
            audio.sample_rate = sample_rate;
            *time_base = tb;
            debug!("VOC 采样率确定为 {} Hz", sample_rate);
        }
        None => debug!("忽略无效的采样率 {}", sample_rate),
    }
}

/// 旧格式声音数据块用于推算位深的编解码器
fn resolve_tag(tag: u16, fallback_codec: Option<CodecId>) -> CodecId {
    match voc::codec_from_tag(tag) {
        CodecId::None => fallback_codec.unwrap_or(CodecId::None),
        id => id,
    }
}

fn warn_if_changed(audio: &AudioStreamParams, params: &NewVoiceParams) {
    if params.sample_rate != audio.sample_rate
        || u32::from(params.channels) != audio.channel_layout.channels
        || u32::from(params.bits_per_sample) != audio.bits_per_coded_sample
    {
        warn!(
            "忽略流中途的参数变化: {} Hz/{} 声道/{} 位 -> {} Hz/{} 声道/{} 位",
            audio.sample_rate,
            audio.channel_layout.channels,
            audio.bits_per_coded_sample,
            params.sample_rate,
            params.channels,
            params.bits_per_sample,
        );
    }
}
