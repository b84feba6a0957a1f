//! VOC 数据块头部解析.
//!
//! 每种数据块的头部形状不同, 这里把"读取哪些字段"与"这些字段占用多少
//! 字节"放在同一个变体里, 调用方只需按 [`ParsedBlock`] 给出的负载长度和
//! 预算消耗记账.

use encoding_rs::WINDOWS_1252;
use log::debug;
use vocal_core::{VocalError, VocalResult};

use crate::io::IoContext;
use crate::voc::BlockType;

/// 声音数据块头部长度: 采样率码 + 编码标签
const VOICE_DATA_HEADER_LEN: u64 = 2;
/// 扩展参数块长度: 采样率参数 u16 + 编码标签 + 声道数-1
const EXTENDED_LEN: u64 = 4;
/// 新格式声音数据块头部长度: 采样率 u32 + 位深 + 声道数 + 编码标签 u16 + 保留 4 字节
const NEW_VOICE_DATA_HEADER_LEN: u64 = 12;
/// 文本块最多保留的字节数, 超出部分直接跳过
const MAX_TEXT_LEN: u64 = 4096;

/// 扩展参数块给出的采样率与声道数
///
/// 只作用于紧随其后的声音数据块, 不直接写入流参数.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExtendedOverride {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
}

/// 新格式声音数据块的参数字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NewVoiceParams {
    pub sample_rate: u32,
    pub bits_per_sample: u8,
    pub channels: u8,
    pub codec_tag: u16,
}

/// 已解析头部的数据块
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Block {
    /// 旧格式声音数据 (8 位采样率码)
    VoiceData { rate_code: u8, codec_tag: u8 },
    /// 声音数据续块
    VoiceDataCont,
    /// 扩展参数
    Extended(ExtendedOverride),
    /// 新格式声音数据
    NewVoiceData(NewVoiceParams),
    /// 文本
    Text(String),
    /// 其他类型 (静音、标记、循环或未定义类型), 整块跳过
    Skipped(u8),
}

/// 数据块头部解析结果
#[derive(Debug)]
pub(crate) struct ParsedBlock {
    pub block: Block,
    /// 头部之后可输出的负载字节数
    pub payload_size: u64,
    /// 本块头部从数据包预算中扣除的字节数 (不含 4 字节的类型与长度)
    pub budget_cost: i64,
}

impl ParsedBlock {
    fn new(block: Block, payload_size: u64, budget_cost: u64) -> Self {
        Self {
            block,
            payload_size,
            budget_cost: budget_cost as i64,
        }
    }
}

/// 由声音数据块的采样率码计算采样率
pub(crate) fn rate_from_code(rate_code: u8) -> u32 {
    1_000_000 / (256 - u32::from(rate_code))
}

/// 读取类型与长度之后的块头部
///
/// `size` 为块声明的总长度 (已处理长度为 0 的情况).
pub(crate) fn read_block(io: &mut IoContext, block_type: u8, size: u64) -> VocalResult<ParsedBlock> {
    match BlockType::from_u8(block_type) {
        Some(BlockType::VoiceData) => {
            let payload_size = header_remainder(block_type, size, VOICE_DATA_HEADER_LEN)?;
            let rate_code = io.read_u8()?;
            let codec_tag = io.read_u8()?;
            Ok(ParsedBlock::new(
                Block::VoiceData {
                    rate_code,
                    codec_tag,
                },
                payload_size,
                VOICE_DATA_HEADER_LEN,
            ))
        }
        Some(BlockType::VoiceDataCont) => Ok(ParsedBlock::new(Block::VoiceDataCont, size, 0)),
        Some(BlockType::Extended) => {
            // 声明长度小于 4 的文件也存在, 四个字段总是照常读取
            let extra = size.saturating_sub(EXTENDED_LEN);
            let rate_param = u32::from(io.read_u16_le()?);
            let _codec_tag = io.read_u8()?;
            let channels = u32::from(io.read_u8()?) + 1;
            if extra > 0 {
                debug!("扩展参数块多出 {} 字节, 跳过", extra);
                io.skip(extra)?;
            }
            let sample_rate = 256_000_000 / (channels * (65536 - rate_param));
            Ok(ParsedBlock::new(
                Block::Extended(ExtendedOverride {
                    sample_rate,
                    channels,
                }),
                0,
                size.max(EXTENDED_LEN),
            ))
        }
        Some(BlockType::NewVoiceData) => {
            let payload_size = header_remainder(block_type, size, NEW_VOICE_DATA_HEADER_LEN)?;
            let sample_rate = io.read_u32_le()?;
            let bits_per_sample = io.read_u8()?;
            let channels = io.read_u8()?;
            let codec_tag = io.read_u16_le()?;
            io.skip(4)?;
            Ok(ParsedBlock::new(
                Block::NewVoiceData(NewVoiceParams {
                    sample_rate,
                    bits_per_sample,
                    channels,
                    codec_tag,
                }),
                payload_size,
                NEW_VOICE_DATA_HEADER_LEN,
            ))
        }
        Some(BlockType::Ascii) => {
            let keep = size.min(MAX_TEXT_LEN);
            let raw = io.read_bytes(keep as usize)?;
            io.skip(size - keep)?;
            Ok(ParsedBlock::new(Block::Text(decode_text(&raw)), 0, size))
        }
        _ => {
            debug!("跳过 VOC 数据块: type={}, size={}", block_type, size);
            io.skip(size)?;
            Ok(ParsedBlock::new(Block::Skipped(block_type), 0, size))
        }
    }
}

/// 块长度扣除固定头部后的剩余字节数, 长度不足时报错
fn header_remainder(block_type: u8, size: u64, header_len: u64) -> VocalResult<u64> {
    size.checked_sub(header_len).ok_or_else(|| {
        VocalError::InvalidData(format!(
            "VOC 数据块 type={} 长度 {} 小于头部长度 {}",
            block_type, size, header_len
        ))
    })
}

/// 文本块以 NUL 结尾, 编码为 DOS 时代的单字节字符集
fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let (text, _, _) = WINDOWS_1252.decode(&raw[..end]);
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryBackend;

    fn memory_io(data: Vec<u8>) -> IoContext {
        IoContext::new(Box::new(MemoryBackend::from_data(data)))
    }

    #[test]
    fn test_采样率码() {
        assert_eq!(rate_from_code(0), 3906);
        assert_eq!(rate_from_code(131), 8000);
        assert_eq!(rate_from_code(255), 1_000_000);
    }

    #[test]
    fn test_声音数据块记账() {
        let mut io = memory_io(vec![131, 0x00, 0xAA]);
        let parsed = read_block(&mut io, 1, 12).unwrap();
        assert_eq!(
            parsed.block,
            Block::VoiceData {
                rate_code: 131,
                codec_tag: 0
            }
        );
        assert_eq!(parsed.payload_size, 10);
        assert_eq!(parsed.budget_cost, 2);
        assert_eq!(io.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn test_扩展参数块() {
        // 立体声 8000 Hz: 65536 - 256000000 / (2 * 8000) = 49536
        let mut data = 49536u16.to_le_bytes().to_vec();
        data.extend_from_slice(&[0x00, 0x01]);
        let mut io = memory_io(data);
        let parsed = read_block(&mut io, 8, 4).unwrap();
        assert_eq!(
            parsed.block,
            Block::Extended(ExtendedOverride {
                sample_rate: 8000,
                channels: 2
            })
        );
        assert_eq!(parsed.payload_size, 0);
        assert_eq!(parsed.budget_cost, 4);
    }

    #[test]
    fn test_扩展参数块_声明长度不足() {
        // 声明长度为 2, 仍然读取完整的 4 字节字段
        let mut data = 49536u16.to_le_bytes().to_vec();
        data.extend_from_slice(&[0x00, 0x01, 0xAA]);
        let mut io = memory_io(data);
        let parsed = read_block(&mut io, 8, 2).unwrap();
        assert_eq!(
            parsed.block,
            Block::Extended(ExtendedOverride {
                sample_rate: 8000,
                channels: 2
            })
        );
        assert_eq!(parsed.budget_cost, 4);
        assert_eq!(io.read_u8().unwrap(), 0xAA);

        // 声明长度超出时跳过多余字节
        let mut data = 49536u16.to_le_bytes().to_vec();
        data.extend_from_slice(&[0x00, 0x01, 0xEE, 0xEE, 0xAA]);
        let mut io = memory_io(data);
        let parsed = read_block(&mut io, 8, 6).unwrap();
        assert_eq!(parsed.budget_cost, 6);
        assert_eq!(io.read_u8().unwrap(), 0xAA);
    }

    #[test]
    fn test_新格式声音数据块() {
        let mut data = 44100u32.to_le_bytes().to_vec();
        data.extend_from_slice(&[16, 2]);
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&[0; 4]);
        data.push(0x55);
        let mut io = memory_io(data);
        let parsed = read_block(&mut io, 9, 112).unwrap();
        assert_eq!(
            parsed.block,
            Block::NewVoiceData(NewVoiceParams {
                sample_rate: 44100,
                bits_per_sample: 16,
                channels: 2,
                codec_tag: 4
            })
        );
        assert_eq!(parsed.payload_size, 100);
        assert_eq!(parsed.budget_cost, 12);
        assert_eq!(io.read_u8().unwrap(), 0x55);
    }

    #[test]
    fn test_长度不足头部() {
        let mut io = memory_io(vec![0; 16]);
        let err = read_block(&mut io, 9, 8).unwrap_err();
        assert!(matches!(err, VocalError::InvalidData(_)));
        let err = read_block(&mut io, 1, 1).unwrap_err();
        assert!(matches!(err, VocalError::InvalidData(_)));
    }

    #[test]
    fn test_文本块与未知块() {
        let mut io = memory_io(b"Hello VOC\0\0\0\xFF\xFF".to_vec());
        let parsed = read_block(&mut io, 5, 12).unwrap();
        assert_eq!(parsed.block, Block::Text("Hello VOC".into()));
        assert_eq!(parsed.budget_cost, 12);

        let parsed = read_block(&mut io, 0x42, 2).unwrap();
        assert_eq!(parsed.block, Block::Skipped(0x42));
        assert_eq!(parsed.payload_size, 0);
        assert_eq!(io.position().unwrap(), 14);
    }
}
