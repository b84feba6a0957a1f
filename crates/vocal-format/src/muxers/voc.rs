//! Creative Voice File (VOC) 封装器.
//!
//! 写入流程:
//! 1. `write_header()` - 写入 VOC 文件头, 记录流参数
//! 2. `write_packet()` - 第一个数据包前写入参数块, 之后的数据包写为续块
//! 3. `write_trailer()` - 写入结束块
//!
//! 编码标签不大于 3 (PCM U8 与 SB Pro ADPCM) 时使用旧格式声音数据块,
//! 多声道时在其前面插入扩展参数块; 其他编码使用新格式声音数据块.

use log::debug;
use vocal_codec::Packet;
use vocal_core::{VocalError, VocalResult};

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::muxer::Muxer;
use crate::stream::{Stream, StreamParams};
use crate::voc::{self, BlockType, VOC_HEADER_SIZE, VOC_MAGIC, VOC_VERSION, header_check};

/// 24 位长度字段能表示的最大块长度
const MAX_BLOCK_LEN: usize = 0xFF_FFFF;

/// 写入参数块所需的流参数
#[derive(Debug, Clone, Copy)]
struct VocParams {
    codec_tag: u16,
    sample_rate: u32,
    channels: u32,
    bits_per_sample: u32,
}

/// VOC 封装器
pub struct VocMuxer {
    /// 流参数 (`write_header` 之后可用)
    params: Option<VocParams>,
    /// 参数块是否已写入
    param_written: bool,
    /// 已写入的负载字节数
    data_written: u64,
}

impl VocMuxer {
    /// 创建 VOC 封装器实例 (工厂函数)
    pub fn create() -> VocalResult<Box<dyn Muxer>> {
        Ok(Box::new(Self::new()))
    }

    /// 创建封装器
    pub fn new() -> Self {
        Self {
            params: None,
            param_written: false,
            data_written: 0,
        }
    }

    /// 已写入的负载字节数
    pub fn data_written(&self) -> u64 {
        self.data_written
    }

    /// 写入第一个数据包的参数块与声音数据块头部
    fn write_param_blocks(
        io: &mut IoContext,
        params: &VocParams,
        payload_len: usize,
    ) -> VocalResult<()> {
        if params.codec_tag > 3 {
            io.write_u8(BlockType::NewVoiceData as u8)?;
            io.write_u24_le(block_len(payload_len, 12)?)?;
            io.write_u32_le(params.sample_rate)?;
            io.write_u8(params.bits_per_sample as u8)?;
            io.write_u8(params.channels as u8)?;
            io.write_u16_le(params.codec_tag)?;
            io.write_u32_le(0)?;
            return Ok(());
        }

        if params.channels > 1 {
            let rate = u64::from(params.sample_rate) * u64::from(params.channels);
            let divisor = (256_000_000 + rate / 2) / rate;
            let rate_param = 65536u64
                .checked_sub(divisor)
                .and_then(|v| u16::try_from(v).ok())
                .ok_or_else(|| {
                    VocalError::Unsupported(format!(
                        "VOC 扩展块无法表示 {} Hz × {} 声道",
                        params.sample_rate, params.channels
                    ))
                })?;
            io.write_u8(BlockType::Extended as u8)?;
            io.write_u24_le(4)?;
            io.write_u16_le(rate_param)?;
            io.write_u8(params.codec_tag as u8)?;
            io.write_u8((params.channels - 1) as u8)?;
        }

        let divisor = (1_000_000 + params.sample_rate / 2) / params.sample_rate;
        let rate_code = 256u32
            .checked_sub(divisor)
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| {
                VocalError::Unsupported(format!(
                    "VOC 声音数据块无法表示采样率 {} Hz",
                    params.sample_rate
                ))
            })?;
        io.write_u8(BlockType::VoiceData as u8)?;
        io.write_u24_le(block_len(payload_len, 2)?)?;
        io.write_u8(rate_code)?;
        io.write_u8(params.codec_tag as u8)?;
        Ok(())
    }
}

impl Default for VocMuxer {
    fn default() -> Self {
        Self::new()
    }
}

/// 负载长度加上块头部后的 24 位长度字段
fn block_len(payload_len: usize, header_len: usize) -> VocalResult<u32> {
    let len = payload_len + header_len;
    if len > MAX_BLOCK_LEN {
        return Err(VocalError::InvalidArgument(format!(
            "数据包过大, VOC 块长度 {} 超出 24 位范围",
            len
        )));
    }
    Ok(len as u32)
}

impl Muxer for VocMuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Voc
    }

    fn name(&self) -> &str {
        "voc"
    }

    fn write_header(&mut self, io: &mut IoContext, streams: &[Stream]) -> VocalResult<()> {
        if streams.len() != 1 {
            return Err(VocalError::Unsupported("VOC 仅支持单个音频流".into()));
        }

        let stream = &streams[0];
        let audio = match &stream.params {
            StreamParams::Audio(a) => a,
            StreamParams::Other => {
                return Err(VocalError::Unsupported("VOC 仅支持音频流".into()));
            }
        };

        let codec_tag = voc::tag_from_codec(stream.codec_id).ok_or_else(|| {
            VocalError::InvalidArgument(format!("VOC 不支持编解码器: {}", stream.codec_id))
        })?;
        let channels = audio.channel_layout.channels;
        if audio.sample_rate == 0 || channels == 0 || channels > 255 {
            return Err(VocalError::InvalidArgument(format!(
                "无效的 VOC 流参数: {} Hz, {} 声道",
                audio.sample_rate, channels
            )));
        }
        let bits_per_sample = match audio.bits_per_coded_sample {
            0 => stream.codec_id.bits_per_sample(),
            n => n,
        };

        io.write_all(VOC_MAGIC)?;
        io.write_u16_le(VOC_HEADER_SIZE)?;
        io.write_u16_le(VOC_VERSION)?;
        io.write_u16_le(header_check(VOC_VERSION))?;

        self.params = Some(VocParams {
            codec_tag,
            sample_rate: audio.sample_rate,
            channels,
            bits_per_sample,
        });
        self.param_written = false;
        self.data_written = 0;

        debug!(
            "VOC 写入头部: {}, {} Hz, {} 声道, 标签 0x{:04X}",
            stream.codec_id, audio.sample_rate, channels, codec_tag
        );
        Ok(())
    }

    fn write_packet(&mut self, io: &mut IoContext, packet: &Packet) -> VocalResult<()> {
        let params = self
            .params
            .ok_or_else(|| VocalError::InvalidArgument("尚未写入 VOC 文件头".into()))?;

        // 长度字段为 0 表示数据延续到文件末尾, 空数据包不能写成数据块
        if packet.is_empty() {
            return Ok(());
        }

        if self.param_written {
            io.write_u8(BlockType::VoiceDataCont as u8)?;
            io.write_u24_le(block_len(packet.size(), 0)?)?;
        } else {
            Self::write_param_blocks(io, &params, packet.size())?;
            self.param_written = true;
        }
        io.write_all(&packet.data)?;
        self.data_written += packet.size() as u64;
        Ok(())
    }

    fn write_trailer(&mut self, io: &mut IoContext) -> VocalResult<()> {
        io.write_u8(BlockType::Eof as u8)?;
        debug!("VOC 写入尾部: 负载 {} 字节", self.data_written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demuxer::Demuxer;
    use crate::demuxers::voc::{VocDemuxOptions, VocDemuxer};
    use crate::io::MemoryBackend;
    use vocal_codec::CodecId;
    use vocal_core::{ChannelLayout, Pts, SampleFormat};

    fn make_audio_stream(codec_id: CodecId, sample_rate: u32, channels: u32) -> Stream {
        let mut stream = Stream::new_audio(0);
        stream.codec_id = codec_id;
        let audio = stream.audio_mut().unwrap();
        audio.sample_rate = sample_rate;
        audio.channel_layout = ChannelLayout::from_channels(channels);
        audio.sample_format = codec_id.sample_format();
        stream
    }

    /// 封装到内存, 返回写出的字节
    fn mux(stream: Stream, packets: &[&[u8]]) -> Vec<u8> {
        let mut muxer = VocMuxer::new();
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        muxer.write_header(&mut io, &[stream]).unwrap();
        for data in packets {
            muxer
                .write_packet(&mut io, &Packet::from_data(data.to_vec()))
                .unwrap();
        }
        muxer.write_trailer(&mut io).unwrap();
        io.seek(std::io::SeekFrom::Start(0)).unwrap();
        let size = io.size().unwrap() as usize;
        io.read_bytes(size).unwrap()
    }

    #[test]
    fn test_封装_文件头() {
        let out = mux(make_audio_stream(CodecId::PcmU8, 8000, 1), &[]);
        assert_eq!(&out[..20], VOC_MAGIC);
        assert_eq!(&out[20..26], &[0x1A, 0x00, 0x14, 0x01, 0x1F, 0x11]);
        assert_eq!(&out[26..], &[0]);
    }

    #[test]
    fn test_封装_旧格式块与续块() {
        let out = mux(make_audio_stream(CodecId::PcmU8, 8000, 1), &[&[1, 2, 3], &[4, 5]]);
        assert_eq!(
            &out[26..],
            &[1, 5, 0, 0, 131, 0x00, 1, 2, 3, 2, 2, 0, 0, 4, 5, 0]
        );
    }

    #[test]
    fn test_封装_立体声写入扩展块() {
        let out = mux(make_audio_stream(CodecId::PcmU8, 8000, 2), &[&[0x80; 4]]);
        // 65536 - 16000 = 49536 = 0xC180
        assert_eq!(&out[26..34], &[8, 4, 0, 0, 0x80, 0xC1, 0x00, 0x01]);
        assert_eq!(&out[34..40], &[1, 6, 0, 0, 131, 0x00]);
    }

    #[test]
    fn test_封装_新格式块() {
        let out = mux(make_audio_stream(CodecId::PcmS16le, 44100, 2), &[&[0; 8]]);
        let mut expected = vec![9, 20, 0, 0];
        expected.extend_from_slice(&44100u32.to_le_bytes());
        expected.extend_from_slice(&[16, 2, 0x04, 0x00, 0, 0, 0, 0]);
        assert_eq!(&out[26..42], &expected[..]);
    }

    #[test]
    fn test_封装_不支持的参数() {
        let mut muxer = VocMuxer::new();
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        let stream = make_audio_stream(CodecId::None, 8000, 1);
        assert!(matches!(
            muxer.write_header(&mut io, &[stream]).unwrap_err(),
            VocalError::InvalidArgument(_)
        ));
        assert!(matches!(
            muxer.write_header(&mut io, &[]).unwrap_err(),
            VocalError::Unsupported(_)
        ));
        let pkt = Packet::from_data(vec![0u8; 4]);
        assert!(muxer.write_packet(&mut io, &pkt).is_err());
    }

    #[test]
    fn test_封装_采样率无法用采样率码表示() {
        let mut muxer = VocMuxer::new();
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        let stream = make_audio_stream(CodecId::PcmU8, 2000, 1);
        muxer.write_header(&mut io, &[stream]).unwrap();
        let err = muxer
            .write_packet(&mut io, &Packet::from_data(vec![0u8; 4]))
            .unwrap_err();
        assert!(matches!(err, VocalError::Unsupported(_)));
    }

    #[test]
    fn test_封装_跳过空数据包() {
        let stream = make_audio_stream(CodecId::PcmU8, 8000, 1);
        let out = mux(stream, &[&[], &[1; 4], &[], &[2; 4]]);
        assert_eq!(
            &out[26..],
            &[1, 6, 0, 0, 131, 0x00, 1, 1, 1, 1, 2, 4, 0, 0, 2, 2, 2, 2, 0]
        );

        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(out)));
        let mut demuxer = VocDemuxer::with_options(VocDemuxOptions::default());
        demuxer.open(&mut io).unwrap();
        let mut data = Vec::new();
        loop {
            match demuxer.read_packet(&mut io) {
                Ok(pkt) => data.extend_from_slice(&pkt.data),
                Err(VocalError::Eof) => break,
                Err(e) => panic!("读取失败: {e}"),
            }
        }
        assert_eq!(data, [1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_封装后解封装() {
        let pcm: Vec<u8> = (0..3000u32).map(|i| (i * 3) as u8).collect();
        let out = mux(
            make_audio_stream(CodecId::PcmS16le, 22050, 2),
            &[&pcm[..1000], &pcm[1000..]],
        );

        let mut io = IoContext::new(Box::new(MemoryBackend::from_data(out)));
        let mut demuxer = VocDemuxer::with_options(VocDemuxOptions::default());
        demuxer.open(&mut io).unwrap();
        let mut data = Vec::new();
        let mut last_pts = Pts::Unknown;
        loop {
            match demuxer.read_packet(&mut io) {
                Ok(pkt) => {
                    last_pts = pkt.pts;
                    data.extend_from_slice(&pkt.data);
                }
                Err(VocalError::Eof) => break,
                Err(e) => panic!("读取失败: {e}"),
            }
        }
        assert_eq!(data, pcm);
        assert_eq!(last_pts, Pts::Known(250));

        let s = &demuxer.streams()[0];
        assert_eq!(s.codec_id, CodecId::PcmS16le);
        let audio = s.audio().unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.channel_layout.channels, 2);
        assert_eq!(audio.sample_format, SampleFormat::S16);
        assert_eq!(s.duration, 750);
    }
}
