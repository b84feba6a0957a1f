//! Creative Voice File (VOC) 解封装器.
//!
//! VOC 文件头之后是一串数据块, 流参数 (采样率、声道数、编码) 由第一个
//! 携带负载的数据块决定, 因此 `open()` 之后流参数仍处于未设置状态,
//! 在第一次 `read_packet()` 时补全.
//!
//! 数据块解析见 `block`, 数据包提取状态机见 `packet`.

mod block;
mod packet;

pub use packet::{DEFAULT_PACKET_SIZE, VocSession};

use log::{debug, warn};
use vocal_codec::{CodecId, Packet};
use vocal_core::{VocalError, VocalResult};

use crate::demuxer::{Demuxer, SeekFlags};
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_LOW, SCORE_MAX};
use crate::stream::Stream;
use crate::voc::{VOC_HEADER_SIZE, VOC_MAGIC, header_check};

/// VOC 解封装选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VocDemuxOptions {
    /// 编码标签未知时使用的编解码器, `None` 表示报错
    pub fallback_codec: Option<CodecId>,
    /// 单个数据包的字节上限, 0 表示使用默认大小 (2048 字节)
    pub max_packet_size: usize,
}

/// VOC 解封装器
pub struct VocDemuxer {
    /// 流信息 (始终只有一条音频流)
    streams: Vec<Stream>,
    /// 读取会话
    session: VocSession,
    /// 解封装选项
    options: VocDemuxOptions,
    /// 元数据
    metadata: Vec<(String, String)>,
}

impl VocDemuxer {
    /// 创建 VOC 解封装器实例 (工厂函数)
    pub fn create() -> VocalResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self::with_options(VocDemuxOptions::default())))
    }

    /// 使用指定选项创建解封装器
    pub fn with_options(options: VocDemuxOptions) -> Self {
        Self {
            streams: Vec::new(),
            session: VocSession::new(),
            options,
            metadata: Vec::new(),
        }
    }

    /// 当前读取会话
    pub fn session(&self) -> &VocSession {
        &self.session
    }

    fn stream_mut(&mut self) -> VocalResult<&mut Stream> {
        self.streams
            .first_mut()
            .ok_or_else(|| VocalError::InvalidArgument("VOC 解封装器尚未打开".into()))
    }

    /// 读取下一个数据包, 到达结束时记录流时长
    fn next_packet(&mut self, io: &mut IoContext) -> VocalResult<Packet> {
        let fallback = self.options.fallback_codec;
        let max_size = i64::try_from(self.options.max_packet_size).unwrap_or(i64::MAX);
        let stream = self
            .streams
            .first_mut()
            .ok_or_else(|| VocalError::InvalidArgument("VOC 解封装器尚未打开".into()))?;

        match self.session.get_packet(io, stream, fallback, max_size) {
            Err(VocalError::Eof) => {
                if let Some(end) = self.session.pts().value() {
                    stream.duration = end;
                    debug!("VOC 读取结束, 时长 {} 个采样", end);
                }
                Err(VocalError::Eof)
            }
            other => other,
        }
    }

    /// 在索引中查找 seek 目标, 命中时恢复读取位置
    ///
    /// `allow_last` 为 false 时不接受最后一个条目, 因为它之后的数据
    /// 还没有被索引覆盖, 无法确定目标是否落在更后面.
    fn seek_to_index(
        &mut self,
        io: &mut IoContext,
        timestamp: i64,
        backward: bool,
        allow_last: bool,
    ) -> VocalResult<bool> {
        let stream = self.stream_mut()?;
        let index = &stream.seek_index;
        let Some(i) = index.search(timestamp, backward) else {
            return Ok(false);
        };
        if !allow_last && i + 1 >= index.len() {
            return Ok(false);
        }
        let Some(entry) = index.get(i).copied() else {
            return Ok(false);
        };
        io.seek(std::io::SeekFrom::Start(entry.pos))?;
        self.session.restore(&entry);
        debug!(
            "VOC seek: 目标 {} -> pos={}, pts={}, remaining={}",
            timestamp, entry.pos, entry.timestamp, entry.size
        );
        Ok(true)
    }
}

impl Demuxer for VocDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Voc
    }

    fn name(&self) -> &str {
        "voc"
    }

    fn open(&mut self, io: &mut IoContext) -> VocalResult<()> {
        let magic = io.read_bytes(VOC_MAGIC.len())?;
        if magic != VOC_MAGIC {
            return Err(VocalError::InvalidData("不是有效的 VOC 文件".into()));
        }

        let header_size = io.read_u16_le()?;
        if header_size != VOC_HEADER_SIZE {
            return Err(VocalError::Unsupported(format!(
                "不支持的 VOC 文件头长度: {}",
                header_size
            )));
        }

        let version = io.read_u16_le()?;
        let check = io.read_u16_le()?;
        if check != header_check(version) {
            warn!(
                "VOC 文件头校验不一致: version=0x{:04X}, check=0x{:04X}",
                version, check
            );
        }
        debug!("检测到 VOC 文件, 版本 {}.{}", version >> 8, version & 0xFF);

        self.metadata = vec![(
            "version".to_string(),
            format!("{}.{}", version >> 8, version & 0xFF),
        )];
        self.streams = vec![Stream::new_audio(0)];
        self.session = VocSession::new();
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> VocalResult<Packet> {
        self.next_packet(io)
    }

    fn seek(
        &mut self,
        io: &mut IoContext,
        stream_index: usize,
        timestamp: i64,
        flags: SeekFlags,
    ) -> VocalResult<()> {
        if stream_index >= self.streams.len() {
            return Err(VocalError::StreamNotFound(stream_index));
        }
        if !io.is_seekable() {
            return Err(VocalError::Unsupported("不支持在非可寻址流上 seek".into()));
        }

        if self.seek_to_index(io, timestamp, flags.backward, false)? {
            return Ok(());
        }

        let stream = self.stream_mut()?;
        let Some(first) = stream.seek_index.first().copied() else {
            return Err(VocalError::InvalidArgument("VOC 索引为空, 无法 seek".into()));
        };
        if first.timestamp > timestamp {
            return Err(VocalError::InvalidArgument(format!(
                "seek 目标 {} 早于索引起点 {}",
                timestamp, first.timestamp
            )));
        }
        let Some(last) = stream.seek_index.last().copied() else {
            return Err(VocalError::InvalidArgument("VOC 索引为空, 无法 seek".into()));
        };

        // 从最后一个索引点向前读取, 读取过程会继续扩充索引
        io.seek(std::io::SeekFrom::Start(last.pos))?;
        self.session.restore(&last);
        debug!("VOC seek: 目标 {} 超出索引范围, 从 pts={} 向前扫描", timestamp, last.timestamp);
        loop {
            let covered = self
                .stream_mut()?
                .seek_index
                .last()
                .is_some_and(|e| e.timestamp > timestamp);
            if covered {
                break;
            }
            match self.next_packet(io) {
                Ok(_) => {}
                Err(VocalError::Eof) => break,
                Err(e) => return Err(e),
            }
        }

        if self.seek_to_index(io, timestamp, flags.backward, true)? {
            Ok(())
        } else {
            Err(VocalError::InvalidArgument(format!(
                "seek 目标 {} 超出流范围",
                timestamp
            )))
        }
    }

    fn duration(&self) -> Option<f64> {
        let stream = self.streams.first()?;
        if stream.duration < 0 || !stream.time_base.is_valid() {
            return None;
        }
        Some(stream.duration as f64 * stream.time_base.to_f64())
    }

    fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }
}

/// VOC 格式探测器
pub struct VocProbe;

impl FormatProbe for VocProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= VOC_MAGIC.len() && &data[..VOC_MAGIC.len()] == VOC_MAGIC {
            // 魔数之后: header_size (20..22), version (22..24), check (24..26)
            if data.len() < 26 {
                return Some(SCORE_LOW);
            }
            let version = u16::from_le_bytes([data[22], data[23]]);
            let check = u16::from_le_bytes([data[24], data[25]]);
            if check != header_check(version) {
                return Some(SCORE_LOW);
            }
            return Some(SCORE_MAX);
        }

        // 仅根据扩展名
        if let Some(name) = filename {
            if FormatId::from_filename(name) == Some(FormatId::Voc) {
                return Some(SCORE_EXTENSION);
            }
        }

        None
    }

    fn format_id(&self) -> FormatId {
        FormatId::Voc
    }
}
