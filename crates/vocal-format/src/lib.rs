//! # vocal-format
//!
//! 容器格式库, 提供 Creative Voice File (VOC) 的解封装与封装,
//! 以及它们依赖的 I/O、流信息、Seek 索引、格式探测等基础设施.
//!
//! 本 crate 对标 FFmpeg 的 libavformat (`vocdec.c` / `vocenc.c` /
//! `voc_packet.c`).

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod index;
pub mod io;
pub mod muxer;
pub mod muxers;
pub mod probe;
pub mod registry;
pub mod stream;
pub mod voc;

// 重导出常用类型
pub use demuxer::{Demuxer, SeekFlags};
pub use demuxers::voc::{VocDemuxOptions, VocDemuxer};
pub use format_id::FormatId;
pub use io::IoContext;
pub use muxer::Muxer;
pub use muxers::voc::VocMuxer;
pub use probe::ProbeResult;
pub use registry::FormatRegistry;
pub use stream::Stream;

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    demuxers::register_all_demuxers(registry);
    muxers::register_all_muxers(registry);
}
