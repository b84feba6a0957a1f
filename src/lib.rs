//! # Vocal
//!
//! 纯 Rust 实现的 Creative Voice File (VOC) 音频容器库, 对标 FFmpeg 的
//! `voc` 解封装器与封装器.
//!
//! VOC 是 Sound Blaster 时代的块结构音频容器: 固定文件头之后是一串
//! 类型化的数据块, 流参数由第一个携带负载的数据块决定. 本库把这些数据块
//! 切分为带时间戳的数据包, 并支持 seek 与写出.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use vocal::format::IoContext;
//!
//! let registry = vocal::default_format_registry();
//! let mut io = IoContext::open_read("sound.voc").unwrap();
//! let mut demuxer = registry.open_input(&mut io, Some("sound.voc")).unwrap();
//! while let Ok(pkt) = demuxer.read_packet(&mut io) {
//!     println!("pts={} size={}", pkt.pts, pkt.size());
//! }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `vocal-core` | 核心类型: 错误、时间戳、有理数、声道布局 |
//! | `vocal-codec` | 编解码器标识与数据包 |
//! | `vocal-format` | VOC 解封装/封装、I/O、Seek 索引、格式探测 |

/// 核心类型与工具 (对标 libavutil)
pub use vocal_core as core;

/// 编解码器标识与数据包 (对标 libavcodec 的公共类型)
pub use vocal_codec as codec;

/// 容器格式框架 (对标 libavformat)
pub use vocal_format as format;

pub mod logging;

/// 获取 Vocal 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置容器格式的注册表
pub fn default_format_registry() -> vocal_format::FormatRegistry {
    let mut registry = vocal_format::FormatRegistry::new();
    vocal_format::register_all(&mut registry);
    registry
}
