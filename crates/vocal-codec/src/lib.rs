//! # vocal-codec
//!
//! 编解码器标识与 Packet 抽象.
//!
//! 本 crate 不做任何解码, 只描述数据包属于哪种编码,
//! 以及如何由字节数推算采样数 (对标 libavcodec 的
//! `av_get_bits_per_sample` / `av_get_audio_frame_duration2`).

pub mod codec_id;
pub mod packet;

// 重导出常用类型
pub use codec_id::CodecId;
pub use packet::Packet;
