//! 统一错误类型定义.
//!
//! 所有 Vocal crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Vocal 统一错误类型
#[derive(Debug, Error)]
pub enum VocalError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// I/O 错误, 原样向上传播
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾 (正常结束, 不是故障)
    #[error("已到达流末尾")]
    Eof,

    /// 无法识别编解码器 (标签未知且没有后备编解码器)
    #[error("未找到编解码器: {0}")]
    CodecNotFound(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 无效数据 (损坏的长度/采样率字段等)
    #[error("无效数据: {0}")]
    InvalidData(String),
}

impl VocalError {
    /// 是否为正常的流结束信号
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

/// Vocal 统一 Result 类型
pub type VocalResult<T> = Result<T, VocalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_错误自动转换() {
        fn fail() -> VocalResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "管道断开"))?;
            Ok(())
        }
        let err = fail().unwrap_err();
        assert!(matches!(err, VocalError::Io(_)));
        assert!(!err.is_eof());
    }

    #[test]
    fn test_错误信息() {
        let err = VocalError::InvalidData("采样率为 0".into());
        assert_eq!(err.to_string(), "无效数据: 采样率为 0");
        assert!(VocalError::Eof.is_eof());
    }
}
