//! I/O 抽象层.
//!
//! 对标 FFmpeg 的 `AVIOContext`, 提供统一的读写接口,
//! 支持文件、内存缓冲区以及不可 seek 的管道输入.

use std::io::{self, Read, Seek, Write};

use byteorder::{ByteOrder, LittleEndian};
use vocal_core::{VocalError, VocalResult};

/// I/O 上下文
///
/// 封装底层 I/O 操作, 为解封装器/封装器提供统一的数据读写接口.
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的 I/O 来源.
pub trait IoBackend: Send {
    /// 读取数据到缓冲区
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 全部写入
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    /// 定位 (seek)
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
    /// 是否支持 seek
    fn is_seekable(&self) -> bool;
}

/// 默认缓冲区大小 (32 KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 从文件路径打开 (只读)
    pub fn open_read(path: &str) -> VocalResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从文件路径打开 (写入)
    pub fn open_write(path: &str) -> VocalResult<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从任意只读数据源打开 (不可 seek, 如标准输入)
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::new(Box::new(ReaderBackend::new(reader)))
    }

    // ========================
    // 读取方法
    // ========================

    /// 从底层重新填充读缓冲区, 返回读到的字节数
    fn fill_buffer(&mut self) -> VocalResult<usize> {
        self.buf_pos = 0;
        self.buf_len = self.inner.read(&mut self.buffer)?;
        Ok(self.buf_len)
    }

    /// 读取指定字节数, 数据不足时返回 `VocalError::Eof`
    pub fn read_exact(&mut self, buf: &mut [u8]) -> VocalResult<()> {
        let got = self.read_into(buf)?;
        if got < buf.len() {
            return Err(VocalError::Eof);
        }
        Ok(())
    }

    /// 尽量填满 `buf`, 返回实际读取的字节数 (到达末尾时可能不足)
    fn read_into(&mut self, buf: &mut [u8]) -> VocalResult<usize> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            if buffered > 0 {
                let to_copy = buffered.min(buf.len() - total_read);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else if self.fill_buffer()? == 0 {
                break;
            }
        }
        Ok(total_read)
    }

    /// 读取 1 个字节
    pub fn read_u8(&mut self) -> VocalResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// 读取 u16 小端
    pub fn read_u16_le(&mut self) -> VocalResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(LittleEndian::read_u16(&buf))
    }

    /// 读取 u24 小端 (3 字节无符号整数)
    pub fn read_u24_le(&mut self) -> VocalResult<u32> {
        let mut buf = [0u8; 3];
        self.read_exact(&mut buf)?;
        Ok(LittleEndian::read_u24(&buf))
    }

    /// 读取 u32 小端
    pub fn read_u32_le(&mut self) -> VocalResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(LittleEndian::read_u32(&buf))
    }

    /// 读取指定数量的字节
    pub fn read_bytes(&mut self, count: usize) -> VocalResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 最多读取 `count` 个字节
    ///
    /// 到达流末尾时返回较短的数据; 一个字节都读不到时返回 `VocalError::Eof`.
    pub fn read_up_to(&mut self, count: usize) -> VocalResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let got = self.read_into(&mut buf)?;
        if got == 0 && count > 0 {
            return Err(VocalError::Eof);
        }
        buf.truncate(got);
        Ok(buf)
    }

    /// 跳过指定字节数
    pub fn skip(&mut self, count: u64) -> VocalResult<()> {
        let buffered = (self.buf_len - self.buf_pos) as u64;
        if count <= buffered {
            self.buf_pos += count as usize;
            return Ok(());
        }

        let remaining = count - buffered;
        self.buf_pos = self.buf_len;

        if self.inner.is_seekable() {
            let offset = i64::try_from(remaining)
                .map_err(|_| VocalError::InvalidArgument(format!("跳过字节数过大: {count}")))?;
            self.inner.seek(io::SeekFrom::Current(offset))?;
        } else {
            // 逐块丢弃读取的数据
            let mut left = remaining;
            while left > 0 {
                let to_read = left.min(self.buffer.len() as u64) as usize;
                let got = self.inner.read(&mut self.buffer[..to_read])?;
                if got == 0 {
                    self.buf_pos = 0;
                    self.buf_len = 0;
                    return Err(VocalError::Eof);
                }
                left -= got as u64;
            }
            self.buf_pos = 0;
            self.buf_len = 0;
        }
        Ok(())
    }

    // ========================
    // 写入方法
    // ========================

    /// 写入全部数据
    pub fn write_all(&mut self, buf: &[u8]) -> VocalResult<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    /// 写入 u8
    pub fn write_u8(&mut self, v: u8) -> VocalResult<()> {
        self.write_all(&[v])
    }

    /// 写入 u16 小端
    pub fn write_u16_le(&mut self, v: u16) -> VocalResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    /// 写入 u24 小端, 超出 24 位的值报错
    pub fn write_u24_le(&mut self, v: u32) -> VocalResult<()> {
        if v > 0x00FF_FFFF {
            return Err(VocalError::InvalidArgument(format!(
                "数值超出 24 位范围: {v}"
            )));
        }
        let mut buf = [0u8; 3];
        LittleEndian::write_u24(&mut buf, v);
        self.write_all(&buf)
    }

    /// 写入 u32 小端
    pub fn write_u32_le(&mut self, v: u32) -> VocalResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    // ========================
    // 定位方法
    // ========================

    /// 定位 (seek)
    ///
    /// 注意: seek 会清空读缓冲区.
    pub fn seek(&mut self, pos: io::SeekFrom) -> VocalResult<u64> {
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 获取当前位置
    ///
    /// 考虑读缓冲区中尚未消耗的数据量.
    pub fn position(&mut self) -> VocalResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }

    /// 是否支持随机访问
    pub fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件 I/O 后端
struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)?;
        let end = self.file.stream_position()?;
        if self.size.is_none_or(|s| end > s) {
            self.size = Some(end);
        }
        Ok(())
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中处理.
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
}

impl MemoryBackend {
    /// 从已有数据创建 (用于读取)
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// 创建空缓冲区 (用于写入)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
        }
    }

    /// 获取内部数据的引用
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.pos >= self.data.len() {
            self.data.resize(self.pos, 0);
            self.data.extend_from_slice(buf);
        } else {
            // 覆盖已有数据, 超出部分追加
            let overlap = (self.data.len() - self.pos).min(buf.len());
            self.data[self.pos..self.pos + overlap].copy_from_slice(&buf[..overlap]);
            self.data.extend_from_slice(&buf[overlap..]);
        }
        self.pos += buf.len();
        Ok(())
    }

    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            io::SeekFrom::Start(offset) => offset as i64,
            io::SeekFrom::End(offset) => self.data.len() as i64 + offset,
            io::SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

/// 只读流式 I/O 后端
///
/// 包装任意 `Read` (标准输入、管道、网络连接等), 只能顺序前进,
/// 不支持 seek, 总大小未知.
pub struct ReaderBackend<R> {
    reader: R,
    /// 已读取的字节数 (即当前位置)
    consumed: u64,
}

impl<R: Read + Send> ReaderBackend<R> {
    /// 包装一个只读数据源
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            consumed: 0,
        }
    }
}

impl<R: Read + Send> IoBackend for ReaderBackend<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }

    fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "只读流不支持写入",
        ))
    }

    fn seek(&mut self, _pos: io::SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "流式输入不支持 seek",
        ))
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.consumed)
    }

    fn size(&self) -> Option<u64> {
        None
    }

    fn is_seekable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_io(data: Vec<u8>) -> IoContext {
        IoContext::new(Box::new(MemoryBackend::from_data(data)))
    }

    #[test]
    fn test_小端整数读取() {
        let mut io = memory_io(vec![0x01, 0x34, 0x12, 0x56, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(io.read_u8().unwrap(), 0x01);
        assert_eq!(io.read_u16_le().unwrap(), 0x1234);
        assert_eq!(io.read_u24_le().unwrap(), 0x12_3456);
        assert_eq!(io.read_u32_le().unwrap(), 0x1234_5678);
        assert!(matches!(io.read_u8(), Err(VocalError::Eof)));
    }

    #[test]
    fn test_位置与跳过() {
        let mut io = memory_io((0u8..100).collect());
        io.skip(10).unwrap();
        assert_eq!(io.position().unwrap(), 10);
        assert_eq!(io.read_u8().unwrap(), 10);
        io.skip(50).unwrap();
        assert_eq!(io.read_u8().unwrap(), 61);
        assert_eq!(io.size(), Some(100));
    }

    #[test]
    fn test_读取不足时截断() {
        let mut io = memory_io(vec![1, 2, 3]);
        assert_eq!(io.read_up_to(10).unwrap(), vec![1, 2, 3]);
        assert!(matches!(io.read_up_to(10), Err(VocalError::Eof)));
        assert_eq!(io.read_up_to(0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_流式后端不可_seek() {
        let data: Vec<u8> = (0u8..64).collect();
        let mut io = IoContext::from_reader(std::io::Cursor::new(data));
        assert!(!io.is_seekable());
        assert_eq!(io.size(), None);
        io.skip(40).unwrap();
        assert_eq!(io.position().unwrap(), 40);
        assert_eq!(io.read_u8().unwrap(), 40);
        assert!(io.seek(io::SeekFrom::Start(0)).is_err());
        assert!(matches!(io.skip(100), Err(VocalError::Eof)));
    }

    #[test]
    fn test_内存写入_u24() {
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        io.write_u24_le(0x0A_0B0C).unwrap();
        assert!(io.write_u24_le(0x0100_0000).is_err());
        io.seek(io::SeekFrom::Start(0)).unwrap();
        assert_eq!(io.read_u24_le().unwrap(), 0x0A_0B0C);
    }

    #[test]
    fn test_文件读写() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("io.bin");
        let path = path.to_str().unwrap();

        let mut out = IoContext::open_write(path).unwrap();
        out.write_u32_le(0xDEAD_BEEF).unwrap();
        out.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(out.size(), Some(7));
        drop(out);

        let mut input = IoContext::open_read(path).unwrap();
        assert!(input.is_seekable());
        assert_eq!(input.size(), Some(7));
        assert_eq!(input.read_u32_le().unwrap(), 0xDEAD_BEEF);
        input.seek(io::SeekFrom::Start(5)).unwrap();
        assert_eq!(input.read_up_to(8).unwrap(), vec![2, 3]);
    }
}
