//! 文件日志系统.
//!
//! 安装 `tracing-subscriber` 订阅器: 控制台输出带颜色的行格式, 文件输出
//! 按天命名 (`<prefix>.<YYYY-MM-DD>.log`), 通过 `tracing-appender` 异步写入.
//! 各库 crate 通过 `log` 门面产生的记录也会被转发到这里.
//!
//! 过期日志的清理与压缩见 `task`.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

mod task;

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 文件日志的过滤规则 (`EnvFilter` 语法, 如 `info,vocal_format=debug`)
    #[serde(default = "default_level")]
    pub level: String,
    /// 控制台日志的过滤规则, 为空时不输出到控制台
    #[serde(default = "default_console_level")]
    pub console_level: String,
    pub directory: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// 超过天数的日志文件会被删除
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// 是否把往日的日志压缩为 `.gz`
    #[serde(default = "default_true")]
    pub compress_history: bool,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_console_level() -> String {
    "warn".to_string()
}

fn default_file_prefix() -> String {
    "vocal".to_string()
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> i64 {
    30
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl LoggingConfig {
    /// 以默认参数在指定目录下记录日志
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            level: default_level(),
            console_level: default_console_level(),
            directory: directory.into(),
            file_prefix: default_file_prefix(),
            retention_days: default_retention_days(),
            compress_history: default_true(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }

    /// 从 JSON 文本解析, 缺省字段取默认值
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("解析日志配置失败")
    }

    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取日志配置失败, path={}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// 今天的日志文件路径
    pub fn current_log_path(&self) -> PathBuf {
        build_current_log_path(
            Path::new(&self.directory),
            &self.file_prefix,
            Local::now().date_naive(),
        )
    }
}

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// 初始化全局日志
///
/// 每个进程只能调用一次. 在 tokio 运行时内调用时会启动后台维护任务
/// (按天切换文件、定期清理); 否则只在启动时清理一次.
pub fn init(config: LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)
        .with_context(|| format!("创建日志目录失败, path={}", config.directory))?;

    let rotate_requested = Arc::new(AtomicBool::new(false));
    let file_appender = CurrentFileWriter::new(
        Path::new(&config.directory),
        &config.file_prefix,
        Arc::clone(&rotate_requested),
    )?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD.set(guard).ok();

    let file_filter =
        EnvFilter::try_new(&config.level).with_context(|| format!("无效的日志级别: {}", config.level))?;
    let file_layer = fmt::Layer::default()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(LineFormatter { ansi: false })
        .with_filter(file_filter);

    let console_layer = if config.console_level.is_empty() {
        None
    } else {
        let console_filter = EnvFilter::try_new(&config.console_level)
            .with_context(|| format!("无效的控制台日志级别: {}", config.console_level))?;
        Some(
            fmt::Layer::default()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .event_format(LineFormatter { ansi: true })
                .with_filter(console_filter),
        )
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("全局日志订阅器已被初始化")?;

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => task::spawn_log_maintenance_task(&handle, config, rotate_requested),
        Err(_) => task::run_startup_maintenance(&config),
    }

    Ok(())
}

/// 写入当天日志文件, 收到切换信号后重新打开新日期的文件
struct CurrentFileWriter {
    directory: PathBuf,
    prefix: String,
    rotate_requested: Arc<AtomicBool>,
    file: File,
}

impl CurrentFileWriter {
    fn new(directory: &Path, prefix: &str, rotate_requested: Arc<AtomicBool>) -> Result<Self> {
        let today = Local::now().date_naive();
        let file = open_append_file(&build_current_log_path(directory, prefix, today))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            rotate_requested,
            file,
        })
    }

    fn reopen_current_file(&mut self) -> std::io::Result<()> {
        let today = Local::now().date_naive();
        let path = build_current_log_path(&self.directory, &self.prefix, today);
        self.file = open_append_file(&path).map_err(std::io::Error::other)?;
        Ok(())
    }
}

impl Write for CurrentFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.rotate_requested.swap(false, Ordering::AcqRel) {
            self.reopen_current_file()?;
        }
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

pub(crate) fn open_append_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("打开日志文件失败, path={}", path.display()))
}

pub(crate) fn build_current_log_path(directory: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    directory.join(format!("{}.{}.log", prefix, date.format("%Y-%m-%d")))
}

/// `[MM-DD hh:mm:ss.mmm] LEVEL target > 消息`
struct LineFormatter {
    ansi: bool,
}

impl LineFormatter {
    fn level_color(level: tracing::Level) -> &'static str {
        match level {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            _ => "\x1b[34m",
        }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = Local::now();
        let meta = event.metadata();
        write!(
            writer,
            "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis()
        )?;
        let level = meta.level().to_string();
        if self.ansi {
            write!(writer, "{}{:5}\x1b[0m ", Self::level_color(*meta.level()), level)?;
        } else {
            write!(writer, "{:5} ", level)?;
        }
        write!(writer, "{} > ", meta.target())?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
