use super::{LoggingConfig, build_current_log_path, open_append_file};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, TimeZone, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, error};

/// 一次清理的结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct CleanupReport {
    pub removed: usize,
    pub compressed: usize,
}

/// 没有 tokio 运行时时, 只在启动时做一次清理
pub(super) fn run_startup_maintenance(config: &LoggingConfig) {
    if let Err(err) = cleanup_logs(config, Local::now().date_naive()) {
        error!("启动时清理日志失败: {}", err);
    }
}

pub(super) fn spawn_log_maintenance_task(
    handle: &tokio::runtime::Handle,
    config: LoggingConfig,
    rotate_requested: Arc<AtomicBool>,
) {
    handle.spawn(async move {
        let period = Duration::from_secs(config.cleanup_interval_seconds.max(1));
        let mut cleanup_interval = tokio::time::interval(period);
        let mut next_rollover_at = next_rollover_or_retry(Local::now());

        loop {
            tokio::select! {
                _ = cleanup_interval.tick() => {
                    if let Err(err) = cleanup_logs(&config, Local::now().date_naive()) {
                        error!("清理日志失败: {}", err);
                    }
                }
                _ = tokio::time::sleep_until(next_rollover_at) => {
                    let today = Local::now().date_naive();
                    let current =
                        build_current_log_path(Path::new(&config.directory), &config.file_prefix, today);
                    match open_append_file(&current) {
                        Ok(_) => rotate_requested.store(true, Ordering::Release),
                        Err(err) => error!("日志翻滚失败: {}", err),
                    }
                    if let Err(err) = cleanup_logs(&config, today) {
                        error!("翻滚后清理日志失败: {}", err);
                    }
                    next_rollover_at = next_rollover_or_retry(Local::now());
                }
            }
        }
    });
}

fn next_rollover_or_retry(now: DateTime<Local>) -> tokio::time::Instant {
    match compute_next_rollover(now) {
        Ok(at) => at,
        Err(err) => {
            error!("计算下一次翻滚时间失败: {}", err);
            tokio::time::Instant::now() + Duration::from_secs(1)
        }
    }
}

/// 删除超过保留期的日志, 压缩今天之前的未压缩日志
///
/// 只处理 `<prefix>.<YYYY-MM-DD>.log[.gz]` 形式的文件, 目录中的其他文件不受影响.
pub(super) fn cleanup_logs(config: &LoggingConfig, today: NaiveDate) -> Result<CleanupReport> {
    let directory = Path::new(&config.directory);
    let mut report = CleanupReport::default();
    if !directory.exists() {
        return Ok(report);
    }

    let cutoff = today - ChronoDuration::days(config.retention_days);

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some((date, compressed)) = parse_log_file_name(&file_name, &config.file_prefix) else {
            continue;
        };
        let path = entry.path();

        if date < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(err) => error!("删除过期日志失败, path={}: {}", path.display(), err),
            }
            continue;
        }

        if config.compress_history && !compressed && date < today {
            match compress_to_gz(&path) {
                Ok(()) => report.compressed += 1,
                Err(err) => error!("压缩日志失败: {}", err),
            }
        }
    }

    if report != CleanupReport::default() {
        debug!(
            "日志清理完成: 删除 {} 个, 压缩 {} 个",
            report.removed, report.compressed
        );
    }
    Ok(report)
}

fn compress_to_gz(path: &Path) -> Result<()> {
    let gz_path = PathBuf::from(format!("{}.gz", path.display()));
    if gz_path.exists() {
        return Ok(());
    }

    let mut input =
        File::open(path).with_context(|| format!("打开待压缩日志失败, path={}", path.display()))?;
    let output = File::create(&gz_path)
        .with_context(|| format!("创建压缩日志失败, path={}", gz_path.display()))?;
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)
        .with_context(|| format!("删除已压缩日志失败, path={}", path.display()))?;
    Ok(())
}

/// 解析 `<prefix>.<YYYY-MM-DD>.log` 或 `<prefix>.<YYYY-MM-DD>.log.gz`
fn parse_log_file_name(file_name: &str, prefix: &str) -> Option<(NaiveDate, bool)> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;
    let (date_part, compressed) = match rest.strip_suffix(".log.gz") {
        Some(date_part) => (date_part, true),
        None => (rest.strip_suffix(".log")?, false),
    };
    if date_part.len() != 10 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((date, compressed))
}

fn compute_next_rollover(now: DateTime<Local>) -> Result<tokio::time::Instant> {
    let next_date = now.date_naive() + ChronoDuration::days(1);
    let next_midnight = next_date
        .and_hms_opt(0, 0, 0)
        .context("计算下一次日志翻滚时间失败")?;
    let next_local = Local
        .from_local_datetime(&next_midnight)
        .earliest()
        .context("转换本地时间失败")?;
    let system_time = SystemTime::from(next_local.with_timezone(&Utc));
    let duration = system_time
        .duration_since(SystemTime::now())
        .unwrap_or(Duration::ZERO);
    Ok(tokio::time::Instant::now() + duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn temp_config(temp_dir: &TempDir) -> LoggingConfig {
        let mut config = LoggingConfig::new(temp_dir.path().to_string_lossy().to_string());
        config.retention_days = 7;
        config
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        match NaiveDate::from_ymd_opt(y, m, d) {
            Some(date) => date,
            None => panic!("无效日期: {}-{}-{}", y, m, d),
        }
    }

    #[test]
    fn test_parse_log_file_name() {
        let prefix = "vocal";
        assert_eq!(
            parse_log_file_name("vocal.2026-02-06.log", prefix),
            Some((date(2026, 2, 6), false))
        );
        assert_eq!(
            parse_log_file_name("vocal.2026-02-06.log.gz", prefix),
            Some((date(2026, 2, 6), true))
        );
        assert!(parse_log_file_name("vocal.log", prefix).is_none());
        assert!(parse_log_file_name("other.2026-02-06.log", prefix).is_none());
        assert!(parse_log_file_name("vocal.2026-2-6.log", prefix).is_none());
    }

    #[test]
    fn test_清理过期日志并压缩历史日志() {
        let temp_dir = match TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let config = temp_config(&temp_dir);
        let dir = temp_dir.path();
        let today = date(2026, 3, 20);

        let write = |name: &str, text: &str| {
            if let Err(err) = fs::write(dir.join(name), text) {
                panic!("写入测试日志失败: {}", err);
            }
        };
        write("vocal.2026-03-01.log", "太旧");
        write("vocal.2026-03-10.log.gz", "太旧");
        write("vocal.2026-03-19.log", "昨天的日志");
        write("vocal.2026-03-20.log", "今天的日志");
        write("notes.txt", "无关文件");

        let report = cleanup_logs(&config, today).ok();
        assert_eq!(
            report,
            Some(CleanupReport {
                removed: 2,
                compressed: 1
            })
        );

        assert!(!dir.join("vocal.2026-03-01.log").exists());
        assert!(!dir.join("vocal.2026-03-10.log.gz").exists());
        assert!(!dir.join("vocal.2026-03-19.log").exists());
        assert!(dir.join("vocal.2026-03-20.log").exists());
        assert!(dir.join("notes.txt").exists());

        let gz = match File::open(dir.join("vocal.2026-03-19.log.gz")) {
            Ok(file) => file,
            Err(err) => panic!("压缩日志不存在: {}", err),
        };
        let mut text = String::new();
        let read = GzDecoder::new(gz).read_to_string(&mut text);
        assert!(read.is_ok());
        assert_eq!(text, "昨天的日志");
    }

    #[test]
    fn test_关闭压缩时保留原文件() {
        let temp_dir = match TempDir::new() {
            Ok(temp_dir) => temp_dir,
            Err(err) => panic!("创建临时目录失败: {}", err),
        };
        let mut config = temp_config(&temp_dir);
        config.compress_history = false;
        let path = temp_dir.path().join("vocal.2026-03-19.log");
        assert!(fs::write(&path, "x").is_ok());

        let report = cleanup_logs(&config, date(2026, 3, 20)).ok();
        assert_eq!(report, Some(CleanupReport::default()));
        assert!(path.exists());
    }

    #[test]
    fn test_目录不存在时不报错() {
        let config = LoggingConfig::new("/nonexistent/vocal-logs");
        let report = cleanup_logs(&config, date(2026, 3, 20)).ok();
        assert_eq!(report, Some(CleanupReport::default()));
    }

    #[tokio::test]
    async fn test_下一次翻滚在一天之内() {
        let at = compute_next_rollover(Local::now());
        let at = match at {
            Ok(at) => at,
            Err(err) => panic!("计算翻滚时间失败: {}", err),
        };
        let wait = at.saturating_duration_since(tokio::time::Instant::now());
        assert!(wait <= Duration::from_secs(25 * 3600));
    }
}
