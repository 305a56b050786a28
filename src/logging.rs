// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// 另提供单次导入的追加式日志文件（RunLog）
// ==========================================

use chrono::Local;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=inventory_import=trace
///
/// # 示例
/// ```no_run
/// use inventory_import::logging;
/// logging::init();
/// ```
pub fn init() {
    // 从环境变量读取日志级别，默认为 info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

// ==========================================
// RunLog - 单次导入日志
// ==========================================
// 文件: <log_dir>/<pipeline>_<时间戳>_<run_id>.log
// 每行: "<本地时间> [LEVEL] 消息"
// 文件打不开或写失败时退化为仅 tracing 输出
pub struct RunLog {
    run_id: String,
    pipeline: &'static str,
    path: Option<PathBuf>,
    file: Option<File>,
}

impl RunLog {
    /// 打开单次导入日志
    ///
    /// # 参数
    /// - log_dir: 日志目录（None 表示不落文件）
    /// - pipeline: 管线名（product / warehouse）
    /// - run_id: 本次导入 id
    pub fn open(log_dir: Option<&Path>, pipeline: &'static str, run_id: &str) -> Self {
        let mut run_log = Self {
            run_id: run_id.to_string(),
            pipeline,
            path: None,
            file: None,
        };

        let Some(dir) = log_dir else {
            return run_log;
        };

        let file_name = format!(
            "{}_{}_{}.log",
            pipeline,
            Local::now().format("%Y%m%d_%H%M%S"),
            run_id
        );
        let path = dir.join(file_name);

        let opened = fs::create_dir_all(dir).and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
        });
        match opened {
            Ok(file) => {
                run_log.file = Some(file);
                run_log.path = Some(path);
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    path = %path.display(),
                    error = %e,
                    "导入日志文件打开失败，仅输出到 tracing"
                );
            }
        }
        run_log
    }

    /// 日志文件路径（未落文件时为 None）
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&mut self, message: impl Display) {
        info!(run_id = %self.run_id, pipeline = self.pipeline, "{}", message);
        self.append("INFO", &message);
    }

    pub fn warn(&mut self, message: impl Display) {
        warn!(run_id = %self.run_id, pipeline = self.pipeline, "{}", message);
        self.append("WARN", &message);
    }

    pub fn error(&mut self, message: impl Display) {
        error!(run_id = %self.run_id, pipeline = self.pipeline, "{}", message);
        self.append("ERROR", &message);
    }

    fn append(&mut self, level: &str, message: &dyn Display) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let line = format!(
            "{} [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level,
            message
        );
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(run_id = %self.run_id, error = %e, "导入日志写入失败，后续仅输出到 tracing");
            self.file = None;
        }
    }
}
