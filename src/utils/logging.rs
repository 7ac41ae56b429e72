/// 日志工具模块
///
/// 控制台日志走 tracing；每次运行的文本日志（review_log.txt 等）由 `RunLog` 负责，
/// 只追加、只给人看，写入失败不会中断评审流程。
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 初始化控制台日志（RUST_LOG 未设置时默认 info）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 当前本地时间
pub fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 运行日志文件
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// 创建（覆盖）日志文件并写入表头
    ///
    /// # 参数
    /// - `path`: 日志文件路径
    /// - `header_lines`: 表头行（时间戳之后）
    pub fn create(path: impl Into<PathBuf>, title: &str, header_lines: &[String]) -> Self {
        let log = Self { path: path.into() };
        let mut content = format!("{}: {}\n", title, now_string());
        for line in header_lines {
            content.push_str(line);
            content.push('\n');
        }
        if let Err(e) = fs::write(&log.path, content) {
            warn!("⚠️ 无法创建日志文件 {}: {}", log.path.display(), e);
        }
        log
    }

    /// 追加若干行
    pub fn append(&self, lines: &[String]) {
        if let Err(e) = self.try_append(lines) {
            warn!("⚠️ 写入日志失败 {}: {}", self.path.display(), e);
        }
    }

    /// 追加一行
    pub fn line(&self, line: impl Into<String>) {
        self.append(&[line.into()]);
    }

    fn try_append(&self, lines: &[String]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        for line in lines {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

/// 格式化耗时显示
///
/// 小于 1 分钟显示秒，小于 1 小时显示分钟，否则显示小时。
pub fn format_elapsed(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}秒", seconds)
    } else if seconds < 3600.0 {
        format!("{:.1}分钟", seconds / 60.0)
    } else {
        format!("{:.1}小时", seconds / 3600.0)
    }
}

/// 分隔线
pub fn rule(ch: char, width: usize) -> String {
    ch.to_string().repeat(width)
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, provider: &str, model: &str) {
    info!("{}", rule('=', 60));
    info!("🚀 需求评审自动化工具 - {}", mode);
    info!("✅ 已加载模型配置: {} - {}", provider, model);
    info!("{}", rule('=', 60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
