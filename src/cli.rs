//! 命令行参数（`clap`）

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "requirement_review",
    version,
    about = "需求评审自动化工具",
    long_about = "使用大模型对工程需求进行评审。\n\n配置优先级：环境变量 > review.toml > 默认值。",
    after_help = "示例:\n  requirement_review check\n  requirement_review single\n  requirement_review batch --config review.toml",
    arg_required_else_help = true
)]
pub struct Cli {
    /// 配置文件路径（默认读取当前目录下的 review.toml）
    #[arg(long, global = true, env = "REVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 单条需求评审
    #[command(
        about = "运行单条需求评审",
        long_about = "逐条评审需求表格中的每一条需求，结果逐条写入结果表格。"
    )]
    Single,
    /// 批量接口评审
    #[command(
        about = "运行批量接口评审",
        long_about = "把接口需求目录中每个文件的全部需求作为一组评审，每个文件生成一个结果表格，并生成汇总表格。"
    )]
    Batch,
    /// 测试模型配置
    #[command(
        about = "测试大模型配置是否正确",
        long_about = "显示当前模型配置，并发送一个简短问题验证连接。"
    )]
    Check,
}
