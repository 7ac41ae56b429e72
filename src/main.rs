mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Commands};
use requirement_review::config::{Config, ModelSettings};
use requirement_review::utils::logging::{self, log_startup};
use requirement_review::utils::truncate_text;
use requirement_review::{BatchPaths, LlmClient, Pipeline, PipelineOptions, PromptTemplate, SinglePaths};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let cli = Cli::parse();

    // 加载配置
    let config = Config::load(cli.config.as_deref())?;
    let settings = config.model_settings().context("模型配置无效")?;

    match cli.cmd {
        Commands::Single => run_single(&config, settings).await,
        Commands::Batch => run_batch(&config, settings).await,
        Commands::Check => check(settings).await,
    }
}

async fn run_single(config: &Config, settings: ModelSettings) -> Result<()> {
    log_startup("单条需求评审", settings.provider.name(), &settings.model_name);

    let template = PromptTemplate::load(&config.prompt_file, &config.checklist_file)?;
    let pipeline = Pipeline::new(LlmClient::new(settings), template, PipelineOptions::from_config(config))?;
    pipeline.run_single(&SinglePaths::from_config(config)).await?;

    Ok(())
}

async fn run_batch(config: &Config, settings: ModelSettings) -> Result<()> {
    log_startup("批量接口评审", settings.provider.name(), &settings.model_name);

    let template = PromptTemplate::load(&config.batch_prompt_file, &config.checklist_file)?;
    let pipeline = Pipeline::new(LlmClient::new(settings), template, PipelineOptions::from_config(config))?;
    pipeline.run_batch(&BatchPaths::from_config(config)).await?;

    Ok(())
}

async fn check(settings: ModelSettings) -> Result<()> {
    info!("🧪 测试大模型配置...");
    info!("📋 配置信息:");
    info!("   - 提供商: {}", settings.provider.name());
    info!("   - 模型: {}", settings.model_name);
    info!("   - API地址: {}", settings.base_url);
    info!("   - API密钥已设置: {}", !settings.api_key.is_empty());

    let client = LlmClient::new(settings);
    match client.probe().await {
        Ok(answer) => {
            info!("✅ 模型响应成功!");
            info!("📝 响应内容: {}", truncate_text(&answer, 100));
            Ok(())
        }
        Err(e) => {
            error!("❌ 配置测试失败: {}", e);
            Err(e.into())
        }
    }
}
