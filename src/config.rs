//! 程序配置
//!
//! 优先级：环境变量 > 配置文件（review.toml）> 默认值

use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "review.toml";

/// 默认系统提示词
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个软件工程专家和适航工程师，专注于DO-178C A级软件标准的合规性评审。你的职责是确保软件需求满足最高安全完整性等级的要求。";

/// 支持的模型提供商
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    DeepSeek,
}

impl Provider {
    /// 从字符串解析提供商（大小写不敏感）
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            other => Err(ConfigError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o",
            Provider::DeepSeek => "deepseek-reasoner",
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    /// 环境变量前缀（OPENAI_API / DEEPSEEK_API ...）
    fn env_prefix(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI",
            Provider::DeepSeek => "DEEPSEEK",
        }
    }
}

/// 单个提供商的连接配置
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    /// 模型提供商：openai / deepseek
    pub model_provider: String,
    pub openai: ProviderSettings,
    pub deepseek: ProviderSettings,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,

    // --- 单条评审模式 ---
    pub requirements_file: PathBuf,
    pub output_file: PathBuf,
    pub log_file: PathBuf,
    pub prompt_file: PathBuf,
    pub checklist_file: PathBuf,

    // --- 批量评审模式 ---
    pub interfaces_dir: PathBuf,
    pub results_dir: PathBuf,
    pub batch_prompt_file: PathBuf,

    // --- 重试与节流 ---
    pub review_attempts: u32,
    pub empty_retry_delay_secs: f64,
    pub error_retry_delay_secs: f64,
    pub store_attempts: u32,
    pub store_lock_delay_secs: f64,
    pub inter_item_pause_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_provider: "deepseek".to_string(),
            openai: ProviderSettings::default(),
            deepseek: ProviderSettings::default(),
            temperature: 0.7,
            max_tokens: 10000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            requirements_file: PathBuf::from("requirements.xlsx"),
            output_file: PathBuf::from("评审结果-cot.xlsx"),
            log_file: PathBuf::from("review_log.txt"),
            prompt_file: PathBuf::from("prompt.txt"),
            checklist_file: PathBuf::from("checklist.txt"),
            interfaces_dir: PathBuf::from("接口需求集合"),
            results_dir: PathBuf::from("评审结果"),
            batch_prompt_file: PathBuf::from("prompt_batch.txt"),
            review_attempts: 3,
            empty_retry_delay_secs: 2.0,
            error_retry_delay_secs: 3.0,
            store_attempts: 3,
            store_lock_delay_secs: 2.0,
            inter_item_pause_secs: 3.0,
        }
    }
}

/// 解析后的模型连接信息
#[derive(Clone, Debug)]
pub struct ModelSettings {
    pub provider: Provider,
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
}

impl Config {
    /// 加载配置
    ///
    /// 显式传入的路径必须存在；未传入时尝试读取当前目录下的 `review.toml`，
    /// 不存在则使用默认值。最后应用环境变量覆盖。
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(p) => Self::from_toml_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileUnreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::FileInvalid {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// 使用环境变量覆盖配置
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("MODEL_PROVIDER") {
            self.model_provider = v;
        }
        override_settings(&mut self.openai, Provider::OpenAi);
        override_settings(&mut self.deepseek, Provider::DeepSeek);
        self
    }

    /// 解析模型提供商并校验密钥
    pub fn model_settings(&self) -> Result<ModelSettings, ConfigError> {
        let provider = Provider::parse(&self.model_provider)?;
        let settings = match provider {
            Provider::OpenAi => &self.openai,
            Provider::DeepSeek => &self.deepseek,
        };

        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                var_name: format!("{}_API", provider.env_prefix()),
            })?;

        Ok(ModelSettings {
            provider,
            api_key,
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| provider.default_url().to_string()),
            model_name: settings
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_prompt: self.system_prompt.clone(),
        })
    }

    pub fn empty_retry_delay(&self) -> Duration {
        secs(self.empty_retry_delay_secs)
    }

    pub fn error_retry_delay(&self) -> Duration {
        secs(self.error_retry_delay_secs)
    }

    pub fn store_lock_delay(&self) -> Duration {
        secs(self.store_lock_delay_secs)
    }

    pub fn inter_item_pause(&self) -> Duration {
        secs(self.inter_item_pause_secs)
    }
}

fn override_settings(settings: &mut ProviderSettings, provider: Provider) {
    let prefix = provider.env_prefix();
    if let Ok(v) = std::env::var(format!("{prefix}_API")) {
        settings.api_key = Some(v);
    }
    if let Ok(v) = std::env::var(format!("{prefix}_URL")) {
        settings.base_url = Some(v);
    }
    if let Ok(v) = std::env::var(format!("{prefix}_MODEL")) {
        settings.model = Some(v);
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
