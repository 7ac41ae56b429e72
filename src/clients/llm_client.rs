//! LLM 客户端 - 评审服务边界
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（OpenAI、DeepSeek 等）
//!
//! 评审流程只依赖 `Reviewer` trait，测试中可替换为脚本化的假客户端。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::ModelSettings;
use crate::error::ReviewInvocationError;

/// 评审服务
///
/// 接收完整提示词，返回评审文本；延迟与可用性都不可信，由调用方负责重试。
#[allow(async_fn_in_trait)]
pub trait Reviewer {
    /// 模型名称（仅用于日志）
    fn model_name(&self) -> &str;

    /// 发送提示词并返回评审文本
    async fn review(&self, prompt: &str) -> Result<String, ReviewInvocationError>;
}

/// 基于 OpenAI 兼容接口的评审客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    settings: ModelSettings,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(settings: ModelSettings) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.base_url);

        Self {
            client: Client::with_config(openai_config),
            settings,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// 发送聊天请求
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `max_tokens`: 最大输出长度
    /// - `temperature`: 采样温度
    pub async fn chat(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ReviewInvocationError> {
        let model = self.settings.model_name.as_str();
        debug!("调用 LLM API，模型: {}", model);
        debug!("用户消息长度: {} 字符", user_message.chars().count());

        let build_err = |e: async_openai::error::OpenAIError| ReviewInvocationError::RequestBuild {
            model: model.to_string(),
            message: e.to_string(),
        };

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(build_err)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .temperature(temperature)
            .max_tokens(max_tokens)
            .build()
            .map_err(build_err)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            ReviewInvocationError::ApiCallFailed {
                model: model.to_string(),
                message: e.to_string(),
            }
        })?;

        debug!("LLM API 调用成功");

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ReviewInvocationError::EmptyResponse {
                model: model.to_string(),
            })
    }

    /// 配置自检：发送一个简短问题，用于 `check` 命令
    pub async fn probe(&self) -> Result<String, ReviewInvocationError> {
        self.chat("请简单回答：你是什么模型？", None, 100, 0.1).await
    }
}

impl Reviewer for LlmClient {
    fn model_name(&self) -> &str {
        &self.settings.model_name
    }

    async fn review(&self, prompt: &str) -> Result<String, ReviewInvocationError> {
        self.chat(
            prompt,
            Some(&self.settings.system_prompt),
            self.settings.max_tokens,
            self.settings.temperature,
        )
        .await
    }
}
