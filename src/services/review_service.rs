//! 评审调用服务 - 业务能力层
//!
//! 包装评审客户端，按固定间隔重试空结果、错误结果和调用异常。
//! 重试耗尽时不报错：最后一次的文本（可能是错误信息）作为评审结果返回，
//! 保证每条需求都有记录。

use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::clients::Reviewer;

/// 思考过程开始标记
pub const THINK_START: &str = "<think>";
/// 思考过程结束标记
pub const THINK_END: &str = "</think>";
/// 评审结果中表示错误的标记
pub const ERROR_MARKER: &str = "Error:";

/// 去除由开始/结束标记包裹的片段
///
/// 只去除第一个开始标记到其后第一个结束标记之间的内容（含标记），
/// 并去掉结果首尾的换行。任一标记缺失时原样返回。
pub fn strip_delimited(text: &str, start_marker: &str, end_marker: &str) -> String {
    let Some(start) = text.find(start_marker) else {
        return text.to_string();
    };
    let search_from = start + start_marker.len();
    let Some(end) = text[search_from..].find(end_marker).map(|pos| search_from + pos) else {
        return text.to_string();
    };

    let mut stripped = String::with_capacity(text.len());
    stripped.push_str(&text[..start]);
    stripped.push_str(&text[end + end_marker.len()..]);
    stripped.trim_matches('\n').to_string()
}

/// 去除推理模型输出的 `<think>...</think>` 片段
pub fn strip_reasoning(text: &str) -> String {
    strip_delimited(text, THINK_START, THINK_END)
}

/// 评审文本是否可用：非空且不含错误标记
pub fn is_acceptable(text: &str) -> bool {
    !text.trim().is_empty() && !text.contains(ERROR_MARKER)
}

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 总尝试次数
    pub max_attempts: u32,
    /// 空结果 / 错误结果后的等待时间
    pub empty_delay: Duration,
    /// 调用异常后的等待时间
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            empty_delay: Duration::from_secs(2),
            error_delay: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// 不等待的策略（测试用）
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            empty_delay: Duration::ZERO,
            error_delay: Duration::ZERO,
        }
    }
}

/// 评审调用结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReply {
    /// 最终文本（已去除思考过程；全部失败时为最后一次的错误信息或返回内容）
    pub text: String,
    /// 是否得到了可用结果
    pub accepted: bool,
    /// 实际尝试次数
    pub attempts: u32,
}

/// 评审调用服务
pub struct ReviewService<R> {
    reviewer: R,
    policy: RetryPolicy,
}

impl<R: Reviewer> ReviewService<R> {
    pub fn new(reviewer: R, policy: RetryPolicy) -> Self {
        Self { reviewer, policy }
    }

    pub fn reviewer(&self) -> &R {
        &self.reviewer
    }

    /// 调用评审服务（带重试）
    ///
    /// # 参数
    /// - `prompt`: 完整提示词
    /// - `label`: 需求标识或接口名称（仅用于日志）
    pub async fn invoke(&self, prompt: &str, label: &str) -> ReviewReply {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut text = String::new();

        for attempt in 1..=max_attempts {
            info!("🔄 [{}] 第 {} 次尝试调用评审服务...", label, attempt);

            match self.reviewer.review(prompt).await {
                Ok(raw) => {
                    text = strip_reasoning(&raw);
                    if is_acceptable(&text) {
                        info!("✅ [{}] 评审服务调用成功", label);
                        return ReviewReply {
                            text,
                            accepted: true,
                            attempts: attempt,
                        };
                    }
                    warn!(
                        "⚠️ [{}] 评审返回异常，重试中 ({}/{})...",
                        label, attempt, max_attempts
                    );
                    if attempt < max_attempts {
                        sleep(self.policy.empty_delay).await;
                    }
                }
                Err(e) => {
                    error!("❌ [{}] 评审服务异常: {}", label, e);
                    text = e.to_string();
                    if attempt < max_attempts {
                        sleep(self.policy.error_delay).await;
                    }
                }
            }
        }

        warn!("⚠️ [{}] 评审服务 {} 次尝试均未得到有效结果", label, max_attempts);
        ReviewReply {
            text,
            accepted: false,
            attempts: max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReviewInvocationError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// 按脚本依次返回结果的假评审客户端
    struct Scripted {
        replies: RefCell<VecDeque<Result<String, ReviewInvocationError>>>,
        calls: RefCell<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ReviewInvocationError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl Reviewer for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn review(&self, _prompt: &str) -> Result<String, ReviewInvocationError> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn api_error(message: &str) -> ReviewInvocationError {
        ReviewInvocationError::ApiCallFailed {
            model: "scripted".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_strip_think_span() {
        assert_eq!(strip_reasoning("<think>推理过程</think>\n结论: 通过"), "结论: 通过");
        assert_eq!(strip_reasoning("前文<think>x</think>后文"), "前文后文");
    }

    #[test]
    fn test_strip_fails_open() {
        assert_eq!(strip_reasoning("没有标记 通过"), "没有标记 通过");
        assert_eq!(strip_reasoning("<think>没有结束标记"), "<think>没有结束标记");
        // 结束标记在开始标记之前不算配对
        assert_eq!(strip_reasoning("</think>a<think>b"), "</think>a<think>b");
    }

    #[test]
    fn test_strip_only_first_span() {
        assert_eq!(
            strip_reasoning("<think>a</think>中<think>b</think>尾"),
            "中<think>b</think>尾"
        );
    }

    #[test]
    fn test_is_acceptable() {
        assert!(is_acceptable("通过"));
        assert!(!is_acceptable("  \n"));
        assert!(!is_acceptable("Error: rate limited"));
    }

    #[tokio::test]
    async fn test_first_good_reply_wins() {
        let service = ReviewService::new(
            Scripted::new(vec![Ok("<think>嗯</think>通过".to_string())]),
            RetryPolicy::immediate(3),
        );

        let reply = service.invoke("prompt", "REQ_001").await;
        assert_eq!(reply.text, "通过");
        assert!(reply.accepted);
        assert_eq!(reply.attempts, 1);
        assert_eq!(*service.reviewer().calls.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retries_empty_and_error_marked() {
        let service = ReviewService::new(
            Scripted::new(vec![
                Ok(String::new()),
                Ok("Error: 429".to_string()),
                Ok("失败 通过".to_string()),
            ]),
            RetryPolicy::immediate(3),
        );

        let reply = service.invoke("prompt", "REQ_002").await;
        assert_eq!(reply.text, "失败 通过");
        assert!(reply.accepted);
        assert_eq!(reply.attempts, 3);
    }

    #[tokio::test]
    async fn test_persistent_exception_recorded_verbatim() {
        let last = api_error("connection reset");
        let expected = last.to_string();
        let service = ReviewService::new(
            Scripted::new(vec![Err(api_error("timeout")), Err(api_error("timeout")), Err(last)]),
            RetryPolicy::immediate(3),
        );

        let reply = service.invoke("prompt", "REQ_003").await;
        assert_eq!(reply.text, expected);
        assert!(!reply.accepted);
        assert_eq!(*service.reviewer().calls.borrow(), 3);
    }

    #[tokio::test]
    async fn test_attempts_bounded() {
        let service = ReviewService::new(Scripted::new(vec![]), RetryPolicy::immediate(3));

        let reply = service.invoke("prompt", "REQ_004").await;
        assert!(!reply.accepted);
        assert_eq!(*service.reviewer().calls.borrow(), 3);
    }
}
