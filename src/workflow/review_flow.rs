//! 评审流程 - 流程层
//!
//! 核心职责：定义"一个评审单元"的完整处理流程
//!
//! 流程顺序：
//! 1. 渲染提示词
//! 2. 调用评审服务（带重试，去除思考过程）
//! 3. 批量模式提取 `[评审结果]` 段
//! 4. 统计关键词，组装结果

use std::time::Instant;
use tracing::{info, warn};

use crate::clients::Reviewer;
use crate::models::ReviewOutcome;
use crate::services::classifier::{extract_result_section, ResponseClassifier};
use crate::services::prompt_builder::PromptTemplate;
use crate::services::review_service::ReviewService;
use crate::workflow::unit_of_work::UnitOfWork;

/// 评审流程
///
/// - 不持有任何文件资源
/// - 不关心结果保存到哪里
/// - 永远返回一个结果（评审失败时结果文本为错误信息）
pub struct ReviewFlow<R> {
    template: PromptTemplate,
    review_service: ReviewService<R>,
    classifier: ResponseClassifier,
}

impl<R: Reviewer> ReviewFlow<R> {
    pub fn new(template: PromptTemplate, review_service: ReviewService<R>, classifier: ResponseClassifier) -> Self {
        Self {
            template,
            review_service,
            classifier,
        }
    }

    pub fn reviewer(&self) -> &R {
        self.review_service.reviewer()
    }

    pub async fn run<U: UnitOfWork>(&self, unit: &U) -> ReviewOutcome {
        let label = unit.label();
        let prompt = self.template.render(&unit.render_requirement());

        info!("🚀 [{}] 开始调用评审服务 (提示词 {} 字符)...", label, prompt.chars().count());
        let started = Instant::now();
        let reply = self.review_service.invoke(&prompt, label).await;
        let elapsed = started.elapsed();

        if !reply.accepted {
            warn!("⚠️ [{}] 未获得有效评审结果，记录最后一次返回内容", label);
        }

        let review_text = if unit.isolates_result_section() {
            extract_result_section(&reply.text)
        } else {
            reply.text
        };
        let counts = self.classifier.classify(&review_text);
        info!("📈 [{}] 评审摘要: {}", label, counts);

        unit.build_outcome(counts, review_text, elapsed)
    }
}
