use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 需求表格读取错误
    #[error("读取错误: {0}")]
    Source(#[from] SourceReadError),
    /// 评审服务调用错误
    #[error("评审错误: {0}")]
    Review(#[from] ReviewInvocationError),
    /// 结果保存错误
    #[error("保存错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 提示模板错误
    #[error("模板错误: {0}")]
    Template(#[from] TemplateError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 需求表格读取错误
#[derive(Debug, Error)]
pub enum SourceReadError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 文件无法解析为表格
    #[error("无法解析表格 ({path}): {message}")]
    Unreadable { path: String, message: String },
    /// 表格中没有任何工作表
    #[error("表格中没有工作表: {path}")]
    NoSheet { path: String },
    /// 缺少必需列
    #[error("表格缺少必需列 '{column}': {path}")]
    MissingColumn { path: String, column: String },
    /// 目录读取失败
    #[error("无法读取目录 ({path}): {message}")]
    DirectoryUnreadable { path: String, message: String },
}

/// 评审服务调用错误
#[derive(Debug, Error)]
pub enum ReviewInvocationError {
    /// 请求构建失败
    #[error("构建请求失败 (模型: {model}): {message}")]
    RequestBuild { model: String, message: String },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回结果为空
    #[error("LLM返回结果为空 (模型: {model})")]
    EmptyResponse { model: String },
}

/// 结果保存错误
///
/// 按照可恢复方式分类：被占用可重试、结构性错误走替代方案、其余直接失败。
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 文件被占用或无权限
    #[error("文件被占用: {path}")]
    Locked { path: String },
    /// 表格结构无法按原位追加的方式编辑
    #[error("表格结构错误 ({path}): {message}")]
    Structural { path: String, message: String },
    /// 其他 IO 错误
    #[error("写入文件失败 ({path}): {message}")]
    Io { path: String, message: String },
    /// CSV 备份写入失败
    #[error("CSV写入失败 ({path}): {message}")]
    Csv { path: String, message: String },
}

/// 提示模板错误
#[derive(Debug, Error)]
pub enum TemplateError {
    /// 模板文件读取失败
    #[error("无法读取模板文件 ({path}): {message}")]
    Unreadable { path: String, message: String },
    /// 占位符数量不正确
    #[error("占位符 {placeholder} 应恰好出现一次，实际出现 {found} 次")]
    PlaceholderCount { placeholder: String, found: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 不支持的模型提供商
    #[error("不支持的模型提供商: {provider}。支持的提供商: openai, deepseek")]
    UnsupportedProvider { provider: String },
    /// 缺少 API 密钥
    #[error("请设置环境变量 {var_name} 或在配置文件中提供 api_key")]
    MissingApiKey { var_name: String },
    /// 配置文件读取失败
    #[error("无法读取配置文件 ({path}): {message}")]
    FileUnreadable { path: String, message: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {message}")]
    FileInvalid { path: String, message: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件不存在错误
    pub fn source_not_found(path: impl Into<String>) -> Self {
        AppError::Source(SourceReadError::NotFound { path: path.into() })
    }
}

impl PersistenceError {
    /// 是否属于"被占用"这类外部暂时性错误
    pub fn is_locked(&self) -> bool {
        matches!(self, PersistenceError::Locked { .. })
    }

    /// 是否属于表格结构错误
    pub fn is_structural(&self) -> bool {
        matches!(self, PersistenceError::Structural { .. })
    }

    /// 将 IO 错误按类型分类
    pub fn from_io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => PersistenceError::Locked { path },
            _ => PersistenceError::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    /// 将表格库错误按类型分类
    pub fn from_xlsx(path: impl Into<String>, err: umya_spreadsheet::XlsxError) -> Self {
        match err {
            umya_spreadsheet::XlsxError::Io(io) => Self::from_io(path, &io),
            other => PersistenceError::Structural {
                path: path.into(),
                message: other.to_string(),
            },
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_permission_denied_is_locked() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "busy");
        assert!(PersistenceError::from_io("a.xlsx", &err).is_locked());

        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let classified = PersistenceError::from_io("a.xlsx", &err);
        assert!(!classified.is_locked());
        assert!(!classified.is_structural());
    }

    #[test]
    fn test_display_messages() {
        let err: AppError = ConfigError::UnsupportedProvider {
            provider: "foo".to_string(),
        }
        .into();
        assert!(err.to_string().contains("不支持的模型提供商: foo"));

        let err = AppError::source_not_found("requirements.xlsx");
        assert_eq!(err.to_string(), "读取错误: 文件不存在: requirements.xlsx");
    }
}
