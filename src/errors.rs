use std::fmt;

#[derive(Debug, Clone)]
pub enum MonetaError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    ProviderCall(String),
    ProviderTimeout(String),
    ProviderUnconfigured(String),
    DateParse(String),
}

impl MonetaError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            MonetaError::DatabaseConfig(_) => "E001",
            MonetaError::DatabaseConnection(_) => "E002",
            MonetaError::DatabaseOperation(_) => "E003",
            MonetaError::Validation(_) => "E004",
            MonetaError::NotFound(_) => "E005",
            MonetaError::Serialization(_) => "E006",
            MonetaError::ProviderCall(_) => "E007",
            MonetaError::ProviderTimeout(_) => "E008",
            MonetaError::ProviderUnconfigured(_) => "E009",
            MonetaError::DateParse(_) => "E010",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            MonetaError::DatabaseConfig(_) => "Database Configuration Error",
            MonetaError::DatabaseConnection(_) => "Database Connection Error",
            MonetaError::DatabaseOperation(_) => "Database Operation Error",
            MonetaError::Validation(_) => "Validation Error",
            MonetaError::NotFound(_) => "Resource Not Found",
            MonetaError::Serialization(_) => "Serialization Error",
            MonetaError::ProviderCall(_) => "Payment Provider Error",
            MonetaError::ProviderTimeout(_) => "Payment Provider Timeout",
            MonetaError::ProviderUnconfigured(_) => "Payment Provider Unconfigured",
            MonetaError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            MonetaError::DatabaseConfig(msg) => msg,
            MonetaError::DatabaseConnection(msg) => msg,
            MonetaError::DatabaseOperation(msg) => msg,
            MonetaError::Validation(msg) => msg,
            MonetaError::NotFound(msg) => msg,
            MonetaError::Serialization(msg) => msg,
            MonetaError::ProviderCall(msg) => msg,
            MonetaError::ProviderTimeout(msg) => msg,
            MonetaError::ProviderUnconfigured(msg) => msg,
            MonetaError::DateParse(msg) => msg,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MonetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MonetaError {}

// 便捷的构造函数
impl MonetaError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        MonetaError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        MonetaError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        MonetaError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        MonetaError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        MonetaError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        MonetaError::Serialization(msg.into())
    }

    pub fn provider_call<T: Into<String>>(msg: T) -> Self {
        MonetaError::ProviderCall(msg.into())
    }

    pub fn provider_timeout<T: Into<String>>(msg: T) -> Self {
        MonetaError::ProviderTimeout(msg.into())
    }

    pub fn provider_unconfigured<T: Into<String>>(msg: T) -> Self {
        MonetaError::ProviderUnconfigured(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        MonetaError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for MonetaError {
    fn from(err: sea_orm::DbErr) -> Self {
        MonetaError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for MonetaError {
    fn from(err: std::io::Error) -> Self {
        MonetaError::DatabaseConfig(err.to_string())
    }
}

impl From<serde_json::Error> for MonetaError {
    fn from(err: serde_json::Error) -> Self {
        MonetaError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for MonetaError {
    fn from(err: chrono::ParseError) -> Self {
        MonetaError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MonetaError>;
