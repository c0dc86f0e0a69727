use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinancePlannerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("No exchange rate available for {from} -> {to}")]
    MissingExchangeRate { from: String, to: String },

    #[error("Accounting equation violation on {date}: Assets ({assets}) != Liabilities ({liabilities}) + Equity ({equity}), difference {difference}")]
    AccountingEquationViolation {
        date: String,
        assets: f64,
        liabilities: f64,
        equity: f64,
        difference: f64,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "ai")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM gateway rate limit reached")]
    RateLimited,

    #[error("LLM gateway credits exhausted")]
    QuotaExhausted,

    #[error("LLM gateway error (status {status}): {body}")]
    Gateway { status: u16, body: String },

    #[error("Model response could not be parsed as JSON")]
    UnparseableResponse { raw: String },

    #[error("Command could not be understood: {0}")]
    CommandNotUnderstood(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl FinancePlannerError {
    /// Localized text shown to the end user. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => {
                "Çok fazla istek gönderildi. Lütfen biraz bekleyip tekrar deneyin.".to_string()
            }
            Self::QuotaExhausted => {
                "Yapay zeka kredisi tükendi. Lütfen hesabınıza kredi ekleyin.".to_string()
            }
            Self::UnparseableResponse { .. } | Self::CommandNotUnderstood(_) => {
                "Komut anlaşılamadı. Lütfen farklı bir şekilde ifade edin.".to_string()
            }
            Self::Unauthorized(_) => "Oturum doğrulanamadı. Lütfen tekrar giriş yapın.".to_string(),
            Self::Timeout(_) => "İstek zaman aşımına uğradı. Lütfen tekrar deneyin.".to_string(),
            Self::InvalidInput(detail) | Self::InvalidWeights(detail) | Self::DateError(detail) => {
                format!("Geçersiz istek: {}", detail)
            }
            Self::MissingExchangeRate { from, to } => {
                format!("{} -> {} için döviz kuru bulunamadı.", from, to)
            }
            _ => "İşlem başarısız oldu. Lütfen daha sonra tekrar deneyin.".to_string(),
        }
    }

    /// True for the two gateway conditions the caller must surface verbatim (429 / 402).
    pub fn is_gateway_limit(&self) -> bool {
        matches!(self, Self::RateLimited | Self::QuotaExhausted)
    }
}

pub type Result<T> = std::result::Result<T, FinancePlannerError>;
