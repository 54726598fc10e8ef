use shared::error::ApiError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("server url '{0}' cannot carry path segments")]
    UrlNotABase(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend rejected request: {0}")]
    Api(#[from] ApiError),
    #[error("invalid form input: {0}")]
    Validation(String),
    #[error("no {0} form is open")]
    NoOpenForm(&'static str),
}

impl SettingsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SettingsError::Api(err) if err.is_not_found())
    }
}
