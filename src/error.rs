pub type StoreshotResult<T> = Result<T, StoreshotError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreshotError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("composite error: {0}")]
    Composite(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreshotError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn layout(msg: impl Into<String>) -> Self {
        Self::Layout(msg.into())
    }

    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }
}
