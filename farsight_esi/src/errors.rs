use std::fmt;

use thiserror::Error;

pub type EsiResult<T> = Result<T, EsiError>;

#[derive(Debug, Error)]
pub enum EsiError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("http transport failed")]
    Transport(#[from] reqwest::Error),
    #[error("response decode failed")]
    Decode(#[from] serde_json::Error),
    #[error("store operation failed")]
    Store(#[from] farsight_store::StoreError),
    #[error("redirect listener failed")]
    Listener(#[from] std::io::Error),
    #[error("redirect did not contain a code parameter")]
    MissingCode,
    #[error("{endpoint} answered with status {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },
    #[error("token exchange response malformed: {0}")]
    TokenExchange(String),
    #[error("token refresh rejected: {0}")]
    Refresh(String),
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("{0}")]
    Message(String),
}

impl EsiError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    pub fn display_chain(&self) -> DisplayChainedError<'_> {
        DisplayChainedError { inner: self }
    }
}

pub struct DisplayChainedError<'a> {
    inner: &'a (dyn std::error::Error + 'static),
}

impl fmt::Debug for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self.inner);

        while let Some(err) = current {
            if first {
                first = false;
            } else {
                write!(f, " -> ")?;
            }

            write!(f, "{err}")?;
            current = err.source();
        }

        Ok(())
    }
}

impl fmt::Display for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
