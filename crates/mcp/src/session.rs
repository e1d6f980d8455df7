//! Per-process session state shared by all handlers.

use std::fmt;
use tokio::sync::RwLock;

/// Credential sent with outbound calls.
#[derive(Clone, PartialEq, Eq)]
pub enum Token {
    /// Long-lived token supplied by the environment at startup.
    Access(String),
    /// Token issued by a login-style tool call.
    Issued(String),
}

impl Token {
    pub fn secret(&self) -> &str {
        match self {
            Token::Access(secret) | Token::Issued(secret) => secret,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Access(_) => f.write_str("Token::Access(<redacted>)"),
            Token::Issued(_) => f.write_str("Token::Issued(<redacted>)"),
        }
    }
}

/// Holder of the current token.
///
/// Reads take a shared lock. Changes go through [`Session::rotate`], which
/// keeps the write lock for the whole exchange so two racing logins cannot
/// overwrite each other's result.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<Token>>,
}

impl Session {
    pub fn new(token: Option<Token>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// Snapshot of the current token.
    pub async fn token(&self) -> Option<Token> {
        self.token.read().await.clone()
    }

    /// Run `exchange` with the current token and store the token it returns.
    ///
    /// On error the stored token is left untouched. Must not be called from
    /// inside `exchange` or through [`Session::token`] while it runs.
    pub async fn rotate<F, Fut, T, E>(&self, exchange: F) -> Result<T, E>
    where
        F: FnOnce(Option<Token>) -> Fut,
        Fut: Future<Output = Result<(Option<Token>, T), E>>,
    {
        let mut guard = self.token.write().await;
        let (next, output) = exchange(guard.clone()).await?;
        *guard = next;
        Ok(output)
    }

    /// Replace the token, returning the previous one.
    pub async fn replace(&self, token: Option<Token>) -> Option<Token> {
        std::mem::replace(&mut *self.token.write().await, token)
    }
}
