// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Outbound email delivery

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors from the mail provider
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail provider error: {0}")]
    Provider(String),
}

/// Abstract outbound email send
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// A recorded outbound email
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that records sends instead of delivering
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded sends
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

/// Mailer that drops everything; for runs without a provider configured
#[derive(Clone, Default)]
pub struct NoOpMailer;

#[async_trait]
impl Mailer for NoOpMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "email send skipped, no provider configured");
        Ok(())
    }
}
