//! Outgoing mail boundary.
//!
//! Delivery mechanics are out of scope; the outbox records what would be sent.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;

use stardust_purchasing::VendorNotice;

use crate::config::{ConfigParameters, SMTP_FROM_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub notice: VendorNotice,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("no SMTP sender configured")]
    NoSender,
    #[error("recipient has no email address")]
    NoRecipient,
    #[error("mail dispatch failed: {0}")]
    Dispatch(String),
}

pub trait MailDispatch: Send + Sync {
    fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Resolves the `From` address of outgoing mail.
pub trait SmtpSenderLookup: Send + Sync {
    fn sender_address(&self) -> Option<String>;
}

impl<S> MailDispatch for Arc<S>
where
    S: MailDispatch + ?Sized,
{
    fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        (**self).send(mail)
    }
}

impl<S> SmtpSenderLookup for Arc<S>
where
    S: SmtpSenderLookup + ?Sized,
{
    fn sender_address(&self) -> Option<String> {
        (**self).sender_address()
    }
}

/// Sender address read from the `mail.smtp_from` parameter.
pub struct ConfiguredSender<P> {
    params: P,
}

impl<P> ConfiguredSender<P> {
    pub fn new(params: P) -> Self {
        Self { params }
    }
}

impl<P: ConfigParameters> SmtpSenderLookup for ConfiguredSender<P> {
    fn sender_address(&self) -> Option<String> {
        self.params
            .get_param(SMTP_FROM_KEY)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Records every mail instead of delivering it.
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    sent: RwLock<Vec<OutgoingMail>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl MailDispatch for InMemoryOutbox {
    fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let mut sent = self
            .sent
            .write()
            .map_err(|_| MailError::Dispatch("outbox lock poisoned".to_string()))?;
        sent.push(mail);
        Ok(())
    }
}
