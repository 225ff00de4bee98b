//! One-time-password phone verification for lead capture.
//!
//! Codes are six digits, stored only as a SHA-256 hash keyed by the
//! normalized phone number, and consumed on successful verification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::time::Instant;

use crate::rate_limit::SlidingWindowLimiter;

/// Wrong guesses allowed before a code is burned.
pub const MAX_VERIFY_ATTEMPTS: u32 = 5;

/// Stored codes above which expired entries are swept.
const SWEEP_THRESHOLD: usize = 500;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Enter a valid 10-digit Indian mobile number")]
    InvalidPhone,
    #[error("Too many OTP requests, please try again later")]
    RateLimited,
    #[error("Incorrect OTP")]
    InvalidCode,
    #[error("OTP expired or was never requested")]
    Expired,
    #[error("Too many incorrect attempts, please request a new OTP")]
    TooManyAttempts,
    #[error("Could not deliver OTP: {0}")]
    Delivery(String),
}

/// Normalize user input to `+91XXXXXXXXXX`.
///
/// Accepts a 10-digit mobile number starting with 6-9, optionally prefixed
/// with `91`, `+91` or a trunk `0`. Separators are ignored.
pub fn normalize_phone(raw: &str) -> Result<String, OtpError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return Err(OtpError::InvalidPhone),
    };
    match national.as_bytes().first() {
        Some(b'6'..=b'9') => Ok(format!("+91{}", national)),
        _ => Err(OtpError::InvalidPhone),
    }
}

/// `+91******3210`
pub fn mask_phone(phone: &str) -> String {
    let tail_start = phone.len().saturating_sub(4);
    let head_end = phone.len().min(3).min(tail_start);
    match (phone.get(..head_end), phone.get(tail_start..)) {
        (Some(head), Some(tail)) => format!("{}{}{}", head, "*".repeat(tail_start - head_end), tail),
        _ => "****".to_string(),
    }
}

fn hash_code(phone: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phone.as_bytes());
    hasher.update(b":");
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct OtpEntry {
    code_hash: String,
    expires_at: Instant,
    attempts: u32,
}

/// Outstanding codes, one per phone.
pub struct OtpStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a fresh code for `phone`, replacing any outstanding one.
    pub fn issue(&self, phone: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        self.insert(phone, &code);
        code
    }

    fn insert(&self, phone: &str, code: &str) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() > SWEEP_THRESHOLD {
            entries.retain(|_, entry| entry.expires_at > now);
        }
        entries.insert(
            phone.to_string(),
            OtpEntry {
                code_hash: hash_code(phone, code),
                expires_at: now + self.ttl,
                attempts: 0,
            },
        );
    }

    /// Drop the outstanding code for `phone`, if any.
    pub fn revoke(&self, phone: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(phone);
    }

    /// Check `code` against the outstanding code for `phone`.
    ///
    /// A match consumes the code. Each mismatch counts as an attempt and the
    /// code is burned on the last allowed one.
    pub fn verify(&self, phone: &str, code: &str) -> Result<(), OtpError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(entry) = entries.get_mut(phone) else {
            return Err(OtpError::Expired);
        };

        if entry.expires_at <= Instant::now() {
            entries.remove(phone);
            return Err(OtpError::Expired);
        }

        if entry.code_hash == hash_code(phone, code.trim()) {
            entries.remove(phone);
            return Ok(());
        }

        entry.attempts += 1;
        if entry.attempts >= MAX_VERIFY_ATTEMPTS {
            entries.remove(phone);
            return Err(OtpError::TooManyAttempts);
        }
        Err(OtpError::InvalidCode)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Delivers OTP messages to a phone.
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<(), OtpError>;
}

/// Development sender: logs that a code went out, never the code itself.
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, phone: &str, _message: &str) -> Result<(), OtpError> {
        tracing::info!("OTP sent to {} (log sender)", mask_phone(phone));
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    message: &'a str,
}

/// POSTs `{to, message}` to an SMS gateway webhook.
pub struct WebhookOtpSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookOtpSender {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OtpSender for WebhookOtpSender {
    async fn send(&self, phone: &str, message: &str) -> Result<(), OtpError> {
        self.client
            .post(&self.url)
            .json(&WebhookPayload { to: phone, message })
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| {
                tracing::warn!("SMS webhook failed for {}: {}", mask_phone(phone), e);
                OtpError::Delivery(e.without_url().to_string())
            })?;
        tracing::info!("OTP sent to {}", mask_phone(phone));
        Ok(())
    }
}

/// Send/verify flow over the store, the per-phone send limiter and a sender.
pub struct OtpService {
    store: OtpStore,
    limiter: SlidingWindowLimiter,
    sender: Arc<dyn OtpSender>,
}

impl OtpService {
    pub fn new(store: OtpStore, limiter: SlidingWindowLimiter, sender: Arc<dyn OtpSender>) -> Self {
        Self {
            store,
            limiter,
            sender,
        }
    }

    /// Issue and deliver a code. Returns how long the code stays valid.
    pub async fn send_code(&self, raw_phone: &str) -> Result<Duration, OtpError> {
        let phone = normalize_phone(raw_phone)?;
        if !self.limiter.check(&phone) {
            tracing::debug!("OTP send rate limited for {}", mask_phone(&phone));
            return Err(OtpError::RateLimited);
        }

        let code = self.store.issue(&phone);
        let message = format!(
            "{} is your TradeDesk verification code. It is valid for {} minutes.",
            code,
            (self.store.ttl().as_secs() / 60).max(1)
        );
        if let Err(e) = self.sender.send(&phone, &message).await {
            self.store.revoke(&phone);
            return Err(e);
        }
        Ok(self.store.ttl())
    }

    pub async fn verify_code(&self, raw_phone: &str, code: &str) -> Result<(), OtpError> {
        let phone = normalize_phone(raw_phone)?;
        let result = self.store.verify(&phone, code);
        match &result {
            Ok(()) => tracing::info!("Phone {} verified", mask_phone(&phone)),
            Err(e) => tracing::debug!("OTP verify for {} failed: {}", mask_phone(&phone), e),
        }
        result
    }
}
