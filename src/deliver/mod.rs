//! Lead delivery fan-out.
//!
//! Once a submission clears validation and verification it is handed to two
//! independent channels at the same time: email dispatch and row storage. The
//! fan-out is a join, not a race: both channels run to completion and report
//! individually, and the submission counts as delivered when at least one
//! channel accepted it.

pub mod email;
pub mod storage;

use async_trait::async_trait;
use serde::Serialize;

use crate::lead::{Lead, SubmissionContext};

pub use email::EmailChannel;
pub use storage::StorageChannel;

/// Per-channel delivery outcome.
///
/// `skipped` means the channel's configuration is absent, which is not a
/// processing error; `reason` carries the skip or failure explanation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelResult {
    pub ok: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChannelResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            skipped: false,
            reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            skipped: true,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            skipped: false,
            reason: Some(reason.into()),
        }
    }
}

/// An external system that can independently record a lead.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Short channel name for logs.
    fn name(&self) -> &'static str;

    /// Attempt delivery. Never errors: failures are folded into the result.
    async fn deliver(&self, lead: &Lead, ctx: &SubmissionContext) -> ChannelResult;
}

/// Combined outcome of the delivery fan-out.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub email: ChannelResult,
    pub storage: ChannelResult,
}

impl DeliveryReport {
    /// Overall success: at least one channel accepted the lead.
    pub fn delivered(&self) -> bool {
        self.email.ok || self.storage.ok
    }
}

/// Run both channels concurrently and wait for both to finish.
pub async fn deliver_all(
    email: &dyn DeliveryChannel,
    storage: &dyn DeliveryChannel,
    lead: &Lead,
    ctx: &SubmissionContext,
) -> DeliveryReport {
    let (email_result, storage_result) =
        tokio::join!(email.deliver(lead, ctx), storage.deliver(lead, ctx));

    for (channel, result) in [(email.name(), &email_result), (storage.name(), &storage_result)] {
        if result.ok {
            tracing::info!(channel, lead_type = lead.type_name(), "Lead delivered");
        } else if result.skipped {
            tracing::debug!(channel, reason = ?result.reason, "Delivery channel not configured");
        } else {
            tracing::warn!(channel, reason = ?result.reason, "Delivery channel failed");
        }
    }

    DeliveryReport {
        email: email_result,
        storage: storage_result,
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ChannelResult);

    #[async_trait]
    impl DeliveryChannel for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn deliver(&self, _lead: &Lead, _ctx: &SubmissionContext) -> ChannelResult {
            self.0.clone()
        }
    }

    fn sample_lead() -> Lead {
        Lead::Contact {
            name: "Jane".into(),
            business_name: "Acme".into(),
            email: "jane@acme.com".into(),
            message: "Hi".into(),
        }
    }

    fn sample_ctx() -> SubmissionContext {
        SubmissionContext {
            page_url: "https://example.com".into(),
            referrer: None,
            user_agent: "test".into(),
            attribution: None,
            ip: "1.2.3.4".into(),
        }
    }

    #[tokio::test]
    async fn one_successful_channel_means_delivered() {
        let report = deliver_all(
            &Fixed(ChannelResult::failed("email down")),
            &Fixed(ChannelResult::success()),
            &sample_lead(),
            &sample_ctx(),
        )
        .await;
        assert!(report.delivered());
        assert!(!report.email.ok);
        assert!(report.storage.ok);
    }

    #[tokio::test]
    async fn skipped_channels_do_not_count_as_delivered() {
        let report = deliver_all(
            &Fixed(ChannelResult::skipped("no api key")),
            &Fixed(ChannelResult::skipped("no database")),
            &sample_lead(),
            &sample_ctx(),
        )
        .await;
        assert!(!report.delivered());
        assert!(report.email.skipped);
        assert!(report.storage.skipped);
    }
}
