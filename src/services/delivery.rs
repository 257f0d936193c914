// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound notification delivery.

use async_trait::async_trait;

/// Sends a notice to a user over an external channel.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;

    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Records delivery intent in the log without contacting any provider.
#[derive(Debug, Default, Clone)]
pub struct LogDelivery;

#[async_trait]
impl DeliveryChannel for LogDelivery {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(
            channel = "email",
            to,
            subject,
            body_len = body.len(),
            "Notification delivery"
        );
        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(channel = "sms", to, body_len = body.len(), "Notification delivery");
        Ok(())
    }
}
