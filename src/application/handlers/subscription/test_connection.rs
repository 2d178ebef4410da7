//! TestConnectionHandler - processor connectivity check.

use std::sync::Arc;

use crate::domain::subscription::BillingError;
use crate::ports::PaymentProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConnectionResult {
    pub livemode: bool,
    /// First characters of the API key in use.
    pub key_prefix: String,
}

pub struct TestConnectionHandler {
    payment_provider: Arc<dyn PaymentProvider>,
    key_prefix: String,
}

impl TestConnectionHandler {
    pub fn new(payment_provider: Arc<dyn PaymentProvider>, key_prefix: impl Into<String>) -> Self {
        Self {
            payment_provider,
            key_prefix: key_prefix.into(),
        }
    }

    pub async fn handle(&self) -> Result<TestConnectionResult, BillingError> {
        let check = self.payment_provider.check_connection().await.map_err(|e| {
            tracing::error!(error = %e, "Stripe connection test failed");
            BillingError::payment_provider(e.message)
        })?;

        Ok(TestConnectionResult {
            livemode: check.livemode,
            key_prefix: self.key_prefix.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::ports::PaymentError;

    #[tokio::test]
    async fn reports_mode_and_prefix() {
        let provider = MockPaymentProvider::new();
        let handler = TestConnectionHandler::new(Arc::new(provider), "sk_test_...");

        let result = handler.handle().await.unwrap();

        assert!(!result.livemode);
        assert_eq!(result.key_prefix, "sk_test_...");
    }

    #[tokio::test]
    async fn provider_failure_is_reported() {
        let provider = MockPaymentProvider::new();
        provider.set_method_error("check_connection", PaymentError::network("dns"));
        let handler = TestConnectionHandler::new(Arc::new(provider), "sk_test_...");

        assert!(matches!(
            handler.handle().await.unwrap_err(),
            BillingError::PaymentProvider(_)
        ));
    }
}
