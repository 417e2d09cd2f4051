//! Registry configuration

use std::time::Duration;

use super::conduit::DeliveryPolicy;

/// Configuration for the connection registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Messages buffered per conduit before the delivery policy applies
    pub conduit_capacity: usize,

    /// Behaviour when a conduit's buffer is full
    pub delivery_policy: DeliveryPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            conduit_capacity: 64,
            delivery_policy: DeliveryPolicy::DropNewest,
        }
    }
}

impl RegistryConfig {
    /// Set the per-conduit buffer size (minimum 1)
    pub fn conduit_capacity(mut self, capacity: usize) -> Self {
        self.conduit_capacity = capacity.max(1);
        self
    }

    /// Set the delivery policy
    pub fn delivery_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery_policy = policy;
        self
    }

    /// Wait up to `timeout` for buffer space instead of dropping immediately
    pub fn delivery_timeout(self, timeout: Duration) -> Self {
        self.delivery_policy(DeliveryPolicy::BoundedWait(timeout))
    }
}
