//! # Metrics
//!
//! Prometheus metrics for monitoring Vault synchronization.
//!
//! ## Metrics Exposed
//!
//! - `vault_sync_vault_operations_total` - Vault HTTP operations by operation
//! - `vault_sync_vault_operation_duration_seconds` - Duration of Vault HTTP operations
//! - `vault_sync_vault_operation_errors_total` - Failed Vault HTTP operations by operation
//! - `vault_sync_merges_total` - Field merges by result (written, unchanged, failed)
//! - `vault_sync_fields_written_total` - Fields created or overwritten in Vault
//! - `vault_sync_authentications_total` - Login attempts by result

use anyhow::Result;
use prometheus::{HistogramVec, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static VAULT_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "vault_sync_vault_operations_total",
            "Total number of Vault operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create VAULT_OPERATIONS_TOTAL metric - this should never happen")
});

static VAULT_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "vault_sync_vault_operation_duration_seconds",
            "Duration of Vault operations in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create VAULT_OPERATION_DURATION metric - this should never happen")
});

static VAULT_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "vault_sync_vault_operation_errors_total",
            "Total number of failed Vault operations by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create VAULT_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static MERGES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "vault_sync_merges_total",
            "Total number of field merges by result",
        ),
        &["result"],
    )
    .expect("Failed to create MERGES_TOTAL metric - this should never happen")
});

static FIELDS_WRITTEN_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "vault_sync_fields_written_total",
        "Total number of fields created or overwritten in Vault",
    )
    .expect("Failed to create FIELDS_WRITTEN_TOTAL metric - this should never happen")
});

static AUTHENTICATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "vault_sync_authentications_total",
            "Total number of Vault login attempts by result",
        ),
        &["result"],
    )
    .expect("Failed to create AUTHENTICATIONS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry
///
/// # Errors
/// Fails if a metric is already registered.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(VAULT_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VAULT_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(VAULT_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MERGES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(FIELDS_WRITTEN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(AUTHENTICATIONS_TOTAL.clone()))?;

    Ok(())
}

/// Render all registered metrics in the Prometheus text format
///
/// # Errors
/// Fails if encoding fails.
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let mut buffer = Vec::new();
    prometheus::TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn increment_vault_operations(operation: &str) {
    VAULT_OPERATIONS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn observe_vault_operation_duration(operation: &str, duration: f64) {
    VAULT_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_vault_operation_errors(operation: &str) {
    VAULT_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

pub fn increment_merges(result: &str) {
    MERGES_TOTAL.with_label_values(&[result]).inc();
}

pub fn increment_fields_written(count: usize) {
    FIELDS_WRITTEN_TOTAL.inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

pub fn increment_authentications(result: &str) {
    AUTHENTICATIONS_TOTAL.with_label_values(&[result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_vault_operations() {
        let before = VAULT_OPERATIONS_TOTAL.with_label_values(&["read"]).get();
        increment_vault_operations("read");
        let after = VAULT_OPERATIONS_TOTAL.with_label_values(&["read"]).get();
        assert!(after > before);
    }

    #[test]
    fn test_increment_vault_operation_errors() {
        let before = VAULT_OPERATION_ERRORS_TOTAL
            .with_label_values(&["write"])
            .get();
        increment_vault_operation_errors("write");
        let after = VAULT_OPERATION_ERRORS_TOTAL
            .with_label_values(&["write"])
            .get();
        assert!(after > before);
    }

    #[test]
    fn test_observe_vault_operation_duration() {
        observe_vault_operation_duration("read", 0.2);
        // Histogram observation doesn't return a value
    }

    #[test]
    fn test_increment_fields_written() {
        let before = FIELDS_WRITTEN_TOTAL.get();
        increment_fields_written(3);
        let after = FIELDS_WRITTEN_TOTAL.get();
        assert!(after >= before + 3u64);
    }

    #[test]
    fn test_increment_merges_by_result() {
        let before = MERGES_TOTAL.with_label_values(&["unchanged"]).get();
        increment_merges("unchanged");
        let after = MERGES_TOTAL.with_label_values(&["unchanged"]).get();
        assert!(after > before);
    }

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        // Registration fails if another test registered first
        let _ = register_metrics();
        increment_authentications("success");

        let text = gather_text().unwrap();
        assert!(text.contains("vault_sync_authentications_total"));
    }
}
