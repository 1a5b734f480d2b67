//! Metrics reporting for connection pools

/// Receiver for the pool's three instruments.
///
/// Implementations must be cheap; the retrieval counter is bumped on the
/// hot path.
pub trait MetricsSink: Send + Sync {
    /// Number of connections currently pooled, reported once per probe
    fn set_connections(&self, count: usize);

    /// A connect attempt failed or a pooled connection was found unhealthy
    fn inc_connection_errors(&self);

    /// A connection was handed out by `next` or `ex_next`
    fn inc_retrievals(&self);
}

#[cfg(feature = "metrics")]
pub use self::prometheus_sink::PrometheusMetrics;

#[cfg(feature = "metrics")]
mod prometheus_sink {
    use super::MetricsSink;
    use prometheus::{IntCounter, IntGauge, Registry};

    /// Prometheus-backed metrics sink.
    ///
    /// Each instrument is optional; missing ones are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_connectionpool::{MetricsSink, PrometheusMetrics};
    /// use prometheus::Registry;
    ///
    /// let registry = Registry::new();
    /// let metrics = PrometheusMetrics::register(&registry, "db_pool").unwrap();
    ///
    /// metrics.set_connections(4);
    /// metrics.inc_retrievals();
    ///
    /// let names: Vec<String> = registry
    ///     .gather()
    ///     .iter()
    ///     .map(|family| family.get_name().to_string())
    ///     .collect();
    /// assert!(names.contains(&"db_pool_connections".to_string()));
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct PrometheusMetrics {
        /// Connections currently in the pool
        pub connections: Option<IntGauge>,

        /// Failed connects and unhealthy evictions
        pub connection_errors: Option<IntCounter>,

        /// Connections retrieved from the pool
        pub retrievals: Option<IntCounter>,
    }

    impl PrometheusMetrics {
        /// Create all three instruments under `prefix` and register them
        pub fn register(registry: &Registry, prefix: &str) -> prometheus::Result<Self> {
            let connections = IntGauge::new(
                format!("{prefix}_connections"),
                "Number of connections currently in the pool",
            )?;
            let connection_errors = IntCounter::new(
                format!("{prefix}_connection_errors_total"),
                "Failed connection attempts and unhealthy evictions",
            )?;
            let retrievals = IntCounter::new(
                format!("{prefix}_retrievals_total"),
                "Connections retrieved from the pool",
            )?;

            registry.register(Box::new(connections.clone()))?;
            registry.register(Box::new(connection_errors.clone()))?;
            registry.register(Box::new(retrievals.clone()))?;

            Ok(Self {
                connections: Some(connections),
                connection_errors: Some(connection_errors),
                retrievals: Some(retrievals),
            })
        }
    }

    impl MetricsSink for PrometheusMetrics {
        fn set_connections(&self, count: usize) {
            if let Some(ref gauge) = self.connections {
                gauge.set(i64::try_from(count).unwrap_or(i64::MAX));
            }
        }

        fn inc_connection_errors(&self) {
            if let Some(ref counter) = self.connection_errors {
                counter.inc();
            }
        }

        fn inc_retrievals(&self) {
            if let Some(ref counter) = self.retrievals {
                counter.inc();
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::MetricsSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct CountingMetrics {
        pub connections: AtomicUsize,
        pub connection_errors: AtomicUsize,
        pub retrievals: AtomicUsize,
    }

    impl CountingMetrics {
        pub fn errors(&self) -> usize {
            self.connection_errors.load(Ordering::SeqCst)
        }

        pub fn retrievals(&self) -> usize {
            self.retrievals.load(Ordering::SeqCst)
        }
    }

    impl MetricsSink for CountingMetrics {
        fn set_connections(&self, count: usize) {
            self.connections.store(count, Ordering::SeqCst);
        }

        fn inc_connection_errors(&self) {
            self.connection_errors.fetch_add(1, Ordering::SeqCst);
        }

        fn inc_retrievals(&self) {
            self.retrievals.fetch_add(1, Ordering::SeqCst);
        }
    }
}
