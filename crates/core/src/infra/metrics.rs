use serde::Serialize;
use std::sync::Mutex;

use crate::domain::types::FailureKind;

/// 保持するレイテンシ記録の上限
const LATENCY_CAPACITY: usize = 1000;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    requests: u64,
    rewrites_succeeded: u64,
    replacements_verified: u64,
    clipboard_handoffs: u64,
    errors_validation: u64,
    errors_provider: u64,
    errors_malformed: u64,
    errors_transport: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（`GET /metrics` で返す）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub requests: u64,
    pub rewrites_succeeded: u64,
    pub replacements_verified: u64,
    pub clipboard_handoffs: u64,
    pub error_counts: ErrorCounts,
    pub avg_rewrite_latency_ms: Option<f64>,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub validation: u64,
    pub provider: u64,
    pub malformed_response: u64,
    pub transport: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    fn with_counters(&self, f: impl FnOnce(&mut MetricsCounters)) {
        // 毒化したロックでもカウンタは読み書きできる
        let mut c = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut c);
    }

    pub fn inc_requests(&self) {
        self.with_counters(|c| c.requests += 1);
    }

    pub fn inc_rewrites_succeeded(&self) {
        self.with_counters(|c| c.rewrites_succeeded += 1);
    }

    pub fn inc_replacements_verified(&self) {
        self.with_counters(|c| c.replacements_verified += 1);
    }

    pub fn inc_clipboard_handoffs(&self) {
        self.with_counters(|c| c.clipboard_handoffs += 1);
    }

    pub fn inc_failure(&self, kind: FailureKind) {
        self.with_counters(|c| match kind {
            FailureKind::ValidationError => c.errors_validation += 1,
            FailureKind::ProviderError => c.errors_provider += 1,
            FailureKind::MalformedResponse => c.errors_malformed += 1,
            FailureKind::TransportError => c.errors_transport += 1,
        });
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());
        latencies.push(record);
        if latencies.len() > LATENCY_CAPACITY {
            let excess = latencies.len() - LATENCY_CAPACITY;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let latencies = self.latencies.lock().unwrap_or_else(|e| e.into_inner());

        let rewrite: Vec<f64> = latencies
            .iter()
            .filter(|r| r.phase == "rewrite")
            .map(|r| r.duration_ms as f64)
            .collect();
        let avg_rewrite_latency_ms = if rewrite.is_empty() {
            None
        } else {
            Some(rewrite.iter().sum::<f64>() / rewrite.len() as f64)
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            requests: c.requests,
            rewrites_succeeded: c.rewrites_succeeded,
            replacements_verified: c.replacements_verified,
            clipboard_handoffs: c.clipboard_handoffs,
            error_counts: ErrorCounts {
                validation: c.errors_validation,
                provider: c.errors_provider,
                malformed_response: c.errors_malformed,
                transport: c.errors_transport,
            },
            avg_rewrite_latency_ms,
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
