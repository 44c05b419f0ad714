use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref EVALUATIONS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "evaluations_submitted_total",
        "Total number of topic evaluations submitted",
        &["passed"]
    )
    .unwrap();

    pub static ref ANSWERS_VERIFIED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_verified_total",
        "Total number of individual answers verified",
        &["correct"]
    )
    .unwrap();

    pub static ref CERTIFICATES_ISSUED_TOTAL: IntCounter = register_int_counter!(
        "certificates_issued_total",
        "Total number of certificates issued"
    )
    .unwrap();

    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "logins_total",
        "Total number of login attempts",
        &["status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
        let _ = EVALUATIONS_SUBMITTED_TOTAL
            .with_label_values(&["true"])
            .get();
    }

    #[test]
    fn render_metrics_contains_counters() {
        CERTIFICATES_ISSUED_TOTAL.inc();
        let output = render_metrics().unwrap();
        assert!(output.contains("certificates_issued_total"));
    }
}
