use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Middleware collecting HTTP metrics (latency, request count).
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Normalize URL path to avoid cardinality explosion.
/// Replaces ObjectIds, topic numbers and certificate codes with placeholders.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut normalized = Vec::new();

    for segment in segments {
        if is_object_id_like(segment) || is_numeric_id(segment) {
            normalized.push("{id}");
        } else if is_certificate_code(segment) {
            normalized.push("{code}");
        } else {
            normalized.push(segment);
        }
    }

    normalized.join("/")
}

/// Check if string looks like a MongoDB ObjectId (24 hex characters)
fn is_object_id_like(s: &str) -> bool {
    s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Check if string is a numeric ID (topic numbers, pagination segments)
fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Check if string looks like a certificate code (CERT-YYYY-XXXXXX)
fn is_certificate_code(s: &str) -> bool {
    s.starts_with("CERT-") && s.len() >= 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_object_ids_and_topics() {
        assert_eq!(
            normalize_path("/admin/users/507f1f77bcf86cd799439011"),
            "/admin/users/{id}"
        );
        assert_eq!(
            normalize_path("/api/v1/questions/topic/2"),
            "/api/v1/questions/topic/{id}"
        );
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn normalizes_certificate_codes() {
        assert_eq!(
            normalize_path("/api/v1/certificates/verify/CERT-2026-A1B2C3"),
            "/api/v1/certificates/verify/{code}"
        );
    }

    #[test]
    fn object_id_detection() {
        assert!(is_object_id_like("507f1f77bcf86cd799439011"));
        assert!(!is_object_id_like("not-an-id"));
        assert!(!is_object_id_like("12345"));
    }

    #[test]
    fn numeric_id_detection() {
        assert!(is_numeric_id("1"));
        assert!(is_numeric_id("999999"));
        assert!(!is_numeric_id("abc"));
        assert!(!is_numeric_id(""));
    }
}
