//! Plain-text rendering of the dashboard snapshot.

use sredash_domain::{ApplicationSnapshot, HealthState, MetricsSnapshot};

const HIGHLIGHTED_METRICS: [&str; 4] = [
    "up",
    "http_requests_total",
    "http_request_duration_seconds_count",
    "go_goroutines",
];

pub fn summary_lines(snapshot: &ApplicationSnapshot) -> Vec<String> {
    let mut lines = vec![
        format!("status:  {}", snapshot.health_status()),
        format!("probes:  {}", probe_line(&snapshot.health)),
    ];

    match &snapshot.version {
        Some(version) => lines.push(format!("version: {}", version.display_label())),
        None => lines.push("version: unknown".to_string()),
    }
    if let Some(environment) = &snapshot.environment {
        lines.push(format!("env:     {} keys", environment.len()));
    }
    if let Some(metrics) = &snapshot.metrics {
        lines.extend(metric_lines(metrics));
    }
    if let Some(error) = &snapshot.last_error {
        lines.push(format!("error:   {error}"));
    }
    lines
}

fn probe_line(health: &HealthState) -> String {
    format!(
        "health {}  ready {}  live {}",
        mark(health.healthy),
        mark(health.ready),
        mark(health.live)
    )
}

fn mark(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAIL" }
}

fn metric_lines(metrics: &MetricsSnapshot) -> Vec<String> {
    let mut lines = vec![format!(
        "metrics: {} families, {} samples",
        metrics.len(),
        metrics.sample_count()
    )];
    for name in HIGHLIGHTED_METRICS {
        if let Some(total) = metrics.sum(name) {
            lines.push(format!("  {name} = {total}"));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use sredash_domain::{VersionInfo, parse_metrics};

    #[test]
    fn test_summary_for_unknown_backend() {
        let lines = summary_lines(&ApplicationSnapshot::default());
        assert_eq!(
            lines,
            vec![
                "status:  unhealthy",
                "probes:  health FAIL  ready FAIL  live FAIL",
                "version: unknown",
            ]
        );
    }

    #[test]
    fn test_summary_with_metrics_and_error() {
        let snapshot = ApplicationSnapshot {
            version: Some(VersionInfo {
                version: "v1.2.3".into(),
                commit: "deadbeefcafe".into(),
                commit_short: "deadbee".into(),
                build_time: "2024-01-01T00:00:00Z".into(),
            }),
            health: HealthState::new(true, false, true),
            metrics: Some(parse_metrics(
                "up 1\nhttp_requests_total{code=\"200\"} 40\nhttp_requests_total{code=\"500\"} 2\n",
            )),
            last_error: Some("Request failed with status code 500".into()),
            ..ApplicationSnapshot::default()
        };

        let lines = summary_lines(&snapshot);
        assert_eq!(lines[0], "status:  not-ready");
        assert!(lines.contains(&"metrics: 2 families, 3 samples".to_string()));
        assert!(lines.contains(&"  up = 1".to_string()));
        assert!(lines.contains(&"  http_requests_total = 42".to_string()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("error:   Request failed with status code 500")
        );
    }
}
