//! LogQL query statistics, as reported by the components that execute queries.

use crate::duration::PromDuration;
use crate::measurement::{
    quantile_literal, Annotation, Measurement, Unit, BYTES_TO_MEGABYTES, SECONDS_TO_MILLISECONDS,
};
use crate::requests::StatusClass;

/// `pod=~"<pod>.*", status_code=~"<status>"`. Pods are matched by prefix.
fn querystats_matchers(pod: &str, status: StatusClass) -> String {
    format!(r#"pod=~"{pod}.*", status_code=~"{status}""#)
}

pub fn query_latency_average(
    pod: &str,
    status: StatusClass,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    let matchers = querystats_matchers(pod, status);
    let numerator =
        format!("sum(rate(loki_logql_querystats_latency_seconds_sum{{{matchers}}}[{range}]))");
    let denominator =
        format!("sum(rate(loki_logql_querystats_latency_seconds_count{{{matchers}}}[{range}]))");

    Measurement::new(
        "LogQL query latency avg",
        format!("({numerator} / {denominator}) * {SECONDS_TO_MILLISECONDS}"),
        Unit::Milliseconds,
        annotation,
    )
}

pub fn query_latency_quantile(
    pod: &str,
    status: StatusClass,
    percentile: u8,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    Measurement::new(
        format!("LogQL query latency P{percentile}"),
        format!(
            "histogram_quantile({}, sum by (job, le) (rate(loki_logql_querystats_latency_seconds_bucket{{{}}}[{range}]))) * {SECONDS_TO_MILLISECONDS}",
            quantile_literal(percentile),
            querystats_matchers(pod, status),
        ),
        Unit::Milliseconds,
        annotation,
    )
}

pub fn processed_throughput_average(
    pod: &str,
    status: StatusClass,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    let matchers = querystats_matchers(pod, status);
    let numerator = format!(
        "sum(rate(loki_logql_querystats_bytes_processed_per_seconds_sum{{{matchers}}}[{range}]))"
    );
    let denominator = format!(
        "sum(rate(loki_logql_querystats_bytes_processed_per_seconds_count{{{matchers}}}[{range}]))"
    );

    Measurement::new(
        "LogQL query MBps processed avg",
        format!("({numerator} / {denominator}) / {BYTES_TO_MEGABYTES}"),
        Unit::MegabytesPerSecond,
        annotation,
    )
}

pub fn processed_throughput_quantile(
    pod: &str,
    status: StatusClass,
    percentile: u8,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    Measurement::new(
        format!("LogQL query MBps processed P{percentile}"),
        format!(
            "histogram_quantile({}, sum by (job, le) (rate(loki_logql_querystats_bytes_processed_per_seconds_bucket{{{}}}[{range}]))) / {BYTES_TO_MEGABYTES}",
            quantile_literal(percentile),
            querystats_matchers(pod, status),
        ),
        Unit::MegabytesPerSecond,
        annotation,
    )
}

/// Latency and processed throughput (average, P99, P50) of successful queries on a component.
pub fn query_metrics(pod: &str, range: PromDuration, annotation: Annotation) -> Vec<Measurement> {
    let status = StatusClass::Http2xx;
    vec![
        query_latency_average(pod, status, range, annotation),
        query_latency_quantile(pod, status, 99, range, annotation),
        query_latency_quantile(pod, status, 50, range, annotation),
        processed_throughput_average(pod, status, range, annotation),
        processed_throughput_quantile(pod, status, 99, range, annotation),
        processed_throughput_quantile(pod, status, 50, range, annotation),
    ]
}

/// Query rate and duration seen by the load queriers themselves, across every component.
pub fn load_querier_metrics(range: PromDuration) -> Vec<Measurement> {
    let numerator = format!("sum(rate(logql_query_duration_seconds_sum[{range}]))");
    let denominator = format!("sum(rate(logql_query_duration_seconds_count[{range}]))");

    let mut measurements = vec![
        Measurement::new(
            "LogQL query rate",
            format!("sum(rate(logql_query_duration_seconds_count[{range}]))"),
            Unit::QueriesPerSecond,
            Annotation::Logql,
        ),
        Measurement::new(
            "LogQL query duration avg",
            format!("({numerator} / {denominator}) * {SECONDS_TO_MILLISECONDS}"),
            Unit::Milliseconds,
            Annotation::Logql,
        ),
    ];

    for percentile in [99, 50] {
        measurements.push(Measurement::new(
            format!("LogQL query duration P{percentile}"),
            format!(
                "histogram_quantile({}, sum by (le) (rate(logql_query_duration_seconds_bucket[{range}]))) * {SECONDS_TO_MILLISECONDS}",
                quantile_literal(percentile),
            ),
            Unit::Milliseconds,
            Annotation::Logql,
        ));
    }

    measurements
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn query_metrics_for_query_frontend() {
        let measurements = query_metrics(
            "query-frontend",
            PromDuration::new(Duration::from_secs(60)),
            Annotation::QueryFrontend,
        );

        assert_eq!(6, measurements.len());
        assert_eq!(
            r#"(sum(rate(loki_logql_querystats_latency_seconds_sum{pod=~"query-frontend.*", status_code=~"2.*"}[1m])) / sum(rate(loki_logql_querystats_latency_seconds_count{pod=~"query-frontend.*", status_code=~"2.*"}[1m]))) * 1000"#,
            measurements[0].query
        );
        assert_eq!("LogQL query MBps processed P99", measurements[4].name);
        assert_eq!(
            r#"histogram_quantile(0.99, sum by (job, le) (rate(loki_logql_querystats_bytes_processed_per_seconds_bucket{pod=~"query-frontend.*", status_code=~"2.*"}[1m]))) / 1000000"#,
            measurements[4].query
        );
        assert_eq!(Unit::MegabytesPerSecond, measurements[5].unit);
    }

    #[test]
    fn load_querier_metrics_are_logql_annotated() {
        let measurements = load_querier_metrics(PromDuration::new(Duration::from_secs(300)));

        assert_eq!(
            vec![
                "LogQL query rate",
                "LogQL query duration avg",
                "LogQL query duration P99",
                "LogQL query duration P50"
            ],
            measurements
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
        );
        assert!(measurements
            .iter()
            .all(|m| m.annotation == Annotation::Logql));
    }
}
