//! Request rate and latency measurements over the `loki_request_duration_seconds` histogram.

use crate::duration::PromDuration;
use crate::measurement::{
    quantile_literal, Annotation, Measurement, Selector, Unit, SECONDS_TO_MILLISECONDS,
};
use std::fmt::{Display, Formatter};

pub const HTTP_GET_METHOD: &str = "GET";
pub const HTTP_POST_METHOD: &str = "POST";
pub const HTTP_PUSH_ROUTE: &str = "loki_api_v1_push";
pub const HTTP_QUERY_ROUTE: &str = "loki_api_v1_query";
pub const HTTP_QUERY_RANGE_ROUTE: &str = "loki_api_v1_query_range";
pub const HTTP_READ_PATH_ROUTES: &str = "loki_api_v1_series|api_prom_series|api_prom_query|api_prom_label|api_prom_label_name_values|loki_api_v1_query|loki_api_v1_query_range|loki_api_v1_labels|loki_api_v1_label_name_values";

pub const GRPC_METHOD: &str = "gRPC";
pub const GRPC_PUSH_ROUTE: &str = "/logproto.Pusher/Push";
pub const GRPC_QUERY_SAMPLE_ROUTE: &str = "/logproto.Querier/QuerySample";
pub const GRPC_READ_PATH_ROUTES: &str = "/logproto.Querier/Query|/logproto.Querier/QuerySample|/logproto.Querier/Label|/logproto.Querier/Series|/logproto.Querier/GetChunkIDs";

pub const BOLTDB_SHIPPER_READ_OPERATION: &str = "Shipper.Query";
pub const BOLTDB_SHIPPER_WRITE_OPERATION: &str = "WRITE";

/// Successful responses, expressed as a regex class so that both transports share one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// `2.*`
    Http2xx,
    /// `success`
    GrpcSuccess,
}

impl Display for StatusClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusClass::Http2xx => f.write_str("2.*"),
            StatusClass::GrpcSuccess => f.write_str("success"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    Grpc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPath {
    Write,
    Read,
}

impl Transport {
    pub fn method(&self, path: RequestPath) -> &'static str {
        match (self, path) {
            (Transport::Http, RequestPath::Write) => HTTP_POST_METHOD,
            (Transport::Http, RequestPath::Read) => HTTP_GET_METHOD,
            (Transport::Grpc, _) => GRPC_METHOD,
        }
    }

    pub fn routes(&self, path: RequestPath) -> &'static str {
        match (self, path) {
            (Transport::Http, RequestPath::Write) => HTTP_PUSH_ROUTE,
            (Transport::Http, RequestPath::Read) => HTTP_READ_PATH_ROUTES,
            (Transport::Grpc, RequestPath::Write) => GRPC_PUSH_ROUTE,
            (Transport::Grpc, RequestPath::Read) => GRPC_READ_PATH_ROUTES,
        }
    }

    pub fn status_class(&self) -> StatusClass {
        match self {
            Transport::Http => StatusClass::Http2xx,
            Transport::Grpc => StatusClass::GrpcSuccess,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Transport::Http => "HTTP",
            Transport::Grpc => "gRPC",
        }
    }
}

impl Display for RequestPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPath::Write => f.write_str("Write Path"),
            RequestPath::Read => f.write_str("Read Path"),
        }
    }
}

/// The label matchers shared by every query over the request duration histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFilter {
    pub job: String,
    pub method: String,
    pub route: String,
    pub status: StatusClass,
}

impl RequestFilter {
    pub fn new(
        job: impl Into<String>,
        method: impl Into<String>,
        route: impl Into<String>,
        status: StatusClass,
    ) -> Self {
        Self {
            job: job.into(),
            method: method.into(),
            route: route.into(),
            status,
        }
    }

    pub fn for_transport(job: impl Into<String>, transport: Transport, path: RequestPath) -> Self {
        Self::new(
            job,
            transport.method(path),
            transport.routes(path),
            transport.status_class(),
        )
    }

    /// Successful instant queries over HTTP.
    pub fn http_query(job: impl Into<String>) -> Self {
        Self::new(job, HTTP_GET_METHOD, HTTP_QUERY_ROUTE, StatusClass::Http2xx)
    }

    /// Successful range queries over HTTP, as a dashboard issues them.
    pub fn http_query_range(job: impl Into<String>) -> Self {
        Self::new(job, HTTP_GET_METHOD, HTTP_QUERY_RANGE_ROUTE, StatusClass::Http2xx)
    }

    /// Successful metric query samples served by an ingester.
    pub fn grpc_query_sample(job: impl Into<String>) -> Self {
        Self::new(job, GRPC_METHOD, GRPC_QUERY_SAMPLE_ROUTE, StatusClass::GrpcSuccess)
    }

    fn matchers(&self, with_method: bool) -> String {
        let job = Selector::job(self.job.as_str());
        if with_method {
            format!(
                r#"{job}, method="{}", route=~"{}", status_code=~"{}""#,
                self.method, self.route, self.status
            )
        } else {
            format!(
                r#"{job}, route=~"{}", status_code=~"{}""#,
                self.route, self.status
            )
        }
    }
}

/// Requests per second. The method is not part of the selector so that every verb on the
/// matched routes is counted.
pub fn request_rate(
    name: &str,
    filter: &RequestFilter,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    Measurement::new(
        format!("{name} request rate"),
        format!(
            "sum(rate(loki_request_duration_seconds_count{{{}}}[{range}]))",
            filter.matchers(false)
        ),
        Unit::RequestsPerSecond,
        annotation,
    )
}

/// Mean request latency in milliseconds.
pub fn request_duration_average(
    name: &str,
    filter: &RequestFilter,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    let matchers = filter.matchers(true);
    let numerator = format!("sum(rate(loki_request_duration_seconds_sum{{{matchers}}}[{range}]))");
    let denominator =
        format!("sum(rate(loki_request_duration_seconds_count{{{matchers}}}[{range}]))");

    Measurement::new(
        format!("{name} request duration avg"),
        format!("({numerator} / {denominator}) * {SECONDS_TO_MILLISECONDS}"),
        Unit::Milliseconds,
        annotation,
    )
}

/// Latency percentile in milliseconds, grouped by job before the quantile is taken.
pub fn request_duration_quantile(
    name: &str,
    filter: &RequestFilter,
    percentile: u8,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    Measurement::new(
        format!("{name} request duration P{percentile}"),
        format!(
            "histogram_quantile({}, sum by (job, le) (rate(loki_request_duration_seconds_bucket{{{}}}[{range}]))) * {SECONDS_TO_MILLISECONDS}",
            quantile_literal(percentile),
            filter.matchers(true),
        ),
        Unit::Milliseconds,
        annotation,
    )
}

/// P99, P50 and average latency of the requests matched by `filter`.
pub fn request_duration_metrics(
    name: &str,
    filter: &RequestFilter,
    range: PromDuration,
    annotation: Annotation,
) -> Vec<Measurement> {
    vec![
        request_duration_quantile(name, filter, 99, range, annotation),
        request_duration_quantile(name, filter, 50, range, annotation),
        request_duration_average(name, filter, range, annotation),
    ]
}

/// Rate, average latency, P99 and P50 for one transport and request path of a component.
pub fn request_metrics(
    transport: Transport,
    path: RequestPath,
    job: &str,
    range: PromDuration,
    annotation: Annotation,
) -> Vec<Measurement> {
    let name = format!("{} {path}", transport.label());
    let filter = RequestFilter::for_transport(job, transport, path);

    vec![
        request_rate(&name, &filter, range, annotation),
        request_duration_average(&name, &filter, range, annotation),
        request_duration_quantile(&name, &filter, 99, range, annotation),
        request_duration_quantile(&name, &filter, 50, range, annotation),
    ]
}

pub fn http_request_metrics(
    path: RequestPath,
    job: &str,
    range: PromDuration,
    annotation: Annotation,
) -> Vec<Measurement> {
    request_metrics(Transport::Http, path, job, range, annotation)
}

pub fn grpc_request_metrics(
    path: RequestPath,
    job: &str,
    range: PromDuration,
    annotation: Annotation,
) -> Vec<Measurement> {
    request_metrics(Transport::Grpc, path, job, range, annotation)
}

/// Successful index shipper operations per second. Always attributed to the ingester.
pub fn boltdb_shipper_request_rate(
    path: RequestPath,
    job: &str,
    range: PromDuration,
) -> Measurement {
    let (name, operation) = match path {
        RequestPath::Write => (
            "BoltDB Shipper successful writes",
            BOLTDB_SHIPPER_WRITE_OPERATION,
        ),
        RequestPath::Read => (
            "BoltDB Shipper successful reads",
            BOLTDB_SHIPPER_READ_OPERATION,
        ),
    };

    Measurement::new(
        format!("{name} request rate"),
        format!(
            r#"sum(rate(loki_boltdb_shipper_request_duration_seconds_count{{{}, operation="{operation}", status_code=~"{}"}}[{range}]))"#,
            Selector::job(job),
            StatusClass::GrpcSuccess,
        ),
        Unit::RequestsPerSecond,
        Annotation::Ingester,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn five_minutes() -> PromDuration {
        PromDuration::new(Duration::from_secs(300))
    }

    #[test]
    fn http_write_path_queries() {
        let measurements = http_request_metrics(
            RequestPath::Write,
            "distributor",
            five_minutes(),
            Annotation::Distributor,
        );

        let names = measurements
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                "HTTP Write Path request rate",
                "HTTP Write Path request duration avg",
                "HTTP Write Path request duration P99",
                "HTTP Write Path request duration P50",
            ],
            names
        );

        assert_eq!(
            r#"sum(rate(loki_request_duration_seconds_count{job=~".*distributor.*", route=~"loki_api_v1_push", status_code=~"2.*"}[5m]))"#,
            measurements[0].query
        );
        assert_eq!(
            r#"(sum(rate(loki_request_duration_seconds_sum{job=~".*distributor.*", method="POST", route=~"loki_api_v1_push", status_code=~"2.*"}[5m])) / sum(rate(loki_request_duration_seconds_count{job=~".*distributor.*", method="POST", route=~"loki_api_v1_push", status_code=~"2.*"}[5m]))) * 1000"#,
            measurements[1].query
        );
        assert_eq!(
            r#"histogram_quantile(0.99, sum by (job, le) (rate(loki_request_duration_seconds_bucket{job=~".*distributor.*", method="POST", route=~"loki_api_v1_push", status_code=~"2.*"}[5m]))) * 1000"#,
            measurements[2].query
        );
        assert!(measurements
            .iter()
            .all(|m| m.annotation == Annotation::Distributor));
        assert_eq!(Unit::RequestsPerSecond, measurements[0].unit);
        assert_eq!(Unit::Milliseconds, measurements[3].unit);
    }

    #[test]
    fn grpc_read_path_uses_success_status() {
        let measurements = grpc_request_metrics(
            RequestPath::Read,
            "ingester",
            five_minutes(),
            Annotation::Ingester,
        );

        assert_eq!("gRPC Read Path request rate", measurements[0].name);
        assert!(measurements[1]
            .query
            .contains(r#"method="gRPC", route=~"/logproto.Querier/Query|"#));
        assert!(measurements
            .iter()
            .all(|m| m.query.contains(r#"status_code=~"success""#)));
    }

    #[test]
    fn boltdb_shipper_is_attributed_to_ingester() {
        let measurement = boltdb_shipper_request_rate(RequestPath::Read, "ingester", five_minutes());

        assert_eq!("BoltDB Shipper successful reads request rate", measurement.name);
        assert_eq!(
            r#"sum(rate(loki_boltdb_shipper_request_duration_seconds_count{job=~".*ingester.*", operation="Shipper.Query", status_code=~"success"}[5m]))"#,
            measurement.query
        );
        assert_eq!(Annotation::Ingester, measurement.annotation);
    }

    #[test]
    fn query_range_latency_only_counts_successful_gets() {
        let measurements = request_duration_metrics(
            "HTTP query range",
            &RequestFilter::http_query_range("query-frontend"),
            five_minutes(),
            Annotation::QueryFrontend,
        );

        let names = measurements
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                "HTTP query range request duration P99",
                "HTTP query range request duration P50",
                "HTTP query range request duration avg",
            ],
            names
        );
        assert_eq!(
            r#"histogram_quantile(0.50, sum by (job, le) (rate(loki_request_duration_seconds_bucket{job=~".*query-frontend.*", method="GET", route=~"loki_api_v1_query_range", status_code=~"2.*"}[5m]))) * 1000"#,
            measurements[1].query
        );
        assert!(measurements.iter().all(|m| m.unit == Unit::Milliseconds));
    }

    #[test]
    fn instant_and_sample_filters() {
        let instant = RequestFilter::http_query("querier");
        assert_eq!(HTTP_QUERY_ROUTE, instant.route);
        assert_eq!(StatusClass::Http2xx, instant.status);

        let sample = request_duration_average(
            "gRPC query sample",
            &RequestFilter::grpc_query_sample("ingester"),
            five_minutes(),
            Annotation::Ingester,
        );
        assert!(sample.query.contains(
            r#"method="gRPC", route=~"/logproto.Querier/QuerySample", status_code=~"success""#
        ));
    }

    #[test]
    fn identical_inputs_render_identical_queries() {
        let filter = RequestFilter::new("querier", "GET", HTTP_QUERY_RANGE_ROUTE, StatusClass::Http2xx);
        let first = request_duration_quantile("HTTP", &filter, 99, five_minutes(), Annotation::Querier);
        let second = request_duration_quantile("HTTP", &filter, 99, five_minutes(), Annotation::Querier);

        assert_eq!(first, second);
    }
}
