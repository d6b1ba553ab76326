//! Measurements that confirm the load generator is producing the configured volume. They describe
//! the harness rather than the system under test.

use crate::duration::PromDuration;
use crate::measurement::{
    Annotation, Measurement, Selector, Unit, BYTES_TO_GIGABYTES, BYTES_TO_MEGABYTES,
    SECONDS_PER_DAY,
};

/// Bytes received by the distributors, projected to gigabytes per day.
pub fn distributor_projected_bytes_received(job: &str, range: PromDuration) -> Measurement {
    Measurement::new(
        "Total Projected Bytes Received",
        format!(
            "sum(rate(loki_distributor_bytes_received_total{{{}}}[{range}])) / {BYTES_TO_GIGABYTES} * {SECONDS_PER_DAY}",
            Selector::job(job)
        ),
        Unit::GigabytesPerDay,
        Annotation::Distributor,
    )
}

/// Network transmit rate of the generator pods in megabytes per second. Pods are matched by the
/// `<generator>-` prefix that the deployment gives them.
pub fn generator_bytes_transmitted(generator: &str, range: PromDuration) -> Measurement {
    Measurement::new(
        "Total Bytes Transmitted",
        format!(
            r#"sum(rate(container_network_transmit_bytes_total{{pod=~"{generator}-.*"}}[{range}])) / {BYTES_TO_MEGABYTES}"#
        ),
        Unit::MegabytesPerSecond,
        Annotation::Generator,
    )
}

pub fn generator_projected_bytes_transmitted(generator: &str, range: PromDuration) -> Measurement {
    Measurement::new(
        "Total Projected Bytes Transmitted",
        format!(
            "sum(rate(container_network_transmit_bytes_total{{{}}}[{range}])) / {BYTES_TO_GIGABYTES} * {SECONDS_PER_DAY}",
            Selector::pod(generator)
        ),
        Unit::GigabytesPerDay,
        Annotation::Generator,
    )
}

pub fn ingestion_verification_metrics(
    generator: &str,
    distributor_job: &str,
    range: PromDuration,
) -> Vec<Measurement> {
    vec![
        generator_bytes_transmitted(generator, range),
        generator_projected_bytes_transmitted(generator, range),
        distributor_projected_bytes_received(distributor_job, range),
    ]
}
