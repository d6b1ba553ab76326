//! Resource usage of a component's pods. Requires cAdvisor and kubelet metrics in Prometheus.

use crate::duration::PromDuration;
use crate::measurement::{
    Annotation, Measurement, Selector, Unit, BYTES_TO_GIGABYTES, CORES_TO_MILLICORES,
};

pub fn container_cpu(job: &str, range: PromDuration, annotation: Annotation) -> Measurement {
    Measurement::new(
        "Container CPU Usage",
        format!(
            "sum(avg_over_time(pod:container_cpu_usage:sum{{{}}}[{range}])) * {CORES_TO_MILLICORES}",
            Selector::pod(job)
        ),
        Unit::Millicores,
        annotation,
    )
}

/// Working set memory of the pod cgroup. The `container=""` matcher avoids double counting the
/// per-container series.
pub fn container_memory_working_set(
    job: &str,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    Measurement::new(
        "Container WorkingSet Memory",
        format!(
            r#"sum(avg_over_time(container_memory_working_set_bytes{{{}, container=""}}[{range}]) / {BYTES_TO_GIGABYTES})"#,
            Selector::pod(job)
        ),
        Unit::Gigabytes,
        annotation,
    )
}

pub fn persistent_volume_used(
    job: &str,
    range: PromDuration,
    annotation: Annotation,
) -> Measurement {
    Measurement::new(
        "Persistent Volume Used Bytes",
        format!(
            "sum(avg_over_time(kubelet_volume_stats_used_bytes{{{}}}[{range}]) / {BYTES_TO_GIGABYTES})",
            Selector::persistent_volume_claim(job)
        ),
        Unit::Gigabytes,
        annotation,
    )
}

/// CPU, plus working set memory when cAdvisor metrics are available.
pub fn resource_usage_metrics(
    job: &str,
    range: PromDuration,
    annotation: Annotation,
    include_memory: bool,
) -> Vec<Measurement> {
    let mut measurements = vec![container_cpu(job, range, annotation)];
    if include_memory {
        measurements.push(container_memory_working_set(job, range, annotation));
    }
    measurements
}

pub fn volume_usage_metrics(
    job: &str,
    range: PromDuration,
    annotation: Annotation,
) -> Vec<Measurement> {
    vec![persistent_volume_used(job, range, annotation)]
}
