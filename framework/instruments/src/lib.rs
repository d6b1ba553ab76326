mod battery;
mod duration;
mod logql;
mod measurement;
mod name;
mod requests;
mod resources;
mod sink;
mod verification;

pub mod prelude {
    pub use crate::battery::{Battery, BatteryBuilder};
    pub use crate::duration::PromDuration;
    pub use crate::logql::{
        load_querier_metrics, processed_throughput_average, processed_throughput_quantile,
        query_latency_average, query_latency_quantile, query_metrics,
    };
    pub use crate::measurement::{
        Annotation, Measurement, Selector, Unit, BYTES_TO_GIGABYTES, BYTES_TO_MEGABYTES,
        CORES_TO_MILLICORES, SECONDS_PER_DAY, SECONDS_TO_MILLISECONDS,
    };
    pub use crate::name::{
        validate_scenario_description, RecordName, RecordNameError, RECORD_NAME_SEPARATOR,
    };
    pub use crate::requests::{
        boltdb_shipper_request_rate, grpc_request_metrics, http_request_metrics,
        request_duration_average, request_duration_metrics, request_duration_quantile,
        request_metrics, request_rate, RequestFilter, RequestPath, StatusClass, Transport,
    };
    pub use crate::resources::{
        container_cpu, container_memory_working_set, persistent_volume_used,
        resource_usage_metrics, volume_usage_metrics,
    };
    pub use crate::sink::{
        CsvSink, FanoutSink, InMemorySink, InfluxFileSink, MeasurementSink, SampleRecord,
    };
    pub use crate::verification::{
        distributor_projected_bytes_received, generator_bytes_transmitted,
        generator_projected_bytes_transmitted, ingestion_verification_metrics,
    };
}
