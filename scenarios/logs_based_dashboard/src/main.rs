use loki_bench_runner::prelude::*;

/// Throughput and latency of the range queries a dashboard issues, once the writers have filled
/// the store and stopped.
fn battery(ctx: &BatteryContext) -> Result<Battery, BenchError> {
    let ingester = ctx.job(Annotation::Ingester)?;
    let querier = ctx.job(Annotation::Querier)?;
    let query_frontend = ctx.job(Annotation::QueryFrontend)?;
    let range = ctx.range;

    let mut builder = BatteryBuilder::new();
    for (job, annotation) in [
        (query_frontend, Annotation::QueryFrontend),
        (querier, Annotation::Querier),
    ] {
        builder = builder
            .read_path([request_rate(
                "HTTP Read Path",
                &RequestFilter::for_transport(job, Transport::Http, RequestPath::Read),
                range,
                annotation,
            )])
            .read_path(request_duration_metrics(
                "HTTP query range",
                &RequestFilter::http_query_range(job),
                range,
                annotation,
            ));
    }

    Ok(builder
        .read_path([
            request_rate(
                "gRPC Read Path",
                &RequestFilter::for_transport(ingester, Transport::Grpc, RequestPath::Read),
                range,
                Annotation::Ingester,
            ),
            boltdb_shipper_request_rate(RequestPath::Read, ingester, range),
        ])
        .read_path(request_duration_metrics(
            "gRPC query sample",
            &RequestFilter::grpc_query_sample(ingester),
            range,
            Annotation::Ingester,
        ))
        .build())
}

fn main() -> LogBenchResult<()> {
    let builder = loki_scenario(env!("CARGO_PKG_NAME")).use_battery(battery);

    run(builder)?;

    Ok(())
}
