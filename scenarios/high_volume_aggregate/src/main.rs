use loki_bench_runner::prelude::*;

/// Latency of successful metric queries at each hop of the read path, once the writers have
/// filled the store and stopped.
fn battery(ctx: &BatteryContext) -> Result<Battery, BenchError> {
    let ingester = ctx.job(Annotation::Ingester)?;
    let querier = ctx.job(Annotation::Querier)?;
    let query_frontend = ctx.job(Annotation::QueryFrontend)?;
    let range = ctx.range;

    Ok(BatteryBuilder::new()
        .read_path(request_duration_metrics(
            "HTTP aggregate query",
            &RequestFilter::http_query(query_frontend),
            range,
            Annotation::QueryFrontend,
        ))
        .read_path(request_duration_metrics(
            "HTTP aggregate query",
            &RequestFilter::http_query(querier),
            range,
            Annotation::Querier,
        ))
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
