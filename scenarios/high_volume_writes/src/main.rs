use loki_bench_runner::prelude::*;

/// Distributor and ingester write path under many generators, plus what the ingesters spend on it.
fn battery(ctx: &BatteryContext) -> Result<Battery, BenchError> {
    let distributor = ctx.job(Annotation::Distributor)?;
    let ingester = ctx.job(Annotation::Ingester)?;
    let range = ctx.range;

    Ok(BatteryBuilder::new()
        .write_path(ingestion_verification_metrics(
            ctx.generator,
            distributor,
            range,
        ))
        .write_path(http_request_metrics(
            RequestPath::Write,
            distributor,
            range,
            Annotation::Distributor,
        ))
        .write_path(grpc_request_metrics(
            RequestPath::Write,
            ingester,
            range,
            Annotation::Ingester,
        ))
        .write_path([boltdb_shipper_request_rate(
            RequestPath::Write,
            ingester,
            range,
        )])
        .resource_usage(resource_usage_metrics(
            ingester,
            range,
            Annotation::Ingester,
            ctx.cadvisor,
        ))
        .build())
}

fn main() -> LogBenchResult<()> {
    let builder = loki_scenario(env!("CARGO_PKG_NAME")).use_battery(battery);

    run(builder)?;

    Ok(())
}
