use loki_bench_runner::prelude::*;

fn battery(ctx: &BatteryContext) -> Result<Battery, BenchError> {
    let ingester = ctx.job(Annotation::Ingester)?;
    let querier = ctx.job(Annotation::Querier)?;
    let query_frontend = ctx.job(Annotation::QueryFrontend)?;
    let range = ctx.range;

    Ok(BatteryBuilder::new()
        .read_path(http_request_metrics(
            RequestPath::Read,
            query_frontend,
            range,
            Annotation::QueryFrontend,
        ))
        .read_path(http_request_metrics(
            RequestPath::Read,
            querier,
            range,
            Annotation::Querier,
        ))
        .read_path(grpc_request_metrics(
            RequestPath::Read,
            ingester,
            range,
            Annotation::Ingester,
        ))
        .read_path([boltdb_shipper_request_rate(
            RequestPath::Read,
            ingester,
            range,
        )])
        .resource_usage(resource_usage_metrics(
            querier,
            range,
            Annotation::Querier,
            ctx.cadvisor,
        ))
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn read_path_then_resources() {
        let jobs = Jobs {
            ingester: Some("loki-ingester".to_string()),
            querier: Some("loki-querier".to_string()),
            query_frontend: Some("loki-query-frontend".to_string()),
            ..Default::default()
        };
        let ctx = BatteryContext {
            jobs: &jobs,
            range: PromDuration::new(Duration::from_secs(120)),
            generator: "logbench-generator",
            cadvisor: true,
        };

        let battery = battery(&ctx).unwrap();

        assert_eq!(17, battery.len());
        assert_eq!(
            "HTTP Read Path request rate",
            battery.measurements()[0].name
        );
        let units = battery
            .iter()
            .skip(13)
            .map(|m| m.unit)
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                Unit::Millicores,
                Unit::Gigabytes,
                Unit::Millicores,
                Unit::Gigabytes
            ],
            units
        );
    }
}
