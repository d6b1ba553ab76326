use loki_bench_runner::prelude::*;

/// Write path throughput and latency, checked against what the generators claim to have sent.
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
        .resource_usage(volume_usage_metrics(ingester, range, Annotation::Ingester))
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

    fn jobs() -> Jobs {
        Jobs {
            distributor: Some("loki-distributor".to_string()),
            ingester: Some("loki-ingester".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn verification_comes_first_and_resources_last() {
        let jobs = jobs();
        let ctx = BatteryContext {
            jobs: &jobs,
            range: PromDuration::new(Duration::from_secs(300)),
            generator: "logbench-generator",
            cadvisor: false,
        };

        let battery = battery(&ctx).unwrap();

        // 3 verification, 4 HTTP, 4 gRPC, 1 BoltDB, CPU, volume
        assert_eq!(14, battery.len());
        let first = &battery.measurements()[0];
        assert_eq!(Annotation::Generator, first.annotation);
        let last = &battery.measurements()[battery.len() - 1];
        assert_eq!(Unit::Gigabytes, last.unit);
        assert!(battery.iter().all(|m| m.query.contains("[5m]")));
    }

    #[test]
    fn cadvisor_adds_memory() {
        let jobs = jobs();
        let ctx = BatteryContext {
            jobs: &jobs,
            range: PromDuration::new(Duration::from_secs(300)),
            generator: "logbench-generator",
            cadvisor: true,
        };

        assert_eq!(15, battery(&ctx).unwrap().len());
    }

    #[test]
    fn ingester_job_is_required() {
        let jobs = Jobs {
            ingester: None,
            ..jobs()
        };
        let ctx = BatteryContext {
            jobs: &jobs,
            range: PromDuration::new(Duration::from_secs(300)),
            generator: "logbench-generator",
            cadvisor: false,
        };

        assert!(matches!(battery(&ctx), Err(BenchError::Configuration(_))));
    }
}
