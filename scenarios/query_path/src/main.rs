use loki_bench_runner::prelude::*;

/// Read path latency and throughput per component while the queriers run against seeded data.
fn battery(ctx: &BatteryContext) -> Result<Battery, BenchError> {
    let distributor = ctx.job(Annotation::Distributor)?;
    let ingester = ctx.job(Annotation::Ingester)?;
    let querier = ctx.job(Annotation::Querier)?;
    let query_frontend = ctx.job(Annotation::QueryFrontend)?;
    let index_gateway = ctx.job(Annotation::IndexGateway)?;
    let range = ctx.range;

    Ok(BatteryBuilder::new()
        .write_path(ingestion_verification_metrics(
            ctx.generator,
            distributor,
            range,
        ))
        .read_path(load_querier_metrics(range))
        .read_path(http_request_metrics(
            RequestPath::Read,
            query_frontend,
            range,
            Annotation::QueryFrontend,
        ))
        .read_path(query_metrics(
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
        .read_path(query_metrics(querier, range, Annotation::Querier))
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
            query_frontend,
            range,
            Annotation::QueryFrontend,
            ctx.cadvisor,
        ))
        .resource_usage(resource_usage_metrics(
            querier,
            range,
            Annotation::Querier,
            ctx.cadvisor,
        ))
        .resource_usage(resource_usage_metrics(
            index_gateway,
            range,
            Annotation::IndexGateway,
            ctx.cadvisor,
        ))
        .resource_usage(volume_usage_metrics(
            index_gateway,
            range,
            Annotation::IndexGateway,
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

    fn jobs() -> Jobs {
        Jobs {
            distributor: Some("loki-distributor".to_string()),
            ingester: Some("loki-ingester".to_string()),
            querier: Some("loki-querier".to_string()),
            query_frontend: Some("loki-query-frontend".to_string()),
            index_gateway: Some("loki-index-gateway".to_string()),
        }
    }

    #[test]
    fn sections_are_ordered() {
        let jobs = jobs();
        let ctx = BatteryContext {
            jobs: &jobs,
            range: PromDuration::new(Duration::from_secs(60)),
            generator: "logbench-generator",
            cadvisor: false,
        };

        let battery = battery(&ctx).unwrap();

        let annotations = battery
            .iter()
            .map(|m| m.annotation)
            .collect::<Vec<_>>();
        // Verification, then the load queriers' own view of the read path.
        assert_eq!(Annotation::Generator, annotations[0]);
        assert_eq!(Annotation::Distributor, annotations[2]);
        assert_eq!(Annotation::Logql, annotations[3]);
        assert_eq!(Some(&Annotation::Ingester), annotations.last());

        // 3 + 4 LogQL + (4 + 6) * 2 + 4 + 1 + CPU * 4 + volume
        assert_eq!(37, battery.len());
    }

    #[test]
    fn every_component_job_is_required() {
        for missing in [
            Annotation::Querier,
            Annotation::QueryFrontend,
            Annotation::IndexGateway,
        ] {
            let mut jobs = jobs();
            match missing {
                Annotation::Querier => jobs.querier = None,
                Annotation::QueryFrontend => jobs.query_frontend = None,
                _ => jobs.index_gateway = None,
            }
            let ctx = BatteryContext {
                jobs: &jobs,
                range: PromDuration::new(Duration::from_secs(60)),
                generator: "logbench-generator",
                cadvisor: false,
            };

            assert!(
                matches!(battery(&ctx), Err(BenchError::Configuration(_))),
                "{missing}"
            );
        }
    }
}
