use crate::config::{GeneratorConfig, QuerierConfig, ReaderSpec, WriterSpec};
use crate::deployment::DeploymentSpec;
use std::collections::BTreeMap;

pub const GENERATOR_APP_LABEL: &str = "logbench-generator";
pub const QUERIER_APP_LABEL: &str = "logbench-querier";

/// The log generator workload for a writer spec.
pub fn generator_spec(writers: &WriterSpec, generator: &GeneratorConfig) -> DeploymentSpec {
    let mut args = vec![
        "generate".to_string(),
        format!("--url={}", generator.push_url),
        format!("--tenant={}", generator.tenant),
    ];
    args.extend(flags(&writers.args));

    DeploymentSpec {
        name: generator.name.clone(),
        namespace: generator.namespace.clone(),
        image: generator.image.clone(),
        replicas: writers.replicas,
        args,
        labels: app_label(GENERATOR_APP_LABEL),
        service_account: generator.service_account.clone(),
    }
}

/// One querier workload per named query, ordered by query name.
pub fn querier_specs(readers: &ReaderSpec, querier: &QuerierConfig) -> Vec<DeploymentSpec> {
    readers
        .queries
        .iter()
        .map(|(id, query)| {
            let mut args = vec![
                "query".to_string(),
                format!("--url={}", querier.url),
                format!("--tenant={}", querier.tenant),
                format!("--queries={query}"),
            ];
            args.extend(flags(&readers.args));

            let mut labels = app_label(QUERIER_APP_LABEL);
            labels.insert("logbench/query".to_string(), id.to_lowercase());

            DeploymentSpec {
                name: format!("{}-{}", querier.name, id.to_lowercase()),
                namespace: querier.namespace.clone(),
                image: querier.image.clone(),
                replicas: readers.replicas,
                args,
                labels,
                service_account: querier.service_account.clone(),
            }
        })
        .collect()
}

fn flags(args: &BTreeMap<String, String>) -> impl Iterator<Item = String> + '_ {
    args.iter().map(|(k, v)| format!("--{k}={v}"))
}

fn app_label(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}
