use std::fmt::{Display, Formatter};

pub const CORES_TO_MILLICORES: u64 = 1_000;
pub const SECONDS_TO_MILLISECONDS: u64 = 1_000;
pub const BYTES_TO_MEGABYTES: u64 = 1_000_000;
pub const BYTES_TO_GIGABYTES: u64 = 1_000_000_000;
pub const SECONDS_PER_DAY: u64 = 86_400;

/// A named PromQL query that evaluates to a single number.
///
/// The query text is fully rendered at construction so the same inputs always produce the same
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub name: String,
    pub query: String,
    pub unit: Unit,
    pub annotation: Annotation,
}

impl Measurement {
    pub fn new(
        name: impl Into<String>,
        query: impl Into<String>,
        unit: Unit,
        annotation: Annotation,
    ) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            unit,
            annotation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unit {
    Gigabytes,
    Millicores,
    Milliseconds,
    RequestsPerSecond,
    QueriesPerSecond,
    MegabytesPerSecond,
    GigabytesPerDay,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Gigabytes => "GB",
            Unit::Millicores => "m",
            Unit::Milliseconds => "ms",
            Unit::RequestsPerSecond => "requests per second",
            Unit::QueriesPerSecond => "queries per second",
            Unit::MegabytesPerSecond => "MBps",
            Unit::GigabytesPerDay => "GBpd",
        }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The service component a measurement describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Annotation {
    Distributor,
    Ingester,
    Querier,
    QueryFrontend,
    IndexGateway,
    Logql,
    Generator,
}

impl Annotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Annotation::Distributor => "distributor",
            Annotation::Ingester => "ingester",
            Annotation::Querier => "querier",
            Annotation::QueryFrontend => "query-frontend",
            Annotation::IndexGateway => "index-gateway",
            Annotation::Logql => "logql",
            Annotation::Generator => "generator",
        }
    }
}

impl Display for Annotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A substring match on a single label, rendered as `label=~".*value.*"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    label: &'static str,
    value: String,
}

impl Selector {
    pub fn job(value: impl Into<String>) -> Self {
        Self {
            label: "job",
            value: value.into(),
        }
    }

    pub fn pod(value: impl Into<String>) -> Self {
        Self {
            label: "pod",
            value: value.into(),
        }
    }

    pub fn persistent_volume_claim(value: impl Into<String>) -> Self {
        Self {
            label: "persistentvolumeclaim",
            value: value.into(),
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, r#"{}=~".*{}.*""#, self.label, self.value)
    }
}

/// Render a percentile such as `99` as the quantile literal `0.99`.
pub(crate) fn quantile_literal(percentile: u8) -> String {
    format!("0.{percentile:02}")
}
