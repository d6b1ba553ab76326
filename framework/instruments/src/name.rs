use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Separates the parts of a [RecordName].
pub const RECORD_NAME_SEPARATOR: &str = " - ";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordNameError {
    #[error("{part} '{value}' cannot be used in a record name because it would not split back into the same parts around \" - \"")]
    AmbiguousPart { part: &'static str, value: String },
    #[error("record name '{0}' does not have the form \"<component> - <metric> - <scenario>\"")]
    Malformed(String),
}

/// Identifies a sampled value as `<component> - <metric> - <scenario>`.
///
/// Reporters split the rendered name back into its parts to decide where a value is written, so a
/// name can only be constructed from parts that survive that split unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordName {
    component: String,
    metric: String,
    scenario: String,
}

impl RecordName {
    pub fn new(
        component: impl Into<String>,
        metric: impl Into<String>,
        scenario: impl Into<String>,
    ) -> Result<Self, RecordNameError> {
        let component = component.into();
        let metric = metric.into();
        let scenario = scenario.into();

        check_part("component", &component)?;
        check_part("metric", &metric)?;
        check_part("scenario", &scenario)?;

        Ok(Self {
            component,
            metric,
            scenario,
        })
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }
}

/// Check that a scenario description can be used as the last part of a record name.
pub fn validate_scenario_description(description: &str) -> Result<(), RecordNameError> {
    check_part("scenario", description)
}

fn check_part(part: &'static str, value: &str) -> Result<(), RecordNameError> {
    // A trailing " -" would merge with the following separator and split one character early.
    if value.contains(RECORD_NAME_SEPARATOR) || value.ends_with(" -") {
        return Err(RecordNameError::AmbiguousPart {
            part,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl Display for RecordName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{RECORD_NAME_SEPARATOR}{}{RECORD_NAME_SEPARATOR}{}",
            self.component, self.metric, self.scenario
        )
    }
}

impl FromStr for RecordName {
    type Err = RecordNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(RECORD_NAME_SEPARATOR).collect::<Vec<_>>();
        match parts.as_slice() {
            [component, metric, scenario] => Self::new(*component, *metric, *scenario),
            _ => Err(RecordNameError::Malformed(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_splits_back() {
        let name = RecordName::new(
            "distributor",
            "HTTP Write Path request rate",
            "ingestion of 10GB per day",
        )
        .unwrap();

        let rendered = name.to_string();
        assert_eq!(
            "distributor - HTTP Write Path request rate - ingestion of 10GB per day",
            rendered
        );
        assert_eq!(name, rendered.parse::<RecordName>().unwrap());
    }

    #[test]
    fn separator_in_description_is_rejected() {
        let err = RecordName::new("querier", "Container CPU Usage", "reads - 100 qps").unwrap_err();
        assert!(matches!(
            err,
            RecordNameError::AmbiguousPart {
                part: "scenario",
                ..
            }
        ));
    }

    #[test]
    fn trailing_dash_is_rejected() {
        assert!(validate_scenario_description("trailing -").is_err());
        assert!(validate_scenario_description("- leading is fine").is_ok());
        assert!(validate_scenario_description("hyphen-ated").is_ok());
    }

    #[test]
    fn wrong_part_count_does_not_parse() {
        assert_eq!(
            Err(RecordNameError::Malformed("a - b".to_string())),
            "a - b".parse::<RecordName>()
        );
    }
}
