use crate::measurement::Measurement;

/// The ordered list of measurements evaluated on every sampling round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Battery {
    measurements: Vec<Measurement>,
}

impl Battery {
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

impl FromIterator<Measurement> for Battery {
    fn from_iter<T: IntoIterator<Item = Measurement>>(iter: T) -> Self {
        Self {
            measurements: iter.into_iter().collect(),
        }
    }
}

/// Assembles a [Battery] from component measurements.
///
/// Measurements may be added in any order but the built battery always lists the write path
/// first, then the read path, then resource usage. Within a section, insertion order is kept.
#[derive(Debug, Default)]
pub struct BatteryBuilder {
    write_path: Vec<Measurement>,
    read_path: Vec<Measurement>,
    resource_usage: Vec<Measurement>,
}

impl BatteryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_path(mut self, measurements: impl IntoIterator<Item = Measurement>) -> Self {
        self.write_path.extend(measurements);
        self
    }

    pub fn read_path(mut self, measurements: impl IntoIterator<Item = Measurement>) -> Self {
        self.read_path.extend(measurements);
        self
    }

    pub fn resource_usage(mut self, measurements: impl IntoIterator<Item = Measurement>) -> Self {
        self.resource_usage.extend(measurements);
        self
    }

    pub fn build(self) -> Battery {
        self.write_path
            .into_iter()
            .chain(self.read_path)
            .chain(self.resource_usage)
            .collect()
    }
}
