use std::fmt::{Display, Formatter};
use std::time::Duration;

/// A duration rendered the way PromQL range selectors expect, e.g. `5m` or `1h30m`.
///
/// Sub-millisecond precision is dropped. Years and weeks are only used when they divide the
/// duration exactly, so 8 days renders as `8d` rather than `1w1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromDuration(Duration);

const MS_PER_SECOND: u128 = 1000;
const MS_PER_MINUTE: u128 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u128 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u128 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: u128 = 7 * MS_PER_DAY;
const MS_PER_YEAR: u128 = 365 * MS_PER_DAY;

impl PromDuration {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for PromDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl Display for PromDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut ms = self.0.as_millis();
        if ms == 0 {
            return f.write_str("0s");
        }

        let units: [(&str, u128, bool); 7] = [
            ("y", MS_PER_YEAR, true),
            ("w", MS_PER_WEEK, true),
            ("d", MS_PER_DAY, false),
            ("h", MS_PER_HOUR, false),
            ("m", MS_PER_MINUTE, false),
            ("s", MS_PER_SECOND, false),
            ("ms", 1, false),
        ];

        for (unit, size, exact_only) in units {
            if exact_only && ms % size != 0 {
                continue;
            }
            let count = ms / size;
            if count > 0 {
                write!(f, "{count}{unit}")?;
                ms -= count * size;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(duration: Duration) -> String {
        PromDuration::new(duration).to_string()
    }

    #[test]
    fn renders_common_windows() {
        assert_eq!("0s", render(Duration::ZERO));
        assert_eq!("30s", render(Duration::from_secs(30)));
        assert_eq!("5m", render(Duration::from_secs(300)));
        assert_eq!("1h30m", render(Duration::from_secs(5400)));
        assert_eq!("1m500ms", render(Duration::from_millis(60_500)));
    }

    #[test]
    fn weeks_and_years_only_when_exact() {
        assert_eq!("1w", render(Duration::from_secs(7 * 86_400)));
        assert_eq!("8d", render(Duration::from_secs(8 * 86_400)));
        assert_eq!("1y", render(Duration::from_secs(365 * 86_400)));
    }

    #[test]
    fn drops_sub_millisecond_precision() {
        assert_eq!("0s", render(Duration::from_micros(999)));
        assert_eq!("1s", render(Duration::from_micros(1_000_400)));
    }
}
