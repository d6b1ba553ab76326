mod connect;

pub mod prelude {
    pub use crate::connect::{connect, loki_scenario};

    /// Re-export of the `logbench_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use logbench_runner::prelude::*;

    /// Re-export of the measurement model, for building batteries.
    pub use logbench_instruments::prelude::*;
}
