mod bin_path;
mod command;
mod docker;
mod kubectl;
mod prometheus;

pub mod prelude {
    pub use crate::bin_path::{binary_path, DOCKER_PATH_ENV, KUBECTL_PATH_ENV};
    pub use crate::docker::DockerDeployer;
    pub use crate::kubectl::KubectlDeployer;
    pub use crate::prometheus::PrometheusBackend;
}
