use logbench_core::prelude::ShutdownHandle;
use tokio::signal;

pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> anyhow::Result<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::warn!("Received shutdown signal, tearing down workloads...");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    Ok(handle)
}
