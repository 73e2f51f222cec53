use tokio::sync::watch;

/// Cooperative stop flag handed to sessions and background loops.
pub type StopSignal = watch::Receiver<bool>;

pub fn stop_channel() -> (watch::Sender<bool>, StopSignal) {
    watch::channel(false)
}

/// Resolves once the flag is raised or its sender is gone. Safe to poll again afterwards.
pub async fn stopped(stop: &mut StopSignal) {
    let _ = stop.wait_for(|stop| *stop).await;
}
