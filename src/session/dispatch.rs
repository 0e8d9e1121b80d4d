use tokio::sync::mpsc;

use super::Session;
use crate::actuator::Actuator;
use crate::hid::HidEvent;
use crate::store::Nvram;

/// Drives `session` from transport events until the channel closes, then hands it back.
///
/// Registry writes and hook spawns run inline, so the loop belongs on a current-thread
/// runtime.
pub async fn run_session_loop<N: Nvram, A: Actuator>(
    mut events_rx: mpsc::Receiver<HidEvent>,
    mut session: Session<N, A>,
) -> Session<N, A> {
    tracing::info!("session loop running");

    while let Some(event) = events_rx.recv().await {
        if let Err(e) = session.handle_event(event) {
            tracing::error!("registry error: {e}");
        }
    }
    tracing::info!("session loop exiting (event channel closed)");
    session
}
