//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); relaunch the app"
                    .to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn queued_command_leaves_status_untouched() {
        let (tx, rx) = bounded(1);
        let mut status = "Ready".to_string();
        dispatch_backend_command(&tx, BackendCommand::Recluster, &mut status);
        assert_eq!(status, "Ready");
        assert!(matches!(rx.try_recv(), Ok(BackendCommand::Recluster)));
    }

    #[test]
    fn full_queue_is_reported() {
        let (tx, _rx) = bounded(1);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::Load, &mut status);
        dispatch_backend_command(&tx, BackendCommand::Load, &mut status);
        assert_eq!(status, "UI command queue is full; please retry");
    }

    #[test]
    fn disconnected_backend_is_reported() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::CloseImage, &mut status);
        assert!(status.starts_with("Backend command processor disconnected"));
    }
}
