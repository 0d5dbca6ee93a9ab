use flume::Sender;
use tracing::{debug, info};

use crate::models::MediaFolder;

/// The two buttons on a section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    ToggleSyncStatus,
    OpenSettings,
}

/// Receives header taps. Called synchronously on the presentation thread.
pub trait ClickListener {
    fn on_sync_status_toggle(&mut self, section: usize, folder: &MediaFolder);
    fn on_sync_folder_settings(&mut self, section: usize, folder: &MediaFolder);
}

/// A short-lived message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

/// Listener that answers every tap with a transient notification.
///
/// Toggling sync and editing folder settings are not implemented yet; the
/// notification only confirms which folder was tapped.
pub struct NotifyingListener {
    tx: Sender<Notification>,
}

impl NotifyingListener {
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }

    fn notify(&self, message: String) {
        info!("{}", message);
        if let Err(e) = self.tx.send(Notification { message }) {
            debug!(message = %e.into_inner().message, "Notification dropped, screen is gone");
        }
    }
}

impl ClickListener for NotifyingListener {
    fn on_sync_status_toggle(&mut self, _section: usize, folder: &MediaFolder) {
        self.notify(format!(
            "Sync Status Clicked for {}",
            folder.absolute_path().display()
        ));
    }

    fn on_sync_folder_settings(&mut self, _section: usize, folder: &MediaFolder) {
        self.notify(format!("Menu Clicked for {}", folder.absolute_path().display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifications_name_the_folder() {
        let (tx, rx) = flume::unbounded();
        let mut listener = NotifyingListener::new(tx);
        let folder = MediaFolder::new("Camera", "/pics/Camera", Vec::new(), 0);

        listener.on_sync_status_toggle(0, &folder);
        listener.on_sync_folder_settings(0, &folder);

        let messages: Vec<String> = rx.try_iter().map(|n| n.message).collect();
        assert_eq!(
            messages,
            vec![
                "Sync Status Clicked for /pics/Camera".to_string(),
                "Menu Clicked for /pics/Camera".to_string(),
            ]
        );
    }

    #[test]
    fn test_tap_after_screen_closed_is_harmless() {
        let (tx, rx) = flume::unbounded();
        let mut listener = NotifyingListener::new(tx.clone());
        drop(rx);
        let folder = MediaFolder::new("Camera", "/pics/Camera", Vec::new(), 0);

        listener.on_sync_status_toggle(0, &folder);
        listener.on_sync_folder_settings(0, &folder);

        assert!(tx.is_disconnected());
    }
}
