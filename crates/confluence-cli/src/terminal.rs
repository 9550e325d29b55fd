//! Terminal stand-ins for the UI collaborators.

use confluence_core::navigation::{routes, Navigator};
use confluence_core::notify::{Notification, Notifier};
use tracing::debug;

/// Prints each failure notification to stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification) {
        eprintln!("{}", notification.title);
        for line in notification.description.lines() {
            eprintln!("  {}", line);
        }
    }
}

/// Translates route changes into hints for the next command to run.
pub struct HintNavigator;

impl Navigator for HintNavigator {
    fn navigate(&self, route: &str) {
        debug!(route, "Navigate");
        match route {
            routes::LOGIN => eprintln!("Please log in again: run `confluence login`."),
            routes::HOME => eprintln!("Signed in. Try `confluence docs list`."),
            other => eprintln!("-> {}", other),
        }
    }
}
