//! The presentation surface a session reports to.

use lorabridge_frame::Message;
use tracing::info;

/// Receives status text and verbose log lines from the session tasks.
///
/// Called from the reader thread, the consumer task and send tasks alike,
/// so implementations must be thread safe.
pub trait Presenter: Send + Sync {
    /// Replace the current status text.
    fn set_status(&self, text: &str);

    /// Append one line to the verbose log.
    fn append_log(&self, line: &str);

    /// Present a consumed message. The default shows the formatted message
    /// as status and logs it.
    fn show_message(&self, message: &Message) {
        let text = format_message(message);
        self.set_status(&text);
        self.append_log(&format!("Processed message: {text}"));
    }
}

/// Render a message for display:
/// `Data: 4C45 (ASCII: LE, Len: 2, Checksum: 5D, Valid: true)`.
pub fn format_message(message: &Message) -> String {
    format!(
        "{}: {} (ASCII: {}, Len: {}, Checksum: {:02X}, Valid: {})",
        message.kind().label(),
        message.payload_hex(),
        message.payload_ascii(),
        message.declared_length(),
        message.received_checksum(),
        message.is_checksum_valid(),
    )
}

/// Presenter that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn set_status(&self, text: &str) {
        info!(status = text, "status updated");
    }

    fn append_log(&self, line: &str) {
        info!("{line}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::Presenter;

    /// Records every call, in order.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPresenter {
        pub(crate) statuses: Mutex<Vec<String>>,
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl RecordingPresenter {
        pub(crate) fn statuses(&self) -> Vec<String> {
            self.statuses.lock().unwrap().clone()
        }

        pub(crate) fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub(crate) fn lines_starting_with(&self, prefix: &str) -> Vec<String> {
            self.lines()
                .into_iter()
                .filter(|line| line.starts_with(prefix))
                .collect()
        }
    }

    impl Presenter for RecordingPresenter {
        fn set_status(&self, text: &str) {
            self.statuses.lock().unwrap().push(text.to_string());
        }

        fn append_log(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use lorabridge_frame::parse_frame;

    use super::testing::RecordingPresenter;
    use super::*;

    #[test]
    fn formats_reference_message() {
        let msg = parse_frame("EA02094C4544206973206F6E5D55").unwrap();
        assert_eq!(
            format_message(&msg),
            "Data: 4C4544206973206F6E (ASCII: LED is on, Len: 9, Checksum: 5D, Valid: true)"
        );
    }

    #[test]
    fn formats_management_and_unknown() {
        let mgmt = parse_frame("EA01026F6E0355").unwrap();
        assert_eq!(
            format_message(&mgmt),
            "Management: 6F6E (ASCII: on, Len: 2, Checksum: 03, Valid: false)"
        );

        let unknown = parse_frame("EA7F007F55").unwrap();
        assert_eq!(
            format_message(&unknown),
            "Unknown:  (ASCII: , Len: 0, Checksum: 7F, Valid: true)"
        );
    }

    #[test]
    fn default_show_message_sets_status_and_logs() {
        let presenter = RecordingPresenter::default();
        let msg = parse_frame("EA01026F6E0255").unwrap();
        presenter.show_message(&msg);

        let text = format_message(&msg);
        assert_eq!(presenter.statuses(), vec![text.clone()]);
        assert_eq!(
            presenter.lines(),
            vec![format!("Processed message: {text}")]
        );
    }
}
