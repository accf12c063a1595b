use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lorabridge_frame::Message;
use lorabridge_session::{Presenter, Session, SessionConfig};
use lorabridge_transport::TransportConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cmd::{parse_duration, MonitorArgs};
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SessionConfig {
        tick_interval: parse_duration(&args.tick)?,
        read_timeout: parse_duration(&args.read_timeout)?,
        policy: args.policy.into(),
        ..SessionConfig::default()
    };
    let duration = args.duration.as_deref().map(parse_duration).transpose()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    runtime.block_on(monitor(args, config, duration, format))
}

async fn monitor(
    args: MonitorArgs,
    config: SessionConfig,
    duration: Option<Duration>,
    format: OutputFormat,
) -> CliResult<i32> {
    let done = CancellationToken::new();
    let presenter = Arc::new(StdoutPresenter::new(format, args.count, done.clone()));

    let mut session = Session::new(config, presenter.clone());
    session
        .start()
        .map_err(|err| session_error("session start failed", err))?;

    let transport = TransportConfig::new(&args.link.path).with_baud_rate(args.link.baud);
    if let Err(err) = session.connect(&transport) {
        let _ = session.stop().await;
        return Err(session_error(
            &format!("failed to open {}", args.link.path.display()),
            err,
        ));
    }

    if args.inject_test {
        session.inject_test_frame();
    }
    if args.send_canned {
        match session.send_canned_command() {
            // A failed send is already reported; keep monitoring.
            Ok(task) => {
                if let Ok(Err(err)) = task.await {
                    debug!(error = %err, "canned command not sent");
                }
            }
            Err(err) => warn!(error = %err, "canned command not sent"),
        }
    }

    let outcome = tokio::select! {
        _ = done.cancelled() => Ok(SUCCESS),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(SUCCESS)
        }
        _ = deadline(duration) => match args.count {
            Some(count) => Err(CliError::new(
                TIMEOUT,
                format!(
                    "received {} of {count} messages before the deadline",
                    presenter.shown()
                ),
            )),
            None => Ok(SUCCESS),
        },
    };

    session
        .stop()
        .await
        .map_err(|err| session_error("session stop failed", err))?;
    outcome
}

async fn deadline(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Prints consumed messages to stdout and routes the verbose log to tracing.
struct StdoutPresenter {
    format: OutputFormat,
    limit: Option<usize>,
    shown: AtomicUsize,
    done: CancellationToken,
}

impl StdoutPresenter {
    fn new(format: OutputFormat, limit: Option<usize>, done: CancellationToken) -> Self {
        Self {
            format,
            limit,
            shown: AtomicUsize::new(0),
            done,
        }
    }

    fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl Presenter for StdoutPresenter {
    fn set_status(&self, text: &str) {
        debug!(status = text, "status updated");
    }

    fn append_log(&self, line: &str) {
        info!("{line}");
    }

    fn show_message(&self, message: &Message) {
        if self.done.is_cancelled() {
            return;
        }
        print_message(message, self.format);

        let shown = self.shown.fetch_add(1, Ordering::SeqCst) + 1;
        if self.limit.is_some_and(|limit| shown >= limit) {
            self.done.cancel();
        }
    }
}
