//! Order channel lifecycle management.
//!
//! [`Supervisor`] keeps exactly one channel alive per subscription. After an
//! abnormal close it retries with a fixed delay, up to a bounded number of
//! attempts, then parks in [`ConnectionState::Failed`] until a manual
//! reconnect. Intentional closes (normal-closure code) are never retried.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::Dialer;
use super::channel::{ChannelCommand, CloseOutcome, HeartbeatChannel, NORMAL_CLOSURE};
use crate::ExpoError;
use crate::config::SyncSettings;
use crate::models::OrderEvent;

/// Connection state as seen by views. Written only by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Dialing or handshaking.
    Connecting,
    /// Live and receiving events.
    Open,
    /// Closed abnormally; a retry is pending.
    Reclosed,
    /// Retries exhausted; waiting for a manual reconnect.
    Failed,
    /// Closed intentionally.
    Closed,
}

impl ConnectionState {
    /// `true` once automatic recovery has given up.
    pub fn is_offline(self) -> bool {
        self == ConnectionState::Failed
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "live",
            ConnectionState::Reclosed => "reconnecting",
            ConnectionState::Failed => "offline",
            ConnectionState::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What to do after an abnormal close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reopen after `delay`; `attempt` is 1-based.
    RetryAfter { attempt: u32, delay: Duration },
    /// Attempts are exhausted.
    GiveUp,
}

/// Fixed-delay, bounded retry accounting.
///
/// The delay is constant on purpose: kitchen screens should come back on a
/// predictable schedule.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    attempts: u32,
    max_attempts: u32,
    delay: Duration,
}

impl RetryBudget {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            delay,
        }
    }

    /// A connection opened successfully.
    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// A connection closed abnormally (or could not be opened).
    pub fn on_abnormal_close(&mut self) -> RetryDecision {
        if self.attempts < self.max_attempts {
            self.attempts += 1;
            RetryDecision::RetryAfter {
                attempt: self.attempts,
                delay: self.delay,
            }
        } else {
            RetryDecision::GiveUp
        }
    }

    /// Manual reconnect starts a fresh budget.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Commands sent to a running supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorCommand {
    /// Reset the retry budget and reconnect immediately.
    Reconnect,
    /// Close the channel intentionally and stop.
    Shutdown,
}

/// How driving one open channel ended.
enum Driven {
    Closed(CloseOutcome),
    Command(SupervisorCommand),
}

/// Owns the channel for one subscription.
pub struct Supervisor<D: Dialer, T> {
    dialer: Arc<D>,
    restaurant_id: String,
    settings: SyncSettings,
    budget: RetryBudget,
    events: mpsc::UnboundedSender<T>,
    commands: mpsc::UnboundedReceiver<SupervisorCommand>,
    state: watch::Sender<ConnectionState>,
}

impl<D, T> Supervisor<D, T>
where
    D: Dialer,
    T: From<OrderEvent> + Send + 'static,
{
    /// Starts supervising the channel for `restaurant_id` on a new task.
    ///
    /// Events are delivered to `events`. The returned handle exposes the
    /// connection state and the manual controls.
    pub fn spawn(
        dialer: Arc<D>,
        restaurant_id: impl Into<String>,
        settings: SyncSettings,
        events: mpsc::UnboundedSender<T>,
    ) -> SupervisorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let supervisor = Self {
            dialer,
            restaurant_id: restaurant_id.into(),
            budget: RetryBudget::new(settings.max_reconnect_attempts, settings.reconnect_delay),
            settings,
            events,
            commands: cmd_rx,
            state: state_tx,
        };
        let task = tokio::spawn(supervisor.run());

        SupervisorHandle {
            commands: cmd_tx,
            state: state_rx,
            task: Some(task),
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Runs until shut down.
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            info!(restaurant_id = %self.restaurant_id, "Connecting to order channel");

            let opened = tokio::select! {
                res = HeartbeatChannel::open(&*self.dialer, &self.restaurant_id, &self.settings) => res,
                cmd = self.commands.recv() => match cmd {
                    Some(SupervisorCommand::Reconnect) => {
                        self.budget.reset();
                        continue;
                    }
                    Some(SupervisorCommand::Shutdown) | None => break,
                },
            };

            let outcome = match opened {
                Ok(channel) => {
                    self.budget.on_open();
                    self.set_state(ConnectionState::Open);
                    info!(restaurant_id = %self.restaurant_id, "Order channel open");

                    match self.drive(channel).await {
                        Driven::Closed(outcome) => outcome,
                        Driven::Command(SupervisorCommand::Reconnect) => {
                            self.budget.reset();
                            continue;
                        }
                        Driven::Command(SupervisorCommand::Shutdown) => break,
                    }
                }
                Err(ExpoError::MissingSubscriberKey) => {
                    error!("Order channel needs a restaurant id");
                    self.set_state(ConnectionState::Failed);
                    if self.wait_for_reconnect().await {
                        continue;
                    }
                    break;
                }
                Err(e) => {
                    warn!(restaurant_id = %self.restaurant_id, error = %e, "Connection failed");
                    CloseOutcome::abnormal(e.to_string())
                }
            };

            if outcome.is_intentional() {
                self.set_state(ConnectionState::Closed);
                if self.wait_for_reconnect().await {
                    continue;
                }
                break;
            }

            match self.budget.on_abnormal_close() {
                RetryDecision::RetryAfter { attempt, delay } => {
                    self.set_state(ConnectionState::Reclosed);
                    info!(
                        restaurant_id = %self.restaurant_id,
                        attempt,
                        max_attempts = self.settings.max_reconnect_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Scheduling reconnect"
                    );

                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        cmd = self.commands.recv() => match cmd {
                            Some(SupervisorCommand::Reconnect) => self.budget.reset(),
                            Some(SupervisorCommand::Shutdown) | None => break,
                        },
                    }
                }
                RetryDecision::GiveUp => {
                    self.set_state(ConnectionState::Failed);
                    warn!(
                        restaurant_id = %self.restaurant_id,
                        attempts = self.budget.attempts(),
                        "Failed to connect after multiple attempts"
                    );
                    if !self.wait_for_reconnect().await {
                        break;
                    }
                    self.budget.reset();
                }
            }
        }

        self.set_state(ConnectionState::Closed);
        info!(restaurant_id = %self.restaurant_id, "Order channel supervisor stopped");
    }

    /// Runs an open channel, relaying supervisor commands as close requests.
    async fn drive<S>(&mut self, channel: HeartbeatChannel<S>) -> Driven
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (close_tx, mut close_rx) = mpsc::unbounded_channel();
        let run = channel.run(&self.events, &mut close_rx);
        tokio::pin!(run);

        let mut requested = None;
        loop {
            tokio::select! {
                outcome = &mut run => {
                    return match requested {
                        Some(cmd) => Driven::Command(cmd),
                        None => Driven::Closed(outcome),
                    };
                }
                cmd = self.commands.recv(), if requested.is_none() => {
                    let cmd = cmd.unwrap_or(SupervisorCommand::Shutdown);
                    let reason = match cmd {
                        SupervisorCommand::Reconnect => "manual reconnect",
                        SupervisorCommand::Shutdown => "unsubscribed",
                    };
                    let _ = close_tx.send(ChannelCommand::Close {
                        code: NORMAL_CLOSURE,
                        reason: reason.to_string(),
                    });
                    requested = Some(cmd);
                }
            }
        }
    }

    /// Parks until a manual reconnect (`true`) or shutdown (`false`).
    async fn wait_for_reconnect(&mut self) -> bool {
        matches!(self.commands.recv().await, Some(SupervisorCommand::Reconnect))
    }
}

/// Control handle for a running [`Supervisor`].
///
/// Dropping the handle shuts the supervisor down.
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<SupervisorCommand>,
    state: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Subscribes to connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Resets the retry budget and reconnects immediately.
    pub fn reconnect(&self) {
        let _ = self.commands.send(SupervisorCommand::Reconnect);
    }

    /// Cancels any pending retry and closes the channel intentionally.
    /// Returns without waiting; see [`SupervisorHandle::join`].
    pub fn shutdown(&self) {
        let _ = self.commands.send(SupervisorCommand::Shutdown);
    }

    /// A sender that can shut this supervisor down after the handle has
    /// been moved elsewhere.
    pub(crate) fn command_sender(&self) -> mpsc::UnboundedSender<SupervisorCommand> {
        self.commands.clone()
    }

    /// Shuts down and waits for the channel to finish closing.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Supervisor task ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(SupervisorCommand::Shutdown);
    }
}
