use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

pub use crate::{
    Action, ConnectionState, ControlId, Effect, LinkError, Notification, Panel, PanelEvent,
    PendingConfirmation, UiState,
};

use super::PanelDriverConfig;

/// Messages into the engine task.
#[derive(Debug, Clone)]
enum DriverMessage {
    Event(PanelEvent),
    Shutdown,
}

/// Native host for [`Panel`].
///
/// One task owns the engine. Socket reader/writer tasks and timers talk to it
/// over a single queue, and observers read its output through `watch` and
/// `broadcast` channels, so the engine is only ever touched from one place.
#[derive(Debug, Clone)]
pub struct PanelDriver {
    pub config: PanelDriverConfig,
    queue_tx: mpsc::Sender<DriverMessage>,
    state_rx: watch::Receiver<UiState>,
    connection_rx: watch::Receiver<ConnectionState>,
    pending_rx: watch::Receiver<Option<PendingConfirmation>>,
    notification_channel: broadcast::Sender<Notification>,
}

impl PanelDriver {
    /// Starts the engine task and begins connecting to `config.url`.
    ///
    /// Returns as soon as the task is running; the connection itself comes up
    /// (and keeps coming back up) in the background. Use
    /// [`PanelDriver::wait_until_open`] to block on it.
    ///
    /// # Errors
    ///
    /// Only configuration errors. Connection failures are never fatal; they
    /// show up as `ConnectionState::Closed` followed by a reconnect.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let driver = PanelDriver::start(PanelDriverConfig::new("ws://192.168.4.1/ws".into()))?;
    /// driver.wait_until_open(Duration::from_secs(5)).await?;
    /// driver.submit(Action::SetTarget { motor: 0, target: 12 }).await?;
    /// ```
    pub fn start(config: PanelDriverConfig) -> Result<PanelDriver, LinkError> {
        config.validate()?;

        let panel = Panel::new(config.panel.clone(), config.url.clone(), now_ms());
        let (queue_tx, queue_rx) = mpsc::channel::<DriverMessage>(config.max_events);
        let (state_tx, state_rx) = watch::channel(panel.ui().clone());
        let (connection_tx, connection_rx) = watch::channel(panel.connection_state());
        let (pending_tx, pending_rx) = watch::channel(None);
        let (notification_channel, _rx) = broadcast::channel(32);

        let outputs = Outputs {
            state_tx,
            connection_tx,
            pending_tx,
            notification_tx: notification_channel.clone(),
        };

        let engine_queue = queue_tx.clone();
        tokio::spawn(async move {
            run_engine(panel, queue_rx, engine_queue, outputs).await;
        });

        let driver = Self {
            config,
            queue_tx,
            state_rx,
            connection_rx,
            pending_rx,
            notification_channel,
        };
        driver.try_event(PanelEvent::Connect)?;
        Ok(driver)
    }

    fn try_event(&self, event: PanelEvent) -> Result<(), LinkError> {
        self.queue_tx
            .try_send(DriverMessage::Event(event))
            .map_err(|e| LinkError::Transport(format!("engine queue: {}", e)))
    }

    async fn event(&self, event: PanelEvent) -> Result<(), LinkError> {
        self.queue_tx
            .send(DriverMessage::Event(event))
            .await
            .map_err(|_| LinkError::Transport("engine task has stopped".to_string()))
    }

    /// Run an action through the gate. Gated actions leave a pending
    /// confirmation behind; see [`PanelDriver::confirm`].
    pub async fn submit(&self, action: Action) -> Result<(), LinkError> {
        let gated = action.is_gated();
        self.event(PanelEvent::Action(action)).await?;
        if gated {
            return Err(LinkError::ConfirmationRequired);
        }
        Ok(())
    }

    pub async fn confirm(&self) -> Result<(), LinkError> {
        self.event(PanelEvent::Confirm).await
    }

    pub async fn cancel(&self) -> Result<(), LinkError> {
        self.event(PanelEvent::Cancel).await
    }

    pub async fn begin_edit(&self, control: ControlId) -> Result<(), LinkError> {
        self.event(PanelEvent::BeginEdit(control)).await
    }

    pub async fn preview_target(&self, motor: usize, target: i32) -> Result<(), LinkError> {
        self.event(PanelEvent::PreviewTarget { motor, target }).await
    }

    pub async fn cancel_edit(&self, control: ControlId) -> Result<(), LinkError> {
        self.event(PanelEvent::CancelEdit(control)).await
    }

    /// Latest reconciled state.
    pub fn ui(&self) -> UiState {
        self.state_rx.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_rx.borrow()
    }

    pub fn pending_confirmation(&self) -> Option<PendingConfirmation> {
        self.pending_rx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<UiState> {
        self.state_rx.clone()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_rx.clone()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<Option<PendingConfirmation>> {
        self.pending_rx.clone()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notification_channel.subscribe()
    }

    /// Wait until the session reports `Open`, or give up after `timeout`.
    pub async fn wait_until_open(&self, timeout: Duration) -> Result<(), LinkError> {
        let mut rx = self.connection_rx.clone();
        let wait = async {
            loop {
                if *rx.borrow_and_update() == ConnectionState::Open {
                    return Ok(());
                }
                if rx.changed().await.is_err() {
                    return Err(LinkError::Transport("engine task has stopped".to_string()));
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| LinkError::Transport(format!("not connected after {:?}", timeout)))?
    }

    /// Stop the engine task and close the socket.
    pub async fn shutdown(&self) {
        let _ = self.queue_tx.send(DriverMessage::Shutdown).await;
    }
}

struct Outputs {
    state_tx: watch::Sender<UiState>,
    connection_tx: watch::Sender<ConnectionState>,
    pending_tx: watch::Sender<Option<PendingConfirmation>>,
    notification_tx: broadcast::Sender<Notification>,
}

/// Handles owned by the engine task for the work it delegates.
#[derive(Default)]
struct Workers {
    socket: Option<(JoinHandle<()>, mpsc::UnboundedSender<String>)>,
    reconnect: Option<JoinHandle<()>>,
}

impl Workers {
    fn drop_socket(&mut self) {
        // dropping the sender lets the writer send a close frame first
        if let Some((handle, tx)) = self.socket.take() {
            drop(tx);
            tokio::spawn(async move {
                sleep(Duration::from_millis(250)).await;
                handle.abort();
            });
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(handle) = self.reconnect.take() {
            handle.abort();
        }
    }
}

async fn run_engine(
    mut panel: Panel,
    mut queue_rx: mpsc::Receiver<DriverMessage>,
    queue_tx: mpsc::Sender<DriverMessage>,
    outputs: Outputs,
) {
    let mut liveness = interval(panel.config().liveness_interval());
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    liveness.tick().await;

    let mut workers = Workers::default();

    loop {
        let event = tokio::select! {
            message = queue_rx.recv() => match message {
                Some(DriverMessage::Event(event)) => event,
                Some(DriverMessage::Shutdown) | None => break,
            },
            _ = liveness.tick() => PanelEvent::LivenessTick,
        };

        let effects = panel.handle(event, now_ms());
        for effect in effects {
            apply_effect(effect, &panel, &mut workers, &queue_tx, &outputs);
        }
    }

    tracing::info!("Panel driver shutting down");
    workers.cancel_reconnect();
    workers.drop_socket();
}

fn apply_effect(
    effect: Effect,
    panel: &Panel,
    workers: &mut Workers,
    queue_tx: &mpsc::Sender<DriverMessage>,
    outputs: &Outputs,
) {
    match effect {
        Effect::OpenTransport { url } => {
            workers.drop_socket();
            workers.socket = Some(spawn_socket(url, queue_tx.clone()));
        }
        Effect::CloseTransport => workers.drop_socket(),
        Effect::Send(text) => match workers.socket {
            Some((_, ref tx)) => {
                if tx.send(text).is_err() {
                    tracing::warn!("socket writer is gone, command dropped");
                }
            }
            None => tracing::warn!("no socket for outgoing command"),
        },
        Effect::ScheduleReconnect { delay } => {
            workers.cancel_reconnect();
            let tx = queue_tx.clone();
            workers.reconnect = Some(tokio::spawn(async move {
                sleep(delay).await;
                let _ = tx.send(DriverMessage::Event(PanelEvent::ReconnectDue)).await;
            }));
        }
        Effect::CancelReconnect => workers.cancel_reconnect(),
        Effect::ConnectionChanged(state) => {
            outputs.connection_tx.send_replace(state);
        }
        Effect::StateChanged => {
            outputs.state_tx.send_replace(panel.ui().clone());
        }
        Effect::ShowNotification(notification) => {
            tracing::info!("[{}] {}", notification.severity.as_str(), notification.message);
            // no subscribers is fine
            let _ = outputs.notification_tx.send(notification);
        }
        Effect::ScheduleDismiss { id, after } => {
            let tx = queue_tx.clone();
            tokio::spawn(async move {
                sleep(after).await;
                let _ = tx.send(DriverMessage::Event(PanelEvent::NotificationExpired(id))).await;
            });
        }
        Effect::HideNotification => {}
        Effect::ShowConfirmation(_) | Effect::HideConfirmation => {
            outputs.pending_tx.send_replace(panel.pending_confirmation().cloned());
        }
    }
}

/// One task per connection attempt: connect, report open, then pump frames
/// both ways until either side stops.
fn spawn_socket(
    url: String,
    queue_tx: mpsc::Sender<DriverMessage>,
) -> (JoinHandle<()>, mpsc::UnboundedSender<String>) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let handle = tokio::spawn(async move {
        let report = |event: PanelEvent| {
            let tx = queue_tx.clone();
            async move {
                let _ = tx.send(DriverMessage::Event(event)).await;
            }
        };

        let ws_stream = match connect_async(url.as_str()).await {
            Ok((ws_stream, _response)) => ws_stream,
            Err(e) => {
                report(PanelEvent::TransportError(e.to_string())).await;
                return;
            }
        };
        report(PanelEvent::TransportOpened).await;

        let (mut write, mut read) = ws_stream.split();
        loop {
            tokio::select! {
                outgoing = out_rx.recv() => match outgoing {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            report(PanelEvent::TransportError(e.to_string())).await;
                            break;
                        }
                    }
                    None => {
                        let _ = write.close().await;
                        break;
                    }
                },
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => report(PanelEvent::TransportMessage(text)).await,
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((1005, String::new()));
                        report(PanelEvent::TransportClosed { code, reason }).await;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        report(PanelEvent::TransportError(e.to_string())).await;
                        break;
                    }
                    None => {
                        report(PanelEvent::TransportClosed { code: 1006, reason: "stream ended".to_string() }).await;
                        break;
                    }
                },
            }
        }
    });

    (handle, out_tx)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
