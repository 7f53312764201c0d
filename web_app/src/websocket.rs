use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use motor_link::{
    Action, ConnectionState, ControlId, Effect, Notification, Panel, PanelConfig, PanelEvent,
    PendingConfirmation, UiState,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

/// Browser host for the panel engine.
///
/// Owns the engine, the socket and the timers, and mirrors the engine's
/// output into signals for the components. Every input (socket callback,
/// timer, button) goes through [`PanelManager::dispatch`].
#[derive(Clone, Copy)]
pub struct PanelManager {
    pub ui: ReadSignal<UiState>,
    set_ui: WriteSignal<UiState>,
    pub connection: ReadSignal<ConnectionState>,
    set_connection: WriteSignal<ConnectionState>,
    /// The single visible toast
    pub notification: ReadSignal<Option<Notification>>,
    set_notification: WriteSignal<Option<Notification>>,
    /// Confirmation dialog contents, if one is open
    pub pending: ReadSignal<Option<PendingConfirmation>>,
    set_pending: WriteSignal<Option<PendingConfirmation>>,
    pub config: StoredValue<PanelConfig>,
    panel: StoredValue<Panel>,
    ws: StoredValue<Option<WebSocket>, LocalStorage>,
    reconnect_timer: StoredValue<Option<TimeoutHandle>, LocalStorage>,
}

impl PanelManager {
    pub fn new() -> Self {
        let config = PanelConfig::default();
        let url = device_url(&config);
        log::info!("Device endpoint: {}", url);

        let panel = Panel::new(config.clone(), url, now_ms());
        let (ui, set_ui) = signal(panel.ui().clone());
        let (connection, set_connection) = signal(panel.connection_state());
        let (notification, set_notification) = signal::<Option<Notification>>(None);
        let (pending, set_pending) = signal::<Option<PendingConfirmation>>(None);

        let manager = Self {
            ui,
            set_ui,
            connection,
            set_connection,
            notification,
            set_notification,
            pending,
            set_pending,
            panel: StoredValue::new(panel),
            ws: StoredValue::new_local(None),
            reconnect_timer: StoredValue::new_local(None),
            config: StoredValue::new(config.clone()),
        };

        // Liveness check runs for the lifetime of the page
        if let Err(e) = set_interval_with_handle(
            move || manager.dispatch(PanelEvent::LivenessTick),
            config.liveness_interval(),
        ) {
            log::error!("Failed to start liveness timer: {:?}", e);
        }

        manager.dispatch(PanelEvent::Connect);
        manager
    }

    /// Feed one event to the engine and carry out what it asks for.
    pub fn dispatch(&self, event: PanelEvent) {
        let now = now_ms();
        let effects = self
            .panel
            .try_update_value(|panel| panel.handle(event, now))
            .unwrap_or_default();
        for effect in effects {
            self.apply(effect);
        }
    }

    pub fn submit(&self, action: Action) {
        self.dispatch(PanelEvent::Action(action));
    }

    pub fn begin_edit(&self, control: ControlId) {
        self.dispatch(PanelEvent::BeginEdit(control));
    }

    pub fn cancel_edit(&self, control: ControlId) {
        self.dispatch(PanelEvent::CancelEdit(control));
    }

    pub fn preview_target(&self, motor: usize, target: i32) {
        self.dispatch(PanelEvent::PreviewTarget { motor, target });
    }

    pub fn confirm(&self) {
        self.dispatch(PanelEvent::Confirm);
    }

    pub fn cancel(&self) {
        self.dispatch(PanelEvent::Cancel);
    }

    /// Manual reconnect from the status bar.
    pub fn reconnect(&self) {
        self.dispatch(PanelEvent::Connect);
    }

    pub fn dismiss_notification(&self) {
        if let Some(n) = self.notification.get_untracked() {
            self.dispatch(PanelEvent::NotificationExpired(n.id));
        }
    }

    fn apply(&self, effect: Effect) {
        let manager = *self;
        match effect {
            Effect::OpenTransport { url } => self.open_socket(&url),
            Effect::CloseTransport => self.close_socket(),
            Effect::Send(text) => match self.ws.get_value() {
                Some(ws) => {
                    if let Err(e) = ws.send_with_str(&text) {
                        log::error!("Failed to send: {:?}", e);
                    }
                }
                None => log::warn!("No socket for outgoing message"),
            },
            Effect::ScheduleReconnect { delay } => {
                self.clear_reconnect_timer();
                match set_timeout_with_handle(move || manager.dispatch(PanelEvent::ReconnectDue), delay) {
                    Ok(handle) => self.reconnect_timer.set_value(Some(handle)),
                    Err(e) => log::error!("Failed to schedule reconnect: {:?}", e),
                }
            }
            Effect::CancelReconnect => self.clear_reconnect_timer(),
            Effect::ConnectionChanged(state) => self.set_connection.set(state),
            Effect::StateChanged => {
                if let Some(ui) = self.panel.try_with_value(|panel| panel.ui().clone()) {
                    self.set_ui.set(ui);
                }
            }
            Effect::ShowNotification(notification) => self.set_notification.set(Some(notification)),
            Effect::ScheduleDismiss { id, after } => {
                set_timeout(move || manager.dispatch(PanelEvent::NotificationExpired(id)), after);
            }
            Effect::HideNotification => self.set_notification.set(None),
            Effect::ShowConfirmation(pending) => self.set_pending.set(Some(pending)),
            Effect::HideConfirmation => self.set_pending.set(None),
        }
    }

    fn clear_reconnect_timer(&self) {
        if let Some(handle) = self.reconnect_timer.get_value() {
            handle.clear();
        }
        self.reconnect_timer.set_value(None);
    }

    fn open_socket(&self, url: &str) {
        // a late event from the old socket must not reach the new session
        self.close_socket();

        let ws = match WebSocket::new(url) {
            Ok(ws) => ws,
            Err(e) => {
                log::error!("Failed to create WebSocket: {:?}", e);
                self.dispatch(PanelEvent::TransportError(format!("{:?}", e)));
                return;
            }
        };
        let manager = *self;

        // On open
        let onopen_callback = Closure::wrap(Box::new(move |_| {
            manager.dispatch(PanelEvent::TransportOpened);
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onopen(Some(onopen_callback.as_ref().unchecked_ref()));
        onopen_callback.forget();

        // On message - the controller only sends text frames
        let onmessage_callback = Closure::wrap(Box::new(move |e: MessageEvent| {
            match e.data().as_string() {
                Some(text) => manager.dispatch(PanelEvent::TransportMessage(text)),
                None => log::debug!("Ignoring non-text frame"),
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage_callback.as_ref().unchecked_ref()));
        onmessage_callback.forget();

        // On error
        let onerror_callback = Closure::wrap(Box::new(move |e: ErrorEvent| {
            manager.dispatch(PanelEvent::TransportError(e.message()));
        }) as Box<dyn FnMut(ErrorEvent)>);
        ws.set_onerror(Some(onerror_callback.as_ref().unchecked_ref()));
        onerror_callback.forget();

        // On close
        let onclose_callback = Closure::wrap(Box::new(move |e: CloseEvent| {
            manager.dispatch(PanelEvent::TransportClosed {
                code: e.code(),
                reason: e.reason(),
            });
        }) as Box<dyn FnMut(CloseEvent)>);
        ws.set_onclose(Some(onclose_callback.as_ref().unchecked_ref()));
        onclose_callback.forget();

        self.ws.set_value(Some(ws));
    }

    fn close_socket(&self) {
        if let Some(ws) = self.ws.get_value() {
            ws.set_onopen(None);
            ws.set_onmessage(None);
            ws.set_onerror(None);
            ws.set_onclose(None);
            let _ = ws.close();
        }
        self.ws.set_value(None);
    }
}

/// `ws://` or `wss://` to the host that served the page.
fn device_url(config: &PanelConfig) -> String {
    let location = window().location();
    let scheme = location.protocol().unwrap_or_else(|_| "http:".to_string());
    let host = location.host().unwrap_or_else(|_| "192.168.4.1".to_string());
    config.endpoint(&scheme, &host)
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}
