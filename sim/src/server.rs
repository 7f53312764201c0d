use std::error::Error;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use motor_link::CommandEnvelope;

use crate::config::SimConfig;
use crate::device::{Device, Reply};

pub const WS_PATH: &str = "/ws";

type Shared = Arc<Mutex<Device>>;

pub async fn serve(config: SimConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Simulated controller listening on ws://{}{}", addr, WS_PATH);
    serve_listener(listener, config).await
}

/// Serve on an already-bound listener. Runs until the listener fails.
pub async fn serve_listener(
    listener: TcpListener,
    config: SimConfig,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut device = Device::new(config.motor_count, config.reported_ip.clone());
    device.latest_version = config.latest_version.clone();
    device.firmware_url = config.firmware_url.clone();
    device.littlefs_url = config.littlefs_url.clone();
    let device: Shared = Arc::new(Mutex::new(device));

    let (broadcast_tx, _) = broadcast::channel::<String>(100);

    // motion and update progress
    let step_device = Arc::clone(&device);
    let step_tx = broadcast_tx.clone();
    let step = config.step;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(step);
        loop {
            ticker.tick().await;
            let snapshot = {
                let mut device = step_device.lock().await;
                device.step().then(|| device.snapshot().to_string())
            };
            if let Some(snapshot) = snapshot {
                let _ = step_tx.send(snapshot);
            }
        }
    });

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let device = Arc::clone(&device);
        let broadcast_tx = broadcast_tx.clone();
        tokio::spawn(async move {
            info!("Client connected from {}", peer);
            if let Err(e) = handle_client(socket, device, broadcast_tx).await {
                warn!("Client {} ended with error: {}", peer, e);
            }
            info!("Client {} disconnected", peer);
        });
    }
}

fn check_path(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    if request.uri().path() == WS_PATH {
        return Ok(response);
    }
    let mut rejection = ErrorResponse::new(Some(format!("no WebSocket endpoint at {}", request.uri().path())));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}

async fn handle_client(
    socket: TcpStream,
    device: Shared,
    broadcast_tx: broadcast::Sender<String>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let ws_stream = accept_hdr_async(socket, check_path).await?;
    let (mut write, mut read) = ws_stream.split();

    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<String>();
    let mut broadcast_rx = broadcast_tx.subscribe();

    let writer = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(text) => text,
                    None => break,
                },
                shared = broadcast_rx.recv() => match shared {
                    Ok(text) => text,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged {} state broadcasts", n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if write.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = read.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let envelope = match CommandEnvelope::decode(&text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Ignoring unparseable command {}: {}", text, e);
                continue;
            }
        };
        if !envelope.command.is_polling() {
            debug!("Received {}", text);
        }

        let (reply, snapshot) = {
            let mut device = device.lock().await;
            let reply = device.apply(&envelope.command);
            (reply, device.snapshot().to_string())
        };
        match reply {
            Reply::State => {
                let _ = broadcast_tx.send(snapshot);
            }
            Reply::Direct(value) => {
                let _ = direct_tx.send(value.to_string());
            }
            Reply::Nothing => {}
        }
    }

    writer.abort();
    Ok(())
}
