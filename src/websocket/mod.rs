use std::sync::Arc;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio_tungstenite::tungstenite;

use crate::handlers::PollApp;
use crate::models::websocket::{
    InteractionEnvelope, RegisterBotMessage, RegisterBotMessageData, ResponseEnvelope,
};

pub struct WsHandle {
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl WsHandle {
    pub fn shutdown(self) {
        info!("Shutting down WebSocket");
        let _ = self.shutdown_tx.send(());
    }

    /// Waits until the connection is closed by either side.
    pub async fn closed(&mut self) {
        if let Err(e) = (&mut self.task).await {
            error!("WebSocket task failed: {}", e);
        }
    }
}

pub async fn run_websocket(
    ws_url: &str,
    bot_name: &str,
    token: &str,
    app: Arc<PollApp>,
) -> Result<WsHandle, anyhow::Error> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url).await?;
    info!("WebSocket connection established: {}", ws_url);

    let (mut sink, mut stream) = ws_stream.split();

    let register_message = serde_json::to_string(&RegisterBotMessage {
        msg_type: "REGISTER_BOT",
        data: RegisterBotMessageData { bot_name, token },
    })?;
    sink.send(tungstenite::Message::text(register_message))
        .await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let task = tokio::spawn(async move {
        tokio::select! {
            _ = async {
                // Interactions are handled one at a time, in arrival order.
                while let Some(msg) = stream.next().await {
                    let msg = match msg {
                        Ok(msg) => msg,
                        Err(e) => {
                            error!("WebSocket error: {}", e);
                            break;
                        }
                    };
                    let text = match msg {
                        tungstenite::Message::Text(text) => text,
                        tungstenite::Message::Close(_) => break,
                        _ => continue,
                    };

                    let envelope = match serde_json::from_str::<InteractionEnvelope>(&text) {
                        Ok(envelope) => envelope,
                        Err(e) => {
                            warn!("Received invalid message: {}", e);
                            continue;
                        }
                    };
                    debug!("Handling request {}", envelope.request_id);

                    let response = ResponseEnvelope {
                        request_id: envelope.request_id,
                        response: app.handle(envelope.interaction).await,
                    };
                    match serde_json::to_string(&response) {
                        Ok(reply) => {
                            if let Err(e) = sink.send(tungstenite::Message::text(reply)).await {
                                error!("Failed to send response: {}", e);
                                break;
                            }
                        }
                        Err(e) => error!("Failed to encode response: {}", e),
                    }
                }
            } => {
                info!("WebSocket stream ended");
            },

            _ = shutdown_rx => {
                info!("WebSocket shutdown requested");
            }
        }

        sink.close().await.ok();
    });

    Ok(WsHandle { shutdown_tx, task })
}
