//! Manages the WebSocket connection lifecycle for a game session.

use super::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use thereis_core::{GameController, controller::RoundOutcome};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Instrument, debug, error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "game_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id: u32 = rand::random();
    tracing::Span::current().record("session_id", session_id);
    info!("New game connection.");

    if let Err(e) = run_game_session(socket, state).await {
        error!(error = ?e, "Game session terminated with error.");
    }
    info!("Game session finished.");
}

/// The main event loop for a game session.
///
/// The controller is owned by this loop alone. Round requests run on a
/// spawned task and report back through a channel, so the loop keeps serving
/// the client while content is being generated.
async fn run_game_session(socket: WebSocket, state: Arc<AppState>) -> Result<()> {
    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut controller =
        GameController::new(state.content_provider.clone()).with_timeout(state.round_timeout);
    let (outcome_tx, mut outcome_rx) = mpsc::channel::<RoundOutcome>(4);
    let mut pending_round = PendingRound::default();

    send_msg(
        &mut socket_tx,
        ServerMessage::State {
            snapshot: controller.snapshot(),
        },
    )
    .await?;

    loop {
        tokio::select! {
            // Handle messages from the client WebSocket.
            msg_result = socket_rx.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => apply_client_message(&mut controller, msg, &outcome_tx, &mut pending_round),
                            Err(e) => {
                                warn!("Ignoring unparseable client message: {}", e);
                                ServerMessage::Rejected { message: format!("Unrecognized message: {}", e) }
                            }
                        };
                        send_msg(&mut socket_tx, reply).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed the connection.");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            },
            // Handle finished round requests.
            Some(outcome) = outcome_rx.recv() => {
                if controller.complete(outcome) {
                    send_msg(&mut socket_tx, ServerMessage::State { snapshot: controller.snapshot() }).await?;
                }
            },
        }
    }

    Ok(())
}

/// The in-flight round request of a session. Dropping it aborts the task,
/// so every exit from the session loop cancels outstanding generation.
#[derive(Default)]
struct PendingRound(Option<JoinHandle<()>>);

impl PendingRound {
    fn set(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.0.replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for PendingRound {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            debug!("Aborting pending round request.");
            handle.abort();
        }
    }
}

/// Applies one client message to the controller and builds the reply.
fn apply_client_message(
    controller: &mut GameController,
    msg: ClientMessage,
    outcome_tx: &mpsc::Sender<RoundOutcome>,
    pending_round: &mut PendingRound,
) -> ServerMessage {
    debug!(?msg, "Client message received");
    let result = match msg {
        ClientMessage::Start => controller.start().map(|request| {
            let tx = outcome_tx.clone();
            let handle = tokio::spawn(
                async move {
                    let outcome = request.fetch().await;
                    if tx.send(outcome).await.is_err() {
                        warn!("Session ended before the round arrived.");
                    }
                }
                .in_current_span(),
            );
            pending_round.set(handle);
        }),
        ClientMessage::SubmitAnswer { choice } => controller.submit_answer(choice).map(|_| ()),
        ClientMessage::Advance => controller.advance().map(|_| ()),
    };

    match result {
        Ok(()) => ServerMessage::State {
            snapshot: controller.snapshot(),
        },
        Err(e) => ServerMessage::Rejected {
            message: e.to_string(),
        },
    }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
