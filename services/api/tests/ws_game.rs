use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};
use thereis_api::{
    router::create_router,
    state::AppState,
    ws::protocol::{ClientMessage, ServerMessage},
};
use thereis_core::{
    ContentProvider, GenerationError, PhaseKind, RoundContent, SentenceItem, SessionSnapshot,
    content::SERVICE_FAILURE_MESSAGE,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Hands out pre-scripted results in order.
struct ScriptedProvider {
    results: Mutex<VecDeque<Result<RoundContent, GenerationError>>>,
}

#[async_trait]
impl ContentProvider for ScriptedProvider {
    async fn request_round(&self) -> Result<RoundContent, GenerationError> {
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::ServiceError("script exhausted".into())))
    }
}

fn dog_and_apples() -> RoundContent {
    RoundContent {
        image: "data:image/png;base64,aGVsbG8=".to_string(),
        sentences: vec![
            SentenceItem::new("There is a dog", true),
            SentenceItem::new("There are three apples", false),
        ],
    }
}

async fn spawn_server(results: Vec<Result<RoundContent, GenerationError>>) -> SocketAddr {
    let state = Arc::new(AppState {
        content_provider: Arc::new(ScriptedProvider {
            results: Mutex::new(results.into()),
        }),
        round_timeout: Duration::from_secs(5),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    client
}

async fn send(client: &mut Client, msg: ClientMessage) {
    let text = serde_json::to_string(&msg).unwrap();
    client
        .send(tungstenite::Message::Text(text.into()))
        .await
        .unwrap();
}

async fn receive(client: &mut Client) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("server did not answer in time")
            .expect("connection closed")
            .unwrap();
        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn receive_state(client: &mut Client) -> SessionSnapshot {
    match receive(client).await {
        ServerMessage::State { snapshot } => snapshot,
        other => panic!("expected a state message, got {:?}", other),
    }
}

async fn request(client: &mut Client, msg: ClientMessage) -> SessionSnapshot {
    send(client, msg).await;
    receive_state(client).await
}

#[tokio::test]
async fn test_full_round_over_websocket() {
    let addr = spawn_server(vec![Ok(dog_and_apples())]).await;
    let mut client = connect(addr).await;

    assert_eq!(receive_state(&mut client).await.phase, PhaseKind::Start);

    let loading = request(&mut client, ClientMessage::Start).await;
    assert_eq!(loading.phase, PhaseKind::Loading);
    let playing = receive_state(&mut client).await;
    assert_eq!(playing.phase, PhaseKind::Playing);
    assert_eq!(playing.sentence.as_deref(), Some("There is a dog"));
    assert_eq!(playing.total_questions, Some(2));

    let result = request(&mut client, ClientMessage::SubmitAnswer { choice: true }).await;
    assert_eq!(result.phase, PhaseKind::ShowingResult);
    assert_eq!(result.last_answer_correct, Some(true));
    assert_eq!(result.score, 1);

    // A second answer to the same question is refused and does not score.
    send(&mut client, ClientMessage::SubmitAnswer { choice: true }).await;
    assert!(matches!(
        receive(&mut client).await,
        ServerMessage::Rejected { .. }
    ));

    let next = request(&mut client, ClientMessage::Advance).await;
    assert_eq!(next.phase, PhaseKind::Playing);
    assert_eq!(next.question_number, Some(2));
    assert!(next.is_last_question);

    request(&mut client, ClientMessage::SubmitAnswer { choice: false }).await;
    let over = request(&mut client, ClientMessage::Advance).await;
    assert_eq!(over.phase, PhaseKind::GameOver);
    assert_eq!(over.score, 2);
    assert_eq!(over.total_questions, Some(2));
}

#[tokio::test]
async fn test_failed_generation_then_retry() {
    let addr = spawn_server(vec![
        Err(GenerationError::ContentUnavailable("no image".into())),
        Ok(dog_and_apples()),
    ])
    .await;
    let mut client = connect(addr).await;
    receive_state(&mut client).await;

    request(&mut client, ClientMessage::Start).await;
    let failed = receive_state(&mut client).await;
    assert_eq!(failed.phase, PhaseKind::Error);
    assert_eq!(failed.error_message.as_deref(), Some(SERVICE_FAILURE_MESSAGE));
    assert_eq!(failed.image, None);

    let retry = request(&mut client, ClientMessage::Start).await;
    assert_eq!(retry.phase, PhaseKind::Loading);
    assert_eq!(retry.error_message, None);
    assert_eq!(receive_state(&mut client).await.phase, PhaseKind::Playing);
}

#[tokio::test]
async fn test_invalid_messages_are_rejected() {
    let addr = spawn_server(vec![]).await;
    let mut client = connect(addr).await;
    receive_state(&mut client).await;

    send(&mut client, ClientMessage::Advance).await;
    assert!(matches!(
        receive(&mut client).await,
        ServerMessage::Rejected { .. }
    ));

    client
        .send(tungstenite::Message::Text("{\"type\": \"cheat\"}".to_string().into()))
        .await
        .unwrap();
    match receive(&mut client).await {
        ServerMessage::Rejected { message } => assert!(message.contains("Unrecognized")),
        other => panic!("expected rejection, got {:?}", other),
    }
}
