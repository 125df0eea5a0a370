use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use ragstream_chat::{ChatApp, ChatConfig, ChatError, ChatUpdate, OverlapPolicy};
use ragstream_client::{
    decode_events, EventStream, QueryBackend, QueryRequest, Source, StreamError,
};
use tokio::sync::mpsc;

type Read = Result<Vec<u8>, std::io::Error>;

enum Script {
    /// Complete body, delivered in one read
    Answer(&'static str),
    /// Body that never ends after its first read
    Hang(&'static str),
    Status(u16),
}

/// Backend that replays a scripted response per question
struct ScriptedBackend {
    scripts: Mutex<Vec<(&'static str, Script)>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(scripts: Vec<(&'static str, Script)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            questions: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn query_stream(&self, request: QueryRequest) -> ragstream_client::Result<EventStream> {
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            let index = scripts
                .iter()
                .position(|(question, _)| *question == request.query)
                .expect("unexpected question");
            scripts.remove(index).1
        };
        self.questions.lock().unwrap().push(request.query);

        match script {
            Script::Answer(body) => {
                let reads: Vec<Read> = vec![Ok(body.as_bytes().to_vec())];
                Ok(decode_events(futures::stream::iter(reads)))
            }
            Script::Hang(first) => {
                let reads: Vec<Read> = vec![Ok(first.as_bytes().to_vec())];
                Ok(decode_events(
                    futures::stream::iter(reads).chain(futures::stream::pending()),
                ))
            }
            Script::Status(status) => Err(StreamError::Connection {
                status: Some(status),
                message: format!("HTTP error! Status: {}", status),
            }),
        }
    }
}

const HELLO: &str = concat!(
    "{\"type\":\"chunk\",\"content\":\"Hel\"}\n",
    "{\"type\":\"chunk\",\"content\":\"lo\"}\n",
    "{\"type\":\"images\",\"content\":[\"img/1.png\"]}\n",
    "{\"type\":\"final\",\"sources\":[{\"title\":\"doc1\"}]}\n",
);

fn drain(rx: &mut mpsc::UnboundedReceiver<ChatUpdate>) -> Vec<ChatUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

fn config(policy: OverlapPolicy) -> ChatConfig {
    ChatConfig {
        overlap_policy: policy,
        ..ChatConfig::default()
    }
}

#[tokio::test]
async fn test_answer_is_streamed_and_recorded() {
    let backend = ScriptedBackend::new(vec![("hello", Script::Answer(HELLO))]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(backend.clone(), &ChatConfig::default(), tx).unwrap();

    app.ask("  hello  ").await.unwrap();
    app.wait().await;

    assert_eq!(
        drain(&mut rx),
        vec![
            ChatUpdate::Chunk("Hel".to_string()),
            ChatUpdate::Chunk("lo".to_string()),
            ChatUpdate::Images(vec!["img/1.png".to_string()]),
            ChatUpdate::Sources(vec![Source::titled("doc1")]),
            ChatUpdate::Finished,
        ]
    );

    let history = app.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "hello");
    assert_eq!(history[0].answer, "Hello");
    assert_eq!(history[0].images, vec!["img/1.png"]);
    assert_eq!(*backend.questions.lock().unwrap(), vec!["hello"]);
    assert_eq!(app.transcript(true).await, "USER: hello\nASSISTANT: Hello");
}

#[tokio::test]
async fn test_blank_question_is_ignored() {
    let backend = ScriptedBackend::new(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(backend.clone(), &ChatConfig::default(), tx).unwrap();

    app.ask("   ").await.unwrap();
    app.wait().await;

    assert!(drain(&mut rx).is_empty());
    assert!(backend.questions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_keeps_partial_answer_visible() {
    let backend = ScriptedBackend::new(vec![(
        "hello",
        Script::Answer(concat!(
            "{\"type\":\"chunk\",\"content\":\"partial\"}\n",
            "{\"type\":\"error\",\"message\":\"boom\"}\n",
        )),
    )]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(backend, &ChatConfig::default(), tx).unwrap();

    app.ask("hello").await.unwrap();
    app.wait().await;

    assert_eq!(
        drain(&mut rx),
        vec![
            ChatUpdate::Chunk("partial".to_string()),
            ChatUpdate::Failed(
                "Sorry, there was an error processing your request: boom".to_string()
            ),
        ]
    );
    assert!(app.history().await.is_empty());
}

#[tokio::test]
async fn test_connection_error_is_reported() {
    let backend = ScriptedBackend::new(vec![("hello", Script::Status(503))]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(backend, &ChatConfig::default(), tx).unwrap();

    app.ask("hello").await.unwrap();
    app.wait().await;

    assert_eq!(
        drain(&mut rx),
        vec![ChatUpdate::Failed(
            "Sorry, there was an error processing your request: HTTP error! Status: 503"
                .to_string()
        )]
    );
}

#[tokio::test]
async fn test_reject_policy_refuses_second_question() {
    let backend = ScriptedBackend::new(vec![
        ("first", Script::Hang("{\"type\":\"chunk\",\"content\":\"thinking\"}\n")),
        ("second", Script::Answer(HELLO)),
    ]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(backend.clone(), &config(OverlapPolicy::Reject), tx).unwrap();

    app.ask("first").await.unwrap();
    tokio::task::yield_now().await;
    let second = app.ask("second").await;
    assert!(matches!(second, Err(ChatError::SlotBusy)));

    app.cancel().await;
    app.wait().await;

    assert_eq!(drain(&mut rx).last(), Some(&ChatUpdate::Cancelled));
    assert!(!backend.questions.lock().unwrap().iter().any(|q| q == "second"));
    assert!(app.history().await.is_empty());
}

#[tokio::test]
async fn test_cancel_and_replace_policy() {
    let backend = ScriptedBackend::new(vec![
        ("first", Script::Hang("{\"type\":\"chunk\",\"content\":\"thinking\"}\n")),
        ("second", Script::Answer(HELLO)),
    ]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(
        backend.clone(),
        &config(OverlapPolicy::CancelAndReplace),
        tx,
    )
    .unwrap();

    app.ask("first").await.unwrap();
    tokio::task::yield_now().await;
    app.ask("second").await.unwrap();
    app.wait().await;

    let updates = drain(&mut rx);
    let cancelled = updates
        .iter()
        .position(|u| *u == ChatUpdate::Cancelled)
        .expect("first question should be cancelled");
    let finished = updates
        .iter()
        .position(|u| *u == ChatUpdate::Finished)
        .expect("second question should finish");
    assert!(cancelled < finished);

    let history = app.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].question, "second");
}

#[tokio::test]
async fn test_history_persists_only_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let transient = ChatConfig {
        history_path: path.clone(),
        ..ChatConfig::default()
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(ScriptedBackend::new(vec![("hello", Script::Answer(HELLO))]), &transient, tx).unwrap();
    app.ask("hello").await.unwrap();
    app.wait().await;
    assert!(!path.exists());

    let persistent = ChatConfig {
        persist: true,
        ..transient
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(ScriptedBackend::new(vec![("hello", Script::Answer(HELLO))]), &persistent, tx).unwrap();
    app.ask("hello").await.unwrap();
    app.wait().await;
    assert!(path.exists());

    let (tx, _rx) = mpsc::unbounded_channel();
    let restored = ChatApp::new(ScriptedBackend::new(vec![]), &persistent, tx).unwrap();
    let history = restored.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].answer, "Hello");

    restored.clear().await.unwrap();
    let (tx, _rx) = mpsc::unbounded_channel();
    let reopened = ChatApp::new(ScriptedBackend::new(vec![]), &persistent, tx).unwrap();
    assert!(reopened.history().await.is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_a_hanging_answer() {
    let backend = ScriptedBackend::new(vec![(
        "first",
        Script::Hang("{\"type\":\"chunk\",\"content\":\"thinking\"}\n"),
    )]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = ChatApp::new(backend, &ChatConfig::default(), tx).unwrap();

    app.ask("first").await.unwrap();
    tokio::task::yield_now().await;

    tokio::time::timeout(std::time::Duration::from_secs(5), app.shutdown())
        .await
        .expect("shutdown should not wait for the stalled backend");

    assert_eq!(drain(&mut rx).last(), Some(&ChatUpdate::Cancelled));
    assert!(app.history().await.is_empty());
}
