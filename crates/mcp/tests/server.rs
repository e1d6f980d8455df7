//! End-to-end behaviour of the serve loop over in-memory pipes.

use futures::future;
use pcmcp::{
    Dispatcher, Registry, ServeError, Server, ServerInfo, Session, Tool,
    error::{HANDLER_ERROR, INVALID_PARAMS, TOOL_NOT_FOUND},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    io,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{Notify, oneshot},
};

#[derive(Debug, Deserialize, JsonSchema)]
struct FolderParams {
    folder_id: u64,
}

/// Counts how often its handler actually runs.
struct ListFolder {
    calls: Arc<AtomicUsize>,
}

impl Tool for ListFolder {
    type Params = FolderParams;

    fn name(&self) -> &str {
        "list_folder"
    }

    fn description(&self) -> &str {
        "List a folder"
    }

    async fn call(&self, _session: &Session, _params: FolderParams) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"result": 0, "contents": []}))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SleepParams {
    ms: u64,
}

struct Sleep {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    started: Arc<Notify>,
}

impl Tool for Sleep {
    type Params = SleepParams;

    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "Sleep, then report how long"
    }

    async fn call(&self, _session: &Session, params: SleepParams) -> anyhow::Result<Value> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();
        tokio::time::sleep(Duration::from_millis(params.ms)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(json!({ "slept": params.ms }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NoParams {}

struct Broken;

impl Tool for Broken {
    type Params = NoParams;

    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn call(&self, _session: &Session, _params: NoParams) -> anyhow::Result<Value> {
        anyhow::bail!("upstream unavailable")
    }
}

struct Fixture {
    server: Server,
    calls: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    started: Arc<Notify>,
}

fn fixture(max_in_flight: usize) -> Fixture {
    let calls = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Notify::new());
    let registry = Registry::builder()
        .tool(ListFolder {
            calls: Arc::clone(&calls),
        })
        .unwrap()
        .tool(Sleep {
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
            started: Arc::clone(&started),
        })
        .unwrap()
        .tool(Broken)
        .unwrap()
        .build();
    let dispatcher = Dispatcher::new(
        registry,
        ServerInfo::new("pCloud MCP Server", "0.1.0"),
        Arc::new(Session::default()),
    );
    Fixture {
        server: Server::new(dispatcher).with_max_in_flight(max_in_flight),
        calls,
        peak,
        started,
    }
}

async fn run(server: &Server, input: &str) -> Vec<Value> {
    let mut output = Vec::new();
    server
        .serve(input.as_bytes(), &mut output, future::pending())
        .await
        .unwrap();
    parse_lines(&output)
}

fn parse_lines(output: &[u8]) -> Vec<Value> {
    let text = std::str::from_utf8(output).unwrap();
    assert!(text.is_empty() || text.ends_with('\n'), "unterminated output: {text:?}");
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn initialize_handshake() {
    let fixture = fixture(1);
    let lines = run(&fixture.server, "{\"id\":1,\"method\":\"initialize\"}\n").await;
    assert_eq!(
        lines,
        vec![json!({
            "id": 1,
            "result": {
                "serverInfo": {"name": "pCloud MCP Server", "version": "0.1.0"},
                "capabilities": {}
            }
        })]
    );
}

#[tokio::test]
async fn unknown_tool_is_reported() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        "{\"id\":3,\"type\":\"tool\",\"tool\":\"nonexistent\",\"params\":{}}\n",
    )
    .await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["id"], json!(3));
    assert_eq!(lines[0]["error"]["code"], json!(TOOL_NOT_FOUND));
    assert!(lines[0].get("result").is_none());
    assert_eq!(fixture.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tool_call_returns_handler_value() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        "{\"id\":2,\"type\":\"tool\",\"tool\":\"list_folder\",\"params\":{\"folder_id\":0}}\n",
    )
    .await;
    assert_eq!(
        lines,
        vec![json!({"id": 2, "result": {"result": 0, "contents": []}})]
    );
    assert_eq!(fixture.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_params_never_reach_the_handler() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        concat!(
            "{\"id\":1,\"tool\":\"list_folder\",\"params\":{}}\n",
            "{\"id\":2,\"tool\":\"list_folder\",\"params\":{\"folder_id\":\"root\"}}\n",
        ),
    )
    .await;
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert_eq!(line["error"]["code"], json!(INVALID_PARAMS));
    }
    assert_eq!(fixture.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_line_is_skipped() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        "{not json\n\n{\"id\":2,\"method\":\"ping\"}\n",
    )
    .await;
    assert_eq!(lines, vec![json!({"id": 2, "result": {}})]);
}

#[tokio::test]
async fn handler_failure_does_not_stop_the_loop() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        "{\"id\":1,\"tool\":\"broken\"}\n{\"id\":2,\"method\":\"ping\"}\n",
    )
    .await;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["error"]["code"], json!(HANDLER_ERROR));
    assert_eq!(
        lines[0]["error"]["message"],
        json!("tool 'broken' failed: upstream unavailable")
    );
    assert_eq!(lines[1]["id"], json!(2));
}

#[tokio::test]
async fn notifications_are_silent() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        concat!(
            "{\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}\n",
        ),
    )
    .await;
    assert_eq!(lines, vec![json!({"jsonrpc": "2.0", "id": 9, "result": {}})]);
}

#[tokio::test]
async fn last_line_without_newline_is_served() {
    let fixture = fixture(1);
    let lines = run(&fixture.server, "{\"id\":5,\"method\":\"ping\"}").await;
    assert_eq!(lines, vec![json!({"id": 5, "result": {}})]);
}

#[tokio::test]
async fn concurrent_requests_answer_in_request_order() {
    let fixture = fixture(4);
    let lines = run(
        &fixture.server,
        concat!(
            "{\"id\":1,\"tool\":\"sleep\",\"params\":{\"ms\":60}}\n",
            "{\"id\":2,\"tool\":\"sleep\",\"params\":{\"ms\":20}}\n",
            "{\"id\":3,\"tool\":\"sleep\",\"params\":{\"ms\":0}}\n",
            "{\"id\":4,\"method\":\"ping\"}\n",
        ),
    )
    .await;
    let ids: Vec<_> = lines.iter().map(|line| line["id"].clone()).collect();
    assert_eq!(ids, [json!(1), json!(2), json!(3), json!(4)]);
    assert!(fixture.peak.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn default_handles_one_request_at_a_time() {
    let fixture = fixture(1);
    let lines = run(
        &fixture.server,
        concat!(
            "{\"id\":1,\"tool\":\"sleep\",\"params\":{\"ms\":10}}\n",
            "{\"id\":2,\"tool\":\"sleep\",\"params\":{\"ms\":0}}\n",
        ),
    )
    .await;
    assert_eq!(lines.len(), 2);
    assert_eq!(fixture.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_before_input_writes_nothing() {
    let fixture = fixture(1);
    let mut output = Vec::new();
    fixture
        .server
        .serve(
            &b"{\"id\":1,\"method\":\"ping\"}\n"[..],
            &mut output,
            future::ready(()),
        )
        .await
        .unwrap();
    assert!(output.is_empty());
}

#[tokio::test]
async fn shutdown_drains_in_flight_requests() {
    let fixture = fixture(1);
    let (mut client, input) = tokio::io::duplex(1024);
    let (sink, mut output) = tokio::io::duplex(64 * 1024);
    let (stop, stopped) = oneshot::channel::<()>();

    let serve = fixture.server.serve(input, sink, async {
        let _ = stopped.await;
    });
    let drive = async {
        client
            .write_all(b"{\"id\":1,\"tool\":\"sleep\",\"params\":{\"ms\":50}}\n")
            .await
            .unwrap();
        fixture.started.notified().await;
        stop.send(()).unwrap();
        client
            .write_all(b"{\"id\":2,\"method\":\"ping\"}\n")
            .await
            .unwrap();
        client
    };

    let (result, _client) = tokio::join!(serve, drive);
    result.unwrap();

    let mut written = Vec::new();
    output.read_to_end(&mut written).await.unwrap();
    assert_eq!(
        parse_lines(&written),
        vec![json!({"id": 1, "result": {"slept": 50}})]
    );
}

struct ClosedPipe;

impl AsyncWrite for ClosedPipe {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn write_failure_is_fatal() {
    let fixture = fixture(1);
    let err = fixture
        .server
        .serve(
            &b"{\"id\":1,\"method\":\"ping\"}\n{\"id\":2,\"method\":\"ping\"}\n"[..],
            ClosedPipe,
            future::pending(),
        )
        .await
        .unwrap_err();
    let ServeError::Transport(source) = err;
    assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
}
