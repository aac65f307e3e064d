#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use agentdash_api::config::ServerConfig;
use agentdash_api::router::build_app_router;
use agentdash_api::state::AppState;

/// Stand-in for the agent CLI. Understands the three subcommands the
/// dashboard uses. Agent `broken` fails to run and agent `slow` takes
/// three seconds to create.
pub const FAKE_CLI: &str = r#"cmd="$1"
shift
case "$cmd" in
  agent-list)
    echo "Loading agents..."
    echo "['reasoner', 'summarizer']"
    ;;
  run)
    shift
    name="$1"
    shift
    if [ "$name" = "broken" ]; then
      echo "agent 'broken' crashed: missing dataflow.yml" >&2
      exit 3
    fi
    echo "agent=$name"
    for arg in "$@"; do
      echo "input=$arg"
    done
    echo "progress: done" >&2
    ;;
  new-agent)
    if [ "$1" = "slow" ]; then
      sleep 3
    fi
    mkdir "$1" || exit 1
    echo "created $1"
    ;;
  *)
    echo "unknown command: $cmd" >&2
    exit 2
    ;;
esac
"#;

/// A router wired to a fake CLI inside a private temp directory.
pub struct TestApp {
    pub router: Router,
    pub agents_dir: PathBuf,
    pub artifact_dir: PathBuf,
    _root: TempDir,
}

impl TestApp {
    /// Number of script artifacts currently on disk.
    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(&self.artifact_dir)
            .map(|it| it.count())
            .unwrap_or(0)
    }
}

/// Build a test `ServerConfig` pointing at `cli_script`.
///
/// The script is run through `sh` rather than executed directly so tests
/// never exec a file that was just written.
pub fn test_config(root: &Path, cli_script: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        agent_cli: format!("sh {}", cli_script.display()),
        agents_dir: root.join("agents"),
        script_interpreter: "sh".to_string(),
        artifact_dir: root.join("artifacts"),
        invocation_timeout_secs: None,
        max_concurrent_invocations: None,
        max_output_bytes: 1024 * 1024,
        create_agent_template: None,
    }
}

/// Build the full application router around the default fake CLI.
pub fn build_test_app() -> TestApp {
    build_test_app_with(FAKE_CLI, |_| {})
}

/// Build the full application router around `cli_body`, letting the caller
/// adjust the config first.
///
/// Uses [`build_app_router`] so tests exercise the same middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) as production.
pub fn build_test_app_with(cli_body: &str, customize: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let root = tempfile::tempdir().expect("tempdir");
    let cli_script = root.path().join("fake-cli.sh");
    std::fs::write(&cli_script, cli_body).expect("write fake cli");

    let mut config = test_config(root.path(), &cli_script);
    customize(&mut config);
    std::fs::create_dir_all(&config.agents_dir).expect("create agents dir");

    let agents_dir = config.agents_dir.clone();
    let artifact_dir = config.artifact_dir.clone();
    let state = AppState::from_config(&config).expect("app state");

    TestApp {
        router: build_app_router(state, &config),
        agents_dir,
        artifact_dir,
        _root: root,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST `body` verbatim with a JSON content type.
pub async fn post_raw(app: Router, uri: &str, body: &'static str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
