//! E2E: load → initialize → bind scenarios.
//!
//! 1. Artifact resolves, `init` succeeds → `eval_rs` bound and callable
//! 2. Artifact request rejects → diagnostic, `eval_rs` unbound
//! 3. Artifact resolves, `init` fails → diagnostic, `eval_rs` unbound
//! 4. Two sessions run independently

use evalrs_runtime::{
    ArtifactLoadError, EvalError, FileSource, HostSession, InitializationError, LoadFailure,
    LoadState, LoaderConfig, MemorySource, Value,
};

use crate::fixtures::{counted_artifact, ArtifactFile, InitBehavior, CallCounter};

fn file_source(file: &ArtifactFile) -> FileSource {
    let config = LoaderConfig {
        artifact: file.path().to_path_buf(),
        fuel: Some(1_000_000),
        ..LoaderConfig::default()
    };
    FileSource::from_config(&config)
}

// ---------------------------------------------------------------------------
// Successful load
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_wasm_module_binds_eval_rs() {
    let file = ArtifactFile::calculator(InitBehavior::Succeed).unwrap();
    let mut session = HostSession::default();

    assert_eq!(session.boot(&file_source(&file)).await, LoadState::Ready);
    assert!(session.namespace().is_bound("eval_rs"));
    assert_eq!(session.evaluate("1 + 2 * 3").unwrap(), Value::Number(6.0));
    assert_eq!(session.evaluate("z").unwrap(), Value::Undefined);
    assert_eq!(session.namespace().writes(), 1);
}

#[tokio::test]
async fn test_native_module_binds_eval_rs() {
    let counter = CallCounter::new();
    let mut session = HostSession::default();
    let source = MemorySource::ready(counted_artifact(&counter, false, false));

    assert_eq!(session.boot(&source).await, LoadState::Ready);
    assert_eq!(session.evaluate(" 42 ").unwrap(), Value::Number(42.0));
    assert!(matches!(session.evaluate("z^2"), Err(EvalError::Fault(_))));
    assert_eq!(counter.creates(), 1);
    assert_eq!(counter.inits(), 1);
    assert_eq!(counter.evaluations(), 2);
}

// ---------------------------------------------------------------------------
// Artifact request failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_artifact_leaves_eval_rs_unbound() {
    let mut session = HostSession::default();
    let source = FileSource::new("/nonexistent/pkg/calculator.wasm");

    assert_eq!(session.boot(&source).await, LoadState::Errored);
    assert!(matches!(
        session.failure(),
        Some(LoadFailure::Artifact(ArtifactLoadError::Fetch { .. }))
    ));
    assert!(matches!(
        session.evaluate("1"),
        Err(EvalError::UndefinedReference(_))
    ));
    assert_eq!(session.namespace().writes(), 0);
}

#[tokio::test]
async fn test_simulated_network_failure() {
    let mut session = HostSession::default();
    let source = MemorySource::failing(ArtifactLoadError::Fetch {
        location: String::from("http://localhost:8000/index.js"),
        reason: String::from("connection refused"),
    });

    assert_eq!(session.boot(&source).await, LoadState::Errored);
    let failure = session.failure().unwrap();
    assert_eq!(failure.stage(), "loading module artifact");
    assert!(failure.to_string().contains("connection refused"));
    assert!(session.namespace().names().is_empty());
}

#[tokio::test]
async fn test_corrupt_artifact_is_load_failure() {
    let file = ArtifactFile::write("calculator.wasm", b"\0asm garbage").unwrap();
    let mut session = HostSession::default();

    assert_eq!(session.boot(&file_source(&file)).await, LoadState::Errored);
    assert!(matches!(
        session.failure(),
        Some(LoadFailure::Artifact(ArtifactLoadError::Compile(_)))
    ));
    assert!(!session.namespace().is_bound("eval_rs"));
}

// ---------------------------------------------------------------------------
// Initialization failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_init_status_failure_leaves_eval_rs_unbound() {
    let file = ArtifactFile::calculator(InitBehavior::Status(3)).unwrap();
    let mut session = HostSession::default();

    assert_eq!(session.boot(&file_source(&file)).await, LoadState::Errored);
    match session.failure() {
        Some(LoadFailure::Initialization(InitializationError::Init(fault))) => {
            assert!(fault.message().contains("status 3"));
        }
        other => panic!("unexpected failure: {:?}", other),
    }
    assert!(!session.namespace().is_bound("eval_rs"));
    assert!(session.loader().app().is_none());
    assert!(session.loader().artifact().is_none());
}

#[tokio::test]
async fn test_init_trap_leaves_eval_rs_unbound() {
    let file = ArtifactFile::calculator(InitBehavior::Trap).unwrap();
    let mut session = HostSession::default();

    assert_eq!(session.boot(&file_source(&file)).await, LoadState::Errored);
    assert_eq!(
        session.failure().unwrap().stage(),
        "initializing application instance"
    );
    assert!(matches!(
        session.evaluate("1"),
        Err(EvalError::UndefinedReference(_))
    ));
}

#[tokio::test]
async fn test_binding_exists_iff_sequence_succeeds() {
    let cases = [
        (true, false, false),
        (true, true, false),
        (true, false, true),
        (false, false, false),
    ];
    for (resolves, fail_create, fail_init) in cases {
        let counter = CallCounter::new();
        let mut session = HostSession::default();
        let source = if resolves {
            MemorySource::ready(counted_artifact(&counter, fail_create, fail_init))
        } else {
            MemorySource::failing(ArtifactLoadError::Compile(String::from("bad magic")))
        };

        let state = session.boot(&source).await;
        // A second boot is ignored.
        session.boot(&source).await;

        let succeeded = resolves && !fail_create && !fail_init;
        assert_eq!(state == LoadState::Ready, succeeded);
        assert_eq!(session.namespace().is_bound("eval_rs"), succeeded);
        assert!(session.namespace().writes() <= 1);
        assert!(counter.creates() <= 1);
        assert!(counter.inits() <= 1);
        if fail_create {
            assert_eq!(counter.inits(), 0);
        }
    }
}

// ---------------------------------------------------------------------------
// Independent process lifetimes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sessions_are_independent() {
    let file = ArtifactFile::calculator(InitBehavior::Succeed).unwrap();
    let mut healthy = HostSession::default();
    let mut broken = HostSession::default();

    let failing = MemorySource::failing(ArtifactLoadError::Fetch {
        location: String::from("/index.js"),
        reason: String::from("offline"),
    });
    assert_eq!(broken.boot(&failing).await, LoadState::Errored);
    assert_eq!(healthy.boot(&file_source(&file)).await, LoadState::Ready);

    assert_eq!(healthy.evaluate("9").unwrap(), Value::Number(9.0));
    assert!(matches!(
        broken.evaluate("9"),
        Err(EvalError::UndefinedReference(_))
    ));
}

#[tokio::test]
async fn test_reload_after_failure_uses_fresh_session() {
    let file = ArtifactFile::calculator(InitBehavior::Succeed).unwrap();

    let mut first = HostSession::default();
    let missing = FileSource::new(file.path().with_extension("missing"));
    assert_eq!(first.boot(&missing).await, LoadState::Errored);

    let mut second = HostSession::default();
    assert_eq!(second.boot(&file_source(&file)).await, LoadState::Ready);
    assert_eq!(second.evaluate("5").unwrap(), Value::Number(5.0));
    assert_eq!(first.state(), LoadState::Errored);
}
