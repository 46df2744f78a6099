use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use syccbot::ccbot::BotState;
use syccbot::ccbot::submission::{Outcome, Submitter, process_submission};
use syccbot::ccdb;
use syccbot::config::Config;
use syccbot::models::{ChallengeSolution, NewChallenge, User};

const ADMIN: i64 = 1000;

const PASSING_REPORT: &str = "...\n\
    ----------------------------------------------------------------------\n\
    Ran 3 tests in 0.004s\n\
    \n\
    OK\n";

const FAILING_REPORT: &str = "F..\n\
    ======================================================================\n\
    FAIL: test_sum (tests.TestSum)\n\
    ----------------------------------------------------------------------\n\
    AssertionError: 3 != 4\n\
    \n\
    ----------------------------------------------------------------------\n\
    Ran 3 tests in 0.002s\n\
    \n\
    FAILED (failures=1)\n";

fn state(dir: &TempDir, server: &MockServer) -> BotState {
    let vars = [
        ("TELEGRAM_TOKEN", String::from("123:abc")),
        ("DEVELOPER_CHAT_ID", ADMIN.to_string()),
        ("GLOT_URL", format!("{}/run", server.uri())),
        ("GLOT_AUTHORIZATION", String::from("Token test")),
        ("DB_PATH", dir.path().join("bot.db").display().to_string()),
        ("GRADING_TIMEOUT_SECS", String::from("5")),
    ];

    let config = Config::from_lookup(|key| {
        vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    })
    .unwrap();

    BotState::new(config).unwrap()
}

async fn grading_replies(server: &MockServer, stderr: &str) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stdout": "", "stderr": stderr })))
        .mount(server)
        .await;
}

async fn add_challenge(state: &BotState) -> i64 {
    ccdb::challenges::insert_challenge(&state.db, &NewChallenge {
        description: String::from("Add two numbers"),
        solution: ChallengeSolution::default(),
        tests: String::from("import unittest\nfrom user_code import add"),
    })
    .unwrap();

    state.active.reload(&state.db).await.unwrap().unwrap().id
}

fn register(state: &BotState, chat_id: i64, username: &str) {
    ccdb::users::insert_user(&state.db, &User {
        chat_id,
        username: Some(username.to_string()),
        full_name: username.to_string(),
        solved_challenges: vec![],
        points: 0,
    })
    .unwrap();
}

fn submitter(chat_id: i64, name: &str) -> Submitter {
    Submitter { chat_id, display_name: name.to_string() }
}

#[tokio::test]
async fn test_no_active_challenge_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stderr": "OK\n" })))
        .expect(0)
        .mount(&server)
        .await;

    let state = state(&dir, &server);
    register(&state, 1, "ada");

    let verdict = process_submission(&state, &submitter(1, "@ada"), "def add(a, b): return a + b")
        .await
        .unwrap();

    assert_eq!(verdict, None);
    assert_eq!(ccdb::users::query_user(&state.db, 1).unwrap().unwrap().points, 0);
}

#[tokio::test]
async fn test_first_solve_awards_one_point_and_resubmission_updates_record() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    grading_replies(&server, PASSING_REPORT).await;

    let state = state(&dir, &server);
    let challenge_id = add_challenge(&state).await;
    register(&state, 1, "ada");

    let verdict = process_submission(&state, &submitter(1, "@ada"), "def add(a, b):\n    return a + b")
        .await
        .unwrap()
        .unwrap();

    assert!(verdict.solved());
    assert_eq!(verdict.outcome, Outcome::Solved { result: 0.004, first_solve: true });
    assert_eq!(verdict.output, "---\nRan 3 tests in 0.004s\n\nOK\n");

    let verdict = process_submission(&state, &submitter(1, "@ada"), "add=lambda a,b:a+b")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(verdict.outcome, Outcome::Solved { result: 0.004, first_solve: false });

    let user = ccdb::users::query_user(&state.db, 1).unwrap().unwrap();
    assert_eq!(user.solved_challenges, vec![challenge_id]);
    assert_eq!(user.points, 1);

    let record = ccdb::solvers::query_solver(&state.db, challenge_id, 1).unwrap().unwrap();
    assert_eq!(record.solution, "add=lambda a,b:a+b");
    assert_eq!(record.code_length, 18);
    assert_eq!(ccdb::solvers::query_fastest(&state.db, challenge_id, 10).unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_runs_are_never_counted() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    grading_replies(&server, PASSING_REPORT).await;

    let state = state(&dir, &server);
    let challenge_id = add_challenge(&state).await;
    register(&state, ADMIN, "admin");

    let verdict = process_submission(&state, &submitter(ADMIN, "@admin"), "def add(a, b): return a + b")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(verdict.outcome, Outcome::AdminRun);
    assert!(!verdict.solved());
    assert!(ccdb::solvers::query_solver(&state.db, challenge_id, ADMIN).unwrap().is_none());
    assert_eq!(ccdb::users::query_user(&state.db, ADMIN).unwrap().unwrap().points, 0);
}

#[tokio::test]
async fn test_failing_run_shows_trimmed_report_and_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    grading_replies(&server, FAILING_REPORT).await;

    let state = state(&dir, &server);
    let challenge_id = add_challenge(&state).await;
    register(&state, 1, "ada");

    let verdict = process_submission(&state, &submitter(1, "@ada"), "def add(a, b): return a - b")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(verdict.outcome, Outcome::Failed);
    assert!(verdict.output.starts_with("---\nAssertionError: 3 != 4"));
    assert!(verdict.output.ends_with("FAILED (failures=1)\n"));
    assert!(ccdb::solvers::query_fastest(&state.db, challenge_id, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_passing_report_without_timing_is_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    grading_replies(&server, "all good\nOK\n").await;

    let state = state(&dir, &server);
    let challenge_id = add_challenge(&state).await;
    register(&state, 1, "ada");

    let verdict = process_submission(&state, &submitter(1, "@ada"), "print(1)")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(verdict.outcome, Outcome::Untimed);
    assert!(ccdb::solvers::query_solver(&state.db, challenge_id, 1).unwrap().is_none());
}

#[tokio::test]
async fn test_grading_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let state = state(&dir, &server);
    let challenge_id = add_challenge(&state).await;

    let result = process_submission(&state, &submitter(1, "@ada"), "print(1)").await;

    assert!(result.is_err());
    assert!(ccdb::solvers::query_solver(&state.db, challenge_id, 1).unwrap().is_none());
}
