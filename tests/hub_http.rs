mod common;

use std::time::Duration;

use common::{closed_port, stub_hub};
use mf_notify::contract::{ConnectionProfile, HubClient};
use mf_notify::hub::MonkeyFarmClient;
use mf_notify::NotifyError;

const ALICE: &str = r#"{"data": {"user": {"label": "alice", "email": "alice@example.com"}}}"#;

fn profile(url: &str) -> ConnectionProfile {
    ConnectionProfile {
        user: "alice".to_string(),
        api_key: "s3cret".to_string(),
        url: url.to_string(),
    }
}

#[tokio::test]
async fn connect_sends_credentials_and_lists_builds() {
    let (url, seen) = stub_hub(vec![
        ("/user/alice.json", 200, ALICE),
        (
            "/tag/testing.json",
            200,
            r#"{"data": {"tag": {"builds": ["php53u-5.3.6-1.ius", "git-1.7.4-2.ius"]}}}"#,
        ),
    ])
    .await;

    let client = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(5))
        .await
        .expect("authentication should succeed");
    let builds = client.list_tagged_builds("testing", "ius").await.unwrap();

    assert_eq!(builds, vec!["php53u-5.3.6-1.ius", "git-1.7.4-2.ius"]);
    let seen = seen.lock().unwrap();
    assert!(seen[0].starts_with("GET /user/alice.json?"), "{seen:?}");
    assert!(seen[0].contains("_login=alice") && seen[0].contains("_api_key=s3cret"));
    assert!(seen[1].contains("project_label=ius"), "{seen:?}");
    assert!(seen[1].contains("_api_key=s3cret"), "{seen:?}");
}

#[tokio::test]
async fn rejected_credentials_are_an_auth_error() {
    let (url, _) = stub_hub(vec![("/user/", 401, r#"{"error": "bad api key"}"#)]).await;

    let err = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(5))
        .await
        .err()
        .expect("authentication must fail");
    match err {
        NotifyError::Auth { user, message } => {
            assert_eq!(user, "alice");
            assert!(message.contains("bad api key"), "{message}");
        }
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[tokio::test]
async fn build_lookup_maps_status_codes() {
    let (url, _) = stub_hub(vec![
        ("/user/alice.json", 200, ALICE),
        (
            "/build/git-1.7.4-2.ius.json",
            200,
            r#"{"data": {"build": {"user_label": "bob", "status_label": "complete", "update_date": "2024-02-10 00:00:00", "releases": ["el6"]}}}"#,
        ),
        ("/build/broken.json", 500, "database is down"),
    ])
    .await;
    let client = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(5))
        .await
        .unwrap();

    let build = client.get_build("git-1.7.4-2.ius", "ius").await.unwrap();
    assert_eq!(build.packager, "bob");
    assert_eq!(build.update_date, "2024-02-10 00:00:00");

    match client.get_build("ghost", "ius").await.unwrap_err() {
        NotifyError::NotFound { kind, id } => {
            assert_eq!(kind, "build");
            assert_eq!(id, "ghost");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }

    match client.get_build("broken", "ius").await.unwrap_err() {
        NotifyError::Remote { status, message } => {
            assert_eq!(status, "500");
            assert_eq!(message, "database is down");
        }
        other => panic!("expected Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn user_email_lookup() {
    let (url, _) = stub_hub(vec![
        ("/user/alice.json", 200, ALICE),
        ("/user/bob.json", 200, r#"{"data": {"user": {"email": "bob@example.com"}}}"#),
    ])
    .await;
    let client = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(client.get_user_email("bob").await.unwrap(), "bob@example.com");
    assert!(matches!(
        client.get_user_email("carol").await.unwrap_err(),
        NotifyError::NotFound { kind: "user", .. }
    ));
}

#[tokio::test]
async fn unreachable_hub_is_a_remote_error() {
    let url = format!("http://127.0.0.1:{}", closed_port());

    let err = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(2))
        .await
        .err()
        .expect("nothing is listening");
    assert!(matches!(err, NotifyError::Remote { .. }), "got {err:?}");
}

#[tokio::test]
async fn unknown_tag_is_a_remote_error() {
    let (url, _) = stub_hub(vec![("/user/alice.json", 200, ALICE)]).await;
    let client = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(5))
        .await
        .unwrap();

    match client.list_tagged_builds("nosuchtag", "ius").await.unwrap_err() {
        NotifyError::Remote { status, message } => {
            assert_eq!(status, "404");
            assert!(message.contains("nosuchtag"), "{message}");
        }
        other => panic!("expected Remote, got {other:?}"),
    }
}

#[tokio::test]
async fn build_ids_are_sent_as_one_escaped_segment() {
    let (url, seen) = stub_hub(vec![("/user/alice.json", 200, ALICE)]).await;
    let client = MonkeyFarmClient::connect(&profile(&url), Duration::from_secs(5))
        .await
        .unwrap();

    let err = client.get_build("odd/id?x#y", "ius").await.unwrap_err();
    assert!(
        matches!(&err, NotifyError::NotFound { kind: "build", id } if id == "odd/id?x#y"),
        "got {err:?}"
    );

    let seen = seen.lock().unwrap();
    let line = seen.last().expect("build request was made");
    assert!(
        line.starts_with("GET /build/odd%2Fid%3Fx%23y.json?"),
        "{line}"
    );
    assert!(line.contains("project_label=ius"), "{line}");
}
