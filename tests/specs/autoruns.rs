use crate::prelude::*;

use drover_core::ConnectPolicy;

#[tokio::test]
async fn autoruns_for_the_default_tag_fire_at_connect() {
    let policy = ConnectPolicy::new();
    policy.set_default_tag(Some("red".to_string()));
    policy.set_autoruns("red", vec!["whoami".to_string(), "id".to_string()]);
    let console = Console::start_with(policy).await;

    let mut agent = console.agent().await;
    console.wait_sessions(1).await;

    // Both autoruns arrive, in list order, before anything else.
    assert_eq!(agent.expect_command().await, "whoami\n");
    agent.respond("root\n").await;
    assert_eq!(agent.expect_command().await, "id\n");
    agent.respond("uid=0(root)\n").await;

    console.wait_deliveries(2).await;
    let texts: Vec<String> = console
        .sink
        .delivered
        .lock()
        .iter()
        .map(|(_, text, _)| text.clone())
        .collect();
    assert_eq!(texts, vec!["whoami", "id"]);
}

#[tokio::test]
async fn autoruns_precede_operator_commands() {
    let policy = ConnectPolicy::new();
    policy.set_default_tag(Some("red".to_string()));
    policy.set_autoruns("red", vec!["whoami".to_string()]);
    let console = Console::start_with(policy).await;

    let mut agent = console.agent().await;
    console.wait_sessions(1).await;
    console
        .registry
        .broadcast("red", &console.command("hostname"));

    assert_eq!(agent.expect_command().await, "whoami\n");
    agent.respond("root\n").await;
    assert_eq!(agent.expect_command().await, "hostname\n");
}

#[tokio::test]
async fn autoruns_set_after_connect_do_not_fire_retroactively() {
    let console = Console::start().await;
    let _agent = console.agent().await;
    console.wait_sessions(1).await;

    console
        .policy
        .set_autoruns("127.0.0.1", vec!["whoami".to_string()]);
    let mut late = console.agent().await;
    console.wait_sessions(2).await;

    // Only the session connected after the table change runs the autorun.
    assert_eq!(late.expect_command().await, "whoami\n");
    let delivered = console.sink.delivered.lock().clone();
    assert!(delivered.is_empty());
}
