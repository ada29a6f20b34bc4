use crate::prelude::*;

#[tokio::test]
async fn connecting_agent_is_registered_with_seed_tags() {
    let console = Console::start().await;
    let _agent = console.agent().await;
    console.wait_sessions(1).await;

    let session = &console.registry.sessions()[0];
    assert_eq!(session.id().as_str(), "s-1");
    assert_eq!(session.peer_addr(), "127.0.0.1");
    assert_eq!(session.tags(), vec!["s-1", "127.0.0.1"]);
    assert!(session.alive());
}

#[tokio::test]
async fn default_tag_applies_to_sessions_connected_while_set() {
    let console = Console::start().await;

    console.policy.set_default_tag(Some("red".to_string()));
    let _a = console.agent().await;
    console.wait_sessions(1).await;

    console.policy.set_default_tag(None);
    let _b = console.agent().await;
    console.wait_sessions(2).await;

    let sessions = console.registry.sessions();
    assert!(sessions[0].has_tag("red"));
    assert!(!sessions[1].has_tag("red"));
}

#[tokio::test]
async fn disconnect_by_id_tag_closes_the_connection() {
    let console = Console::start().await;
    let mut agent = console.agent().await;
    console.wait_sessions(1).await;

    let session = console.registry.sessions()[0].clone();
    console.registry.remove_all_by_tag("s-1");

    assert!(!session.alive());
    assert!(console.registry.is_empty());
    agent.expect_closed().await;
}

#[tokio::test]
async fn wildcard_disconnect_closes_every_connection() {
    let console = Console::start().await;
    let mut a = console.agent().await;
    let mut b = console.agent().await;
    console.wait_sessions(2).await;

    console.registry.remove_all_by_tag("*");

    assert!(console.registry.is_empty());
    a.expect_closed().await;
    b.expect_closed().await;
}

#[tokio::test]
async fn agent_dropping_its_connection_removes_the_session() {
    let console = Console::start().await;
    let agent = console.agent().await;
    console.wait_sessions(1).await;

    // Queue a command so the dispatch loop touches the dead socket.
    drop(agent);
    console
        .registry
        .broadcast("s-1", &console.command("whoami"));

    wait_for(|| console.registry.is_empty()).await;
    assert!(console.sink.delivered.lock().is_empty());
}

#[tokio::test]
async fn one_dead_connection_does_not_disturb_the_others() {
    let console = Console::start().await;
    let dead = console.agent().await;
    let mut live = console.agent().await;
    console.wait_sessions(2).await;

    drop(dead);
    console.registry.broadcast("*", &console.command("whoami"));

    assert_eq!(live.expect_command().await, "whoami\n");
    live.respond("root\n").await;

    console.wait_deliveries(1).await;
    wait_for(|| console.registry.len() == 1).await;
    let delivered = console.sink.delivered.lock().clone();
    assert_eq!(delivered, vec![(
        "s-2".to_string(),
        "whoami".to_string(),
        Some("root\n".to_string()),
    )]);
}
