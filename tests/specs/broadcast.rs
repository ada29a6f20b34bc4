use crate::prelude::*;

#[tokio::test]
async fn tag_broadcast_reaches_each_matched_session_independently() {
    let console = Console::start().await;
    let mut a = console.agent().await;
    let mut b = console.agent().await;
    let _c = console.agent().await;
    console.wait_sessions(3).await;

    console.registry.tag_all("s-1", "web");
    console.registry.tag_all("s-2", "web");

    let reached = console
        .registry
        .broadcast("web", &console.command("echo hi"));
    assert_eq!(reached, 2);

    assert_eq!(a.expect_command().await, "echo hi\n");
    assert_eq!(b.expect_command().await, "echo hi\n");

    a.respond("hi from a\n").await;
    b.respond("hi from b\n").await;

    console.wait_deliveries(2).await;
    let mut results: Vec<(String, Option<String>)> = console
        .sink
        .delivered
        .lock()
        .iter()
        .map(|(id, _, result)| (id.clone(), result.clone()))
        .collect();
    results.sort();
    assert_eq!(
        results,
        vec![
            ("s-1".to_string(), Some("hi from a\n".to_string())),
            ("s-2".to_string(), Some("hi from b\n".to_string())),
        ]
    );
}

#[tokio::test]
async fn commands_reach_one_session_in_fifo_order() {
    let console = Console::start().await;
    let mut agent = console.agent().await;
    console.wait_sessions(1).await;

    console.registry.broadcast("s-1", &console.command("whoami"));
    console.registry.broadcast("s-1", &console.command("id"));

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
async fn broadcast_to_an_unknown_tag_is_a_silent_no_op() {
    let console = Console::start().await;
    let _agent = console.agent().await;
    console.wait_sessions(1).await;

    assert_eq!(
        console.registry.broadcast("nope", &console.command("whoami")),
        0
    );
}

#[tokio::test]
async fn quoted_tags_match_their_bare_form() {
    let console = Console::start().await;
    let mut agent = console.agent().await;
    console.wait_sessions(1).await;
    console.registry.tag_all("s-1", "web");

    let reached = console
        .registry
        .broadcast("\"web\"", &console.command("whoami"));
    assert_eq!(reached, 1);
    assert_eq!(agent.expect_command().await, "whoami\n");
}
