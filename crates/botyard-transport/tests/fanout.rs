use std::time::Duration;

use botyard_core::{BotConfig, ChannelId, Message, Transport};
use botyard_transport::MemoryHub;

#[tokio::test]
async fn test_every_joined_bot_sees_each_message_in_order() {
    let hub = MemoryHub::new();
    let general = ChannelId::new("general");

    let mut inboxes = Vec::new();
    for id in ["math", "recipe", "health"] {
        let mut conn = hub
            .connect(&BotConfig::new(id, id, format!("{id}_bot")))
            .await
            .unwrap();
        conn.inbox.join(&general).await.unwrap();
        inboxes.push(conn.inbox);
    }

    assert_eq!(hub.post(Message::new("general", "first")), 3);
    hub.post(Message::new("general", "second").with_tag("math"));

    for inbox in &mut inboxes {
        let mut seen = Vec::new();
        for _ in 0..2 {
            let msg = tokio::time::timeout(Duration::from_secs(1), inbox.recv())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            seen.push(msg.content);
        }
        assert_eq!(seen, ["first", "second"]);
    }
}

#[tokio::test]
async fn test_joining_twice_does_not_duplicate() {
    let hub = MemoryHub::new();
    let general = ChannelId::new("general");
    let mut conn = hub
        .connect(&BotConfig::new("math", "Math", "math_bot"))
        .await
        .unwrap();
    conn.inbox.join(&general).await.unwrap();
    conn.inbox.join(&general).await.unwrap();

    hub.post(Message::new("general", "once"));
    hub.post(Message::new("general", "twice"));

    let first = conn.inbox.recv().await.unwrap().unwrap();
    let second = conn.inbox.recv().await.unwrap().unwrap();
    assert_eq!(first.content, "once");
    assert_eq!(second.content, "twice");
}
