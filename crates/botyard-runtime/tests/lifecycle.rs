use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use botyard_core::{
    Bot, BotConfig, BoxedTransport, ChannelId, Cleanup, CleanupError, Connection, Inbox,
    Message, Outbox, Replies, ResponseError, ResponseResult, Transport, TransportResult,
    is_addressed,
};
use botyard_runtime::{BotInstance, BotOutcome, InstanceId, LifecycleManager, WorkerState};
use botyard_transport::{Emission, MemoryHub};
use tokio::sync::broadcast;

#[derive(Clone, Copy)]
enum CleanupBehavior {
    None,
    Succeed,
    Fail,
    Panic,
}

struct EchoBot {
    config: BotConfig,
    marker: String,
    cleanup: CleanupBehavior,
    cleanups: Arc<AtomicUsize>,
}

impl EchoBot {
    fn new(id: &str, cleanup: CleanupBehavior) -> Self {
        Self {
            config: BotConfig::new(id, format!("{id} bot"), "echo_bot"),
            marker: format!("<!--{id}-->"),
            cleanup,
            cleanups: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Bot for EchoBot {
    fn config(&self) -> &BotConfig {
        &self.config
    }

    fn should_respond_to(&self, message: &Message) -> bool {
        let trigger = format!("@{}", self.config.bot_id);
        is_addressed(message, &self.config.bot_id, &trigger, Some(&self.marker))
    }

    async fn generate_response(
        &self,
        message: &Message,
        replies: &Replies,
    ) -> ResponseResult<String> {
        if message.content.contains("fail") {
            return Err(ResponseError::Llm("upstream said no".into()));
        }
        if message.content.contains("panic") {
            panic!("bot exploded");
        }
        if message.content.contains("unusable") {
            return Err(ResponseError::Unusable("model revoked".into()));
        }
        if message.content.contains("ack") {
            replies.acknowledge("working...").await?;
        }
        Ok(format!("echo: {}", message.content))
    }

    fn suppression_marker(&self) -> Option<&str> {
        Some(&self.marker)
    }

    fn cleanup(&self) -> Option<&dyn Cleanup> {
        match self.cleanup {
            CleanupBehavior::None => None,
            _ => Some(self),
        }
    }
}

#[async_trait]
impl Cleanup for EchoBot {
    async fn cleanup(&self) -> Result<(), CleanupError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        match self.cleanup {
            CleanupBehavior::Fail => Err(CleanupError::Failed("disk full".into())),
            CleanupBehavior::Panic => panic!("cleanup exploded"),
            _ => Ok(()),
        }
    }
}

fn instance(index: usize, bot: EchoBot) -> (BotInstance, Arc<AtomicUsize>) {
    let cleanups = Arc::clone(&bot.cleanups);
    let id = InstanceId::new(&bot.config.bot_id.clone(), index);
    (BotInstance::new(id, "echo", Arc::new(bot), "echo.toml"), cleanups)
}

async fn next_emission(rx: &mut broadcast::Receiver<Emission>) -> Emission {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no emission within 2s")
        .unwrap()
}

/// Posts until the bot's inbox has joined, using a ping message the bot ignores.
async fn wait_until_listening(hub: &MemoryHub, receivers: usize) {
    for _ in 0..200 {
        if hub.post(Message::new("general", "ping")) >= receivers {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("bots never joined");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_all_workers_stop_and_clean_up_once() {
    let hub = MemoryHub::new();
    let manager = LifecycleManager::new(Arc::new(hub.clone()) as BoxedTransport)
        .with_stop_grace(Duration::from_secs(2));

    let behaviors = [
        CleanupBehavior::Succeed,
        CleanupBehavior::Fail,
        CleanupBehavior::Panic,
        CleanupBehavior::Succeed,
    ];
    let mut instances = Vec::new();
    let mut counters = Vec::new();
    for (index, behavior) in behaviors.into_iter().enumerate() {
        let (inst, count) = instance(index, EchoBot::new(&format!("bot{index}"), behavior));
        instances.push(inst);
        counters.push(count);
    }

    let running = manager.start(instances);
    assert_eq!(running.len(), 4);
    assert_eq!(running.live_workers(), 4);

    wait_until_listening(&hub, 4).await;
    assert!(
        running
            .snapshot()
            .iter()
            .all(|s| s.state == WorkerState::Running && s.crashed.is_none())
    );

    let report = running.shutdown().await;
    assert_eq!(report.len(), 4);
    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    let outcomes: Vec<_> = report.entries().iter().map(|e| e.outcome.clone()).collect();
    assert_eq!(outcomes[0], BotOutcome::Stopped);
    assert!(matches!(&outcomes[1], BotOutcome::CleanupFailed { reason } if reason.contains("disk full")));
    assert!(matches!(&outcomes[2], BotOutcome::CleanupFailed { reason } if reason.contains("cleanup exploded")));
    assert_eq!(outcomes[3], BotOutcome::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_response_is_emitted_with_marker() {
    let hub = MemoryHub::new();
    let mut emissions = hub.subscribe_emissions();
    let manager = LifecycleManager::new(Arc::new(hub.clone()) as BoxedTransport);
    let (inst, _) = instance(0, EchoBot::new("echo", CleanupBehavior::None));
    let running = manager.start(vec![inst]);
    wait_until_listening(&hub, 1).await;

    hub.post(Message::new("general", "@echo ack hi"));
    let ack = next_emission(&mut emissions).await;
    assert_eq!(ack.event.content, "<!--echo-->working...");
    let reply = next_emission(&mut emissions).await;
    assert_eq!(reply.bot_id, "echo");
    assert_eq!(reply.event.channel_id, ChannelId::new("general"));
    assert_eq!(reply.event.content, "<!--echo-->echo: @echo ack hi");

    // Explicit addressing through tags works without the trigger.
    hub.post(Message::new("general", "hello there").with_tag("echo"));
    let tagged = next_emission(&mut emissions).await;
    assert_eq!(tagged.event.content, "<!--echo-->echo: hello there");

    let report = running.shutdown().await;
    assert!(report.all_clean());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_are_reported_and_the_loop_continues() {
    let hub = MemoryHub::new();
    let mut emissions = hub.subscribe_emissions();
    let manager = LifecycleManager::new(Arc::new(hub.clone()) as BoxedTransport);
    let (inst, _) = instance(0, EchoBot::new("echo", CleanupBehavior::None));
    let running = manager.start(vec![inst]);
    wait_until_listening(&hub, 1).await;

    hub.post(Message::new("general", "@echo fail"));
    let failed = next_emission(&mut emissions).await;
    assert_eq!(
        failed.event.content,
        "<!--echo-->**echo bot Error:** language model request failed: upstream said no"
    );

    hub.post(Message::new("general", "@echo panic"));
    let panicked = next_emission(&mut emissions).await;
    assert!(panicked.event.content.contains("**echo bot Error:**"));

    hub.post(Message::new("general", "@echo still here"));
    let reply = next_emission(&mut emissions).await;
    assert_eq!(reply.event.content, "<!--echo-->echo: @echo still here");

    assert_eq!(running.live_workers(), 1);
    assert!(running.shutdown().await.all_clean());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_crash_is_isolated() {
    let hub = MemoryHub::new();
    let mut emissions = hub.subscribe_emissions();
    let manager = LifecycleManager::new(Arc::new(hub.clone()) as BoxedTransport);
    let (doomed, doomed_cleanups) = instance(0, EchoBot::new("doomed", CleanupBehavior::Succeed));
    let (steady, _) = instance(1, EchoBot::new("steady", CleanupBehavior::None));
    let running = manager.start(vec![doomed, steady]);
    wait_until_listening(&hub, 2).await;

    hub.post(Message::new("general", "@doomed unusable"));
    for _ in 0..200 {
        if running.live_workers() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(running.live_workers(), 1);
    assert!(running.snapshot()[0].crashed.is_some());

    hub.post(Message::new("general", "@steady ping"));
    let reply = next_emission(&mut emissions).await;
    assert_eq!(reply.bot_id, "steady");

    let report = running.shutdown().await;
    assert!(matches!(
        report.entries()[0].outcome,
        BotOutcome::Crashed { .. }
    ));
    assert_eq!(report.entries()[1].outcome, BotOutcome::Stopped);
    assert_eq!(doomed_cleanups.load(Ordering::SeqCst), 1);
}

/// A transport whose join never completes, so its worker cannot stop.
struct StuckTransport;

struct StuckInbox;

#[async_trait]
impl Inbox for StuckInbox {
    async fn join(&mut self, _channel: &ChannelId) -> TransportResult<()> {
        std::future::pending().await
    }

    async fn recv(&mut self) -> TransportResult<Option<Message>> {
        std::future::pending().await
    }

    async fn close(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Transport for StuckTransport {
    fn name(&self) -> &'static str {
        "stuck"
    }

    async fn connect(&self, _config: &BotConfig) -> TransportResult<Connection> {
        let (outbox, _events) = Outbox::channel(1);
        Ok(Connection {
            inbox: Box::new(StuckInbox),
            outbox,
        })
    }
}

#[tokio::test]
async fn test_unresponsive_worker_times_out_but_is_cleaned_up() {
    let manager = LifecycleManager::new(Arc::new(StuckTransport) as BoxedTransport)
        .with_stop_grace(Duration::from_millis(50));
    let (inst, cleanups) = instance(0, EchoBot::new("stuck", CleanupBehavior::Succeed));

    let running = manager.start(vec![inst]);
    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = running.shutdown().await;

    assert_eq!(report.entries()[0].outcome, BotOutcome::StopTimedOut);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_until_returns_after_shutdown_future() {
    let hub = MemoryHub::new();
    let manager = LifecycleManager::new(Arc::new(hub.clone()) as BoxedTransport);
    let (a, a_cleanups) = instance(0, EchoBot::new("a", CleanupBehavior::Succeed));
    let (b, b_cleanups) = instance(1, EchoBot::new("b", CleanupBehavior::Succeed));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let run = tokio::spawn(async move {
        manager
            .run_until(vec![a, b], async {
                let _ = rx.await;
            })
            .await
    });

    wait_until_listening(&hub, 2).await;
    tx.send(()).unwrap();
    let report = run.await.unwrap();

    assert_eq!(report.len(), 2);
    assert!(report.all_clean());
    assert_eq!(a_cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(b_cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_closed_transport_crashes_workers() {
    let hub = MemoryHub::new();
    let manager = LifecycleManager::new(Arc::new(hub.clone()) as BoxedTransport);
    let (inst, _) = instance(0, EchoBot::new("echo", CleanupBehavior::None));
    let running = manager.start(vec![inst]);
    wait_until_listening(&hub, 1).await;

    hub.close();
    for _ in 0..200 {
        if running.live_workers() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let report = running.shutdown().await;
    assert!(matches!(
        &report.entries()[0].outcome,
        BotOutcome::Crashed { reason } if reason.contains("transport closed")
    ));
}
