use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use botyard_core::{
    Bot, BotConfig, BotEnv, BoxedBot, BuildContext, BuildResult, Message, Replies,
    ResponseResult, register_bot,
};
use botyard_runtime::{DiscoveryError, discover};

struct GreeterBot {
    config: BotConfig,
}

#[async_trait]
impl Bot for GreeterBot {
    fn config(&self) -> &BotConfig {
        &self.config
    }

    fn should_respond_to(&self, message: &Message) -> bool {
        message.content.contains("@greet")
    }

    async fn generate_response(
        &self,
        _message: &Message,
        _replies: &Replies,
    ) -> ResponseResult<String> {
        Ok("hello".into())
    }
}

fn create_greeter(ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
    let config = ctx.config(BotConfig::new("greeter", "Greeter", "greeter_bot"))?;
    Ok(Arc::new(GreeterBot { config }))
}

register_bot! {
    static GREETER = {
        kind: "discovery-greeter",
        ty: GreeterBot,
        description: "says hello",
        create: create_greeter,
    }
}

register_bot! {
    static TWIN_A = {
        kind: "discovery-twin",
        ty: GreeterBot,
        description: "first twin",
        create: create_greeter,
    }
}

register_bot! {
    static TWIN_B = {
        kind: "discovery-twin",
        ty: GreeterBot,
        description: "second twin",
        create: create_greeter,
    }
}

fn create_exploding(_ctx: &BuildContext<'_>) -> BuildResult<BoxedBot> {
    panic!("factory exploded");
}

register_bot! {
    static EXPLODING = {
        kind: "discovery-exploding",
        ty: GreeterBot,
        description: "panics while building",
        create: create_exploding,
    }
}

fn manifest(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_three_valid_and_one_broken() {
    let dir = tempfile::tempdir().unwrap();
    manifest(dir.path(), "charlie.toml", "kind = \"discovery-greeter\"\n[config]\nbot_id = \"c\"");
    manifest(dir.path(), "alpha.toml", "kind = \"discovery-greeter\"\n[config]\nbot_id = \"a\"");
    manifest(dir.path(), "bravo.toml", "kind = \"discovery-greeter\"\n[config]\nbot_id = \"b\"");
    manifest(dir.path(), "broken.toml", "kind = \"discovery-greeter\"\n[config\nbot_id = ");

    let report = discover(dir.path(), &BotEnv::new()).unwrap();

    let ids: Vec<_> = report.bots.iter().map(|b| b.id.to_string()).collect();
    assert_eq!(ids, ["alpha#0", "bravo#1", "charlie#3"]);
    let bot_ids: Vec<_> = report
        .bots
        .iter()
        .map(|b| b.bot.config().bot_id.clone())
        .collect();
    assert_eq!(bot_ids, ["a", "b", "c"]);

    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(&report.skipped[0], DiscoveryError::Load { .. }));
    assert_eq!(report.skipped[0].path(), dir.path().join("broken.toml"));
}

#[test]
fn test_unknown_kind_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    manifest(dir.path(), "a.toml", "kind = \"not-linked-anywhere\"");
    manifest(dir.path(), "b.toml", "kind = \"discovery-greeter\"");

    let report = discover(dir.path(), &BotEnv::new()).unwrap();
    assert_eq!(report.bots.len(), 1);
    assert!(matches!(
        &report.skipped[0],
        DiscoveryError::UnknownKind { kind, .. } if kind == "not-linked-anywhere"
    ));
}

#[test]
fn test_ambiguous_kind_never_picks_one() {
    let dir = tempfile::tempdir().unwrap();
    manifest(dir.path(), "twin.toml", "kind = \"discovery-twin\"");

    let report = discover(dir.path(), &BotEnv::new()).unwrap();
    assert!(report.bots.is_empty());
    assert!(matches!(
        &report.skipped[0],
        DiscoveryError::AmbiguousKind { count: 2, .. }
    ));
}

#[test]
fn test_invalid_override_is_a_build_error() {
    let dir = tempfile::tempdir().unwrap();
    manifest(dir.path(), "blank.toml", "kind = \"discovery-greeter\"\n[config]\nbot_id = \"  \"");

    let report = discover(dir.path(), &BotEnv::new()).unwrap();
    assert!(report.bots.is_empty());
    assert!(matches!(&report.skipped[0], DiscoveryError::Build { .. }));
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let report = discover(dir.path(), &BotEnv::new()).unwrap();
    assert!(report.bots.is_empty());
    assert!(report.skipped.is_empty());
}

#[test]
fn test_panicking_factory_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    manifest(dir.path(), "a.toml", "kind = \"discovery-exploding\"");
    manifest(dir.path(), "b.toml", "kind = \"discovery-greeter\"");

    let report = discover(dir.path(), &BotEnv::new()).unwrap();
    assert_eq!(report.bots.len(), 1);
    assert_eq!(report.bots[0].id.to_string(), "b#1");
    assert!(matches!(
        &report.skipped[0],
        DiscoveryError::FactoryPanicked { reason, .. } if reason == "factory exploded"
    ));
    assert_eq!(report.skipped[0].path(), dir.path().join("a.toml"));
}
