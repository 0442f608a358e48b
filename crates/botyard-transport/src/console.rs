//! Connects a [`MemoryHub`] to the terminal.
//!
//! Each stdin line becomes a message in one channel. Leading `#name` words
//! are read as explicit-addressing tags, so `#math 2 + 2` reaches the bot
//! whose `bot_id` is `math` without a trigger token.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use botyard_core::{ChannelId, Message};

use crate::hub::{Emission, MemoryHub};

/// Author recorded on console messages.
pub const CONSOLE_AUTHOR: &str = "console";

/// Parses one console line into a message; `None` for blank lines.
pub fn parse_line(channel: &ChannelId, line: &str) -> Option<Message> {
    let mut message = Message::new(channel.clone(), "").with_author(CONSOLE_AUTHOR);
    let mut rest = line.trim();

    while let Some(stripped) = rest.strip_prefix('#') {
        let (tag, tail) = stripped
            .split_once(char::is_whitespace)
            .unwrap_or((stripped, ""));
        if tag.is_empty() {
            break;
        }
        message = message.with_tag(tag);
        rest = tail.trim_start();
    }

    if rest.is_empty() && message.tags.is_empty() {
        return None;
    }
    message.content = rest.to_string();
    Some(message)
}

/// Removes a leading `<!--...-->` marker for display.
pub fn strip_marker(content: &str) -> &str {
    if let Some(body) = content.strip_prefix("<!--")
        && let Some(end) = body.find("-->")
    {
        return &body[end + 3..];
    }
    content
}

/// Reads stdin line by line into `channel` until EOF or cancellation.
pub async fn pump_stdin(hub: MemoryHub, channel: ChannelId, token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                if let Some(message) = parse_line(&channel, &line) {
                    let receivers = hub.post(message);
                    debug!(channel = %channel, receivers, "Console message posted");
                }
            }
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                break;
            }
        }
    }
}

/// Writes every emission to stdout until cancellation.
pub async fn print_emissions(emissions: broadcast::Receiver<Emission>, token: CancellationToken) {
    write_emissions(emissions, tokio::io::stdout(), token).await;
}

/// Writes every emission to `out` until cancellation or hub shutdown.
pub async fn write_emissions<W>(
    mut emissions: broadcast::Receiver<Emission>,
    mut out: W,
    token: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let emission = tokio::select! {
            _ = token.cancelled() => break,
            emission = emissions.recv() => emission,
        };

        match emission {
            Ok(Emission { bot_id, event }) => {
                let line = format!(
                    "[{bot_id} #{}] {}\n",
                    event.channel_id,
                    strip_marker(&event.content)
                );
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    warn!(error = %e, "Failed to write emission");
                    break;
                }
                let _ = out.flush().await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Console output lagged, emissions dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use botyard_core::OutboundEvent;

    use super::*;

    #[test]
    fn test_parse_plain_line() {
        let msg = parse_line(&ChannelId::new("general"), "  @math 2 + 2 ").unwrap();
        assert_eq!(msg.content, "@math 2 + 2");
        assert!(msg.tags.is_empty());
        assert_eq!(msg.author.as_deref(), Some(CONSOLE_AUTHOR));
    }

    #[test]
    fn test_parse_leading_tags() {
        let msg = parse_line(&ChannelId::new("general"), "#math #health what is 2+2").unwrap();
        assert!(msg.is_addressed_to("math"));
        assert!(msg.is_addressed_to("health"));
        assert_eq!(msg.content, "what is 2+2");
    }

    #[test]
    fn test_parse_blank_line() {
        assert!(parse_line(&ChannelId::new("general"), "   ").is_none());
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("<!--recipebot-->**Answer**"), "**Answer**");
        assert_eq!(strip_marker("plain"), "plain");
        assert_eq!(strip_marker("<!--unterminated"), "<!--unterminated");
    }

    #[tokio::test]
    async fn test_write_emissions_formats_lines() {
        let (tx, rx) = broadcast::channel(4);
        let token = CancellationToken::new();
        let (client, mut server) = tokio::io::duplex(256);

        let writer = tokio::spawn(write_emissions(rx, client, token.clone()));
        tx.send(Emission {
            bot_id: "math".into(),
            event: OutboundEvent::new(ChannelId::new("general"), "<!--mathcalcybot-->4.0"),
        })
        .unwrap();

        let mut buf = vec![0u8; 64];
        let n = tokio::time::timeout(
            Duration::from_secs(1),
            tokio::io::AsyncReadExt::read(&mut server, &mut buf),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(&buf[..n], b"[math #general] 4.0\n");

        token.cancel();
        writer.await.unwrap();
    }
}
