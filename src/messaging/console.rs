use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use crate::{
    core::{commands::Command, notifier::Notification},
    error::CacheResult,
    messaging::{service::ServiceHandle, templates::MessageTemplate},
};

/// Text answer for one console line. `None` when the line is not a command.
pub async fn reply(handle: &ServiceHandle, line: &str) -> CacheResult<Option<String>> {
    if !Command::is_command(line) {
        return Ok(None);
    }
    let command = Command::build_from(line);
    debug!(?command, "Received console command");
    let text = match command.request() {
        Some(request) => handle.request(request).await?.to_string(),
        None => MessageTemplate::Help
            .render(())
            .unwrap_or_else(|_| "!help".to_string()),
    };
    Ok(Some(text))
}

/// Reads commands line by line until the input closes.
pub async fn run<R, W>(
    handle: ServiceHandle,
    reader: R,
    mut writer: W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        match reply(&handle, &line).await {
            Ok(Some(text)) => {
                writer.write_all(format!("{text}\n").as_bytes()).await?;
                writer.flush().await?;
            }
            Ok(None) => {}
            Err(e) => error!("{e}"),
        }
    }
    info!("Console input closed.");
    Ok(())
}

/// Prints change notifications as they arrive, for as long as the observer
/// stays registered.
pub async fn announce<W>(mut rx: Receiver<Notification>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(notification) = rx.recv().await {
        let text = format!("{notification}\n");
        if let Err(e) = writer.write_all(text.as_bytes()).await {
            error!("Could not print notification. {e}");
        }
        let _ = writer.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::leaderboard::Fetcher,
        core::{
            notifier::Notifier,
            record::RawEntry,
            refresh::{RefreshCoordinator, RefreshPolicy},
        },
        messaging::service::CacheService,
        storage::{MemoryStore, Store},
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct SinglePage;

    #[async_trait]
    impl Fetcher for SinglePage {
        async fn fetch_page(&self, offset: usize, _limit: usize) -> CacheResult<Vec<RawEntry>> {
            if offset > 0 {
                return Ok(vec![]);
            }
            Ok(vec![RawEntry::from_json(
                json!({"username": "Alice", "points": 12345}),
            )?])
        }
    }

    fn handle(notifier: Arc<Notifier>) -> ServiceHandle {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            Arc::new(SinglePage),
            notifier,
            RefreshPolicy::default(),
        )
        .unwrap();
        CacheService::new(Arc::new(coordinator), store).spawn(4)
    }

    #[tokio::test]
    async fn test_console_session() {
        let handle = handle(Arc::new(Notifier::new()));
        let input: &[u8] = b"hello there\n!lookup @alice\n!refresh\n!lookup @ALICE\n!lookup\n";
        let mut output: Vec<u8> = Vec::new();

        run(handle, input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "No ranking found.");
        assert!(lines[1].starts_with("⭐ Rankings updated: 1 entries"));
        assert_eq!(lines[2], "Alice 1st ★ 12,345");
        assert!(lines[3].contains("commands"));
        assert!(output.contains("!lookup <user>"));
    }

    #[tokio::test]
    async fn test_announces_notifications() {
        let notifier = Notifier::new();
        let (id, rx) = notifier.subscribe();
        notifier.notify_badge_state(false);
        notifier.notify_refreshed();
        notifier.unsubscribe(&id);

        let mut output: Vec<u8> = Vec::new();
        announce(rx, &mut output).await;

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("off"));
        assert!(lines[1].contains("rankings changed"));
    }
}
