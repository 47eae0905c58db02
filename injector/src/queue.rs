use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use formpilot_protocol::InjectorCommand;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::CommandSink;
use crate::EmergencyStop;
use crate::InjectorError;
use crate::InjectorLink;
use crate::Result;

/// Fixed gap after every queued write. The firmware is free-running and never
/// acknowledged; this gap is the only back-pressure.
const COMMAND_GAP: Duration = Duration::from_millis(50);

struct QueuedCommand {
    command: InjectorCommand,
    done: oneshot::Sender<()>,
}

/// FIFO pipeline with a single consumer task. Enqueue order is write order;
/// bytes of different commands never interleave because every line goes
/// through the link's writer lock.
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<QueuedCommand>,
}

impl CommandQueue {
    pub fn spawn(link: Arc<InjectorLink>, stop: EmergencyStop) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedCommand>();
        let handle = tokio::spawn(async move {
            while let Some(QueuedCommand { command, done }) = rx.recv().await {
                if stop.is_triggered() {
                    // Drain without writing once the stop flag is up.
                    let _ = done.send(());
                    continue;
                }
                let line = command.to_string();
                debug!("injector <- {line}");
                if let Err(err) = link.write_line(&line) {
                    warn!("injector write failed: {err}");
                }
                tokio::time::sleep(COMMAND_GAP).await;
                let _ = done.send(());
            }
        });
        (Self { tx }, handle)
    }

    async fn push(&self, command: InjectorCommand) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(QueuedCommand {
                command,
                done: done_tx,
            })
            .map_err(|_| InjectorError::QueueClosed)?;
        done_rx.await.map_err(|_| InjectorError::QueueClosed)
    }
}

/// The production [`CommandSink`]: clicks, scrolls, keys, and chords ride the
/// queue; `MOVE` deltas take the direct path because the motion engine paces
/// them itself.
pub struct SerialSink {
    link: Arc<InjectorLink>,
    queue: CommandQueue,
}

impl SerialSink {
    pub fn new(link: Arc<InjectorLink>, queue: CommandQueue) -> Self {
        Self { link, queue }
    }
}

#[async_trait]
impl CommandSink for SerialSink {
    async fn send(&self, command: InjectorCommand) -> Result<()> {
        if command.is_blocked() {
            return Err(InjectorError::BlockedKey(command.to_string()));
        }
        self.queue.push(command).await
    }

    fn write_move(&self, dx: i32, dy: i32) -> Result<()> {
        self.link
            .write_line(&InjectorCommand::Move { dx, dy }.to_string())
    }
}
