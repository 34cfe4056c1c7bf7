//! Receive sessions: opens the link, then runs the configured mode until the
//! host finishes or the process is interrupted.

use std::time::Duration;

use anyhow::Context;
use loranode_transfer::{
    FsStorage, Link, ObjectReceiver, Outcome, Storage, StreamLink, TransferError,
};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{Config, LinkConfig, Mode};

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Link over either a serial device node or stdin/stdout.
pub type DeviceLink = StreamLink<BufReader<BoxedReader>, BoxedWriter>;

/// Runs the receiver until the session ends.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            shutdown.cancel();
        }
    });

    let heartbeat = tokio::spawn(heartbeat(
        Duration::from_secs(config.heartbeat_secs.max(1)),
        cancel.clone(),
    ));

    let link = open_link(&config.link, config.receiver.read_timeout()).await?;
    let storage = FsStorage::new(&config.storage.root);
    let mut receiver = ObjectReceiver::new(link, storage, config.receiver.clone(), cancel.clone());

    let result = run_session(&mut receiver, &config, &cancel).await;

    cancel.cancel();
    let _ = heartbeat.await;
    result
}

/// Runs the loop matching `config.mode`.
pub async fn run_session<L: Link, S: Storage>(
    receiver: &mut ObjectReceiver<L, S>,
    config: &Config,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    info!(mode = ?config.mode, "waiting for host");
    match config.mode {
        Mode::Config => receive_configs(receiver, cancel).await,
        Mode::Images => receive_images(receiver, &config.image_base, cancel).await,
        Mode::Archive => receive_archives(receiver, cancel).await,
    }
}

async fn receive_configs<L: Link, S: Storage>(
    receiver: &mut ObjectReceiver<L, S>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut stored = 0usize;
    while !cancel.is_cancelled() {
        match receiver.receive_config().await {
            Ok(Some(Outcome::Stored(name))) => {
                stored += 1;
                info!(name = %name, "config stored");
            }
            Ok(Some(Outcome::Finished)) => {
                info!(stored, "host finished sending configs");
                return Ok(());
            }
            Ok(None) => idle(receiver, cancel).await,
            Err(TransferError::Cancelled) => break,
            Err(e) => warn!(error = %e, "config transfer failed"),
        }
    }
    Ok(())
}

async fn receive_images<L: Link, S: Storage>(
    receiver: &mut ObjectReceiver<L, S>,
    base: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    while !cancel.is_cancelled() {
        match receiver.receive_labeled_blob(base).await {
            Ok(Some(label)) => info!(label = %label, "image stored"),
            Ok(None) => idle(receiver, cancel).await,
            Err(TransferError::Cancelled) => break,
            Err(e) => warn!(error = %e, "image transfer failed"),
        }
    }
    Ok(())
}

async fn receive_archives<L: Link, S: Storage>(
    receiver: &mut ObjectReceiver<L, S>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut stored = 0usize;
    while !cancel.is_cancelled() {
        match receiver.receive_archive().await {
            Ok(Outcome::Stored(name)) => {
                stored += 1;
                info!(name = %name, "archive entry stored");
            }
            Ok(Outcome::Finished) => {
                info!(stored, "host finished sending archive");
                return Ok(());
            }
            Err(TransferError::Cancelled) => break,
            // A failed entry invalidates the rest of the archive.
            Err(e) => {
                warn!(stored, error = %e, "archive transfer abandoned");
                return Err(anyhow::Error::new(e).context("archive transfer abandoned"));
            }
        }
    }
    Ok(())
}

/// Backs off after an idle poll so a closed link does not spin.
async fn idle<L, S>(receiver: &ObjectReceiver<L, S>, cancel: &CancellationToken)
where
    L: Link,
    S: Storage,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(receiver.config().poll_interval()) => {}
    }
}

async fn open_link(config: &LinkConfig, read_timeout: Duration) -> anyhow::Result<DeviceLink> {
    let (reader, writer): (BoxedReader, BoxedWriter) = if config.device == "-" {
        info!("using stdin/stdout as link");
        (Box::new(tokio::io::stdin()), Box::new(tokio::io::stdout()))
    } else {
        let device = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .await
            .with_context(|| format!("failed to open serial device {}", config.device))?;
        info!(device = %config.device, "serial link opened");
        let (reader, writer) = tokio::io::split(device);
        (Box::new(reader), Box::new(writer))
    };
    Ok(StreamLink::new(BufReader::new(reader), writer, read_timeout))
}

async fn heartbeat(period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    let mut beats: u64 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                beats += 1;
                trace!(beats, "alive");
            }
        }
    }
    debug!(beats, "heartbeat stopped");
}
