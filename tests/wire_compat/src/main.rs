fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use loranode_protocol::{ARCHIVE_NAME_WIDTH, CHUNK_SIZE, ControlToken};
    use loranode_transfer::{
        FsStorage, ObjectReceiver, Outcome, ReceiverConfig, StreamLink, TransferError, crc32,
    };
    use tokio::io::{
        AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf,
    };
    use tokio_util::sync::CancellationToken;

    type NodeLink = StreamLink<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

    /// The host side of the serial line, as the desktop sender drives it.
    struct Host {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Host {
        async fn send(&mut self, bytes: &[u8]) {
            self.writer.write_all(bytes).await.unwrap();
            self.writer.flush().await.unwrap();
        }

        async fn reply(&mut self) -> String {
            let mut line = String::new();
            self.reader.read_line(&mut line).await.unwrap();
            line.trim_end().to_owned()
        }
    }

    fn pair(root: &Path) -> (Host, ObjectReceiver<NodeLink, FsStorage>) {
        let (host, node) = tokio::io::duplex(64 * 1024);
        let (host_read, host_write) = tokio::io::split(host);
        let (node_read, node_write) = tokio::io::split(node);

        let link = StreamLink::new(
            BufReader::new(node_read),
            node_write,
            Duration::from_millis(500),
        );
        let config = ReceiverConfig {
            idle_timeout_ms: 5_000,
            ..ReceiverConfig::default()
        };
        let receiver =
            ObjectReceiver::new(link, FsStorage::new(root), config, CancellationToken::new());

        (
            Host {
                reader: BufReader::new(host_read),
                writer: host_write,
            },
            receiver,
        )
    }

    fn numeric(value: u64) -> Vec<u8> {
        format!("{value:010}\n").into_bytes()
    }

    /// Bytes that never contain the `END` sentinel.
    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 64) as u8).collect()
    }

    #[tokio::test]
    async fn config_files_from_host() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut host, mut receiver) = pair(tmp.path());

        let settings = serde_json::json!({
            "node": "trap-07",
            "sample_interval_s": 300,
            "sensors": (0..40).map(|i| format!("probe-{i:02}")).collect::<Vec<_>>(),
        });
        let body = serde_json::to_vec_pretty(&settings).unwrap();
        assert!(body.len() > CHUNK_SIZE);

        let sender = async {
            host.send(b"settings.json\n").await;
            host.send(&numeric(body.len() as u64)).await;
            host.send(&numeric(crc32(&body) as u64)).await;
            host.send(&body).await;
            host.send(ControlToken::End.line()).await;
            host.send(ControlToken::Finished.line()).await;
        };
        let node = async {
            let mut stored = Vec::new();
            loop {
                match receiver.receive_config().await.unwrap() {
                    Some(Outcome::Stored(name)) => stored.push(name),
                    Some(Outcome::Finished) => break,
                    None => {}
                }
            }
            stored
        };
        let ((), stored) = tokio::join!(sender, node);

        assert_eq!(stored, vec!["settings.json".to_owned()]);
        let written = std::fs::read(tmp.path().join("settings.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(parsed, settings);
    }

    #[tokio::test]
    async fn labeled_image_from_host() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut host, mut receiver) = pair(tmp.path());
        let image = payload(3 * CHUNK_SIZE + 17);

        let sender = async {
            host.send(ControlToken::Start.line()).await;
            host.send(b"owl\n").await;
            host.send(&numeric(image.len() as u64)).await;
            host.send(&numeric(crc32(&image) as u64)).await;
            host.send(&image).await;
            host.send(ControlToken::End.line()).await;
        };
        let node = receiver.receive_labeled_blob("capture");
        let ((), label) = tokio::join!(sender, node);

        assert_eq!(label.unwrap().as_deref(), Some("owl"));
        let written = std::fs::read(tmp.path().join("capture-owl.jpeg")).unwrap();
        assert_eq!(written, image);
    }

    #[tokio::test]
    async fn corrupted_image_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut host, mut receiver) = pair(tmp.path());
        let image = payload(900);

        let sender = async {
            host.send(ControlToken::Start.line()).await;
            host.send(b"fox\n").await;
            host.send(&numeric(image.len() as u64)).await;
            host.send(&numeric((crc32(&image) ^ 0xFF) as u64)).await;
            host.send(&image).await;
            host.send(ControlToken::End.line()).await;
        };
        let node = receiver.receive_labeled_blob("capture");
        let ((), result) = tokio::join!(sender, node);

        assert!(matches!(result, Err(TransferError::ChecksumMismatch { .. })));
        assert!(!tmp.path().join("capture-fox.jpeg").exists());
    }

    #[tokio::test]
    async fn archive_with_stop_and_wait() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut host, mut receiver) = pair(tmp.path());
        let data = payload(CHUNK_SIZE + 200);

        let sender = async {
            let mut replies = Vec::new();

            host.send(ControlToken::Start.line()).await;
            replies.push(host.reply().await);

            let mut header = numeric(data.len() as u64);
            header.extend(format!("{:<width$}\n", "survey.tar", width = ARCHIVE_NAME_WIDTH).into_bytes());
            header.extend(numeric(crc32(&data) as u64));
            host.send(&header).await;

            let mut corrupt_once = true;
            for fragment in data.chunks(CHUNK_SIZE) {
                loop {
                    let mut advertised = crc32(fragment);
                    if corrupt_once {
                        advertised ^= 1;
                        corrupt_once = false;
                    }
                    host.send(&numeric(advertised as u64)).await;
                    host.send(fragment).await;
                    let reply = host.reply().await;
                    let acked = reply == "ACK";
                    replies.push(reply);
                    if acked {
                        break;
                    }
                }
            }

            host.send(ControlToken::End.line()).await;
            replies.push(host.reply().await);
            host.send(ControlToken::Finished.line()).await;
            replies
        };
        let node = async {
            let first = receiver.receive_archive().await.unwrap();
            let second = receiver.receive_archive().await.unwrap();
            (first, second)
        };
        let (replies, (first, second)) = tokio::join!(sender, node);

        assert_eq!(replies, ["LISTEN", "NACK", "ACK", "ACK", "OK"]);
        assert_eq!(first, Outcome::Stored("survey.tar".into()));
        assert_eq!(second, Outcome::Finished);
        let written = std::fs::read(tmp.path().join("survey.tar")).unwrap();
        assert_eq!(written, data);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_host_times_out_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut host, mut receiver) = pair(tmp.path());

        host.send(b"stale.json\n").await;
        host.send(&numeric(4096)).await;
        host.send(&numeric(0)).await;
        host.send(&payload(100)).await;

        let result = receiver.receive_config().await;
        assert!(matches!(result, Err(TransferError::Timeout)));
        assert!(!tmp.path().join("stale.json").exists());
        drop(host);
    }
}
