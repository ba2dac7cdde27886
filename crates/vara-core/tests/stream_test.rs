#![allow(clippy::unwrap_used)]
// Integration tests for `DataStream`: payload I/O, BUFFER pacing and close.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use vara_core::{ConnectionState, CoreError, Modem};

use common::{MockModem, dial, eventually};

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

// ── Payload ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bytes_flow_both_ways() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;

    assert_eq!(stream.write(b"hello").await.unwrap(), 5);
    assert_eq!(link.read_data(5).await, b"hello");

    link.write_data(b"world").await;
    let mut buf = [0u8; 16];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"world");
}

#[tokio::test]
async fn test_empty_write_is_a_no_op() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, _link) = dial(&mock, &modem).await;

    assert_eq!(stream.write(b"").await.unwrap(), 0);
    assert_eq!(stream.tx_buffer_len(), 0);
}

#[tokio::test]
async fn test_read_returns_zero_when_link_drops() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    let reader = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move {
            let mut buf = [0u8; 16];
            stream.read(&mut buf).await
        })
    };
    settle().await;
    assert!(!reader.is_finished());

    link.send("DISCONNECTED").await;
    assert_eq!(reader.await.unwrap().unwrap(), 0);

    let mut buf = [0u8; 16];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
}

// ── Pacing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_write_tracks_modem_buffer_reports() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;

    link.send("BUFFER 42").await;
    eventually(|| stream.tx_buffer_len() == 42).await;

    // 42 < 7 × 10: goes straight through.
    assert_eq!(stream.write(&[0xAA; 10]).await.unwrap(), 10);
    assert_eq!(stream.tx_buffer_len(), 52);

    link.send("BUFFER 3").await;
    eventually(|| stream.tx_buffer_len() == 3).await;

    assert_eq!(stream.write(&[0x55; 12]).await.unwrap(), 12);
    assert_eq!(stream.tx_buffer_len(), 15);
    assert_eq!(link.read_data(22).await.len(), 22);
}

#[tokio::test]
async fn test_small_write_blocks_until_buffer_report_drops() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    link.send("BUFFER 42").await;
    eventually(|| stream.tx_buffer_len() == 42).await;

    // 42 >= 7 × 5
    let writer = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.write(b"12345").await })
    };
    settle().await;
    assert!(!writer.is_finished());

    link.send("BUFFER 10").await;
    assert_eq!(writer.await.unwrap().unwrap(), 5);
    assert_eq!(stream.tx_buffer_len(), 15);

    link.send("DISCONNECTED").await;
    eventually(|| modem.state() == ConnectionState::Disconnected).await;
    assert!(matches!(
        stream.write(b"x").await,
        Err(CoreError::EndOfStream)
    ));
}

#[tokio::test]
async fn test_write_waits_for_modem_to_drain() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    link.send("BUFFER 100").await;
    eventually(|| stream.tx_buffer_len() == 100).await;

    let writer = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.write(b"0123456789").await })
    };
    settle().await;
    assert!(!writer.is_finished(), "100 >= 70 should block the write");

    link.send("BUFFER 80").await;
    settle().await;
    assert!(!writer.is_finished(), "80 >= 70 should keep blocking");

    link.send("BUFFER 20").await;
    assert_eq!(writer.await.unwrap().unwrap(), 10);
    assert_eq!(stream.tx_buffer_len(), 30);
    assert_eq!(link.read_data(10).await, b"0123456789");
}

#[tokio::test]
async fn test_write_times_out_without_buffer_reports() {
    let mock = MockModem::bind().await;
    let mut config = mock.config();
    config.buffer_timeout = Duration::from_millis(200);
    let modem = Modem::new("N0CALL", config).unwrap();
    let (stream, mut link) = dial(&mock, &modem).await;

    link.send("BUFFER 500").await;
    eventually(|| stream.tx_buffer_len() == 500).await;

    let result = stream.write(b"payload").await;
    assert!(
        matches!(
            result,
            Err(CoreError::BufferTimeout {
                operation: "write",
                ..
            })
        ),
        "expected BufferTimeout, got: {result:?}"
    );
    assert_eq!(stream.tx_buffer_len(), 500);
}

#[tokio::test]
async fn test_blocked_write_fails_on_disconnect() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    link.send("BUFFER 1000").await;
    eventually(|| stream.tx_buffer_len() == 1000).await;

    let writer = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.write(b"blocked").await })
    };
    settle().await;

    link.send("DISCONNECTED").await;
    assert!(matches!(
        writer.await.unwrap(),
        Err(CoreError::EndOfStream)
    ));
}

// ── Flush ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_flush_waits_for_empty_buffer() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    stream.flush().await.unwrap();

    link.send("BUFFER 30").await;
    eventually(|| stream.tx_buffer_len() == 30).await;

    let flusher = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.flush().await })
    };
    settle().await;
    assert!(!flusher.is_finished());

    link.send("BUFFER 12").await;
    link.send("BUFFER 0").await;
    flusher.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_flush_times_out_without_progress() {
    let mock = MockModem::bind().await;
    let mut config = mock.config();
    config.buffer_timeout = Duration::from_millis(200);
    let modem = Modem::new("N0CALL", config).unwrap();
    let (stream, mut link) = dial(&mock, &modem).await;

    link.send("BUFFER 64").await;
    eventually(|| stream.tx_buffer_len() == 64).await;

    let result = stream.flush().await;
    assert!(
        matches!(
            result,
            Err(CoreError::BufferTimeout {
                operation: "flush",
                ..
            })
        ),
        "expected BufferTimeout, got: {result:?}"
    );
}

#[tokio::test]
async fn test_flush_fails_when_link_drops() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    link.send("BUFFER 30").await;
    eventually(|| stream.tx_buffer_len() == 30).await;

    let flusher = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.flush().await })
    };
    settle().await;
    assert!(!flusher.is_finished());

    link.send("DISCONNECTED").await;
    assert!(matches!(
        flusher.await.unwrap(),
        Err(CoreError::EndOfStream)
    ));
}

#[tokio::test]
async fn test_flush_returns_at_once_while_closing() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    link.send("BUFFER 30").await;
    eventually(|| stream.tx_buffer_len() == 30).await;

    let closer = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.close().await })
    };
    link.expect("DISCONNECT").await;
    assert!(stream.is_closing());
    assert_eq!(modem.state(), ConnectionState::Connected);

    tokio::time::timeout(Duration::from_secs(1), stream.flush())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stream.tx_buffer_len(), 30);

    link.send("DISCONNECTED").await;
    closer.await.unwrap().unwrap();
}

// ── Close ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_close_sends_one_disconnect() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;

    let (first, second, ()) = tokio::join!(stream.close(), stream.close(), async {
        link.expect("DISCONNECT").await;
        link.send("DISCONNECTED").await;
    });
    first.unwrap();
    second.unwrap();

    // Teardown closes the command channel; nothing else was sent.
    link.expect_closed().await;
    stream.close().await.unwrap();
    stream.flush().await.unwrap();
}

#[tokio::test]
async fn test_write_during_close_is_held_back() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;
    let stream = Arc::new(stream);

    link.send("BUFFER 4").await;
    eventually(|| stream.tx_buffer_len() == 4).await;

    let closer = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.close().await })
    };
    link.expect("DISCONNECT").await;
    assert!(stream.is_closing());

    let writer = {
        let stream = Arc::clone(&stream);
        tokio::spawn(async move { stream.write(b"late").await })
    };
    settle().await;
    assert!(!writer.is_finished());
    assert_eq!(stream.tx_buffer_len(), 4);

    link.send("DISCONNECTED").await;
    closer.await.unwrap().unwrap();
    assert!(matches!(
        writer.await.unwrap(),
        Err(CoreError::EndOfStream)
    ));
    assert_eq!(stream.tx_buffer_len(), 4);
}

#[tokio::test]
async fn test_close_timeout_aborts_session() {
    let mock = MockModem::bind().await;
    let mut config = mock.config();
    config.disconnect_timeout = Duration::from_millis(200);
    let modem = Modem::new("N0CALL", config).unwrap();
    let (stream, mut link) = dial(&mock, &modem).await;

    let result = stream.close().await;
    assert!(
        matches!(result, Err(CoreError::DisconnectTimeout { .. })),
        "expected DisconnectTimeout, got: {result:?}"
    );
    link.expect("DISCONNECT").await;
    link.expect("ABORT").await;
    link.expect_closed().await;

    // The outcome sticks.
    assert!(matches!(
        stream.close().await,
        Err(CoreError::DisconnectTimeout { .. })
    ));
    let mut buf = [0u8; 4];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn test_close_after_remote_hangup_is_immediate() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;

    link.send("DISCONNECTED").await;
    link.expect_closed().await;

    stream.close().await.unwrap();
}

#[tokio::test]
async fn test_cancelled_close_does_not_resend_disconnect() {
    let mock = MockModem::bind().await;
    let modem = mock.modem();
    let (stream, mut link) = dial(&mock, &modem).await;

    let first = tokio::time::timeout(Duration::from_millis(200), stream.close()).await;
    assert!(first.is_err(), "close should still be waiting for DISCONNECTED");
    link.expect("DISCONNECT").await;

    let (second, ()) = tokio::join!(stream.close(), async {
        settle().await;
        link.send("DISCONNECTED").await;
    });
    second.unwrap();

    // Only teardown follows; no second DISCONNECT.
    link.expect_closed().await;
}
