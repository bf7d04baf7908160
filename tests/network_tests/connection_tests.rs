//! Connection Tests
//!
//! These tests verify:
//! - Lifecycle transitions (connect, authenticate, fail, close, reconnect)
//! - Command execution over chunked, truncated and malformed replies
//! - FIFO serialization of concurrent callers
//!
//! All tests run against the scripted in-memory transport.

#[path = "../common/mod.rs"]
mod common;

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::unbounded;
use parking_lot::Mutex;
use resplite::network::{Connection, ConnectionState, RequestQueue};
use resplite::protocol::{Command, ReplyFrame};
use resplite::{ClientConfig, RespError};

use common::{scripted_config, ScriptedConnector, Step};

// =============================================================================
// Helper Functions
// =============================================================================

fn get(key: &str) -> Command {
    Command::Get {
        key: key.as_bytes().to_vec(),
    }
}

fn with_password(password: &str) -> ClientConfig {
    let mut config = scripted_config();
    config.password = Some(password.to_string());
    config
}

/// Accepts AUTH "pw", answers GET with `$-1`
fn auth_server() -> ScriptedConnector {
    ScriptedConnector::new(|args| {
        let reply: &[u8] = match args[0].as_slice() {
            b"AUTH" if args[1] == b"pw" => b"+OK\r\n",
            b"AUTH" => b"-WRONGPASS invalid username-password pair\r\n",
            _ => b"$-1\r\n",
        };
        vec![Step::Chunk(reply.to_vec())]
    })
}

fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(5));
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_starts_disconnected() {
    let connection = Connection::new(ScriptedConnector::replying(b"+OK\r\n"), &scripted_config()).unwrap();
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}

#[test]
fn test_address_from_config() {
    let connection = Connection::new(ScriptedConnector::replying(b"+OK\r\n"), &scripted_config()).unwrap();
    assert_eq!(connection.address().host(), "scripted");
    assert_eq!(connection.address().to_string(), "scripted:6379");
}

#[test]
fn test_open_without_password_is_ready() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();

    connection.open().unwrap();

    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
    assert!(connector.requests().is_empty());
}

#[test]
fn test_open_when_ready_is_noop() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();

    connection.open().unwrap();
    connection.open().unwrap();

    assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
    assert_eq!(connection.state(), ConnectionState::Ready);
}

#[test]
fn test_open_while_connecting_is_rejected() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let gate = connector.hold_opens();
    let connection = Arc::new(Connection::new(connector.clone(), &scripted_config()).unwrap());

    let first = {
        let connection = Arc::clone(&connection);
        thread::spawn(move || connection.open())
    };
    gate.wait_entered();
    assert_eq!(connection.state(), ConnectionState::Connecting);

    let err = connection.open().unwrap_err();
    assert!(matches!(err, RespError::AlreadyInProgress(ConnectionState::Connecting)));

    gate.release();
    first.join().unwrap().unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
}

#[test]
fn test_open_while_authenticating_is_rejected() {
    let (release_tx, release_rx) = unbounded::<()>();
    let connector = ScriptedConnector::new(move |_| {
        let _ = release_rx.recv();
        vec![Step::Chunk(b"+OK\r\n".to_vec())]
    });
    let connection = Arc::new(Connection::new(connector.clone(), &with_password("pw")).unwrap());

    let first = {
        let connection = Arc::clone(&connection);
        thread::spawn(move || connection.open())
    };
    wait_until("AUTH to be written", || connector.requests().len() == 1);
    assert_eq!(connection.state(), ConnectionState::Authenticating);

    let err = connection.open().unwrap_err();
    assert!(matches!(err, RespError::AlreadyInProgress(ConnectionState::Authenticating)));

    release_tx.send(()).unwrap();
    first.join().unwrap().unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
}

#[test]
fn test_open_with_password_authenticates() {
    let connector = auth_server();
    let connection = Connection::new(connector.clone(), &with_password("pw")).unwrap();

    connection.open().unwrap();

    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(connector.requests(), vec![b"*2\r\n$4\r\nAUTH\r\n$2\r\npw\r\n".to_vec()]);
}

#[test]
fn test_wrong_password_fails_connection() {
    let connector = auth_server();
    let connection = Connection::new(connector.clone(), &with_password("nope")).unwrap();

    let err = connection.open().unwrap_err();

    assert!(matches!(err, RespError::AuthFailed(ref msg) if msg.starts_with("WRONGPASS")));
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);

    let err = connection.execute(get("k")).unwrap_err();
    assert!(matches!(err, RespError::NotConnected(ConnectionState::Failed)));
}

#[test]
fn test_unexpected_auth_reply_fails_connection() {
    let connection = Connection::new(ScriptedConnector::replying(b":1\r\n"), &with_password("pw")).unwrap();

    let err = connection.open().unwrap_err();

    assert!(matches!(err, RespError::Protocol(_)));
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[test]
fn test_auth_eof_fails_connection() {
    let connector = ScriptedConnector::new(|_| vec![Step::Eof]);
    let connection = Connection::new(connector, &with_password("pw")).unwrap();

    assert!(matches!(connection.open(), Err(RespError::ConnectionClosed)));
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[test]
fn test_open_refused() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    connector.refuse_connections();
    let connection = Connection::new(connector, &scripted_config()).unwrap();

    let err = connection.open().unwrap_err();

    match err {
        RespError::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[test]
fn test_reconnect_after_failure() {
    let connector = ScriptedConnector::replying(b"!garbage\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();

    connection.open().unwrap();
    assert!(connection.execute(get("k")).is_err());
    assert_eq!(connection.state(), ConnectionState::Failed);

    connection.open().unwrap();
    assert_eq!(connection.state(), ConnectionState::Ready);
    assert_eq!(connector.opens.load(Ordering::SeqCst), 2);
}

#[test]
fn test_close_from_ready() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();

    connection.open().unwrap();
    connection.close();

    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    assert!(matches!(
        connection.execute(get("k")),
        Err(RespError::NotConnected(ConnectionState::Disconnected))
    ));
}

#[test]
fn test_close_during_open_discards_late_transport() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let gate = connector.hold_opens();
    let connection = Arc::new(Connection::new(connector.clone(), &scripted_config()).unwrap());

    let first = {
        let connection = Arc::clone(&connection);
        thread::spawn(move || connection.open())
    };
    gate.wait_entered();
    connection.close();
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    gate.release();
    let result = first.join().unwrap();

    assert!(matches!(result, Err(RespError::ConnectionClosed)));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connector.opens.load(Ordering::SeqCst), 1);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_close_during_authentication() {
    // AUTH is never answered, so open() waits until the close lands
    let connector = ScriptedConnector::new(|_| Vec::new());
    let connection = Arc::new(Connection::new(connector.clone(), &with_password("pw")).unwrap());

    let first = {
        let connection = Arc::clone(&connection);
        thread::spawn(move || connection.open())
    };
    wait_until("AUTH to be written", || connector.requests().len() == 1);
    connection.close();

    let result = first.join().unwrap();
    assert!(matches!(result, Err(RespError::ConnectionClosed)));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_close_without_transport() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();

    connection.close();

    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_close_after_failure_resets_to_disconnected() {
    let connection = Connection::new(ScriptedConnector::replying(b"?\r\n"), &scripted_config()).unwrap();
    connection.open().unwrap();
    let _ = connection.execute(get("k"));
    assert_eq!(connection.state(), ConnectionState::Failed);

    connection.close();
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_requires_ready() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();

    let err = connection.execute(get("k")).unwrap_err();

    assert!(matches!(err, RespError::NotConnected(ConnectionState::Disconnected)));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
    assert!(connector.requests().is_empty());
}

#[test]
fn test_execute_writes_encoded_command() {
    let connector = ScriptedConnector::replying(b"$-1\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();
    connection.open().unwrap();

    let reply = connection.execute(get("missing")).unwrap();

    assert_eq!(reply, ReplyFrame::Bulk(None));
    assert_eq!(
        connector.requests(),
        vec![b"*2\r\n$3\r\nGET\r\n$7\r\nmissing\r\n".to_vec()]
    );
}

#[test]
fn test_execute_reassembles_chunked_reply() {
    let connector = ScriptedConnector::new(|_| {
        vec![
            Step::Chunk(b"$1".to_vec()),
            Step::Chunk(b"1\r\nhello".to_vec()),
            Step::Chunk(b" world\r".to_vec()),
            Step::Chunk(b"\n".to_vec()),
        ]
    });
    let connection = Connection::new(connector, &scripted_config()).unwrap();
    connection.open().unwrap();

    let reply = connection.execute(get("k")).unwrap();

    assert_eq!(reply, ReplyFrame::Bulk(Some(Bytes::from_static(b"hello world"))));
    assert_eq!(connection.state(), ConnectionState::Ready);
}

#[test]
fn test_execute_with_small_read_chunks() {
    let mut config = scripted_config();
    config.read_chunk_size = 3;
    let connection = Connection::new(ScriptedConnector::replying(b"$10\r\n0123456789\r\n"), &config).unwrap();
    connection.open().unwrap();

    let reply = connection.execute(get("k")).unwrap();
    assert_eq!(reply, ReplyFrame::Bulk(Some(Bytes::from_static(b"0123456789"))));
}

#[test]
fn test_server_error_reply_keeps_connection() {
    let connection = Connection::new(
        ScriptedConnector::replying(b"-WRONGTYPE Operation against a key\r\n"),
        &scripted_config(),
    )
    .unwrap();
    connection.open().unwrap();

    let reply = connection.execute(get("k")).unwrap();

    assert!(matches!(reply, ReplyFrame::Error(_)));
    assert_eq!(connection.state(), ConnectionState::Ready);
}

#[test]
fn test_eof_mid_reply_fails_request() {
    let connector = ScriptedConnector::new(|_| vec![Step::Chunk(b"$5\r\nhe".to_vec()), Step::Eof]);
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();
    connection.open().unwrap();

    let err = connection.execute(get("k")).unwrap_err();

    assert!(matches!(err, RespError::ConnectionClosed));
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_read_timeout_fails_connection() {
    let connector = ScriptedConnector::new(|_| vec![Step::Fail(io::ErrorKind::WouldBlock)]);
    let connection = Connection::new(connector, &scripted_config()).unwrap();
    connection.open().unwrap();

    let err = connection.execute(get("k")).unwrap_err();

    assert!(matches!(err, RespError::Timeout));
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[test]
fn test_read_error_fails_connection() {
    let connector = ScriptedConnector::new(|_| vec![Step::Fail(io::ErrorKind::ConnectionReset)]);
    let connection = Connection::new(connector, &scripted_config()).unwrap();
    connection.open().unwrap();

    let err = connection.execute(get("k")).unwrap_err();

    assert!(matches!(err, RespError::Transport(_)));
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[test]
fn test_write_error_fails_connection() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();
    connection.open().unwrap();
    connector.fail_writes(io::ErrorKind::BrokenPipe);

    let err = connection.execute(get("k")).unwrap_err();

    match err {
        RespError::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    assert!(connector.requests().is_empty());
}

#[test]
fn test_write_timeout_fails_connection() {
    let connector = ScriptedConnector::replying(b"+OK\r\n");
    let connection = Connection::new(connector.clone(), &scripted_config()).unwrap();
    connection.open().unwrap();
    connector.fail_writes(io::ErrorKind::WouldBlock);

    let err = connection.execute(get("k")).unwrap_err();

    assert!(matches!(err, RespError::Timeout));
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalid_marker_fails_connection() {
    let connection = Connection::new(ScriptedConnector::replying(b"%2\r\n"), &scripted_config()).unwrap();
    connection.open().unwrap();

    let err = connection.execute(get("k")).unwrap_err();

    assert!(matches!(err, RespError::Protocol(_)));
    assert_eq!(connection.state(), ConnectionState::Failed);
    assert!(matches!(
        connection.execute(get("k")),
        Err(RespError::NotConnected(ConnectionState::Failed))
    ));
}

#[test]
fn test_missing_terminator_fails_connection() {
    let connection = Connection::new(ScriptedConnector::replying(b"+OK\n"), &scripted_config()).unwrap();
    connection.open().unwrap();

    assert!(matches!(connection.execute(get("k")), Err(RespError::Protocol(_))));
    assert_eq!(connection.state(), ConnectionState::Failed);
}

#[test]
fn test_close_while_request_pending() {
    // Never answers, so the request blocks in read until the close lands
    let connector = ScriptedConnector::new(|_| Vec::new());
    let connection = Arc::new(Connection::new(connector.clone(), &scripted_config()).unwrap());
    connection.open().unwrap();

    let pending = {
        let connection = Arc::clone(&connection);
        thread::spawn(move || connection.execute(get("k")))
    };

    wait_until("request to be written", || connector.requests().len() == 1);
    connection.close();

    let result = pending.join().unwrap();
    assert!(matches!(result, Err(RespError::ConnectionClosed)));
    assert_eq!(connection.state(), ConnectionState::Disconnected);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_requests_do_not_interleave() {
    // Echo the key back as the value, split over two reads
    let connector = ScriptedConnector::new(|args| {
        let key = &args[1];
        let mut reply = format!("${}\r\n", key.len()).into_bytes();
        reply.extend_from_slice(key);
        reply.extend_from_slice(b"\r\n");
        let tail = reply.split_off(reply.len() / 2);
        vec![Step::Chunk(reply), Step::Chunk(tail)]
    });
    let connection = Arc::new(Connection::new(connector.clone(), &scripted_config()).unwrap());
    connection.open().unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let connection = Arc::clone(&connection);
            thread::spawn(move || {
                let key = format!("key-{}", i);
                for _ in 0..10 {
                    let reply = connection.execute(get(&key)).unwrap();
                    assert_eq!(reply, ReplyFrame::Bulk(Some(Bytes::from(key.clone().into_bytes()))));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(connector.requests().len(), 160);
    assert_eq!(connection.state(), ConnectionState::Ready);
}

#[test]
fn test_queue_serves_in_arrival_order() {
    let queue = Arc::new(RequestQueue::new());
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = queue.wait_turn();
    assert_eq!(first.ticket(), 0);

    let mut handles = Vec::new();
    for name in ["second", "third", "fourth"] {
        let queue_for_thread = Arc::clone(&queue);
        let order = Arc::clone(&order);
        let expected_waiting = queue.len() + 1;
        handles.push(thread::spawn(move || {
            let _turn = queue_for_thread.wait_turn();
            order.lock().push(name);
        }));
        // Make sure each caller has taken its ticket before the next starts
        wait_until("caller to queue", || queue.len() == expected_waiting);
    }

    drop(first);
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(*order.lock(), vec!["second", "third", "fourth"]);
    assert!(queue.is_empty());
}
