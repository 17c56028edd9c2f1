#![expect(missing_docs, reason = "test")]

mod common;

use common::tcp_pair;
use netwrap::test_suite;
use netwrap_std::net::TcpListener;

#[tokio::test]
async fn tcp_read_write() {
    let (client, server, _listener) = tcp_pair().await;
    test_suite::test_read_write(client, server).await;
}

#[tokio::test]
async fn tcp_close_unblocks_read() {
    let (client, _server, _listener) = tcp_pair().await;
    test_suite::test_close_unblocks_read(client).await;
}

#[tokio::test]
async fn tcp_close_twice() {
    let (client, _server, _listener) = tcp_pair().await;
    test_suite::test_close_twice(client).await;
}

#[tokio::test]
async fn tcp_read_deadline() {
    let (client, _server, _listener) = tcp_pair().await;
    test_suite::test_read_deadline(client).await;
}

#[tokio::test]
async fn tcp_deadline_applies_to_pending_read() {
    let (client, _server, _listener) = tcp_pair().await;
    test_suite::test_deadline_applies_to_pending_read(client).await;
}

#[tokio::test]
async fn tcp_deadline_reset() {
    let (client, server, _listener) = tcp_pair().await;
    test_suite::test_deadline_reset(client, server).await;
}

#[tokio::test]
async fn tcp_elapsed_deadline_with_pending_data() {
    let (client, server, _listener) = tcp_pair().await;
    test_suite::test_elapsed_deadline_with_pending_data(client, server).await;
}

#[tokio::test]
async fn tcp_close_unblocks_accept() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    test_suite::test_close_unblocks_accept(listener).await;
}

#[tokio::test]
async fn tcp_accept_after_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    test_suite::test_accept_after_close(listener).await;
}
