use netwrap::{BoxConnection, Listener};
use netwrap_std::net::{TcpConnection, TcpListener};

/// Connects a client to a fresh loopback listener, returning both ends and the listener.
pub async fn tcp_pair() -> (TcpConnection, BoxConnection, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.address().as_socket_addr().unwrap();

    let (client, server) = tokio::join!(TcpConnection::connect(address), listener.accept());
    (client.unwrap(), server.unwrap(), listener)
}
