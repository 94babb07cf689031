//! End-to-end tests against a real listener on localhost.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{self, Message};

use broadcast_hub::{
    connection, serve, Client, ClientId, ClientOptions, ClientState, Room, RoomHandle,
};

const WAIT: Duration = Duration::from_secs(5);

async fn start_hub() -> (SocketAddr, RoomHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (room, _room_task) = Room::spawn(64);
    tokio::spawn(serve(listener, room.clone(), ClientOptions::default()));
    (addr, room)
}

async fn wait_for_members(room: &RoomHandle, count: usize) {
    tokio::time::timeout(WAIT, async {
        while room.members().await.unwrap().len() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("members never reached expected count");
}

async fn next_text<S>(ws: &mut S) -> String
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

#[tokio::test]
async fn test_message_reaches_every_client() {
    let (addr, room) = start_hub().await;
    let url = format!("ws://{addr}/ws");

    let (mut a, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut c, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_members(&room, 3).await;

    a.send(Message::Text("hello".to_string())).await.unwrap();

    assert_eq!(next_text(&mut a).await, "hello");
    assert_eq!(next_text(&mut b).await, "hello");
    assert_eq!(next_text(&mut c).await, "hello");
}

#[tokio::test]
async fn test_disconnect_leaves_room() {
    let (addr, room) = start_hub().await;
    let url = format!("ws://{addr}/ws");

    let (a, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_members(&room, 2).await;

    drop(a);
    wait_for_members(&room, 1).await;

    b.send(Message::Text("still here".to_string())).await.unwrap();
    assert_eq!(next_text(&mut b).await, "still here");
}

#[tokio::test]
async fn test_room_stop_closes_connections() {
    let (addr, room) = start_hub().await;
    let url = format!("ws://{addr}/ws");

    let (mut a, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_members(&room, 1).await;

    room.stop().await.unwrap();

    let ended = tokio::time::timeout(WAIT, async {
        loop {
            match a.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok());
}

#[tokio::test]
async fn test_stalled_socket_evicted_and_released() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (room, _room_task) = Room::spawn(64);
    let url = format!("ws://{addr}/ws");

    let (peer, server_side) = tokio::join!(tokio_tungstenite::connect_async(url.as_str()), async {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    });
    // Kept open but never polled, so it stops reading
    let (_peer, _) = peer.unwrap();

    let (reader, writer) = connection::split(server_side);
    let options = ClientOptions {
        send_timeout: Duration::from_millis(10),
        outbound_capacity: 1,
    };
    let client = Client::new(ClientId::new(), reader, writer, options);
    let handle = client.handle();
    let tasks = client.start(&room).await.unwrap();

    // Large enough to fill the socket buffers quickly
    let payload = "x".repeat(4 * 1024 * 1024);
    tokio::time::timeout(WAIT, async {
        while !room.members().await.unwrap().is_empty() {
            room.publish(payload.clone()).await.unwrap();
        }
    })
    .await
    .expect("stalled client was never evicted");
    assert!(handle.is_stopped());

    tokio::time::timeout(WAIT, tasks.join())
        .await
        .expect("client tasks did not finish after eviction");
    assert_eq!(handle.state(), ClientState::Closed);
}

#[tokio::test]
async fn test_status_request_in_two_segments() {
    let (addr, _room) = start_hub().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.set_nodelay(true).unwrap();
    stream.write_all(b"GET /st").await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;
    stream
        .write_all(b"at HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));
}

#[tokio::test]
async fn test_upgrade_on_unknown_path_rejected() {
    let (addr, room) = start_hub().await;

    let err = tokio_tungstenite::connect_async(format!("ws://{addr}/nope"))
        .await
        .unwrap_err();
    match err {
        tungstenite::Error::Http(response) => assert_eq!(response.status(), 404),
        other => panic!("unexpected error: {other}"),
    }
    assert!(room.members().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_status_endpoint() {
    let (addr, _room) = start_hub().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /stat HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    tokio::time::timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .unwrap()
        .unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with(r#"{"status":"working"}"#));
}
