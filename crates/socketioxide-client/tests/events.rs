use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use socketioxide_client::{
    Client, ClientConfig, ConnectionState, DisconnectReason, PayloadValue, ProtocolVersion,
    extract::{AckId, Args, Data, SocketRef, TryData},
    handler::Ack,
};
use tokio::sync::mpsc;

mod fixture;
mod utils;

use fixture::{MockTransport, config, connected, connected_with, wait_state};

async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> T {
    let res = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
    assert_some!(assert_ok!(res))
}

#[tokio::test]
async fn event_dispatch() {
    let (tx, mut rx) = mpsc::channel::<(String, String)>(1);
    let (_client, server) = connected("/chat", move |c| {
        c.on("msg", move |s: SocketRef, Data::<String>(msg)| {
            tx.try_send((s.ns().to_string(), msg)).unwrap();
        })
        .unwrap();
    })
    .await;

    server.send(r#"42/chat,["msg","hi"]"#).await;
    assert_eq!(recv(&mut rx).await, ("/chat".into(), "hi".into()));
}

#[tokio::test]
async fn event_with_several_args() {
    let (tx, mut rx) = mpsc::channel::<(String, i64, Vec<PayloadValue>)>(1);
    let (_client, server) = connected("/", move |c| {
        c.on("multi", move |Data::<(String, i64)>(data), Args(args)| {
            tx.try_send((data.0, data.1, args)).unwrap();
        })
        .unwrap();
    })
    .await;

    server.send(r#"42["multi","a",2]"#).await;
    let (a, b, args) = recv(&mut rx).await;
    assert_eq!((a.as_str(), b), ("a", 2));
    assert_eq!(args, vec![PayloadValue::from("a"), PayloadValue::from(2)]);
}

#[tokio::test]
async fn ack_requested_by_server() {
    let (_client, mut server) = connected("/chat", |c| {
        c.on("add", |Data::<(i64, i64)>((a, b)), AckId(id)| {
            assert_eq!(id, Some(5));
            PayloadValue::from(a + b)
        })
        .unwrap();
    })
    .await;

    server.send(r#"42/chat,5["add",1,2]"#).await;
    assert_eq!(server.recv_text().await, "43/chat,5[3]");
}

#[tokio::test]
async fn async_handler_ack() {
    let (_client, mut server) = connected("/", |c| {
        c.on("slow", async |Args(args)| {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ack(args.len())
        })
        .unwrap();
    })
    .await;

    server.send(r#"4212["slow",1,2,3]"#).await;
    assert_eq!(server.recv_text().await, "4312[3]");
}

#[tokio::test]
async fn no_ack_without_id() {
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let (_client, mut server) = connected("/", move |c| {
        c.on("msg", move || {
            tx.try_send(()).unwrap();
            PayloadValue::from("ignored")
        })
        .unwrap();
    })
    .await;

    server.send(r#"42["msg"]"#).await;
    recv(&mut rx).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(server.is_idle());
}

#[tokio::test]
async fn failed_extraction_skips_handler() {
    let (tx, mut rx) = mpsc::channel::<bool>(2);
    let (_client, server) = connected("/", move |c| {
        let tx_ = tx.clone();
        c.on("typed", move |Data::<i64>(_)| {
            tx_.try_send(true).unwrap();
        })
        .unwrap();
        c.on("try", move |TryData::<i64>(res)| {
            tx.try_send(res.is_ok()).unwrap();
        })
        .unwrap();
    })
    .await;

    server.send(r#"42["typed","not a number"]"#).await;
    server.send(r#"42["try","not a number"]"#).await;
    assert!(!recv(&mut rx).await);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unknown_and_invalid_packets_are_dropped() {
    let (client, mut server) = connected("/chat", |_| {}).await;

    server.send(r#"42/chat,["unknown"]"#).await;
    server.send("4x").await;
    server.send("9").await;
    server.send(r#"42/other,["msg"]"#).await;
    server.send(r#"42/chat,{"not":"an event"}"#).await;
    server.send("5").await;
    server.send("6").await;

    // the connection is still alive
    server.send("2").await;
    assert_eq!(server.recv_text().await, "3");
    assert_eq!(client.state(), ConnectionState::NamespaceConnected);
}

#[tokio::test]
async fn binary_event_reconstruction() {
    let (tx, mut rx) = mpsc::channel::<(String, Bytes)>(1);
    let (_client, server) = connected("/chat", move |c| {
        c.on("file", move |Data::<(String, Bytes)>((name, file))| {
            tx.try_send((name, file)).unwrap();
        })
        .unwrap();
    })
    .await;

    server
        .send(r#"451-/chat,["file","a.txt",{"_placeholder":true,"num":0}]"#)
        .await;
    server.send_bin(vec![1, 2, 3]).await;
    let (name, file) = recv(&mut rx).await;
    assert_eq!(name, "a.txt");
    assert_eq!(file, Bytes::from_static(&[1, 2, 3]));
}

#[tokio::test]
async fn emit_binary_event() {
    let (client, mut server) = connected("/chat", |_| {}).await;
    let bin = Bytes::from_static(&[4, 5, 6]);
    assert_ok!(client.emit_args("file", vec![PayloadValue::Binary(bin.clone())]));
    assert_eq!(
        server.recv_text().await,
        r#"451-/chat,["file",{"_placeholder":true,"num":0}]"#
    );
    assert_eq!(server.recv_bin().await, bin);
}

#[tokio::test]
async fn v3_binary_frames_carry_type_byte() {
    let (transport, mut server) = MockTransport::new(ProtocolVersion::V3, false);
    let config = socketioxide_client::ClientConfig::builder()
        .protocol(ProtocolVersion::V3)
        .build()
        .unwrap();
    let client = Client::with_transport("http://localhost", config, transport).unwrap();
    let (tx, mut rx) = mpsc::channel::<Bytes>(1);
    client
        .on("file", move |Data::<Bytes>(file)| {
            tx.try_send(file).unwrap();
        })
        .unwrap();
    assert_ok!(client.connect().await);
    server.open(25000, 20000).await;
    wait_state(&client, ConnectionState::NamespaceConnected).await;

    server
        .send(r#"451-["file",{"_placeholder":true,"num":0}]"#)
        .await;
    server.send_bin(vec![4, 9, 9]).await;
    assert_eq!(recv(&mut rx).await, Bytes::from_static(&[9, 9]));

    assert_ok!(client.emit("file", &Bytes::from_static(&[7])));
    assert_eq!(
        server.recv_text().await,
        r#"451-["file",{"_placeholder":true,"num":0}]"#
    );
    assert_eq!(server.recv_bin().await, Bytes::from_static(&[4, 7]));
}

#[tokio::test]
async fn stray_binary_is_a_protocol_violation() {
    let (client, server) = connected("/", |_| {}).await;
    server.send_bin(vec![1, 2]).await;
    assert_eq!(
        client.closed().await,
        Some(DisconnectReason::ProtocolViolation)
    );
}

#[tokio::test]
async fn msgpack_framing() {
    let (transport, mut server) = MockTransport::new(ProtocolVersion::V4, true);
    let client = Client::with_transport("http://localhost", config("/"), transport).unwrap();
    let (tx, mut rx) = mpsc::channel::<String>(1);
    client
        .on("event", move |Data::<String>(data)| {
            tx.try_send(data).unwrap();
        })
        .unwrap();
    assert_ok!(client.connect().await);
    server.open(25000, 20000).await;

    // {"type":0,"nsp":"/"}
    let connect = server.recv_bin().await;
    assert_eq!(
        connect.as_ref(),
        &[130, 164, 116, 121, 112, 101, 0, 163, 110, 115, 112, 161, 47]
    );

    // {"type":0,"nsp":"/","data":{"sid":"x"}}
    server
        .send_bin(vec![
            131, 164, 116, 121, 112, 101, 0, 163, 110, 115, 112, 161, 47, 164, 100, 97, 116, 97,
            129, 163, 115, 105, 100, 161, 120,
        ])
        .await;
    wait_state(&client, ConnectionState::NamespaceConnected).await;
    assert_eq!(client.ns_id(), Some("x"));

    // {"type":2,"nsp":"/","data":["event","foo"]}
    server
        .send_bin(vec![
            131, 164, 116, 121, 112, 101, 2, 163, 110, 115, 112, 161, 47, 164, 100, 97, 116, 97,
            146, 165, 101, 118, 101, 110, 116, 163, 102, 111, 111,
        ])
        .await;
    assert_eq!(recv(&mut rx).await, "foo");

    // text packets are not expected with binary framing
    server.send(r#"42["event","bar"]"#).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(rx.try_recv().is_err());
    assert!(client.state() == ConnectionState::NamespaceConnected);
}

#[tokio::test]
async fn async_handlers_hold_their_dispatch_slot() {
    let running = Arc::new(AtomicUsize::new(0));
    let running_ = running.clone();
    let config = ClientConfig::builder()
        .namespace("/")
        .max_concurrent_handlers(1)
        .build()
        .unwrap();
    let (_client, server) = connected_with(config, move |c| {
        c.on("slow", move || {
            let running = running_.clone();
            async move {
                running.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        })
        .unwrap();
    })
    .await;

    for _ in 0..5 {
        server.send(r#"42["slow"]"#).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(running.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn async_handlers_release_their_slot_once_done() {
    let current = Arc::new(AtomicUsize::new(0));
    let max = Arc::new(AtomicUsize::new(0));
    let (current_, max_) = (current.clone(), max.clone());
    let config = ClientConfig::builder()
        .namespace("/")
        .max_concurrent_handlers(1)
        .build()
        .unwrap();
    let (_client, mut server) = connected_with(config, move |c| {
        c.on("work", move || {
            let (current, max) = (current_.clone(), max_.clone());
            async move {
                let n = current.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(n, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ack("done")
            }
        })
        .unwrap();
    })
    .await;

    for id in 1..=3 {
        server.send(&format!(r#"42{id}["work"]"#)).await;
    }
    for id in 1..=3 {
        assert_eq!(server.recv_text().await, format!(r#"43{id}["done"]"#));
    }
    assert_eq!(max.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reserved_event_names_are_not_dispatched() {
    let connections = Arc::new(AtomicUsize::new(0));
    let disconnections = Arc::new(AtomicUsize::new(0));
    let (connections_, disconnections_) = (connections.clone(), disconnections.clone());
    let (_client, mut server) = connected("/", move |c| {
        c.on("connection", move || {
            connections_.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        c.on("disconnection", move || {
            disconnections_.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    })
    .await;

    server.send(r#"42["connection"]"#).await;
    server.send(r#"42["disconnection"]"#).await;
    server.send("2").await;
    assert_eq!(server.recv_text().await, "3");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert_eq!(disconnections.load(Ordering::SeqCst), 0);
}
