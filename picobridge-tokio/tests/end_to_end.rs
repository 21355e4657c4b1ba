//! The whole bridge against a scripted broker on a loopback socket

use std::time::Duration;

use picobridge_tokio::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;

static EDGES: EdgeQueue = EdgeQueue::new();

async fn read_packet(stream: &mut TcpStream) -> Vec<u8> {
    let mut packet = vec![stream.read_u8().await.unwrap()];
    let mut remaining = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await.unwrap();
        packet.push(byte);
        remaining |= ((byte & 0x7F) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let start = packet.len();
    packet.resize(start + remaining, 0);
    stream.read_exact(&mut packet[start..]).await.unwrap();
    packet
}

async fn run_until<F>(liveness: &mut TokioLivenessLoop, mut done: F)
where
    F: FnMut(&TokioLivenessLoop) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(&*liveness) {
        assert!(Instant::now() < deadline, "bridge did not reach the expected state");
        if let Err(e) = liveness.run_once().await {
            panic!("loop iteration failed: {}", e);
        }
    }
}

#[tokio::test]
async fn test_bridge_against_scripted_broker() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let connect = read_packet(&mut stream).await;
        assert_eq!(&connect[..2], &[0x10, 0x19]);
        assert!(connect.ends_with(b"zephyr_client"));
        stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

        let subscribe = read_packet(&mut stream).await;
        assert_eq!(&subscribe[..2], &[0x82, 0x16]);
        assert_eq!(&subscribe[6..23], b"device/led/status");
        stream
            .write_all(&[0x90, 0x03, subscribe[2], subscribe[3], 0x00])
            .await
            .unwrap();

        // QoS 2 "on" with packet id 7
        let mut publish = vec![0x34, 0x17, 0x00, 0x11];
        publish.extend_from_slice(b"device/led/status");
        publish.extend_from_slice(&[0x00, 0x07]);
        publish.extend_from_slice(b"on");
        stream.write_all(&publish).await.unwrap();

        assert_eq!(read_packet(&mut stream).await, [0x50, 0x02, 0x00, 0x07]);
        stream.write_all(&[0x62, 0x02, 0x00, 0x07]).await.unwrap();
        assert_eq!(read_packet(&mut stream).await, [0x70, 0x02, 0x00, 0x07]);

        let button = read_packet(&mut stream).await;
        assert_eq!(button[0], 0x30);
        assert!(button.ends_with(b"device/button/pressButton Pressed"));

        assert_eq!(read_packet(&mut stream).await, [0xE0, 0x00]);
    });

    let mut config = BridgeConfig::default();
    config.broker = heapless::String::try_from("127.0.0.1").unwrap();
    config.port = port;

    let gpio = SimGpio::new();
    let mut bridge = EventBridge::new(gpio.clone(), &config);
    bridge.configure(&EDGES).unwrap();
    let client =
        PubSubClient::from_config(TokioTransport::new(), StdTimeSource::new(), &config).unwrap();
    let mut liveness = LivenessLoop::new(client, bridge, &EDGES, TokioDelay, 100);

    liveness.client_mut().connect(&config.broker).await.unwrap();
    run_until(&mut liveness, |l| l.client().state() == SessionState::Subscribed).await;

    run_until(&mut liveness, |l| l.bridge().led_level() == Level::High).await;
    assert_eq!(gpio.get(config.led_pin), Level::High);
    run_until(&mut liveness, |l| l.client().session().pending_ack_count() == 0).await;

    gpio.press(config.button_pin).unwrap();
    liveness.run_once().await.unwrap();

    liveness.client_mut().disconnect().await.unwrap();
    broker.await.unwrap();
}

#[tokio::test]
async fn test_malformed_broker_address_keeps_running() {
    let config = BridgeConfig::default();
    let mut client =
        PubSubClient::from_config(TokioTransport::new(), StdTimeSource::new(), &config).unwrap();
    assert_eq!(client.connect("broker.local").await, Err(BridgeError::Address));
    assert_eq!(client.state(), SessionState::Disconnected);
}
