mod support;

use futures_util::TryStreamExt as _;
use http_body_util::{BodyExt, BodyStream, StreamBody};
use phoenix_transport::{ClientConfig, ClientEngine};
use support::Body;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn echo_response(req: http::Request<hyper::body::Incoming>) -> http::Response<Body> {
    let frames = BodyStream::new(req.into_body())
        .try_filter_map(|frame| async move { Ok(frame.into_data().ok().map(http_body::Frame::data)) })
        .map_err(|e| Box::new(e) as support::BoxError);
    let body = StreamBody::new(frames).boxed();
    http::Response::builder().status(200).body(body).unwrap()
}

#[tokio::test]
async fn cleartext_dial_round_trips_bytes() {
    let server = support::h2c(|req| async move { echo_response(req) });
    let addr = server.addr();

    let config = ClientConfig::builder().remote_addr(addr.to_string()).build();
    let engine = ClientEngine::new(config).unwrap();
    assert_eq!(engine.security_mode(), phoenix_transport::SecurityMode::CleartextH2c);

    let mut session = engine.dial("echo", "").await.unwrap();

    session.write_all(b"hello tunnel").await.unwrap();
    session.shutdown().await.unwrap();

    let mut received = Vec::new();
    session.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"hello tunnel");
}

#[tokio::test]
async fn protocol_and_target_headers_reach_the_server() {
    let server = support::h2c(|req| async move {
        let protocol = req.headers().get("x-nerve-protocol").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
        let target = req.headers().get("x-nerve-target").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
        let _ = req.into_body().collect().await;
        let body = support::body_once(format!("{protocol}|{target}"));
        http::Response::builder().status(200).body(body).unwrap()
    });
    let addr = server.addr();

    let config = ClientConfig::builder().remote_addr(addr.to_string()).build();
    let engine = ClientEngine::new(config).unwrap();
    let mut session = engine.dial("socks5", "example.org:443").await.unwrap();
    session.shutdown().await.unwrap();

    let mut received = Vec::new();
    session.read_to_end(&mut received).await.unwrap();
    assert_eq!(received, b"socks5|example.org:443");
}
