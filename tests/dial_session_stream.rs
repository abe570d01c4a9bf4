mod support;

use futures_util::{future::join_all, TryStreamExt as _};
use http_body_util::{BodyExt, BodyStream, StreamBody};
use phoenix_transport::ClientConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn echo_response(req: http::Request<hyper::body::Incoming>) -> http::Response<support::Body> {
    let frames = BodyStream::new(req.into_body())
        .try_filter_map(|frame| async move { Ok(frame.into_data().ok().map(http_body::Frame::data)) })
        .map_err(|e| Box::new(e) as support::BoxError);
    http::Response::builder().status(200).body(StreamBody::new(frames).boxed()).unwrap()
}

#[tokio::test]
async fn closing_a_session_twice_is_a_no_op() {
    let server = support::h2c(|req| async move { echo_response(req) });
    let addr = server.addr();

    let config = ClientConfig::builder().remote_addr(addr.to_string()).build();
    let engine = phoenix_transport::ClientEngine::new(config).unwrap();
    let mut session = engine.dial("echo", "").await.unwrap();

    session.write_all(b"x").await.unwrap();
    session.close().await;
    session.close().await;

    // Reads behave like an already-drained stream rather than erroring.
    let mut buf = [0u8; 8];
    assert_eq!(session.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_dials_on_one_engine_stay_independent() {
    let server = support::h2c(|req| async move { echo_response(req) });
    let addr = server.addr();

    let config = ClientConfig::builder().remote_addr(addr.to_string()).build();
    let engine = std::sync::Arc::new(phoenix_transport::ClientEngine::new(config).unwrap());

    let tasks = (0..8).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut session = engine.dial("echo", "").await.unwrap();
            let payload = format!("session-{i}");
            session.write_all(payload.as_bytes()).await.unwrap();
            session.shutdown().await.unwrap();

            let mut received = Vec::new();
            session.read_to_end(&mut received).await.unwrap();
            assert_eq!(received, payload.as_bytes());
        })
    });

    for result in join_all(tasks).await {
        result.unwrap();
    }
}
