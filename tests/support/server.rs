use std::{convert::Infallible, future::Future, net, sync::mpsc as std_mpsc, thread, time::Duration};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use tokio::{runtime, sync::oneshot};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
pub type Body = BoxBody<Bytes, BoxError>;

pub struct Server {
    addr: net::SocketAddr,
    panic_rx: std_mpsc::Receiver<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Server {
    pub fn addr(&self) -> net::SocketAddr {
        self.addr
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if !std::thread::panicking() {
            let _ = self.panic_rx.recv_timeout(Duration::from_secs(3));
        }
    }
}

/// Spins up a plain-TCP h2c server on its own thread/runtime, mirroring the
/// "run the listener off the test's own reactor" pattern so a dialing client
/// under test can use its own tokio runtime without conflict.
pub fn h2c<F, Fut>(func: F) -> Server
where
    F: Fn(http::Request<hyper::body::Incoming>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = http::Response<Body>> + Send + 'static,
{
    thread::spawn(move || {
        let rt = runtime::Builder::new_current_thread().enable_all().build().expect("new rt");
        let listener = rt.block_on(async {
            tokio::net::TcpListener::bind(&std::net::SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap()
        });
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let (panic_tx, panic_rx) = std_mpsc::channel();

        thread::spawn(move || {
            rt.block_on(async move {
                let builder = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new());
                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        accepted = listener.accept() => {
                            let (io, _) = accepted.expect("accepted");
                            let func = func.clone();
                            let svc = hyper::service::service_fn(move |req| {
                                let fut = func(req);
                                async move { Ok::<_, Infallible>(fut.await) }
                            });
                            let builder = builder.clone();
                            tokio::spawn(async move {
                                let _ = builder.serve_connection_with_upgrades(hyper_util::rt::TokioIo::new(io), svc).await;
                            });
                        }
                    }
                }
                let _ = panic_tx.send(());
            });
        });

        Server { addr, panic_rx, shutdown_tx: Some(shutdown_tx) }
    })
    .join()
    .unwrap()
}

pub fn body_once(bytes: impl Into<Bytes>) -> Body {
    use http_body_util::{BodyExt, Full};
    Full::new(bytes.into()).map_err(|never: Infallible| match never {}).boxed()
}
