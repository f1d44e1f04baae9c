use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;

use super::error::{AuthError, Result};
use super::openid::CallbackParams;

pub const CALLBACK_PATH: &str = "/auth/callback";

/// How long in-flight responses get to finish once the callback arrived.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<!doctype html><html><head><title>AchievementTracker</title></head>\
<body><h2>Steam sign-in received</h2><p>You can close this window and return to the terminal.</p></body></html>";

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Loopback listener for the OpenID redirect.
pub struct CallbackServer {
    listener: TcpListener,
}

impl CallbackServer {
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// `return_to` and `realm` for the OpenID request.
    pub fn urls(&self) -> Result<(String, String)> {
        let addr = self.local_addr()?;
        let realm = format!("http://{}", addr);
        Ok((format!("{}{}", realm, CALLBACK_PATH), realm))
    }

    /// Serve requests until the callback arrives, the token is cancelled or
    /// `timeout` elapses. Other paths (favicon requests) get a 404.
    pub async fn wait_for_callback(
        self,
        cancel: CancellationToken,
        timeout: Duration,
    ) -> Result<CallbackParams> {
        let (tx, rx) = oneshot::channel();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));
        let router = Router::new()
            .route(CALLBACK_PATH, get(callback_handler))
            .with_state(sender);

        let stop = cancel.child_token();
        let mut server = tokio::spawn(
            axum::serve(self.listener, router)
                .with_graceful_shutdown(stop.clone().cancelled_owned())
                .into_future(),
        );

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            _ = tokio::time::sleep(timeout) => Err(AuthError::Timeout),
            params = rx => params.map_err(|_| {
                AuthError::Io(std::io::Error::other("callback server stopped"))
            }),
        };

        stop.cancel();
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Err(e))) => tracing::warn!(error = %e, "Callback server failed"),
            Ok(_) => {}
            Err(_) => {
                tracing::debug!("Callback server still has open connections, aborting");
                server.abort();
            }
        }
        result
    }
}

async fn callback_handler(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    match sender.lock().await.take() {
        Some(tx) => {
            let _ = tx.send(params);
        }
        None => tracing::debug!("Ignoring repeated sign-in callback"),
    }
    Html(SUCCESS_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    async fn spawn_server(
        timeout: Duration,
    ) -> (
        String,
        SocketAddr,
        tokio::task::JoinHandle<Result<CallbackParams>>,
    ) {
        let server = CallbackServer::bind(0).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (return_to, realm) = server.urls().unwrap();
        assert_eq!(realm, format!("http://{}", addr));
        assert!(return_to.ends_with(CALLBACK_PATH));

        let waiter = tokio::spawn(server.wait_for_callback(CancellationToken::new(), timeout));
        (return_to, addr, waiter)
    }

    #[tokio::test]
    async fn receives_browser_redirect() {
        let (return_to, addr, waiter) = spawn_server(Duration::from_secs(5)).await;

        let favicon = reqwest::get(format!("http://{}/favicon.ico", addr))
            .await
            .unwrap();
        assert_eq!(favicon.status(), reqwest::StatusCode::NOT_FOUND);

        let page = reqwest::get(format!(
            "{}?openid.mode=id_res&openid.claimed_id=https%3A%2F%2Fsteamcommunity.com%2Fopenid%2Fid%2F76561197960287930",
            return_to
        ))
        .await
        .unwrap();
        assert!(page.status().is_success());
        assert!(page.text().await.unwrap().contains("Steam sign-in received"));

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params["openid.mode"], "id_res");
        assert_eq!(
            params["openid.claimed_id"],
            "https://steamcommunity.com/openid/id/76561197960287930"
        );
    }

    #[tokio::test]
    async fn idle_connection_does_not_block_the_redirect() {
        let (return_to, addr, waiter) = spawn_server(Duration::from_secs(5)).await;

        // Browsers open speculative connections that never send a request
        let _idle = TcpStream::connect(addr).await.unwrap();

        let page = tokio::time::timeout(
            Duration::from_secs(2),
            reqwest::get(format!("{}?openid.mode=id_res", return_to)),
        )
        .await
        .expect("callback answered while another connection is idle")
        .unwrap();
        assert!(page.status().is_success());

        let params = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("wait_for_callback returns despite the idle connection")
            .unwrap()
            .unwrap();
        assert_eq!(params["openid.mode"], "id_res");
    }

    #[tokio::test]
    async fn cancellation_stops_waiting() {
        let server = CallbackServer::bind(0).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = server
            .wait_for_callback(cancel, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
    }
}
