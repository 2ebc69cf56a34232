// src/serve/server.rs

//! Static file server over the output directory with live reload.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::serve::reload::{LiveReload, ReloadEvent};

pub const LIVERELOAD_PATH: &str = "/__sitepipe/livereload";
pub const CLIENT_PATH: &str = "/__sitepipe/client.js";

/// Largest HTML page the injector will buffer.
const MAX_INJECT_BYTES: usize = 16 * 1024 * 1024;

const CLIENT_JS: &str = r#"(function () {
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var ws = new WebSocket(proto + location.host + "/__sitepipe/livereload");
  ws.onmessage = function (e) {
    var msg = JSON.parse(e.data);
    if (msg.kind !== "css") {
      location.reload();
      return;
    }
    var hit = false;
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var url = new URL(link.href);
      if (url.pathname.replace(/^\//, "") === msg.path) {
        url.searchParams.set("v", Date.now());
        link.href = url.toString();
        hit = true;
      }
    });
    if (!hit) location.reload();
  };
})();
"#;

#[derive(Debug, Clone)]
struct ServerState {
    reload: LiveReload,
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    pub local_addr: SocketAddr,
    pub task: JoinHandle<()>,
}

/// Bind `addr` and serve `dist` in the background.
///
/// Port `0` picks an ephemeral port; the bound address is returned.
pub async fn start(dist: PathBuf, addr: SocketAddr, reload: LiveReload) -> Result<ServerHandle> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding dev server to {addr}"))?;
    let local_addr = listener.local_addr().context("reading bound address")?;

    let app = router(dist.clone(), reload);
    info!(addr = %local_addr, dist = %dist.display(), "serving http://{local_addr}/");

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "dev server stopped");
        }
    });

    Ok(ServerHandle { local_addr, task })
}

pub fn router(dist: PathBuf, reload: LiveReload) -> Router {
    Router::new()
        .route(LIVERELOAD_PATH, get(livereload))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(dist))
        .layer(map_response(inject_client))
        .with_state(ServerState { reload })
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn livereload(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    let events = state.reload.subscribe();
    ws.on_upgrade(move |socket| client_session(socket, events))
}

async fn client_session(
    socket: WebSocket,
    mut events: tokio::sync::broadcast::Receiver<ReloadEvent>,
) {
    debug!("live reload client connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(_)) => ReloadEvent::Reload,
                    Err(RecvError::Closed) => break,
                };
                if sender.send(Message::Text(event.to_json().into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("live reload client disconnected");
}

async fn inject_client(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_INJECT_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "could not buffer html response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let injected = inject_script(&html);
    parts.headers.remove(header::CONTENT_LENGTH);
    if let Ok(len) = HeaderValue::from_str(&injected.len().to_string()) {
        parts.headers.insert(header::CONTENT_LENGTH, len);
    }
    Response::from_parts(parts, Body::from(injected))
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{CLIENT_PATH}"></script>"#);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => format!("{}{tag}{}", &html[..idx], &html[idx..]),
        None => format!("{html}{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let out = inject_script("<html><body><p>x</p></BODY></html>");
        assert_eq!(
            out,
            r#"<html><body><p>x</p><script src="/__sitepipe/client.js"></script></BODY></html>"#
        );
    }

    #[test]
    fn fragment_without_body_gets_script_appended() {
        assert!(inject_script("<p>x</p>").ends_with("</script>"));
    }
}
