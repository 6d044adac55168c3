//! Listener lifecycle: run until asked to stop, then drain for a bounded grace period.

// std
use std::{net::SocketAddr, pin::pin, time::Duration as StdDuration};
// crates.io
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use tokio::{
	net::{TcpListener, TcpStream},
	sync::watch,
	task::JoinSet,
};
// self
use crate::{_prelude::*, error::TransportError};

/// How long in-flight requests may run after shutdown is requested.
pub const DEFAULT_SHUTDOWN_GRACE: StdDuration = StdDuration::from_secs(5);
/// Environment variable that tells child processes where the proxy listens.
pub const LISTEN_ADDRESS_ENV: &str = "RELEASE_PROXY_LISTEN_ADDRESS";

/// Address clients should use for `listen`; a bare `:port` becomes `localhost:port`.
pub fn advertised_address(listen: &str) -> String {
	if listen.starts_with(':') { format!("localhost{listen}") } else { listen.to_owned() }
}

/// Binds the listener for `listen`, accepting the `:port` shorthand.
pub async fn bind(listen: &str) -> Result<TcpListener> {
	let listener = TcpListener::bind(advertised_address(listen))
		.await
		.map_err(TransportError::from)?;

	Ok(listener)
}

/// Serves `router` until `shutdown` resolves.
///
/// Once `shutdown` resolves the listener is closed and every open connection is asked to
/// finish its current request. Connections still open after `grace` are aborted, so `serve`
/// never returns with a request running.
pub async fn serve<F>(
	listener: TcpListener,
	router: Router,
	shutdown: F,
	grace: StdDuration,
) -> Result<()>
where
	F: Future<Output = ()>,
{
	let address = listener.local_addr().map_err(TransportError::from)?;
	let (drain, draining) = watch::channel(false);
	let mut connections = JoinSet::new();
	let mut shutdown = pin!(shutdown);

	tracing::info!(%address, "Release proxy listening.");

	loop {
		tokio::select! {
			() = &mut shutdown => break,
			accepted = listener.accept() => match accepted {
				Ok((stream, peer)) => {
					connections.spawn(serve_connection(stream, peer, router.clone(), draining.clone()));
				},
				Err(e) => tracing::error!(error = %e, "Failed to accept connection."),
			},
			Some(_) = connections.join_next(), if !connections.is_empty() => {},
		}
	}

	drop(listener);

	tracing::info!(
		grace_ms = grace.as_millis() as u64,
		connections = connections.len(),
		"Draining in-flight requests."
	);

	drain.send_replace(true);

	let drained = tokio::time::timeout(grace, async {
		while connections.join_next().await.is_some() {}
	})
	.await;

	if drained.is_err() {
		tracing::warn!(
			connections = connections.len(),
			"Grace period elapsed; aborting remaining connections."
		);

		connections.shutdown().await;
	}

	tracing::info!("Release proxy stopped.");

	Ok(())
}

async fn serve_connection(
	stream: TcpStream,
	peer: SocketAddr,
	router: Router,
	mut draining: watch::Receiver<bool>,
) {
	let connection = http1::Builder::new()
		.serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));
	let mut connection = pin!(connection);
	let result = tokio::select! {
		result = connection.as_mut() => result,
		_ = draining.changed() => {
			connection.as_mut().graceful_shutdown();

			connection.as_mut().await
		},
	};

	if let Err(e) = result {
		tracing::debug!(%peer, error = %e, "Connection closed with an error.");
	}
}
