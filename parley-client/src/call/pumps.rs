use crate::error::TransportError;
use crate::signaling::SignalingTransport;
use futures::FutureExt;
use futures::future::BoxFuture;
use parley_core::{Signal, SignalingMessage};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Results the background tasks hand back to the call loop.
///
/// Every message carries the join attempt that spawned its task so the loop
/// can drop results that outlived a hangup.
#[derive(Debug)]
pub(crate) enum PumpOutput {
    Signals { attempt: u64, signals: Vec<Signal> },
    Unauthorized { attempt: u64 },
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PumpKind {
    Ping,
    Pull,
}

impl fmt::Display for PumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => f.write_str("ping"),
            Self::Pull => f.write_str("pull"),
        }
    }
}

pub(crate) struct PumpSettings {
    pub token: String,
    pub attempt: u64,
    pub ping_interval: Duration,
    pub pull_interval: Duration,
    pub pump_retries: u32,
    pub send_retries: u32,
    pub send_retry_delay: Duration,
}

/// The ping, pull and send tasks of one joined call.
pub(crate) struct Pumps {
    outbox: mpsc::UnboundedSender<Vec<SignalingMessage>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pumps {
    pub fn spawn(
        transport: Arc<dyn SignalingTransport>,
        settings: PumpSettings,
        leaving: Arc<AtomicBool>,
        output: mpsc::UnboundedSender<PumpOutput>,
    ) -> Self {
        let PumpSettings {
            token,
            attempt,
            ping_interval,
            pull_interval,
            pump_retries,
            send_retries,
            send_retry_delay,
        } = settings;

        let ping = {
            let transport = transport.clone();
            let token = token.clone();
            tokio::spawn(run_pump(
                PumpKind::Ping,
                ping_interval,
                pump_retries,
                leaving.clone(),
                output.clone(),
                attempt,
                move || {
                    let transport = transport.clone();
                    let token = token.clone();
                    async move { transport.ping_call(&token).await.map(|()| Vec::new()) }.boxed()
                },
            ))
        };

        let pull = {
            let transport = transport.clone();
            let token = token.clone();
            tokio::spawn(run_pump(
                PumpKind::Pull,
                pull_interval,
                pump_retries,
                leaving.clone(),
                output.clone(),
                attempt,
                move || {
                    let transport = transport.clone();
                    let token = token.clone();
                    async move { transport.pull_signaling(&token).await }.boxed()
                },
            ))
        };

        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let sender = tokio::spawn(run_sender(
            transport,
            token,
            send_retries,
            send_retry_delay,
            leaving,
            outbox_rx,
            output,
            attempt,
        ));

        Self {
            outbox,
            tasks: vec![ping, pull, sender],
        }
    }

    /// Queues messages for the relay. Batches go out one at a time, in order.
    pub fn send(&self, messages: Vec<SignalingMessage>) {
        if messages.is_empty() {
            return;
        }
        if self.outbox.send(messages).is_err() {
            debug!("Send task already stopped, dropping outbound batch");
        }
    }

    pub fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Issues `request` every `interval` until the leaving flag is raised or
/// `retries` consecutive transient failures follow the first one.
///
/// A response the relay sent but that cannot be used is skipped; asking again
/// would not bring it back, so it does not count as a failure.
async fn run_pump<F>(
    kind: PumpKind,
    interval: Duration,
    retries: u32,
    leaving: Arc<AtomicBool>,
    output: mpsc::UnboundedSender<PumpOutput>,
    attempt: u64,
    mut request: F,
) where
    F: FnMut() -> BoxFuture<'static, Result<Vec<Signal>, TransportError>> + Send,
{
    info!("Starting {} pump every {:?}", kind, interval);
    let mut failures = 0u32;

    loop {
        if leaving.load(Ordering::SeqCst) {
            break;
        }

        match request().await {
            Ok(signals) => {
                failures = 0;
                if leaving.load(Ordering::SeqCst) {
                    break;
                }
                if !signals.is_empty() {
                    let _ = output.send(PumpOutput::Signals { attempt, signals });
                }
            }
            Err(TransportError::Unauthorized) => {
                warn!("{} pump rejected by the relay, stopping", kind);
                let _ = output.send(PumpOutput::Unauthorized { attempt });
                return;
            }
            Err(e) if !e.is_transient() => {
                warn!("{} response discarded: {}", kind, e);
            }
            Err(e) => {
                failures += 1;
                if failures > retries {
                    warn!("{} pump giving up after {} failures: {}", kind, failures, e);
                    return;
                }
                debug!("{} failed ({}/{}): {}", kind, failures, retries, e);
            }
        }

        tokio::time::sleep(interval).await;
    }

    info!("{} pump stopped, leaving", kind);
}

async fn run_sender(
    transport: Arc<dyn SignalingTransport>,
    token: String,
    retries: u32,
    retry_delay: Duration,
    leaving: Arc<AtomicBool>,
    mut outbox: mpsc::UnboundedReceiver<Vec<SignalingMessage>>,
    output: mpsc::UnboundedSender<PumpOutput>,
    attempt: u64,
) {
    while let Some(messages) = outbox.recv().await {
        let mut failures = 0u32;

        loop {
            if leaving.load(Ordering::SeqCst) {
                return;
            }

            match transport.send_signaling(&token, messages.clone()).await {
                Ok(signals) => {
                    if !signals.is_empty() {
                        let _ = output.send(PumpOutput::Signals { attempt, signals });
                    }
                    break;
                }
                Err(TransportError::Unauthorized) => {
                    warn!("Outbound signaling rejected by the relay");
                    let _ = output.send(PumpOutput::Unauthorized { attempt });
                    return;
                }
                Err(e) if !e.is_transient() => {
                    // The relay answered, so the batch is not sent again.
                    warn!("Unusable reply to {} outbound messages: {}", messages.len(), e);
                    break;
                }
                Err(e) => {
                    failures += 1;
                    if failures > retries {
                        warn!("Dropping {} outbound messages: {}", messages.len(), e);
                        break;
                    }
                    debug!("Send failed ({}/{}): {}", failures, retries, e);
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }
}
