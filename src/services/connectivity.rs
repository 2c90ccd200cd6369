use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch};
use tokio::time::{MissedTickBehavior, sleep, timeout};
use tracing::{debug, info, warn};
use url::Url;

/// Interface-level network signal. Says nothing about whether the remote
/// service can actually be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    Down,
}

/// Cheap, side-effect-free check that the remote service answers.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// HEADs a same-origin URL, bypassing caches. Anything but a 2xx is "unreachable".
pub struct HttpProbe {
    client: reqwest::Client,
    url: Url,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(client: reqwest::Client, url: Url, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        let res = self
            .client
            .head(self.url.clone())
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .timeout(self.timeout)
            .send()
            .await;

        match res {
            Ok(response) => {
                debug!("Probe {} answered {}", self.url, response.status());
                response.status().is_success()
            }
            Err(e) => {
                debug!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// Tracks confirmed connectivity to the remote service.
///
/// `is_online` only turns true after a successful probe. Each offline to
/// online transition is announced once on the `restored` channel.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    settle_delay: Duration,
    online: watch::Sender<bool>,
    restored: broadcast::Sender<()>,
}

impl ConnectivityMonitor {
    /// Starts out offline until the first probe succeeds.
    pub fn new(probe: Arc<dyn ReachabilityProbe>, settle_delay: Duration) -> Self {
        let (online, _) = watch::channel(false);
        let (restored, _) = broadcast::channel(8);
        Self {
            probe,
            settle_delay,
            online,
            restored,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Edge-triggered: one message per confirmed offline to online transition.
    pub fn subscribe_restored(&self) -> broadcast::Receiver<()> {
        self.restored.subscribe()
    }

    pub fn mark_offline(&self) {
        let changed = self.online.send_if_modified(|online| {
            let was_online = *online;
            *online = false;
            was_online
        });
        if changed {
            info!("📴 Connectivity lost");
        }
    }

    fn mark_online(&self) {
        let changed = self.online.send_if_modified(|online| {
            let was_offline = !*online;
            *online = true;
            was_offline
        });
        if changed {
            info!("🌐 Connectivity restored");
            let _ = self.restored.send(());
        }
    }

    /// Probes immediately and updates the state from the result.
    pub async fn check_now(&self) -> bool {
        let reachable = self.probe.is_reachable().await;
        if reachable {
            self.mark_online();
        } else {
            self.mark_offline();
        }
        reachable
    }

    /// Handles an interface "up" signal: wait for the link to settle, then probe.
    pub async fn on_link_up(&self) -> bool {
        sleep(self.settle_delay).await;
        self.check_now().await
    }

    /// Follows the link signal until shutdown. While the link is up but the
    /// service did not answer, re-probes every `recheck_interval`.
    pub async fn run(
        &self,
        mut link: watch::Receiver<LinkState>,
        mut shutdown: watch::Receiver<bool>,
        recheck_interval: Duration,
    ) {
        info!("🌐 Connectivity monitor started");

        let mut recheck = tokio::time::interval(recheck_interval);
        recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if *link.borrow_and_update() == LinkState::Up {
            self.on_link_up().await;
        }

        loop {
            let link_up = *link.borrow() == LinkState::Up;

            tokio::select! {
                _ = shutdown.changed() => {
                    info!("🛑 Connectivity monitor shutting down");
                    break;
                }
                changed = link.changed() => {
                    if changed.is_err() {
                        warn!("Link signal closed, connectivity monitor stopping");
                        break;
                    }
                    let state = *link.borrow_and_update();
                    match state {
                        LinkState::Down => self.mark_offline(),
                        LinkState::Up => {
                            debug!("Link up, settling for {:?}", self.settle_delay);
                            tokio::select! {
                                _ = shutdown.changed() => break,
                                _ = sleep(self.settle_delay) => {}
                            }
                            // Flapped back down while settling
                            if *link.borrow() == LinkState::Up {
                                self.check_now().await;
                            }
                        }
                    }
                }
                _ = recheck.tick(), if link_up && !self.is_online() => {
                    self.check_now().await;
                }
            }
        }
    }
}

/// Interface signal for headless hosts: polls TCP reachability of the remote host.
pub struct LinkWatcher {
    target: String,
    interval: Duration,
    connect_timeout: Duration,
}

impl LinkWatcher {
    pub fn new(target: impl Into<String>, interval: Duration, connect_timeout: Duration) -> Self {
        Self {
            target: target.into(),
            interval,
            connect_timeout,
        }
    }

    /// Watches the host and port the probe URL points at.
    pub fn for_url(url: &Url, interval: Duration, connect_timeout: Duration) -> anyhow::Result<Self> {
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("probe URL {} has no host", url))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow::anyhow!("probe URL {} has no port", url))?;
        Ok(Self::new(format!("{}:{}", host, port), interval, connect_timeout))
    }

    pub async fn check(&self) -> LinkState {
        match timeout(self.connect_timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_)) => LinkState::Up,
            _ => LinkState::Down,
        }
    }

    pub async fn run(self, tx: watch::Sender<LinkState>, mut shutdown: watch::Receiver<bool>) {
        info!("🔌 Link watcher polling {} every {:?}", self.target, self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let state = self.check().await;
                    tx.send_if_modified(|current| {
                        if *current == state {
                            return false;
                        }
                        debug!("Link {:?} -> {:?}", *current, state);
                        *current = state;
                        true
                    });
                }
            }
        }
    }
}
