//! ICMP echo prober.
//!
//! Sends a single echo request per call and measures the reply RTT.
//! Opening ICMP sockets needs raw-socket privileges or, on Linux, a
//! `net.ipv4.ping_group_range` that includes the running group.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use surge_ping::{Client, Config, ICMP, PingIdentifier, PingSequence};

use super::{ProbeError, Prober, Target};

/// Echo payload, matching the default size of common ping tools.
const PAYLOAD: [u8; 56] = [0; 56];

/// ICMP echo prober backed by `surge-ping`.
///
/// One client per address family is opened up front and shared by every
/// probe; each probe uses a fresh identifier so concurrent probes to the same
/// host do not steal each other's replies.
pub struct IcmpProber {
    v4: Client,
    v6: Option<Client>,
    sequence: AtomicU16,
}

impl IcmpProber {
    /// Open the ICMP sockets.
    ///
    /// # Errors
    /// Returns `ProbeError::Network` if the IPv4 socket cannot be opened.
    /// A missing IPv6 stack only disables IPv6 targets.
    pub fn new() -> Result<Self, ProbeError> {
        let v4 = Client::new(&Config::default())?;
        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "IPv6 ICMP socket unavailable, IPv6 targets will fail");
                None
            }
        };

        Ok(Self {
            v4,
            v6,
            sequence: AtomicU16::new(0),
        })
    }

    fn client_for(&self, ip: IpAddr) -> Result<&Client, ProbeError> {
        match ip {
            IpAddr::V4(_) => Ok(&self.v4),
            IpAddr::V6(_) => self
                .v6
                .as_ref()
                .ok_or_else(|| ProbeError::Unreachable("IPv6 ICMP socket unavailable".into())),
        }
    }
}

impl std::fmt::Debug for IcmpProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpProber")
            .field("ipv6", &self.v6.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolve a target to an IP address; IP literals skip the lookup.
pub(crate) async fn resolve_host(target: &Target) -> Result<IpAddr, ProbeError> {
    if let Some(ip) = target.ip() {
        return Ok(ip);
    }

    let host = target.as_str();
    let addrs = tokio::net::lookup_host(format!("{host}:0"))
        .await
        .map_err(|e| ProbeError::InvalidTarget(format!("{host}: {e}")))?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| ProbeError::InvalidTarget(format!("{host}: no addresses found")))
}

#[async_trait::async_trait]
impl Prober for IcmpProber {
    async fn probe(&self, target: &Target, timeout: Duration) -> Result<Duration, ProbeError> {
        let ip = resolve_host(target).await?;
        let client = self.client_for(ip)?;

        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(timeout);

        let seq = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));
        match tokio::time::timeout(timeout, pinger.ping(seq, &PAYLOAD)).await {
            Ok(Ok((_, rtt))) => Ok(rtt),
            Ok(Err(surge_ping::SurgeError::Timeout { .. })) | Err(_) => Err(ProbeError::Timeout),
            Ok(Err(e)) => Err(ProbeError::Unreachable(e.to_string())),
        }
    }
}
