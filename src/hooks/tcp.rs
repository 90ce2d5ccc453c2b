//! TCP packet latency: the time from a data packet arriving at the socket
//! to the owning application consuming it.
//!
//! The receive-path probe records the first pending packet's arrival per
//! socket; later arrivals on the same socket keep the earliest timestamp so
//! the measurement covers the oldest unconsumed data. The receive-buffer
//! adjustment fires once the application has read, closing the interval.
//! Sockets are keyed by their kernel address; socket destruction tears the
//! entry down so dead sockets cannot pin slots.
//!
//! A nonzero sample mask restricts tracking to the sockets whose identity
//! masks to zero, trading coverage for overhead on busy hosts.

use crate::config::Config;
use crate::histogram::{Histogram, HistogramError};
use crate::interval::KeyedIntervalTable;

// finer grouping than the time histograms, capped at ~34 seconds
const GROUPING_POWER: u8 = 4;
const MAX_VALUE_POWER: u8 = 35;

pub struct PacketLatencyHooks {
    start: KeyedIntervalTable,
    latency: Histogram,
    sample_mask: u64,
}

impl PacketLatencyHooks {
    pub fn new(config: &Config) -> Result<Self, HistogramError> {
        Ok(Self {
            start: KeyedIntervalTable::new(config.max_sockets()),
            latency: Histogram::new(GROUPING_POWER, MAX_VALUE_POWER)?,
            sample_mask: config.tcp_sample_mask(),
        })
    }

    fn sampled(&self, sock: u64) -> bool {
        sock & self.sample_mask == 0
    }

    /// A data packet arrived on the socket's receive path.
    pub fn on_tcp_probe(&self, sock: u64, ts: u64) {
        if !self.sampled(sock) {
            return;
        }

        // earliest pending packet wins
        self.start.begin_if_idle(sock, ts);
    }

    /// The application consumed from the receive buffer.
    pub fn on_tcp_rcv_space_adjust(&self, sock: u64, ts: u64) {
        if !self.sampled(sock) {
            return;
        }

        if let Some(latency) = self.start.end(sock, ts) {
            self.latency.observe(latency);
        }
    }

    /// Socket teardown: clear any pending packet for the dying socket.
    pub fn on_tcp_destroy_sock(&self, sock: u64) {
        self.start.teardown(sock);
    }

    pub fn latency(&self) -> &Histogram {
        &self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::value_to_index;

    const SOCK: u64 = 0xffff_8881_0234_5600;

    fn hooks(mask: u64) -> PacketLatencyHooks {
        let config: Config =
            toml::from_str(&format!("max_sockets = 64\ntcp_sample_mask = {mask}\n")).unwrap();
        PacketLatencyHooks::new(&config).unwrap()
    }

    #[test]
    fn test_arrival_to_consume_latency() {
        let hooks = hooks(0);

        hooks.on_tcp_probe(SOCK, 1_000);
        hooks.on_tcp_rcv_space_adjust(SOCK, 26_000);

        let expected = value_to_index(25_000, GROUPING_POWER, MAX_VALUE_POWER);
        assert_eq!(hooks.latency().bucket(expected), 1);
    }

    #[test]
    fn test_earliest_packet_wins() {
        let hooks = hooks(0);

        hooks.on_tcp_probe(SOCK, 1_000);
        hooks.on_tcp_probe(SOCK, 20_000);
        hooks.on_tcp_rcv_space_adjust(SOCK, 21_000);

        let expected = value_to_index(20_000, GROUPING_POWER, MAX_VALUE_POWER);
        assert_eq!(hooks.latency().bucket(expected), 1);
    }

    #[test]
    fn test_consume_without_arrival_is_noop() {
        let hooks = hooks(0);

        hooks.on_tcp_rcv_space_adjust(SOCK, 1_000);

        let total: u64 = hooks.latency().load().iter().sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_destroy_clears_pending() {
        let hooks = hooks(0);

        hooks.on_tcp_probe(SOCK, 1_000);
        hooks.on_tcp_destroy_sock(SOCK);
        hooks.on_tcp_rcv_space_adjust(SOCK, 2_000);

        let total: u64 = hooks.latency().load().iter().sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_sample_mask_excludes_sockets() {
        let hooks = hooks(0x100);

        let sampled = 0xffff_0000_0000_0200u64;
        let excluded = 0xffff_0000_0000_0100u64;

        hooks.on_tcp_probe(excluded, 1_000);
        hooks.on_tcp_rcv_space_adjust(excluded, 2_000);

        hooks.on_tcp_probe(sampled, 1_000);
        hooks.on_tcp_rcv_space_adjust(sampled, 2_000);

        let total: u64 = hooks.latency().load().iter().sum();
        assert_eq!(total, 1);
    }
}
