//! Per-client request rate limiting.
//!
//! This module provides the [`RateLimiter`] struct which caps how many
//! requests each client may make within a fixed lookback window, protecting
//! the service from a single chatty connection.
//!
//! # Overview
//!
//! Each client key (normally the peer IP) owns a window that starts at its
//! first admitted request. Requests inside the window increment a counter up
//! to the cap; once the window has fully aged out the entry is purged and the
//! next request starts a fresh window. This is a fixed lookback from "now" at
//! each call, an accepted approximation rather than an exact rolling bucket.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tubedown_core::limit::RateLimiter;
//!
//! let limiter = RateLimiter::new(2, Duration::from_secs(60));
//! assert!(limiter.admit("10.0.0.1"));
//! assert!(limiter.admit("10.0.0.1"));
//! assert!(!limiter.admit("10.0.0.1"));
//! // A different client is counted on its own.
//! assert!(limiter.admit("10.0.0.2"));
//! ```

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::config::RATE_WINDOW;

/// Per-client sliding-window request counter.
///
/// Shared across connection handlers behind an `Arc`; `DashMap` keeps
/// concurrent admits on different clients from contending on one lock.
/// State lives only in memory and resets on process restart.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum admitted requests per client per window.
    max_requests: u32,

    /// Lookback interval measured from each client's window start.
    window: Duration,

    /// Live windows keyed by client.
    clients: DashMap<String, ClientWindow>,
}

/// Counter state for one client.
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    /// Requests admitted since `window_start`.
    count: u32,

    /// When this client's current window opened.
    window_start: Instant,
}

impl RateLimiter {
    /// Creates a rate limiter admitting `max_requests` per client per
    /// `window`.
    #[must_use]
    #[instrument(skip_all, fields(max_requests, window_secs = window.as_secs()))]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        debug!("creating rate limiter");
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
        }
    }

    /// Creates a rate limiter over the standard one-minute window.
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, RATE_WINDOW)
    }

    /// Decides whether one more request from `client_key` is admitted.
    ///
    /// Every call first purges windows that have fully aged out, then counts
    /// this request against the client's live window. A client with no live
    /// window gets a fresh one with this request as its first.
    #[must_use]
    #[instrument(skip(self))]
    pub fn admit(&self, client_key: &str) -> bool {
        let now = Instant::now();

        // A window that has aged out is gone entirely; the client's next
        // request opens a new one with a zeroed count.
        self.clients
            .retain(|_, window| now.duration_since(window.window_start) < self.window);

        let mut entry = self
            .clients
            .entry(client_key.to_string())
            .or_insert(ClientWindow {
                count: 0,
                window_start: now,
            });

        if entry.count < self.max_requests {
            entry.count += 1;
            debug!(count = entry.count, "request admitted");
            true
        } else {
            debug!(count = entry.count, "rate limit exceeded");
            false
        }
    }

    /// Maximum admitted requests per client per window.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// The configured lookback interval.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}
