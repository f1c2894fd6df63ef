//! Geocoding cache.
//!
//! Maps normalized address strings to coordinates with a per-entry TTL and a
//! capacity bound. When full, the entry inserted first is evicted; reads do
//! not refresh an entry's position.

use std::collections::HashMap;
use std::fmt::Display;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::model::Coordinates;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    coordinates: Coordinates,
    inserted_at: Instant,
    ttl: Duration,
    sequence: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) >= self.ttl
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
    hits: u64,
    misses: u64,
    expired: u64,
    evictions: u64,
}

impl CacheState {
    fn remove_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.expired += removed as u64;
        removed
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.sequence)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadReport {
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Thread-safe geocoding cache, shared by cloning.
#[derive(Debug, Clone)]
pub struct GeocodeCache {
    state: Arc<Mutex<CacheState>>,
    config: CacheConfig,
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl GeocodeCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            config,
        }
    }

    /// Lower-cases, strips punctuation and collapses whitespace so that
    /// `"Eiffel Tower, Paris"` and `"eiffel  tower paris"` share an entry.
    pub fn normalize_key(address: &str) -> String {
        address
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn get(&self, address: &str) -> Option<Coordinates> {
        let key = Self::normalize_key(address);
        let now = Instant::now();
        let mut state = self.lock();

        match state.entries.get(&key).copied() {
            Some(entry) if entry.is_expired(now) => {
                state.entries.remove(&key);
                state.expired += 1;
                state.misses += 1;
                None
            }
            Some(entry) => {
                state.hits += 1;
                Some(entry.coordinates)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    pub fn set(&self, address: &str, coordinates: Coordinates) {
        self.set_with_ttl(address, coordinates, self.config.ttl);
    }

    pub fn set_with_ttl(&self, address: &str, coordinates: Coordinates, ttl: Duration) {
        let key = Self::normalize_key(address);
        if key.is_empty() || self.config.capacity == 0 {
            return;
        }

        let mut state = self.lock();
        if !state.entries.contains_key(&key) && state.entries.len() >= self.config.capacity {
            state.evict_oldest();
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            key,
            CacheEntry {
                coordinates,
                inserted_at: Instant::now(),
                ttl,
                sequence,
            },
        );
    }

    /// True when a live entry exists. Does not touch hit/miss counters.
    pub fn has(&self, address: &str) -> bool {
        let key = Self::normalize_key(address);
        let now = Instant::now();
        self.lock()
            .entries
            .get(&key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    pub fn remove_expired(&self) -> usize {
        self.lock().remove_expired(Instant::now())
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: self.config.capacity,
            hits: state.hits,
            misses: state.misses,
            expired: state.expired,
            evictions: state.evictions,
        }
    }

    /// Warms the cache for `addresses`, skipping live entries.
    ///
    /// Lookup failures are logged and counted; they never abort the batch.
    pub fn preload<F, E>(&self, addresses: &[&str], lookup: F) -> PreloadReport
    where
        F: Fn(&str) -> Result<Option<Coordinates>, E>,
        E: Display,
    {
        let mut report = PreloadReport::default();

        for &address in addresses {
            if self.has(address) {
                report.skipped += 1;
                continue;
            }

            match lookup(address) {
                Ok(Some(coordinates)) => {
                    self.set(address, coordinates);
                    report.loaded += 1;
                }
                Ok(None) => {
                    warn!(address, "preload lookup returned no coordinates");
                    report.failed += 1;
                }
                Err(err) => {
                    warn!(address, error = %err, "preload lookup failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            loaded = report.loaded,
            skipped = report.skipped,
            failed = report.failed,
            "geocode cache preload finished"
        );
        report
    }

    /// Spawns the background thread removing expired entries every
    /// `sweep_interval`. The sweep stops when the handle is dropped or the
    /// last cache clone goes away.
    pub fn start_sweeper(&self) -> io::Result<SweepHandle> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = Arc::downgrade(&self.state);
        let interval = self.config.sweep_interval;

        let thread = thread::Builder::new()
            .name("geocode-cache-sweep".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let Some(state) = state.upgrade() else {
                                break;
                            };
                            let removed = state
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .remove_expired(Instant::now());
                            if removed > 0 {
                                debug!(removed, "swept expired geocode entries");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(SweepHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the sweep thread; dropping it stops the sweep.
#[derive(Debug)]
pub struct SweepHandle {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Signals the sweep thread and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("geocode cache sweeper panicked");
            }
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
