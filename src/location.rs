//! Location Gateway: the only code that touches the addressable location.
//!
//! The environment is abstracted by the [`Location`] trait (current href,
//! history mutation, back/forward listeners). [`MemoryLocation`] is an
//! in-memory implementation with a real history stack, used by tests and
//! by non-browser hosts; [`NoLocation`] models a context without any
//! addressable location.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};
use url::Url;

use crate::error::SyncError;
use crate::options::{HistoryMode, PathnameHandler};

/// Callback fired on back/forward navigation.
pub type NavigationHandler = Arc<dyn Fn() + Send + Sync>;

/// Handle for a registered navigation listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Environment primitives consumed by the gateway.
pub trait Location: Send + Sync {
    /// The current location string, or `None` when there is no
    /// addressable location at all.
    fn href(&self) -> Option<String>;

    /// Add a history entry for `path` without reloading and without
    /// notifying navigation listeners.
    fn push_state(&self, path: &str);

    /// Replace the current history entry with `path`, same guarantees as
    /// `push_state`.
    fn replace_state(&self, path: &str);

    /// Register a back/forward listener. `None` means the environment
    /// cannot register listeners.
    fn add_navigation_listener(&self, handler: NavigationHandler) -> Option<ListenerId>;

    fn remove_navigation_listener(&self, id: ListenerId);
}

/// A context with no addressable location (server-side, headless).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl Location for NoLocation {
    fn href(&self) -> Option<String> {
        None
    }

    fn push_state(&self, _path: &str) {}

    fn replace_state(&self, _path: &str) {}

    fn add_navigation_listener(&self, _handler: NavigationHandler) -> Option<ListenerId> {
        None
    }

    fn remove_navigation_listener(&self, _id: ListenerId) {}
}

// ── MemoryLocation ──

struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    fn current(&self) -> &str {
        &self.entries[self.index]
    }

    /// Resolve a path written by the application against the current entry.
    fn resolve(&self, path: &str) -> String {
        match Url::parse(self.current()).and_then(|base| base.join(path)) {
            Ok(url) => url.to_string(),
            Err(_) => path.to_string(),
        }
    }
}

/// In-memory location with a history stack.
///
/// - `push_state` / `replace_state` are application writes: counted,
///   never notify listeners.
/// - `navigate` is a user navigation to a new document entry: not
///   counted, no notification.
/// - `back` / `forward` / `go` move through history and notify every
///   navigation listener, like a browser's popstate.
pub struct MemoryLocation {
    history: RwLock<History>,
    listeners: RwLock<Vec<(ListenerId, NavigationHandler)>>,
    next_id: AtomicU64,
    writes: AtomicU64,
}

impl MemoryLocation {
    /// Create a location whose single history entry is `href`.
    ///
    /// `href` is stored verbatim; an invalid URL is allowed so that the
    /// malformed-location path can be exercised.
    pub fn new(href: &str) -> Self {
        Self {
            history: RwLock::new(History {
                entries: vec![href.to_string()],
                index: 0,
            }),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            writes: AtomicU64::new(0),
        }
    }

    /// User navigation: drop forward entries, push `href`, no event.
    pub fn navigate(&self, href: &str) {
        let mut history = self.history.write().unwrap();
        let resolved = history.resolve(href);
        let next = history.index + 1;
        history.entries.truncate(next);
        history.entries.push(resolved);
        history.index = next;
    }

    /// Step back one entry. Returns false (and fires nothing) at the start.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Step forward one entry. Returns false (and fires nothing) at the end.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    /// Move `delta` entries through history and notify listeners.
    pub fn go(&self, delta: isize) -> bool {
        {
            let mut history = self.history.write().unwrap();
            let target = history.index as isize + delta;
            if delta == 0 || target < 0 || target >= history.entries.len() as isize {
                return false;
            }
            history.index = target as usize;
        }
        // Handlers read the location; call them with no lock held.
        let handlers: Vec<NavigationHandler> = self
            .listeners
            .read()
            .unwrap()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler();
        }
        true
    }

    /// Number of `push_state` / `replace_state` calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of currently registered navigation listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap().len()
    }

    /// Number of history entries.
    pub fn history_len(&self) -> usize {
        self.history.read().unwrap().entries.len()
    }
}

impl Location for MemoryLocation {
    fn href(&self) -> Option<String> {
        Some(self.history.read().unwrap().current().to_string())
    }

    fn push_state(&self, path: &str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut history = self.history.write().unwrap();
        let resolved = history.resolve(path);
        let next = history.index + 1;
        history.entries.truncate(next);
        history.entries.push(resolved);
        history.index = next;
    }

    fn replace_state(&self, path: &str) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut history = self.history.write().unwrap();
        let resolved = history.resolve(path);
        let index = history.index;
        history.entries[index] = resolved;
    }

    fn add_navigation_listener(&self, handler: NavigationHandler) -> Option<ListenerId> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().unwrap().push((id, handler));
        Some(id)
    }

    fn remove_navigation_listener(&self, id: ListenerId) {
        self.listeners.write().unwrap().retain(|(other, _)| *other != id);
    }
}

// ── NavigationSubscription ──

/// A registered back/forward listener. Unregisters on drop.
pub struct NavigationSubscription {
    location: Arc<dyn Location>,
    id: Option<ListenerId>,
}

impl NavigationSubscription {
    /// Whether a listener is currently registered.
    pub fn is_active(&self) -> bool {
        self.id.is_some()
    }

    /// Unregister. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            self.location.remove_navigation_listener(id);
            debug!(listener = id.0, "navigation listener removed");
        }
    }
}

impl Drop for NavigationSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// ── LocationGateway ──

/// Reads and writes the location on behalf of the sync controller.
///
/// No method returns an error: an unavailable or malformed location reads
/// as `None` (logged), and writes go either to the configured pathname
/// delegate or to the history primitive selected by [`HistoryMode`].
#[derive(Clone)]
pub struct LocationGateway {
    location: Arc<dyn Location>,
    on_pathname_change: Option<PathnameHandler>,
    history: HistoryMode,
}

impl LocationGateway {
    pub fn new(
        location: Arc<dyn Location>,
        on_pathname_change: Option<PathnameHandler>,
        history: HistoryMode,
    ) -> Self {
        Self {
            location,
            on_pathname_change,
            history,
        }
    }

    /// Parse the current href. Errors are returned, not logged.
    pub fn try_current_url(&self) -> Result<Url, SyncError> {
        let href = self.location.href().ok_or(SyncError::Unavailable)?;
        Url::parse(&href).map_err(|e| SyncError::MalformedUrl {
            href,
            reason: e.to_string(),
        })
    }

    /// The current URL if the location exists and is valid.
    pub fn current_url(&self) -> Option<Url> {
        match self.try_current_url() {
            Ok(url) => Some(url),
            Err(SyncError::Unavailable) => {
                debug!("location unavailable, url sync skipped");
                None
            }
            Err(e) => {
                warn!("cannot read location: {e}");
                None
            }
        }
    }

    /// The current query string without `?`; empty when the URL has none.
    pub fn read_current_query(&self) -> Option<String> {
        self.current_url()
            .map(|url| url.query().unwrap_or_default().to_string())
    }

    /// Write `pathname?query` through the delegate or the history API.
    pub fn write_query(&self, pathname: &str, query: &str) {
        let path = format!("{pathname}?{query}");
        match &self.on_pathname_change {
            Some(delegate) => {
                debug!(%path, "delegating location write");
                delegate(&path);
            }
            None => {
                debug!(%path, mode = ?self.history, "writing location");
                match self.history {
                    HistoryMode::Replace => self.location.replace_state(&path),
                    HistoryMode::Push => self.location.push_state(&path),
                }
            }
        }
    }

    /// Register `handler` for back/forward navigation.
    ///
    /// In an environment that cannot register listeners the returned
    /// subscription is inactive and dropping it does nothing.
    pub fn subscribe_to_navigation(&self, handler: NavigationHandler) -> NavigationSubscription {
        let id = self.location.add_navigation_listener(handler);
        match id {
            Some(id) => debug!(listener = id.0, "navigation listener registered"),
            None => debug!("navigation listeners unsupported"),
        }
        NavigationSubscription {
            location: Arc::clone(&self.location),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn gateway(location: Arc<dyn Location>) -> LocationGateway {
        LocationGateway::new(location, None, HistoryMode::Replace)
    }

    // ========================================================================
    // MemoryLocation
    // ========================================================================

    #[test]
    fn replace_resolves_relative_path() {
        let loc = MemoryLocation::new("https://app.test/list?page=1");
        loc.replace_state("/list?page=2");
        assert_eq!(loc.href().unwrap(), "https://app.test/list?page=2");
        assert_eq!(loc.history_len(), 1);
        assert_eq!(loc.write_count(), 1);
    }

    #[test]
    fn push_adds_entry_and_truncates_forward() {
        let loc = MemoryLocation::new("https://app.test/?a=1");
        loc.push_state("/?a=2");
        loc.push_state("/?a=3");
        assert!(loc.back());
        loc.push_state("/?a=4");
        assert_eq!(loc.history_len(), 3);
        assert!(!loc.forward());
        assert_eq!(loc.href().unwrap(), "https://app.test/?a=4");
    }

    #[test]
    fn back_and_forward_fire_listeners() {
        let loc = MemoryLocation::new("https://app.test/?a=1");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_c = fired.clone();
        loc.add_navigation_listener(Arc::new(move || {
            fired_c.fetch_add(1, Ordering::Relaxed);
        }));

        loc.navigate("/?a=2");
        assert_eq!(fired.load(Ordering::Relaxed), 0);

        assert!(loc.back());
        assert_eq!(loc.href().unwrap(), "https://app.test/?a=1");
        assert!(loc.forward());
        assert_eq!(loc.href().unwrap(), "https://app.test/?a=2");
        assert_eq!(fired.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn go_out_of_range_is_noop() {
        let loc = MemoryLocation::new("https://app.test/");
        assert!(!loc.back());
        assert!(!loc.forward());
        assert!(!loc.go(0));
    }

    #[test]
    fn writes_do_not_fire_listeners() {
        let loc = MemoryLocation::new("https://app.test/");
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_c = fired.clone();
        loc.add_navigation_listener(Arc::new(move || {
            fired_c.fetch_add(1, Ordering::Relaxed);
        }));
        loc.push_state("/?x=1");
        loc.replace_state("/?x=2");
        assert_eq!(fired.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn listener_sees_new_href() {
        let loc = Arc::new(MemoryLocation::new("https://app.test/?a=1"));
        loc.navigate("/?a=2");
        let seen = Arc::new(RwLock::new(String::new()));
        let seen_c = seen.clone();
        let loc_c = loc.clone();
        loc.add_navigation_listener(Arc::new(move || {
            *seen_c.write().unwrap() = loc_c.href().unwrap();
        }));
        loc.back();
        assert_eq!(*seen.read().unwrap(), "https://app.test/?a=1");
    }

    #[test]
    fn remove_listener() {
        let loc = MemoryLocation::new("https://app.test/");
        let id = loc.add_navigation_listener(Arc::new(|| {})).unwrap();
        assert_eq!(loc.listener_count(), 1);
        loc.remove_navigation_listener(id);
        assert_eq!(loc.listener_count(), 0);
    }

    // ========================================================================
    // LocationGateway: read
    // ========================================================================

    #[test]
    fn read_query_from_valid_url() {
        let gw = gateway(Arc::new(MemoryLocation::new("https://app.test/p?page=2&q=hi")));
        assert_eq!(gw.read_current_query().as_deref(), Some("page=2&q=hi"));
    }

    #[test]
    fn read_query_without_query_is_empty() {
        let gw = gateway(Arc::new(MemoryLocation::new("https://app.test/p")));
        assert_eq!(gw.read_current_query().as_deref(), Some(""));
    }

    #[test]
    fn unavailable_location_reads_none() {
        let gw = gateway(Arc::new(NoLocation));
        assert!(gw.read_current_query().is_none());
        assert!(matches!(gw.try_current_url(), Err(SyncError::Unavailable)));
    }

    #[test]
    fn malformed_location_reads_none() {
        let gw = gateway(Arc::new(MemoryLocation::new("not a url")));
        assert!(gw.read_current_query().is_none());
        assert!(matches!(
            gw.try_current_url(),
            Err(SyncError::MalformedUrl { .. })
        ));
    }

    // ========================================================================
    // LocationGateway: write
    // ========================================================================

    #[test]
    fn write_replaces_by_default() {
        let loc = Arc::new(MemoryLocation::new("https://app.test/list?page=1"));
        let gw = gateway(loc.clone());
        gw.write_query("/list", "page=2");
        assert_eq!(loc.href().unwrap(), "https://app.test/list?page=2");
        assert_eq!(loc.history_len(), 1);
    }

    #[test]
    fn write_push_mode_adds_entry() {
        let loc = Arc::new(MemoryLocation::new("https://app.test/list?page=1"));
        let gw = LocationGateway::new(loc.clone(), None, HistoryMode::Push);
        gw.write_query("/list", "page=2");
        assert_eq!(loc.history_len(), 2);
        assert!(loc.back());
        assert_eq!(loc.href().unwrap(), "https://app.test/list?page=1");
    }

    #[test]
    fn write_with_delegate_skips_history() {
        let loc = Arc::new(MemoryLocation::new("https://app.test/list"));
        let received = Arc::new(RwLock::new(Vec::<String>::new()));
        let received_c = received.clone();
        let delegate: PathnameHandler = Arc::new(move |path: &str| {
            received_c.write().unwrap().push(path.to_string());
        });
        let gw = LocationGateway::new(loc.clone(), Some(delegate), HistoryMode::Replace);

        gw.write_query("/list", "page=2&ref=abc");

        assert_eq!(*received.read().unwrap(), vec!["/list?page=2&ref=abc".to_string()]);
        assert_eq!(loc.write_count(), 0);
        assert_eq!(loc.href().unwrap(), "https://app.test/list");
    }

    // ========================================================================
    // LocationGateway: subscribe
    // ========================================================================

    #[test]
    fn subscription_unregisters_on_drop() {
        let loc = Arc::new(MemoryLocation::new("https://app.test/"));
        let gw = gateway(loc.clone());
        {
            let sub = gw.subscribe_to_navigation(Arc::new(|| {}));
            assert!(sub.is_active());
            assert_eq!(loc.listener_count(), 1);
        }
        assert_eq!(loc.listener_count(), 0);
    }

    #[test]
    fn unsubscribe_twice_is_noop() {
        let loc = Arc::new(MemoryLocation::new("https://app.test/"));
        let gw = gateway(loc.clone());
        let mut sub = gw.subscribe_to_navigation(Arc::new(|| {}));
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(loc.listener_count(), 0);
    }

    #[test]
    fn subscribe_without_listener_support() {
        let gw = gateway(Arc::new(NoLocation));
        let mut sub = gw.subscribe_to_navigation(Arc::new(|| {}));
        assert!(!sub.is_active());
        sub.unsubscribe();
    }
}
