//! Sync Controller: keeps a [`State`] and the location's query string in step.
//!
//! Two sources change the state:
//!
//! - the application, through [`QuerySync::set_state`] (or a cloned
//!   [`StateHandle`]): the new state is stored, observers run, then the
//!   merged query is written to the location;
//! - the user, through back/forward navigation: the state is recomputed
//!   from the new URL and stored, with no location write, since the URL
//!   already holds it.
//!
//! ```ignore
//! let location = Arc::new(MemoryLocation::new("https://app.test/list?page=2"));
//! let sync = QuerySync::init(query_map! { "page" => 1, "q" => "" }, location, SyncOptions::default());
//! assert_eq!(sync.state(), query_map! { "page" => 2, "q" => "" });
//!
//! sync.update(|s| s.overlay(&query_map! { "q" => "rust" }));
//! // location is now https://app.test/list?page=2&q=rust
//! sync.reset();
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::codec::QueryCodec;
use crate::location::{Location, LocationGateway, NavigationSubscription};
use crate::options::{SyncOptions, ValueChangeHandler};
use crate::reconcile::reconcile;
use crate::schema::Schema;
use crate::value::{State, SubscriptionId};

/// Callback type for state replacement notifications.
pub type StateObserver = Arc<dyn Fn(&State) + Send + Sync>;

/// What `set_state` should do.
pub enum StateUpdate {
    /// Use this state as-is. A full replacement, not a patch.
    Replace(State),
    /// Compute the new state from the current one.
    Update(Box<dyn FnOnce(&State) -> State + Send>),
    /// Restore the schema defaults.
    Reset,
}

impl StateUpdate {
    pub fn update<F>(f: F) -> Self
    where
        F: FnOnce(&State) -> State + Send + 'static,
    {
        StateUpdate::Update(Box::new(f))
    }
}

impl From<State> for StateUpdate {
    fn from(state: State) -> Self {
        StateUpdate::Replace(state)
    }
}

/// Session internals shared by the controller, its handles and the
/// navigation listener (which holds only a weak reference).
struct Inner {
    schema: RwLock<Schema>,
    state: RwLock<State>,
    sync_pathname: AtomicBool,
    torn_down: AtomicBool,
    gateway: LocationGateway,
    codec: Arc<dyn QueryCodec>,
    on_value_change: Option<ValueChangeHandler>,
    observers: RwLock<Vec<(SubscriptionId, StateObserver)>>,
    next_id: AtomicU64,
}

impl Inner {
    fn schema(&self) -> Schema {
        self.schema.read().unwrap().clone()
    }

    fn state(&self) -> State {
        self.state.read().unwrap().clone()
    }

    fn sync_enabled(&self) -> bool {
        self.sync_pathname.load(Ordering::Acquire)
    }

    /// State derived from the location, or the defaults when sync is off
    /// or the location cannot be read.
    fn location_state(&self) -> State {
        let schema = self.schema();
        if !self.sync_enabled() {
            return schema.defaults().clone();
        }
        match self.gateway.read_current_query() {
            Some(query) => reconcile(&schema, &query, self.codec.as_ref()),
            None => schema.defaults().clone(),
        }
    }

    fn store(&self, next: &State) {
        *self.state.write().unwrap() = next.clone();
    }

    fn notify(&self, state: &State) {
        let observers: Vec<StateObserver> = self
            .observers
            .read()
            .unwrap()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(state);
        }
    }

    fn set_state(&self, update: StateUpdate) {
        let next = match update {
            StateUpdate::Replace(state) => state,
            StateUpdate::Update(f) => f(&self.state()),
            StateUpdate::Reset => self.schema().defaults().clone(),
        };

        self.store(&next);
        if let Some(on_value_change) = &self.on_value_change {
            on_value_change(&next);
        }
        self.notify(&next);

        if self.sync_enabled() {
            self.write_back(&next);
        }
    }

    /// Lay `state` over the current URL mapping and write the result.
    ///
    /// Every schema key is overwritten; foreign keys already in the URL
    /// survive.
    fn write_back(&self, state: &State) {
        let Some(url) = self.gateway.current_url() else {
            return;
        };
        let schema = self.schema();
        let existing = self.codec.parse(url.query().unwrap_or_default(), &schema);
        let query = self.codec.stringify(&existing.overlay(state));
        self.gateway.write_query(url.path(), &query);
    }

    /// Back/forward handler: adopt the navigated-to URL, write nothing.
    fn resync(&self) {
        if self.torn_down.load(Ordering::Acquire) || !self.sync_enabled() {
            return;
        }
        let next = self.location_state();
        debug!(keys = next.len(), "state re-synced from navigation");
        self.store(&next);
        self.notify(&next);
    }
}

/// A URL-synchronized state session.
///
/// Owns the single navigation subscription; dropping the session (or
/// calling [`teardown`](Self::teardown)) removes it. Cloned
/// [`StateHandle`]s keep working after teardown but no longer follow
/// navigation.
pub struct QuerySync {
    inner: Arc<Inner>,
    navigation: Mutex<Option<NavigationSubscription>>,
}

impl QuerySync {
    /// Start a session.
    ///
    /// With sync enabled the initial state is reconciled from the current
    /// location; otherwise (or when the location is unavailable or
    /// malformed) it is the defaults verbatim.
    pub fn init(
        defaults: impl Into<Schema>,
        location: Arc<dyn Location>,
        options: SyncOptions,
    ) -> Self {
        let schema = defaults.into();
        let gateway = LocationGateway::new(location, options.on_pathname_change, options.history);
        let inner = Arc::new(Inner {
            state: RwLock::new(schema.defaults().clone()),
            schema: RwLock::new(schema),
            sync_pathname: AtomicBool::new(options.sync_pathname),
            torn_down: AtomicBool::new(false),
            gateway,
            codec: options.codec,
            on_value_change: options.on_value_change,
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        });
        let initial = inner.location_state();
        inner.store(&initial);
        debug!(
            keys = initial.len(),
            sync = options.sync_pathname,
            "query sync session initialized"
        );

        let sync = Self {
            inner,
            navigation: Mutex::new(None),
        };
        sync.resubscribe();
        sync
    }

    // ====================================================================
    // State
    // ====================================================================

    /// The current state (a clone).
    pub fn state(&self) -> State {
        self.inner.state()
    }

    pub fn schema(&self) -> Schema {
        self.inner.schema()
    }

    /// Resolve `update`, store the result, notify, then write the location.
    pub fn set_state(&self, update: impl Into<StateUpdate>) {
        self.inner.set_state(update.into());
    }

    /// Shorthand for `set_state(StateUpdate::update(f))`.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&State) -> State + Send + 'static,
    {
        self.inner.set_state(StateUpdate::update(f));
    }

    /// Restore the schema defaults (and write them to the location).
    pub fn reset(&self) {
        self.inner.set_state(StateUpdate::Reset);
    }

    /// A cloneable handle bound to this session.
    pub fn handle(&self) -> StateHandle {
        StateHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    // ====================================================================
    // Observers
    // ====================================================================

    /// Observe every state replacement, including navigation re-syncs.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .observers
            .write()
            .unwrap()
            .push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .observers
            .write()
            .unwrap()
            .retain(|(other, _)| *other != id);
    }

    // ====================================================================
    // Configuration
    // ====================================================================

    pub fn is_sync_enabled(&self) -> bool {
        self.inner.sync_enabled()
    }

    /// Toggle URL sync. A change re-establishes the navigation subscription.
    pub fn set_sync_pathname(&self, enabled: bool) {
        let previous = self.inner.sync_pathname.swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            self.resubscribe();
        }
    }

    /// Swap the defaults. A different schema reference re-establishes the
    /// navigation subscription; the current state is left alone.
    pub fn set_defaults(&self, defaults: impl Into<Schema>) {
        let schema = defaults.into();
        let changed = {
            let mut current = self.inner.schema.write().unwrap();
            if current.same_reference(&schema) {
                false
            } else {
                *current = schema;
                true
            }
        };
        if changed {
            self.resubscribe();
        }
    }

    /// Whether a navigation listener is currently registered.
    pub fn is_listening(&self) -> bool {
        self.navigation
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(NavigationSubscription::is_active)
    }

    /// End the session: remove the navigation listener. Idempotent.
    pub fn teardown(&self) {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut subscription) = self.navigation.lock().unwrap().take() {
            subscription.unsubscribe();
        }
        debug!("query sync session torn down");
    }

    /// Drop any existing listener, then register one if sync is enabled.
    fn resubscribe(&self) {
        let mut navigation = self.navigation.lock().unwrap();
        if let Some(mut old) = navigation.take() {
            old.unsubscribe();
        }
        if self.inner.torn_down.load(Ordering::Acquire) || !self.inner.sync_enabled() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        *navigation = Some(self.inner.gateway.subscribe_to_navigation(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.resync();
            }
        })));
    }
}

impl Drop for QuerySync {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Bound `set_state` / `reset` actions of a session.
#[derive(Clone)]
pub struct StateHandle {
    inner: Arc<Inner>,
}

impl StateHandle {
    pub fn state(&self) -> State {
        self.inner.state()
    }

    pub fn set_state(&self, update: impl Into<StateUpdate>) {
        self.inner.set_state(update.into());
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&State) -> State + Send + 'static,
    {
        self.inner.set_state(StateUpdate::update(f));
    }

    pub fn reset(&self) {
        self.inner.set_state(StateUpdate::Reset);
    }
}
