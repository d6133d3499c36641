use std::fmt;
use std::sync::Arc;

use crate::codec::{QueryCodec, StandardCodec};
use crate::value::State;

/// Receives every new state produced by `set_state`.
pub type ValueChangeHandler = Arc<dyn Fn(&State) + Send + Sync>;

/// Receives the composed `pathname?query` instead of a direct history write.
pub type PathnameHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Which history primitive a direct location write uses.
///
/// Neither notifies navigation listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Rewrite the current entry in place.
    #[default]
    Replace,
    /// Add a new entry, so back/forward steps through state changes.
    Push,
}

/// Options for a sync session.
///
/// ```ignore
/// let options = SyncOptions::default()
///     .with_value_change(|state| println!("{state:?}"))
///     .with_history(HistoryMode::Push);
/// ```
#[derive(Clone)]
pub struct SyncOptions {
    /// Called with every new state after each `set_state` resolution.
    pub on_value_change: Option<ValueChangeHandler>,

    /// When set, location writes are handed to this delegate, which is
    /// solely responsible for navigation.
    pub on_pathname_change: Option<PathnameHandler>,

    /// Parse/stringify implementation. Defaults to [`StandardCodec`].
    pub codec: Arc<dyn QueryCodec>,

    /// Enables URL synchronization and navigation handling.
    pub sync_pathname: bool,

    /// History primitive for direct writes.
    pub history: HistoryMode,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            on_value_change: None,
            on_pathname_change: None,
            codec: Arc::new(StandardCodec),
            sync_pathname: true,
            history: HistoryMode::Replace,
        }
    }
}

impl SyncOptions {
    pub fn with_value_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        self.on_value_change = Some(Arc::new(handler));
        self
    }

    pub fn with_pathname_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_pathname_change = Some(Arc::new(handler));
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn QueryCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_sync_pathname(mut self, enabled: bool) -> Self {
        self.sync_pathname = enabled;
        self
    }

    pub fn with_history(mut self, history: HistoryMode) -> Self {
        self.history = history;
        self
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("on_value_change", &self.on_value_change.is_some())
            .field("on_pathname_change", &self.on_pathname_change.is_some())
            .field("sync_pathname", &self.sync_pathname)
            .field("history", &self.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = SyncOptions::default();
        assert!(options.sync_pathname);
        assert!(options.on_value_change.is_none());
        assert!(options.on_pathname_change.is_none());
        assert_eq!(options.history, HistoryMode::Replace);
    }

    #[test]
    fn builder_sets_fields() {
        let options = SyncOptions::default()
            .with_value_change(|_| {})
            .with_pathname_change(|_| {})
            .with_sync_pathname(false)
            .with_history(HistoryMode::Push);
        assert!(options.on_value_change.is_some());
        assert!(options.on_pathname_change.is_some());
        assert!(!options.sync_pathname);
        assert_eq!(options.history, HistoryMode::Push);
    }

    #[test]
    fn debug_hides_handlers() {
        let debug = format!("{:?}", SyncOptions::default().with_value_change(|_| {}));
        assert!(debug.contains("on_value_change: true"));
        assert!(debug.contains("sync_pathname: true"));
    }
}
