//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::socket::SocketRegistry;
use crate::translate::{TranslateError, Translator};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] BackendError),
    #[error("translator: {0}")]
    Translator(#[from] TranslateError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend client, the translator, the chat relay registry and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    translator: Option<Translator>,
    sockets: SocketRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let translator = config
            .translator
            .as_ref()
            .map(Translator::new)
            .transpose()?;

        if translator.is_none() {
            tracing::info!("TRANSLATE_API_KEY not set, page translation disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                translator,
                sockets: SocketRegistry::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the shop backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// The translator, if one is configured.
    #[must_use]
    pub fn translator(&self) -> Option<&Translator> {
        self.inner.translator.as_ref()
    }

    /// Live chat relays keyed by session.
    #[must_use]
    pub fn sockets(&self) -> &SocketRegistry {
        &self.inner.sockets
    }
}
