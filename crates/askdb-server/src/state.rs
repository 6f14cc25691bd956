use crate::registry::SessionRegistry;
use crate::session::SessionContext;
use askdb_backend::BackendRegistry;
use askdb_core::AskdbConfig;
use askdb_guard::QueryValidator;
use askdb_runtime::Converter;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AskdbConfig>,
    pub registry: Arc<SessionRegistry>,
    pub converter: Arc<Converter>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(config: AskdbConfig, converter: Converter) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(SessionRegistry::new()),
            converter: Arc::new(converter),
            shutdown: Arc::new(watch::channel(false).0),
        }
    }

    /// Build backends and the validator from configuration.
    pub fn from_config(config: AskdbConfig) -> anyhow::Result<Self> {
        let backends = BackendRegistry::from_config(&config.backends)?;
        let validator = QueryValidator::from_config(&config.guard);
        let converter = Converter::new(backends, validator, config.database.max_result_rows);
        Ok(Self::new(config, converter))
    }

    /// Fires once [`AppState::close_sessions`] is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Ask every live session to close.
    pub fn close_sessions(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            session: self.config.session.clone(),
            database: self.config.database.clone(),
            default_backend: self.config.backends.default.clone(),
            converter: self.converter.clone(),
            registry: self.registry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_sessions_fires_signal() {
        let state = AppState::from_config(AskdbConfig::default()).unwrap();
        let mut signal = state.shutdown_signal();
        assert!(!*signal.borrow_and_update());

        state.clone().close_sessions();
        assert!(*signal.borrow_and_update());
    }

    #[test]
    fn test_unknown_default_backend_rejected() {
        let mut config = AskdbConfig::default();
        config.backends.default = "claude".to_string();
        let err = AppState::from_config(config).unwrap_err();
        assert!(err.to_string().contains("unknown backend 'claude'"));
    }
}
