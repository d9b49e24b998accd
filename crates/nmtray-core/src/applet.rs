// ── Applet facade ──
//
// The presentation-facing entry point. Owns the registry, the sync worker,
// the dispatcher and the refresh driver, and exposes the handful of calls a
// front-end needs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::command::{CommandDispatcher, Selection, SettingsStore};
use crate::config::AppletConfig;
use crate::engine::{Connector, SyncEngine, UnixConnector};
use crate::error::CoreError;
use crate::menu::{Menu, MenuEntry, menu_entries};
use crate::model::DisplayView;
use crate::refresh::{Presenter, RefreshDriver};
use crate::store::Registry;

/// A running indicator session.
///
/// Must be created inside a tokio runtime only if [`run`](Self::run) will
/// be awaited; the sync worker brings its own runtime.
pub struct Applet {
    registry: Arc<Registry>,
    engine: SyncEngine,
    dispatcher: CommandDispatcher,
    driver: RefreshDriver,
}

impl Applet {
    /// Start a session against the daemon socket named in `config`.
    pub fn start(config: &AppletConfig, settings: Arc<dyn SettingsStore>) -> Result<Self, CoreError> {
        Self::with_connector(config, UnixConnector::new(&config.socket_path), settings)
    }

    /// Start a session over an arbitrary daemon link.
    pub fn with_connector<C: Connector>(
        config: &AppletConfig,
        connector: C,
        settings: Arc<dyn SettingsStore>,
    ) -> Result<Self, CoreError> {
        let registry = Arc::new(Registry::new());
        let engine = SyncEngine::start(Arc::clone(&registry), connector)?;
        let dispatcher =
            CommandDispatcher::new(Arc::clone(&registry), engine.request_handle(), settings);
        let driver = RefreshDriver::new(
            Arc::clone(&registry),
            config.refresh_interval,
            config.frame_interval,
        );

        info!(socket = %config.socket_path.display(), "applet started");
        Ok(Self {
            registry,
            engine,
            dispatcher,
            driver,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Current display state, animation phase and visibility.
    pub fn display_state(&self) -> DisplayView {
        self.driver.current_view()
    }

    pub fn list_menu_entries(&self) -> Vec<MenuEntry> {
        self.registry.read(|view| menu_entries(view))
    }

    pub fn menu(&self) -> Menu {
        self.registry.read(|view| Menu::build(view))
    }

    pub fn dispatch_selection(&self, selection: &Selection) -> Result<(), CoreError> {
        self.dispatcher.dispatch(selection)
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Render through `presenter` until `cancel` fires.
    pub async fn run<P: Presenter>(&self, presenter: &mut P, cancel: CancellationToken) {
        self.driver.run(presenter, cancel).await;
    }

    /// Whether the sync worker is still attached to the daemon.
    pub fn is_connected(&self) -> bool {
        !self.engine.is_finished()
    }

    /// Stop the sync worker and wait for it. The registry keeps its last
    /// state.
    pub fn shutdown(&self) {
        self.engine.shutdown();
        info!("applet stopped");
    }
}
