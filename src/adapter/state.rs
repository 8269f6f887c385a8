use crate::application::eventbus::SharedEventBus;
use crate::application::service::{GroupService, PlayerService, SessionService};
use crate::domain::repository::{GroupRepository, PlayerRepository, SessionProvider};
use crate::infrastructure::config::PanelConfig;
use crate::infrastructure::persistence::rest::RestClient;
use std::sync::Arc;

/// Type aliases for dynamic repository types
pub type DynPlayerRepository = Arc<dyn PlayerRepository>;
pub type DynGroupRepository = Arc<dyn GroupRepository>;
pub type DynSessionProvider = Arc<dyn SessionProvider>;

pub struct AppState {
    pub session_service: SessionService<DynSessionProvider>,
    pub player_service: Arc<PlayerService<DynPlayerRepository>>,
    pub group_service: GroupService<DynGroupRepository, DynPlayerRepository>,
    pub event_bus: SharedEventBus,
    /// Present when the hosted backend is in use; needed for sign-in
    pub rest_client: Option<RestClient>,
}

impl AppState {
    pub fn new(
        player_repo: DynPlayerRepository,
        group_repo: DynGroupRepository,
        session_provider: DynSessionProvider,
        event_bus: SharedEventBus,
        panel: &PanelConfig,
    ) -> Self {
        let player_service = Arc::new(PlayerService::new(
            player_repo,
            panel.search_limit,
            panel.min_search_chars,
        ));

        Self {
            session_service: SessionService::new(session_provider, event_bus.clone()),
            group_service: GroupService::new(
                group_repo,
                player_service.clone(),
                event_bus.clone(),
                panel.group_name_max_chars,
            ),
            player_service,
            event_bus,
            rest_client: None,
        }
    }

    pub fn with_rest_client(mut self, client: RestClient) -> Self {
        self.rest_client = Some(client);
        self
    }
}
