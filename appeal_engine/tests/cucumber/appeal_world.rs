use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use appeal_engine::{
    db_types::{Order, Precheck, ReportId},
    events::EventProducers,
    precheck_objects::PrecheckSource,
    snapshot::ReportSnapshot,
    test_utils::prepare_env::fresh_database,
    DigestRenderer,
    OrderFlowApi,
    PrecheckApi,
    RenderError,
    ReportApi,
    ReportRenderer,
    SqliteDatabase,
    SystemConfig,
};
use cucumber::World;
use log::*;
use property_data::DataSourceGateway;

#[derive(Default, Debug, World)]
pub struct AppealWorld {
    pub system: Option<AppealSystem>,
    pub last_precheck: Option<(PrecheckSource, Precheck)>,
    pub orders: HashMap<String, Order>,
    pub last_error: Option<String>,
}

impl AppealWorld {
    pub fn system(&self) -> &AppealSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn order(&self, alias: &str) -> &Order {
        self.orders.get(alias).unwrap_or_else(|| panic!("No order called {alias}"))
    }

    pub fn precheck(&self) -> &Precheck {
        &self.last_precheck.as_ref().expect("No precheck has been run").1
    }
}

/// A renderer that can be switched off to simulate an outage.
#[derive(Clone, Debug, Default)]
pub struct SwitchableRenderer {
    pub down: Arc<AtomicBool>,
    inner: DigestRenderer,
}

impl ReportRenderer for SwitchableRenderer {
    async fn render(&self, report_id: &ReportId, snapshot: &ReportSnapshot) -> Result<String, RenderError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(RenderError::Unavailable("connection refused".into()));
        }
        self.inner.render(report_id, snapshot).await
    }
}

pub struct AppealSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub config: SystemConfig,
    pub renderer: SwitchableRenderer,
    pub prechecks: PrecheckApi<SqliteDatabase, DataSourceGateway>,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub reports: ReportApi<SqliteDatabase, SwitchableRenderer>,
}

impl Debug for AppealSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AppealSystem({})", self.db_path)
    }
}

impl AppealSystem {
    pub async fn new() -> Self {
        let db = fresh_database().await;
        let url = db.url().to_string();
        debug!("Created database: {url}");
        let renderer = SwitchableRenderer::default();
        let producers = EventProducers::default();
        Self {
            db_path: url,
            config: SystemConfig::default(),
            prechecks: PrecheckApi::new(db.clone(), DataSourceGateway::fixture_only(), producers.clone()),
            orders: OrderFlowApi::new(db.clone(), producers.clone()),
            reports: ReportApi::new(db.clone(), renderer.clone(), producers),
            renderer,
            db,
        }
    }
}
