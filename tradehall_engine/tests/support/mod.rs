#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sqlx::{migrate::MigrateDatabase, Sqlite};
use tradehall_engine::{
    db_types::UserId,
    events::EventProducers,
    InMemoryOrderRepository,
    MarketplaceDatabase,
    Notification,
    Notifier,
    OrderFlowApi,
    RatingApi,
    SchedulerApi,
    SchedulerConfig,
    SqliteDatabase,
};

pub async fn prepare_test_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = format!(
        "sqlite://{}/tradehall_test_{}.db",
        std::env::temp_dir().display(),
        rand::random::<u64>()
    );
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
    db.migrate().await.expect("Error running migrations");
    db
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await.expect("Error closing test database");
    let _ = Sqlite::drop_database(&url).await;
}

//--------------------------------------  Recording notifier  --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    User(UserId),
    Channel(String),
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: Target,
    pub note: Notification,
}

/// Test double for the chat platform: records every delivery and can be told to "lose" messages for specific users.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    unreachable: Arc<Mutex<Vec<UserId>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_unreachable(&self, user: &UserId) {
        self.unreachable.lock().unwrap().push(user.clone());
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn to_user(&self, user: &UserId) -> Vec<Notification> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.target == Target::User(user.clone()))
            .map(|d| d.note)
            .collect()
    }

    pub fn to_channel(&self, channel: &str) -> Vec<Notification> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.target == Target::Channel(channel.to_string()))
            .map(|d| d.note)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn notify_user(&self, user: &UserId, note: Notification) -> bool {
        if self.unreachable.lock().unwrap().contains(user) {
            return false;
        }
        self.deliveries.lock().unwrap().push(Delivery { target: Target::User(user.clone()), note });
        true
    }

    async fn notify_channel(&self, channel: &str, note: Notification) -> bool {
        self.deliveries.lock().unwrap().push(Delivery { target: Target::Channel(channel.to_string()), note });
        true
    }
}

//--------------------------------------      API bundle      --------------------------------------------------------

pub struct TestHarness {
    pub db: SqliteDatabase,
    pub repo: InMemoryOrderRepository,
    pub notifier: RecordingNotifier,
    pub orders: OrderFlowApi<SqliteDatabase, InMemoryOrderRepository, RecordingNotifier>,
    pub ratings: RatingApi<SqliteDatabase, InMemoryOrderRepository, RecordingNotifier>,
    pub scheduler: SchedulerApi<SqliteDatabase, InMemoryOrderRepository, RecordingNotifier>,
}

pub async fn setup() -> TestHarness {
    setup_with_scheduler_config(SchedulerConfig::default()).await
}

/// A second, independently owned handle onto the same order flow, for tests that race API calls on separate tasks.
pub fn order_api(
    db: &SqliteDatabase,
    repo: &InMemoryOrderRepository,
    notifier: &RecordingNotifier,
) -> OrderFlowApi<SqliteDatabase, InMemoryOrderRepository, RecordingNotifier> {
    OrderFlowApi::new(db.clone(), repo.clone(), notifier.clone(), EventProducers::default())
}

pub async fn setup_with_scheduler_config(config: SchedulerConfig) -> TestHarness {
    let db = prepare_test_db().await;
    let repo = InMemoryOrderRepository::new();
    let notifier = RecordingNotifier::new();
    let producers = EventProducers::default();
    let orders = OrderFlowApi::new(db.clone(), repo.clone(), notifier.clone(), producers.clone());
    let ratings = RatingApi::new(db.clone(), repo.clone(), notifier.clone(), producers.clone());
    let scheduler = SchedulerApi::new(db.clone(), repo.clone(), notifier.clone(), producers, config);
    TestHarness { db, repo, notifier, orders, ratings, scheduler }
}

impl TestHarness {
    pub async fn tear_down(self) {
        tear_down(self.db).await;
    }
}
