//! Test server management.
//!
//! Runs the capgate router in-process on an ephemeral port, backed by a
//! SQLite file in a temporary directory.

use capgate::access::ResourcePermission;
use capgate::auth::SigningContext;
use capgate::db::Database;
use capgate::http::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";
pub const REALM: &str = "capgate-test";

/// Seeded accounts. Passwords equal the local part of the email.
pub const MEMBER_EMAIL: &str = "member@example.com";
pub const MEMBER_PASSWORD: &str = "member";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin";

/// A running test server.
pub struct TestServer {
    addr: SocketAddr,
    pub db: Database,
    pub signing: Arc<SigningContext>,
    pub member_id: i64,
    pub admin_id: i64,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a server with default token lifetimes.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with_ttls(Duration::from_secs(3600), Duration::from_secs(86_400)).await
    }

    pub async fn spawn_with_ttls(access_ttl: Duration, refresh_ttl: Duration) -> anyhow::Result<Self> {
        capgate::metrics::init();

        let data_dir = tempfile::tempdir()?;
        let db_path = data_dir.path().join("capgate.db");
        let db = Database::new(db_path.to_str().unwrap()).await?;

        let member_role = db.roles().create("member").await?;
        db.roles()
            .grant(member_role.id, &ResourcePermission::read("notes"))
            .await?;
        let admin_role = db.roles().create("admin").await?;
        db.roles()
            .grant(admin_role.id, &ResourcePermission::read("notes"))
            .await?;
        db.roles()
            .grant(admin_role.id, &ResourcePermission::read_write("sessions"))
            .await?;

        let member = db
            .accounts()
            .create(MEMBER_EMAIL, MEMBER_PASSWORD, member_role.id)
            .await?;
        let admin = db
            .accounts()
            .create(ADMIN_EMAIL, ADMIN_PASSWORD, admin_role.id)
            .await?;

        let signing = Arc::new(SigningContext::hs256(SECRET, "capgate"));
        let state = AppState::new(db.clone(), signing.clone(), REALM, access_ttl, refresh_ttl)?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = http::serve(listener, state, async {
                let _ = rx.await;
            })
            .await;
        });

        Ok(Self {
            addr,
            db,
            signing,
            member_id: member.id,
            admin_id: admin.id,
            shutdown: Some(tx),
            task: Some(task),
            _data_dir: data_dir,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Create a client for this server.
    pub fn client(&self) -> super::client::TestClient {
        super::client::TestClient::new(self.url())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
