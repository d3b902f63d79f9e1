//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: configuration check, metrics
//! recorder, database and migrations, bootstrap administrator, REST API
//! and graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::{AuthService, AuthorizationGate, Registration};
use crate::config::{AdminSection, AppConfig};
use crate::domain::{AccountStore, Role};
use crate::infrastructure::crypto::jwt::TokenIssuer;
use crate::infrastructure::crypto::password::PasswordHasher;
use crate::infrastructure::database::entities;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, SeaOrmAccountStore};
use crate::interfaces::{create_api_router, RouterDeps};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::shared::{AuthError, StoreError};

// ── Options ────────────────────────────────────────────────────────

/// Options for starting the service.
pub struct ServerOptions {
    /// Application configuration.
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running service.
///
/// ```rust,no_run
/// use authgate::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address the REST API is bound to.
    pub local_addr: SocketAddr,
    /// Registration / login workflow backing the API.
    pub service: Arc<AuthService>,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the service.
    ///
    /// 1. Validate configuration
    /// 2. Install the Prometheus recorder (once per process)
    /// 3. Connect to the database and run migrations
    /// 4. Provision the bootstrap administrator, if configured
    /// 5. Serve the REST API until shutdown is triggered
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting authgate...");

        let prometheus = prometheus_handle();

        // ── Database ───────────────────────────────────────────
        let db = init_database(&app_cfg.database_config()).await?;

        if opts.auto_migrate {
            info!("Running database migrations...");
            Migrator::up(&db, None).await?;
            info!("Migrations completed");
        }

        // ── Core components ────────────────────────────────────
        let jwt_config = app_cfg.jwt_config();
        info!(
            issuer = %jwt_config.issuer,
            "Tokens expire after {}h",
            jwt_config.expiration_hours
        );

        let store: Arc<dyn AccountStore> = Arc::new(SeaOrmAccountStore::new(db.clone()));
        let hasher = PasswordHasher::new(app_cfg.security.bcrypt_cost)?;
        let service = Arc::new(
            AuthService::new(store, hasher, TokenIssuer::new(jwt_config.clone()))
                .with_deadline(app_cfg.request_timeout()),
        );

        if let Some(admin) = &app_cfg.admin {
            if let Err(e) = provision_bootstrap_admin(&db, &service, admin).await {
                error!("Failed to provision bootstrap administrator: {}", e);
            }
        }

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(RouterDeps {
            service: service.clone(),
            gate: AuthorizationGate::new(&jwt_config),
            db: db.clone(),
            prometheus,
        });

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);

        let listener = tokio::net::TcpListener::bind(app_cfg.api_address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_shutdown = shutdown.signal();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(
                listener,
                api_router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("REST API server received shutdown signal");
            });

            if let Err(e) = server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            config: app_cfg,
            local_addr,
            service,
            db,
            shutdown,
            api_task,
        })
    }

    /// Signal that fires when shutdown begins.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Trigger graceful shutdown (non-blocking). Call [`wait`](Self::wait)
    /// to block until everything has stopped.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the server to fully stop after shutdown has been triggered.
    pub async fn wait(self) {
        info!("Waiting for in-flight requests to complete...");

        let Self {
            db,
            shutdown,
            api_task,
            ..
        } = self;

        let abort = api_task.abort_handle();
        let drained = shutdown
            .drain(async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task failed: {}", e),
                }
            })
            .await;
        if !drained {
            warn!("Shutdown timeout elapsed, aborting remaining requests");
            abort.abort();
        }

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("authgate shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down authgate...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process; later
/// starts reuse the first handle. `None` when another recorder owns the
/// slot, in which case `/metrics` is not served.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus metrics recorder unavailable: {}", e);
                None
            }
        })
        .clone()
}

/// Create the configured administrator if no accounts exist yet.
async fn provision_bootstrap_admin(
    db: &DatabaseConnection,
    service: &AuthService,
    admin: &AdminSection,
) -> Result<(), AuthError> {
    let accounts = entities::Account::find()
        .count(db)
        .await
        .map_err(StoreError::from)?;
    if accounts > 0 {
        info!("Accounts already exist, skipping bootstrap administrator");
        return Ok(());
    }

    let id = service
        .provision(
            Registration::new(&admin.username, &admin.email, &admin.password),
            Role::Admin,
        )
        .await?;
    info!(account_id = %id, username = %admin.username, "Bootstrap administrator created");
    Ok(())
}

/// Initialize tracing (logging) from the application config.
///
/// Call once at process startup, before [`ServerHandle::start`].
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::from_toml(
            r#"
            [server]
            api_host = "127.0.0.1"
            api_port = 0
            shutdown_timeout = 5

            [database]
            url = "sqlite::memory:"
            max_connections = 1

            [security]
            jwt_secret = "server-test-secret-server-test-secret"
            bcrypt_cost = 4
            "#,
        )
        .unwrap()
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_health_and_shuts_down() {
        let handle = ServerHandle::start(ServerOptions {
            config: test_config(),
            auto_migrate: true,
        })
        .await
        .unwrap();
        assert!(handle.is_running());

        let response = get(handle.local_addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

        let signal = handle.shutdown_signal();
        handle.shutdown().await;
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn invalid_config_refuses_to_start() {
        let mut config = test_config();
        config.security.jwt_secret.clear();

        let result = ServerHandle::start(ServerOptions {
            config,
            auto_migrate: true,
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bootstrap_admin_is_provisioned_once() {
        let mut config = test_config();
        config.admin = Some(AdminSection {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "root-password".into(),
        });

        let handle = ServerHandle::start(ServerOptions {
            config: config.clone(),
            auto_migrate: true,
        })
        .await
        .unwrap();

        let admin = handle
            .service
            .store()
            .find_by_username("root")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);

        let session = handle.service.login("root", "root-password").await.unwrap();
        let identity = AuthorizationGate::new(&config.jwt_config())
            .authorize(Some(&format!("Bearer {}", session.token.token)))
            .unwrap();
        assert!(identity.is_admin());

        handle.shutdown().await;
    }
}
