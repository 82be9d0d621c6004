//! Basic example of the Trellis DI container.

use std::sync::Arc;

use trellis::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Config {
    database_url: String,
    debug: bool,
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

struct UserService {
    repo: Arc<UserRepository>,
    logger: Arc<dyn Logger>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        self.repo.find_user(id)
    }
}

// === Modules ===

struct ServiceModule;

impl Module for ServiceModule {
    fn declare(&self, m: &mut Declarations) {
        let repo = m.typed::<UserRepository>();
        let logger = m.typed::<dyn Logger>();
        m.factory("users", move || {
            Ok(Arc::new(UserService {
                repo: repo.get()?,
                logger: logger.get()?,
            }))
        });
    }

    fn name(&self) -> &str {
        "ServiceModule"
    }
}

struct StorageModule;

impl Module for StorageModule {
    fn declare(&self, m: &mut Declarations) {
        let config = m.named::<Config>("config");
        let logger = m.typed::<dyn Logger>();
        m.factory("db", move || {
            Ok(Arc::new(Database {
                url: config.get()?.database_url.clone(),
                logger: logger.get()?,
            }))
        });
    }

    fn name(&self) -> &str {
        "StorageModule"
    }
}

struct RepositoryModule;

impl Module for RepositoryModule {
    fn declare(&self, m: &mut Declarations) {
        let db = m.named::<Database>("db");
        m.factory("user_repository", move || Ok(Arc::new(UserRepository { db: db.get()? })));
    }

    fn name(&self) -> &str {
        "RepositoryModule"
    }
}

fn main() -> Result<()> {
    // Initialize tracing (override with TRELLIS_LOG)
    if let Err(err) = trellis::logging::init("trellis=debug") {
        eprintln!("logging disabled: {err}");
    }

    let infrastructure = module::from_fn("InfrastructureModule", |m| {
        m.instance(
            "config",
            Config {
                database_url: "postgres://localhost/myapp".to_string(),
                debug: true,
            },
        );
        m.instance("console", ConsoleLogger)
            .assignable_to::<dyn Logger>(|c| c as Arc<dyn Logger>);
    });

    // Listed out of order on purpose: dependencies decide the build order
    let container = create_container(&[
        &ServiceModule,
        &RepositoryModule,
        &StorageModule,
        &infrastructure,
    ])?;

    run(&container)?;

    // A module missing its provider fails as a whole
    match create_container(&[&ServiceModule, &infrastructure]) {
        Ok(_) => println!("unexpected success"),
        Err(err) => println!("❌ {err}"),
    }

    Ok(())
}

fn run(container: &Container) -> Result<()> {
    tracing::info!(instances = container.len(), "Demo container ready");
    println!("✅ Container built successfully!");
    println!("{container:?}");
    println!("{}", container.report());

    let config: Arc<Config> = container.instance_by_name("config")?;
    println!("📋 Config: database_url={}, debug={}", config.database_url, config.debug);

    let service: Arc<UserService> = container.instance()?;
    println!("👤 {}", service.get_user(42));

    // Same instance every time
    let again: Arc<UserService> = container.instance_by_name("users")?;
    assert!(Arc::ptr_eq(&service, &again));

    println!("\n🎉 Everything works!");
    Ok(())
}
