//! Basic example of the cacodi resolver.

use std::sync::Arc;

use cacodi::logging::{DEFAULT_FILTER, init_logging};
use cacodi::prelude::*;
use cacodi::{Inject, injectable};

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

#[injectable(implements(Logger))]
impl ConsoleLogger {
    pub fn new() -> Self {
        Self
    }
}

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

#[injectable]
impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

#[derive(Inject)]
struct UserService {
    repo: Arc<UserRepository>,
    #[inject]
    logger: Option<Arc<dyn Logger>>,
}

#[injectable]
impl UserService {
    pub fn new(repo: Arc<UserRepository>) -> Self {
        Self { repo, logger: None }
    }
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        if let Some(logger) = &self.logger {
            logger.log(&format!("Getting user {id}"));
        }
        self.repo.find_user(id)
    }
}

fn main() -> Result<()> {
    init_logging(DEFAULT_FILTER);

    let resolver = Resolver::builder().detect_cycles(true).build()?;

    // Config: a ready-made value
    resolver.add::<Config, _>(Arc::new(Config {
        database_url: "postgres://localhost/myapp".to_string(),
        debug: true,
    }));

    // Logger: mapped to its implementing type
    resolver.implement::<dyn Logger, ConsoleLogger>()?;

    // Database: built by a factory from the config and the logger
    resolver.add_factory::<Database, _>(|r: &dyn DependencyResolver| -> Result<Arc<Database>> {
        let config = r.get::<Config>()?;
        let logger = r.get::<dyn Logger>()?;
        Ok(Arc::new(Database {
            url: config.database_url.clone(),
            logger,
        }))
    });

    println!("✅ Resolver built successfully!");

    let config = resolver.get::<Config>()?;
    println!("📋 Config: database_url={}, debug={}", config.database_url, config.debug);

    // UserService: constructor injection for the repository, field
    // injection for the logger
    let service = resolver.get::<UserService>()?;
    println!("👤 {}", service.get_user(42));

    // Cached: the same instance every time
    let again = resolver.get::<UserService>()?;
    println!("👤 {}", again.get_user(7));
    assert!(Arc::ptr_eq(&service, &again));

    // Nothing describes u64, so this fails with a readable diagnostic
    if let Err(err) = resolver.get::<u64>() {
        println!("❌ {err}");
    }

    println!("\n🎉 Everything works!");
    Ok(())
}
