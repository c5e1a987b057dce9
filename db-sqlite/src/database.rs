use crate::workers::{DaySyncDB, TradeEventDB};
use diesel::prelude::*;
use diesel::sql_query;
use model::{DatabaseFactory, DaySyncRead, DaySyncWrite, TradeEventRead, TradeEventWrite};
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite database implementation providing access to all database operations
pub struct SqliteDatabase {
    connection: Arc<Mutex<SqliteConnection>>,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDatabase")
            .field("connection", &"Arc<Mutex<SqliteConnection>>")
            .finish()
    }
}

impl DatabaseFactory for SqliteDatabase {
    fn trade_event_read(&self) -> Box<dyn TradeEventRead> {
        Box::new(TradeEventDB {
            connection: self.connection.clone(),
        })
    }

    fn trade_event_write(&self) -> Box<dyn TradeEventWrite> {
        Box::new(TradeEventDB {
            connection: self.connection.clone(),
        })
    }

    fn day_sync_read(&self) -> Box<dyn DaySyncRead> {
        Box::new(DaySyncDB {
            connection: self.connection.clone(),
        })
    }

    fn day_sync_write(&self) -> Box<dyn DaySyncWrite> {
        Box::new(DaySyncDB {
            connection: self.connection.clone(),
        })
    }
}

impl SqliteDatabase {
    /// Create a new SQLite database connection from a URL
    pub fn new(url: &str) -> Self {
        let connection: SqliteConnection = Self::establish_connection(url);
        SqliteDatabase {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    /// Create a new SQLite database from an existing connection
    pub fn new_from(connection: Arc<Mutex<SqliteConnection>>) -> Self {
        SqliteDatabase { connection }
    }

    #[doc(hidden)]
    pub fn new_in_memory() -> Self {
        use diesel_migrations::*;
        pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
        // This is only used for tests, so we use a simpler error handling approach
        let mut connection = SqliteConnection::establish(":memory:").unwrap_or_else(|e| {
            eprintln!("Failed to establish in-memory database connection: {e}");
            std::process::exit(1);
        });
        connection
            .run_pending_migrations(MIGRATIONS)
            .unwrap_or_else(|e| {
                eprintln!("Failed to run migrations on in-memory database: {e}");
                std::process::exit(1);
            });
        Self::configure_connection(&mut connection);
        connection.begin_test_transaction().unwrap_or_else(|e| {
            eprintln!("Failed to begin test transaction: {e}");
            std::process::exit(1);
        });
        SqliteDatabase {
            connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[doc(hidden)]
    pub fn connection_handle(&self) -> Arc<Mutex<SqliteConnection>> {
        self.connection.clone()
    }

    /// Establish a connection to the SQLite database.
    fn establish_connection(database_url: &str) -> SqliteConnection {
        let db_exists = std::path::Path::new(database_url).exists();
        // Use the database URL to establish a connection to the SQLite database
        let mut connection = SqliteConnection::establish(database_url).unwrap_or_else(|e| {
            eprintln!("Error connecting to {database_url}: {e}");
            std::process::exit(1);
        });

        // Run migrations only if it is a new DB
        if !db_exists {
            use diesel_migrations::*;
            pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
            connection
                .run_pending_migrations(MIGRATIONS)
                .unwrap_or_else(|e| {
                    eprintln!("Failed to run migrations on new database: {e}");
                    std::process::exit(1);
                });
        }

        Self::configure_connection(&mut connection);
        connection
    }

    fn configure_connection(connection: &mut SqliteConnection) {
        // Sync writers on the same file wait instead of failing fast.
        sql_query("PRAGMA busy_timeout = 5000;")
            .execute(connection)
            .unwrap_or_else(|e| {
                eprintln!("Failed to set busy_timeout pragma: {e}");
                std::process::exit(1);
            });
    }
}

pub(crate) fn lock_connection(
    connection: &Arc<Mutex<SqliteConnection>>,
) -> MutexGuard<'_, SqliteConnection> {
    connection.lock().unwrap_or_else(|e| {
        eprintln!("Failed to acquire connection lock: {e}");
        std::process::exit(1);
    })
}
