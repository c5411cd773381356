#![allow(dead_code)]

use chrono::{DateTime, Utc};
use repokit_data::{Entity, Related, Value};
use repokit_sqlx::{Database, DatabaseOptions, Driver, ErrorTranslator, Migration};

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct User {
    #[sqlx(try_from = "i64")]
    pub id: u64,
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl User {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            email: format!("{name}@example.com"),
            age,
        }
    }
}

impl Entity for User {
    fn table_name() -> &'static str {
        "users"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "email", "age"]
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.clone().into(),
            self.email.clone().into(),
            self.age.into(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Book {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Author {
    #[sqlx(try_from = "i64")]
    pub id: u64,
    pub name: String,
    #[sqlx(skip)]
    pub books: Vec<Book>,
}

impl Entity for Author {
    fn table_name() -> &'static str {
        "authors"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.name.clone().into()]
    }

    fn related(&self) -> Vec<Related> {
        self.books
            .iter()
            .map(|book| {
                Related::new("books", book.id)
                    .column("author_id", self.id)
                    .column("title", book.title.clone())
            })
            .collect()
    }
}

/// Timestamps are stored as the RFC 3339 text the driver binds them as.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Event {
    #[sqlx(try_from = "i64")]
    pub id: u64,
    pub kind: String,
    pub created_at: Option<String>,
}

impl Event {
    pub fn new(kind: &str, created_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: 0,
            kind: kind.into(),
            created_at: created_at.map(|ts| ts.to_rfc3339()),
        }
    }
}

impl Entity for Event {
    fn table_name() -> &'static str {
        "events"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "kind", "created_at"]
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![self.id.into(), self.kind.clone().into(), self.created_at.clone().into()]
    }
}

pub fn schema() -> Vec<Migration> {
    vec![
        Migration::new(
            "create_users",
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                age INTEGER NOT NULL
            )",
        ),
        Migration::new(
            "create_authors",
            "CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            )",
        ),
        Migration::new(
            "create_books",
            "CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id INTEGER NOT NULL,
                title TEXT NOT NULL
            )",
        ),
        Migration::new(
            "create_events",
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                created_at TEXT
            )",
        ),
    ]
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory SQLite on a single connection, so every statement sees the same database.
pub fn options() -> DatabaseOptions {
    DatabaseOptions::new(Driver::Sqlite, "sqlite::memory:")
        .max_connections(1)
        .auto_migrate(true)
        .log_statements(true)
        .migrations(schema())
}

pub async fn setup() -> Database {
    init_tracing();
    Database::connect(options()).await.unwrap()
}

pub async fn setup_with(translator: impl ErrorTranslator + 'static) -> Database {
    init_tracing();
    Database::connect(options().translator(translator))
        .await
        .unwrap()
}
