//! Identifier quoting, literal escaping, and catalog introspection SQL.
//!
//! Coded migration steps stay engine-neutral by asking the backend's
//! [`Namespace`] for the statement shapes that differ between engines.

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DuckDb,
    Postgres,
    MySql,
    SqlServer,
}

impl Dialect {
    /// Quote an identifier in the engine's native style
    pub fn quote_ident(self, ident: &str) -> String {
        match self {
            Dialect::DuckDb | Dialect::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
            Dialect::SqlServer => format!("[{}]", ident.replace(']', "]]")),
        }
    }

    /// Quote a string literal; MySQL also treats backslash as an escape
    pub fn quote_literal(self, text: &str) -> String {
        let escaped = text.replace('\'', "''");
        match self {
            Dialect::MySql => format!("'{}'", escaped.replace('\\', "\\\\")),
            Dialect::SqlServer => format!("N'{}'", escaped),
            _ => format!("'{}'", escaped),
        }
    }
}

/// Where the migrated tables live and how to address them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    dialect: Dialect,
    schema: Option<String>,
}

impl Namespace {
    pub fn new(dialect: Dialect, schema: Option<String>) -> Self {
        Self { dialect, schema }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Explicit schema objects are qualified with, if the engine needs one
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Table reference usable in statements.
    ///
    /// PostgreSQL tables are schema-qualified and folded to lower case the
    /// same way unquoted DDL folds them.
    pub fn table(&self, name: &str) -> String {
        match (&self.dialect, &self.schema) {
            (Dialect::Postgres, Some(schema)) => format!("{}.{}", schema, name.to_lowercase()),
            _ => name.to_string(),
        }
    }

    pub fn literal(&self, text: &str) -> String {
        self.dialect.quote_literal(text)
    }

    fn catalog_name(&self, name: &str) -> String {
        match self.dialect {
            Dialect::Postgres => self.literal(&name.to_lowercase()),
            _ => self.literal(name),
        }
    }

    fn schema_filter(&self, column: &str) -> String {
        match (self.dialect, &self.schema) {
            (Dialect::Postgres, Some(schema)) => format!(" AND {} = {}", column, self.literal(schema)),
            (Dialect::MySql, _) => format!(" AND {} = DATABASE()", column),
            _ => String::new(),
        }
    }

    /// `SELECT COUNT(*)` that is non-zero when the table exists
    pub fn table_exists_sql(&self, table: &str) -> String {
        match self.dialect {
            Dialect::DuckDb => format!(
                "SELECT COUNT(*) FROM information_schema.tables WHERE lower(table_name) = lower({})",
                self.literal(table)
            ),
            Dialect::Postgres => format!(
                "SELECT COUNT(*) FROM pg_tables WHERE tablename = {}{}",
                self.catalog_name(table),
                self.schema_filter("schemaname")
            ),
            // BINARY keeps the match case-sensitive on case-insensitive filesystems
            Dialect::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.TABLES WHERE BINARY TABLE_NAME = {}{}",
                self.literal(table),
                self.schema_filter("TABLE_SCHEMA")
            ),
            Dialect::SqlServer => format!(
                "SELECT COUNT(*) FROM sysobjects WHERE name = {} AND xtype = 'U'",
                self.literal(table)
            ),
        }
    }

    /// `SELECT COUNT(*)` that is non-zero when the column exists
    pub fn column_exists_sql(&self, table: &str, column: &str) -> String {
        match self.dialect {
            Dialect::DuckDb => format!(
                "SELECT COUNT(*) FROM information_schema.columns WHERE lower(table_name) = lower({}) AND lower(column_name) = lower({})",
                self.literal(table),
                self.literal(column)
            ),
            Dialect::Postgres => format!(
                "SELECT COUNT(*) FROM information_schema.columns WHERE table_name = {} AND column_name = {}{}",
                self.catalog_name(table),
                self.catalog_name(column),
                self.schema_filter("table_schema")
            ),
            Dialect::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.COLUMNS WHERE TABLE_NAME = {} AND COLUMN_NAME = {}{}",
                self.literal(table),
                self.literal(column),
                self.schema_filter("TABLE_SCHEMA")
            ),
            Dialect::SqlServer => format!(
                "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {} AND COLUMN_NAME = {}",
                self.literal(table),
                self.literal(column)
            ),
        }
    }

    /// `SELECT COUNT(*)` that is non-zero when the index exists on the table
    pub fn index_exists_sql(&self, table: &str, index: &str) -> String {
        match self.dialect {
            Dialect::DuckDb => format!(
                "SELECT COUNT(*) FROM duckdb_indexes() WHERE lower(table_name) = lower({}) AND lower(index_name) = lower({})",
                self.literal(table),
                self.literal(index)
            ),
            Dialect::Postgres => format!(
                "SELECT COUNT(*) FROM pg_indexes WHERE tablename = {} AND indexname = {}{}",
                self.catalog_name(table),
                self.catalog_name(index),
                self.schema_filter("schemaname")
            ),
            Dialect::MySql => format!(
                "SELECT COUNT(*) FROM information_schema.STATISTICS WHERE TABLE_NAME = {} AND INDEX_NAME = {}{}",
                self.literal(table),
                self.literal(index),
                self.schema_filter("TABLE_SCHEMA")
            ),
            Dialect::SqlServer => format!(
                "SELECT COUNT(*) FROM sys.indexes WHERE name = {} AND object_id = OBJECT_ID({})",
                self.literal(index),
                self.literal(table)
            ),
        }
    }

    pub fn drop_index_sql(&self, table: &str, index: &str) -> String {
        match self.dialect {
            Dialect::DuckDb => format!("DROP INDEX {}", index),
            Dialect::Postgres => format!("DROP INDEX {}", self.table(index)),
            Dialect::MySql | Dialect::SqlServer => format!("DROP INDEX {} ON {}", index, table),
        }
    }

    pub fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", self.table(table), column)
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
