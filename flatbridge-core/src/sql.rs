//! SQL text construction: identifier and literal escaping plus the
//! statement builders used by the transfer engines.
//!
//! Identifiers are wrapped in backticks, which both ClickHouse and SQLite
//! accept. Escaping is purely lexical: no character-set validation is done,
//! so a caller that accepts arbitrary identifiers from users must validate
//! them before they get here.

/// Quote character used for identifiers.
pub const IDENTIFIER_QUOTE: char = '`';

/// Escapes a table or column name for splicing into a query.
///
/// # Example
/// ```rust
/// use flatbridge_core::sql::escape_identifier;
///
/// assert_eq!(escape_identifier("orders"), "`orders`");
/// assert_eq!(escape_identifier("we`ird"), "`we``ird`");
/// ```
pub fn escape_identifier(identifier: &str) -> String {
    let mut escaped = String::with_capacity(identifier.len() + 2);
    escaped.push(IDENTIFIER_QUOTE);
    for ch in identifier.chars() {
        if ch == IDENTIFIER_QUOTE {
            escaped.push(IDENTIFIER_QUOTE);
        }
        escaped.push(ch);
    }
    escaped.push(IDENTIFIER_QUOTE);
    escaped
}

/// Escapes a value as a single-quoted string literal (quotes doubled).
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// SQL dialect of a connection. Decides literal escaping and the
/// statements used for schema introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// ClickHouse over HTTP
    ClickHouse,
    /// SQLite through sqlx
    Sqlite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::ClickHouse => write!(f, "ClickHouse"),
            Dialect::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl Dialect {
    /// Escapes a value as a string literal for this dialect.
    ///
    /// ClickHouse also interprets backslash escapes inside literals, so
    /// backslashes are doubled there in addition to single quotes.
    pub fn quote_literal(self, value: &str) -> String {
        match self {
            Dialect::ClickHouse if value.contains('\\') => {
                quote_literal(&value.replace('\\', "\\\\"))
            }
            _ => quote_literal(value),
        }
    }

    /// Statement listing the tables of `database`; first result column is
    /// the table name.
    pub fn show_tables(self, database: &str) -> String {
        match self {
            Dialect::ClickHouse => format!("SHOW TABLES FROM {}", escape_identifier(database)),
            Dialect::Sqlite => format!(
                "SELECT name FROM {}.sqlite_master WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite_%' ORDER BY name",
                escape_identifier(database)
            ),
        }
    }

    /// Statement describing the columns of `table`, in declaration order.
    pub fn describe_table(self, table: &str) -> String {
        match self {
            Dialect::ClickHouse => format!("DESCRIBE TABLE {}", escape_identifier(table)),
            Dialect::Sqlite => format!("PRAGMA table_info({})", escape_identifier(table)),
        }
    }

    /// Position of the column-name field in a `describe_table` result row.
    pub fn describe_name_index(self) -> usize {
        match self {
            Dialect::ClickHouse => 0,
            Dialect::Sqlite => 1,
        }
    }

    /// Statement reading the server product/version string.
    pub fn version_query(self) -> &'static str {
        match self {
            Dialect::ClickHouse => "SELECT version()",
            Dialect::Sqlite => "SELECT sqlite_version()",
        }
    }
}

/// Comma-separated list of escaped identifiers.
pub fn select_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| escape_identifier(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table>`
pub fn build_select(table: &str, columns: &[String]) -> String {
    format!(
        "SELECT {} FROM {}",
        select_list(columns),
        escape_identifier(table)
    )
}

/// `SELECT <columns> FROM t0 JOIN t1 ON <cond> JOIN t2 ON <cond> ...`
///
/// The same condition text is repeated for every join step; it is not
/// rewritten per pair of tables.
pub fn build_join_select(tables: &[String], join_condition: &str, columns: &[String]) -> String {
    let mut query = format!("SELECT {}", select_list(columns));
    for (i, table) in tables.iter().enumerate() {
        if i == 0 {
            query.push_str(" FROM ");
        } else {
            query.push_str(" JOIN ");
        }
        query.push_str(&escape_identifier(table));
        if i > 0 {
            query.push_str(" ON ");
            query.push_str(join_condition);
        }
    }
    query
}

/// `INSERT INTO <table> (<columns>) VALUES ` prefix; tuples are appended
/// by the caller.
pub fn insert_prefix(table: &str, columns: &[String]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ",
        escape_identifier(table),
        select_list(columns)
    )
}

/// One `('a', 'b', ...)` value tuple built from raw field text.
pub fn value_tuple<'a>(dialect: Dialect, values: impl IntoIterator<Item = &'a str>) -> String {
    let literals: Vec<String> = values
        .into_iter()
        .map(|v| dialect.quote_literal(v))
        .collect();
    format!("({})", literals.join(", "))
}
