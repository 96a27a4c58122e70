//! Splitting migration SQL into statements and recognizing the DDL shapes
//! that need an existence check before they can be re-run safely.

/// Split SQL text on semicolons that are not inside a single- or
/// double-quoted string. Segments are trimmed and empty ones dropped; a
/// trailing statement without a semicolon is kept.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut buffer = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            _ => {}
        }

        if ch == ';' && !in_single && !in_double {
            push_trimmed(&mut statements, &buffer);
            buffer.clear();
        } else {
            buffer.push(ch);
        }
    }
    push_trimmed(&mut statements, &buffer);
    statements
}

fn push_trimmed(statements: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// What the applier must check before executing a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// `ALTER TABLE <table> ADD COLUMN <column> ...`
    AddColumn { table: String, column: String },
    /// `CREATE INDEX [IF NOT EXISTS] <index> ...`
    CreateIndex { index: String },
    /// Anything else runs unconditionally.
    None,
}

impl Guard {
    /// Classify a statement by its leading keywords, case-insensitively.
    /// Leading whitespace and `--` comment lines are skipped first.
    pub fn classify(statement: &str) -> Self {
        let mut tokens = strip_leading_comments(statement).split_whitespace();
        let (first, second) = (tokens.next(), tokens.next());

        if keyword_is(first, "ALTER") && keyword_is(second, "TABLE") {
            Self::classify_add_column(tokens)
        } else if keyword_is(first, "CREATE") && keyword_is(second, "INDEX") {
            Self::classify_create_index(tokens)
        } else {
            Self::None
        }
    }

    fn classify_add_column<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Self {
        let Some(table) = tokens.next().filter(|t| is_identifier(t)) else {
            return Self::None;
        };
        let add = tokens.next();
        let column_kw = tokens.next();
        if !keyword_is(add, "ADD") || !keyword_is(column_kw, "COLUMN") {
            return Self::None;
        }
        match tokens.next().and_then(identifier_prefix) {
            Some(column) => Self::AddColumn {
                table: table.to_string(),
                column: column.to_string(),
            },
            None => Self::None,
        }
    }

    fn classify_create_index<'a>(tokens: impl Iterator<Item = &'a str>) -> Self {
        let mut tokens = tokens.peekable();
        if tokens.peek().is_some_and(|t| t.eq_ignore_ascii_case("IF")) {
            tokens.next();
            let not = tokens.next();
            let exists = tokens.next();
            if !keyword_is(not, "NOT") || !keyword_is(exists, "EXISTS") {
                return Self::None;
            }
        }
        match tokens.next().and_then(identifier_prefix) {
            Some(index) => Self::CreateIndex {
                index: index.to_string(),
            },
            None => Self::None,
        }
    }
}

fn keyword_is(token: Option<&str>, keyword: &str) -> bool {
    token.is_some_and(|t| t.eq_ignore_ascii_case(keyword))
}

fn is_identifier(token: &str) -> bool {
    identifier_prefix(token).is_some_and(|ident| ident.len() == token.len())
}

/// The longest leading run of word characters, or `None` if the token does
/// not start with one (e.g. a quoted identifier).
fn identifier_prefix(token: &str) -> Option<&str> {
    let end = token
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    (end > 0).then(|| &token[..end])
}

fn strip_leading_comments(statement: &str) -> &str {
    let mut rest = statement.trim_start();
    while let Some(comment) = rest.strip_prefix("--") {
        rest = match comment.find('\n') {
            Some(newline) => comment[newline + 1..].trim_start(),
            None => "",
        };
    }
    rest
}
