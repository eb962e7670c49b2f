//! Statement splitting using the sqlparser tokenizer
//!
//! The script is tokenized once; every `;` token that the tokenizer reports
//! (and therefore not one inside a literal, comment or quoted identifier)
//! closes a statement. Statement text is sliced from the original script so
//! that quoting, escapes and comments reach the warehouse unchanged.

use sqlparser::dialect::SnowflakeDialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer, TokenizerError};

/// Splits SQL scripts the way Snowflake tokenizes them
pub struct StatementSplitter {
    dialect: SnowflakeDialect,
}

impl StatementSplitter {
    /// Create a splitter for Snowflake, the dialect scripts are executed against
    pub fn new() -> Self {
        Self::snowflake()
    }

    /// Create a splitter for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: SnowflakeDialect {},
        }
    }

    /// Split a script into trimmed statements, each keeping its terminating `;`
    ///
    /// Fragments holding only whitespace or comments are dropped. When the
    /// tokenizer rejects the script (for instance an unterminated literal),
    /// statements up to the last separator it still accepts are split as
    /// usual and the remainder is returned as a single statement, leaving
    /// the warehouse to report the problem.
    pub fn split(&self, script: &str) -> Vec<String> {
        match self.try_split(script) {
            Ok(statements) => statements,
            Err(e) => {
                tracing::warn!("Could not tokenize script, executing the remainder as one statement: {}", e);
                self.split_clean_prefix(script)
            }
        }
    }

    fn split_clean_prefix(&self, script: &str) -> Vec<String> {
        let prefix_end = script
            .match_indices(';')
            .map(|(idx, _)| idx + 1)
            .rev()
            .find(|&end| self.ends_with_separator(&script[..end]));

        let (mut statements, rest) = match prefix_end {
            Some(end) => (
                self.try_split(&script[..end]).unwrap_or_default(),
                &script[end..],
            ),
            None => (Vec::new(), script),
        };

        let rest = rest.trim();
        if !rest.is_empty() {
            statements.push(rest.to_string());
        }
        statements
    }

    /// Whether `text` tokenizes cleanly and its last token is a `;`
    fn ends_with_separator(&self, text: &str) -> bool {
        match Tokenizer::new(&self.dialect, text).tokenize() {
            Ok(tokens) => matches!(
                tokens
                    .iter()
                    .rev()
                    .find(|t| !matches!(t, Token::Whitespace(_) | Token::EOF)),
                Some(Token::SemiColon)
            ),
            Err(_) => false,
        }
    }

    /// Split a script, surfacing tokenizer failures
    pub fn try_split(&self, script: &str) -> Result<Vec<String>, SplitError> {
        let tokens = Tokenizer::new(&self.dialect, script)
            .tokenize_with_location()
            .map_err(SplitError::from)?;

        let offsets = LineOffsets::new(script);
        let mut statements = Vec::new();
        let mut start = 0;
        let mut has_content = false;

        for token in &tokens {
            match &token.token {
                Token::SemiColon => {
                    let end = offsets.byte_offset(script, token.span.start) + 1;
                    if has_content {
                        statements.push(script[start..end].trim().to_string());
                    }
                    start = end;
                    has_content = false;
                }
                Token::Whitespace(_) | Token::EOF => {}
                _ => has_content = true,
            }
        }

        if has_content {
            statements.push(script[start..].trim().to_string());
        }

        Ok(statements)
    }
}

impl Default for StatementSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offsets of line starts, for mapping tokenizer locations back to the source
struct LineOffsets {
    starts: Vec<usize>,
}

impl LineOffsets {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { starts }
    }

    /// Locations are 1-based and count columns in characters
    fn byte_offset(&self, text: &str, location: Location) -> usize {
        let line_idx = (location.line.max(1) - 1) as usize;
        let line_start = self.starts.get(line_idx).copied().unwrap_or(text.len());
        let column = (location.column.max(1) - 1) as usize;

        text[line_start..]
            .char_indices()
            .nth(column)
            .map(|(idx, _)| line_start + idx)
            .unwrap_or(text.len())
    }
}

/// Tokenizer failure while splitting
#[derive(Debug, thiserror::Error)]
#[error("SQL tokenize error: {message}")]
pub struct SplitError {
    pub message: String,
}

impl From<TokenizerError> for SplitError {
    fn from(e: TokenizerError) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_simple_script() {
        let splitter = StatementSplitter::new();
        let statements = splitter.split("CREATE TABLE t (id INT);\nINSERT INTO t VALUES (1);\nSELECT * FROM t");

        assert_eq!(
            statements,
            vec![
                "CREATE TABLE t (id INT);",
                "INSERT INTO t VALUES (1);",
                "SELECT * FROM t",
            ]
        );
    }

    #[test]
    fn semicolon_in_string_literal() {
        let splitter = StatementSplitter::new();
        let statements = splitter.split("INSERT INTO t VALUES ('a;b')");
        assert_eq!(statements, vec!["INSERT INTO t VALUES ('a;b')"]);
    }

    #[test]
    fn escaped_quote_is_preserved() {
        let splitter = StatementSplitter::new();
        let statements = splitter.split("INSERT INTO t VALUES ('it''s; fine'); SELECT 1;");
        assert_eq!(
            statements,
            vec!["INSERT INTO t VALUES ('it''s; fine');", "SELECT 1;"]
        );
    }

    #[test]
    fn semicolon_in_quoted_identifier() {
        let splitter = StatementSplitter::new();
        let statements = splitter.split(r#"SELECT 1 AS "odd;name"; SELECT 2;"#);
        assert_eq!(statements, vec![r#"SELECT 1 AS "odd;name";"#, "SELECT 2;"]);
    }

    #[test]
    fn semicolon_in_comments() {
        let splitter = StatementSplitter::new();
        let script = "-- setup; not a separator\nSELECT 1; /* still; one */ SELECT 2;";
        let statements = splitter.split(script);
        assert_eq!(
            statements,
            vec![
                "-- setup; not a separator\nSELECT 1;",
                "/* still; one */ SELECT 2;",
            ]
        );
    }

    #[test]
    fn empty_and_comment_only_fragments_are_dropped() {
        let splitter = StatementSplitter::new();
        assert!(splitter.split("").is_empty());
        assert!(splitter.split("   \n\t ").is_empty());
        assert!(splitter.split(";;  ;").is_empty());

        let statements = splitter.split("SELECT 1;;\n-- trailing note\n");
        assert_eq!(statements, vec!["SELECT 1;"]);
    }

    #[test]
    fn multibyte_text_before_separator() {
        let splitter = StatementSplitter::new();
        let statements = splitter.split("SELECT 'héllo wörld';\nSELECT 'ß';");
        assert_eq!(statements, vec!["SELECT 'héllo wörld';", "SELECT 'ß';"]);
    }

    #[test]
    fn unterminated_literal_falls_back_to_single_statement() {
        let splitter = StatementSplitter::new();
        let script = "SELECT 'oops; SELECT 2;";

        assert!(splitter.try_split(script).is_err());
        assert_eq!(splitter.split(script), vec![script.to_string()]);
    }

    #[test]
    fn statements_before_a_tokenizer_error_are_kept() {
        let splitter = StatementSplitter::new();

        assert!(splitter.try_split("SELECT 1; /* unterminated").is_err());
        assert_eq!(
            splitter.split("SELECT 1; /* unterminated"),
            vec!["SELECT 1;", "/* unterminated"]
        );
        assert_eq!(
            splitter.split("SELECT 'a;b'; SELECT 2; SELECT 'oops; SELECT 3;"),
            vec!["SELECT 'a;b';", "SELECT 2;", "SELECT 'oops; SELECT 3;"]
        );
    }

    #[test]
    fn separator_in_line_comment_is_not_a_clean_prefix() {
        let splitter = StatementSplitter::new();
        let statements = splitter.split("-- note; here\nSELECT 'x");
        assert_eq!(statements, vec!["-- note; here\nSELECT 'x"]);
    }
}
