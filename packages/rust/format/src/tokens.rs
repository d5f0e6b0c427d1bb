//! Token stream for the layout pass.
//!
//! Runs sqlparser's tokenizer with the Databricks dialect and maps every
//! token back onto the exact slice of input it came from. The writer only
//! re-spaces and recases; token text is never re-rendered.

use std::ops::Range;
use std::str::Chars;

use sqlparser::dialect::DatabricksDialect;
use sqlparser::tokenizer::{Location, Token as SqlToken, Tokenizer, Whitespace};
use tracing::debug;

/// A token borrowed from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Whitespace(&'a str),
    /// `-- ...` without its line break.
    LineComment(&'a str),
    BlockComment(&'a str),
    /// Any string literal, prefixed forms included.
    Str(&'a str),
    /// Backtick or double-quote delimited identifier.
    QuotedIdent(&'a str),
    /// Identifier, keyword, or number.
    Word(&'a str),
    /// Placeholders and template fragments (`?`, `$1`, `:name`, `${var}`).
    /// Written as-is, keeping whatever adjacency they had in the input.
    Opaque(&'a str),
    /// Operators and separators.
    Punct(&'a str),
}

#[cfg(test)]
impl<'a> Token<'a> {
    fn text(&self) -> &'a str {
        match *self {
            Self::Whitespace(s)
            | Self::LineComment(s)
            | Self::BlockComment(s)
            | Self::Str(s)
            | Self::QuotedIdent(s)
            | Self::Word(s)
            | Self::Opaque(s)
            | Self::Punct(s) => s,
        }
    }
}

type Spanned<'a> = (Token<'a>, Range<usize>);

/// Tokenize the whole input. Concatenating the token texts yields the input.
///
/// Returns `None` when the tokenizer rejects the input or its spans cannot be
/// mapped back onto it; callers leave such input untouched.
pub(crate) fn tokenize(sql: &str) -> Option<Vec<Token<'_>>> {
    let dialect = DatabricksDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).tokenize_with_location() {
        Ok(tokens) => tokens,
        Err(e) => {
            debug!(error = %e, "tokenizer rejected input");
            return None;
        }
    };

    let mut cursor = Cursor::new(sql);
    let mut spanned: Vec<Spanned<'_>> = Vec::with_capacity(tokens.len());
    let mut expected = 0;
    for item in &tokens {
        if matches!(item.token, SqlToken::EOF) {
            continue;
        }
        let (Some(start), Some(end)) = (
            cursor.advance_to(item.span.start),
            cursor.advance_to(item.span.end),
        ) else {
            debug!(token = %item.token, "token span does not map onto input");
            return None;
        };
        if start != expected || end <= start {
            debug!(start, expected, "token spans are not contiguous");
            return None;
        }
        expected = end;
        push_classified(&mut spanned, &item.token, sql, start..end);
    }
    if expected != sql.len() {
        debug!(covered = expected, len = sql.len(), "tokens do not cover input");
        return None;
    }

    merge_fragments(sql, spanned)
}

fn push_classified<'a>(
    out: &mut Vec<Spanned<'a>>,
    token: &SqlToken,
    sql: &'a str,
    range: Range<usize>,
) {
    let text = &sql[range.clone()];
    let mapped = match token {
        SqlToken::Whitespace(Whitespace::SingleLineComment { .. }) => {
            // The tokenizer folds the terminating line break into the comment.
            let body = text.trim_end_matches(['\r', '\n']);
            let split = range.start + body.len();
            out.push((Token::LineComment(body), range.start..split));
            if split < range.end {
                out.push((Token::Whitespace(&sql[split..range.end]), split..range.end));
            }
            return;
        }
        SqlToken::Whitespace(Whitespace::MultiLineComment(_)) => Token::BlockComment(text),
        SqlToken::Whitespace(_) => Token::Whitespace(text),
        SqlToken::Word(word) if word.quote_style.is_some() => Token::QuotedIdent(text),
        SqlToken::Word(_) | SqlToken::Number(..) => Token::Word(text),
        SqlToken::Placeholder(_) => Token::Opaque(text),
        _ if text.contains(['\'', '"']) => Token::Str(text),
        _ => Token::Punct(text),
    };
    out.push((mapped, range));
}

/// Fold template fragments into single opaque tokens: brace groups (with a
/// glued leading `$`) and `:name` / `@name` markers.
fn merge_fragments<'a>(sql: &'a str, tokens: Vec<Spanned<'a>>) -> Option<Vec<Token<'a>>> {
    let mut out: Vec<Spanned<'a>> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some((token, range)) = iter.next() {
        match token {
            Token::Punct("{") => {
                let mut start = range.start;
                let glued_dollar =
                    matches!(out.last(), Some((Token::Opaque("$"), prev)) if prev.end == start);
                if glued_dollar {
                    if let Some((_, prev)) = out.pop() {
                        start = prev.start;
                    }
                }
                let mut depth = 1usize;
                let mut end = range.end;
                while depth > 0 {
                    let Some((inner, inner_range)) = iter.next() else {
                        debug!(offset = range.start, "unbalanced brace");
                        return None;
                    };
                    match inner {
                        Token::Punct("{") => depth += 1,
                        Token::Punct("}") => depth -= 1,
                        _ => {}
                    }
                    end = inner_range.end;
                }
                out.push((Token::Opaque(&sql[start..end]), start..end));
            }
            Token::Punct(":" | "@")
                if iter.peek().is_some_and(|(next, next_range)| {
                    matches!(next, Token::Word(_)) && next_range.start == range.end
                }) =>
            {
                let end = iter.next().map_or(range.end, |(_, r)| r.end);
                out.push((Token::Opaque(&sql[range.start..end]), range.start..end));
            }
            _ => out.push((token, range)),
        }
    }

    Some(out.into_iter().map(|(token, _)| token).collect())
}

/// Walks the input in step with the tokenizer's 1-based line/column
/// locations, converting them to byte offsets.
struct Cursor<'a> {
    chars: Chars<'a>,
    offset: usize,
    line: u64,
    column: u64,
}

impl<'a> Cursor<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            chars: sql.chars(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn advance_to(&mut self, target: Location) -> Option<usize> {
        while (self.line, self.column) < (target.line, target.column) {
            let ch = self.chars.next()?;
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ((self.line, self.column) == (target.line, target.column)).then_some(self.offset)
    }
}
