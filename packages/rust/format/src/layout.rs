//! Token re-spacing and clause layout.
//!
//! Walks the significant tokens once, upper-casing keywords and starting a
//! new line at each top-level clause. Parenthesised subqueries indent one
//! level. Expressions inside ordinary parentheses are left on one line.
//! Punctuation outside the known operator set keeps its original spacing.

use crate::tokens::{Token, tokenize};

const INDENT: &str = "    ";

const KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ANY", "APPLY", "AS", "ASC", "BEGIN", "BETWEEN", "BY", "CASE",
    "CAST", "COLUMN", "CREATE", "CROSS", "DATABASE", "DECLARE", "DEFAULT", "DELETE", "DESC",
    "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXEC", "EXISTS", "FROM", "FULL", "FUNCTION",
    "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN",
    "LEFT", "LIKE", "LIMIT", "MERGE", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER",
    "OVER", "PARTITION", "PROCEDURE", "QUALIFY", "RETURN", "RIGHT", "SELECT", "SET", "TABLE",
    "THEN", "TOP", "TRUNCATE", "UNION", "UPDATE", "USING", "VALUES", "VIEW", "WHEN", "WHERE",
    "WITH",
];

/// Keywords that start a clause on a new line.
const CLAUSES: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "QUALIFY", "UNION", "EXCEPT",
    "INTERSECT", "VALUES", "SET", "UPDATE", "DELETE", "INSERT", "WITH", "JOIN",
];

/// Join modifiers. They start the clause and the `JOIN` that follows stays
/// on their line.
const JOIN_MODIFIERS: &[&str] = &["LEFT", "RIGHT", "INNER", "FULL", "CROSS", "OUTER"];

/// Binary operators written with one space on each side.
const SPACED_OPERATORS: &[&str] = &[
    "=", "==", "<>", "!=", "<", ">", "<=", ">=", "<=>", "||", "*", "/", "%", "->", "=>",
];

fn is_keyword(upper: &str) -> bool {
    KEYWORDS.binary_search(&upper).is_ok()
}

/// A non-whitespace token with what separated it from the previous one.
#[derive(Debug, Clone, Copy)]
struct Item<'a> {
    token: Token<'a>,
    space_before: bool,
    newline_before: bool,
}

fn significant(tokens: Vec<Token<'_>>) -> Vec<Item<'_>> {
    let mut items = Vec::with_capacity(tokens.len());
    let mut space_before = false;
    let mut newline_before = false;
    for token in tokens {
        if let Token::Whitespace(ws) = token {
            space_before = true;
            newline_before |= ws.contains('\n');
            continue;
        }
        items.push(Item {
            token,
            space_before,
            newline_before,
        });
        space_before = false;
        newline_before = false;
    }
    items
}

/// Re-lay out the SQL text. Output may carry trailing spaces and blank
/// lines; the cleanup passes normalise those. `None` when the input could
/// not be tokenized.
pub(crate) fn relayout(sql: &str) -> Option<String> {
    let items = significant(tokenize(sql)?);
    let mut writer = Writer::new(sql.len());
    for (i, item) in items.iter().enumerate() {
        writer.push(item, items.get(i + 1));
    }
    Some(writer.out)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

struct Writer {
    out: String,
    /// Subquery nesting depth.
    level: usize,
    /// One entry per open paren: `true` for a subquery.
    parens: Vec<bool>,
    /// Current clause keyword, one entry per level.
    clauses: Vec<&'static str>,
    prev_word: Option<String>,
    /// Whether the last token was an operand (so `-` after it is binary).
    prev_operand: bool,
    between: bool,
    glue_next: bool,
    break_next: bool,
}

impl Writer {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity + capacity / 4),
            level: 0,
            parens: Vec::new(),
            clauses: vec![""],
            prev_word: None,
            prev_operand: false,
            between: false,
            glue_next: false,
            break_next: false,
        }
    }

    fn in_expression(&self) -> bool {
        self.parens.last() == Some(&false)
    }

    fn set_clause(&mut self, clause: &'static str) {
        if let Some(current) = self.clauses.last_mut() {
            *current = clause;
        }
    }

    fn clause(&self) -> &'static str {
        self.clauses.last().copied().unwrap_or("")
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches(' ').len();
        self.out.truncate(kept);
    }

    fn break_line(&mut self, indent: usize) {
        self.trim_trailing_spaces();
        self.glue_next = false;
        self.break_next = false;
        if self.out.is_empty() {
            return;
        }
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        for _ in 0..indent {
            self.out.push_str(INDENT);
        }
    }

    fn space(&mut self) {
        if self.break_next {
            self.break_line(self.level);
            return;
        }
        if self.glue_next {
            self.glue_next = false;
            return;
        }
        match self.out.chars().last() {
            None | Some('\n' | ' ' | '(' | '[') => {}
            _ => self.out.push(' '),
        }
    }

    fn glue(&mut self) {
        if self.break_next {
            self.break_line(self.level);
        }
        self.glue_next = false;
    }

    /// Space before and glue after exactly as the input had them.
    fn keep_spacing(&mut self, item: &Item<'_>, next: Option<&Item<'_>>) {
        if item.space_before {
            self.space();
        } else {
            self.glue();
        }
        self.glue_next = next.is_some_and(|n| !n.space_before);
    }

    fn push(&mut self, item: &Item<'_>, next: Option<&Item<'_>>) {
        match item.token {
            Token::LineComment(text) | Token::BlockComment(text) => {
                if item.newline_before {
                    self.break_line(self.level);
                } else {
                    self.space();
                }
                self.out.push_str(text);
                if matches!(item.token, Token::LineComment(_)) {
                    self.break_next = true;
                }
            }
            Token::Str(text) | Token::QuotedIdent(text) => {
                self.space();
                self.out.push_str(text);
                self.prev_word = None;
                self.prev_operand = true;
            }
            Token::Opaque(text) => {
                self.keep_spacing(item, next);
                self.out.push_str(text);
                self.prev_word = None;
                self.prev_operand = true;
            }
            Token::Word(text) => self.word(text, next),
            Token::Punct(text) => self.punct(text, item, next),
            Token::Whitespace(_) => {}
        }
    }

    fn word(&mut self, text: &str, next: Option<&Item<'_>>) {
        let upper = text.to_ascii_uppercase();
        let keyword = is_keyword(&upper);
        let next_is_paren = next.is_some_and(|n| n.token == Token::Punct("("));
        let next_is_call = next_is_paren && next.is_some_and(|n| !n.space_before);
        let prev = self.prev_word.as_deref();

        let starts_clause = keyword
            && !self.in_expression()
            && !next_is_call
            && self.out.chars().last() != Some('.')
            && match upper.as_str() {
                "JOIN" => !prev.is_some_and(|p| JOIN_MODIFIERS.contains(&p)),
                "FROM" => prev != Some("DELETE"),
                // Table hints such as `WITH (NOLOCK)`.
                "WITH" => !next_is_paren,
                "OUTER" => !prev.is_some_and(|p| JOIN_MODIFIERS.contains(&p)),
                u => CLAUSES.contains(&u) || JOIN_MODIFIERS.contains(&u),
            };

        if starts_clause {
            self.break_line(self.level);
            let clause = CLAUSES
                .iter()
                .find(|c| **c == upper)
                .copied()
                .unwrap_or("JOIN");
            self.set_clause(clause);
        } else if keyword && matches!(upper.as_str(), "AND" | "OR") && !self.in_expression() {
            if upper == "AND" && self.between {
                self.between = false;
                self.space();
            } else {
                self.break_line(self.level + 1);
            }
        } else {
            if upper == "BETWEEN" {
                self.between = true;
            }
            self.space();
        }

        self.out.push_str(if keyword { &upper } else { text });
        self.prev_operand = !keyword || matches!(upper.as_str(), "NULL" | "END");
        self.prev_word = Some(upper);
    }

    fn punct(&mut self, text: &str, item: &Item<'_>, next: Option<&Item<'_>>) {
        match text {
            "(" => {
                let subquery = next.is_some_and(|n| match n.token {
                    Token::Word(w) => {
                        w.eq_ignore_ascii_case("SELECT") || w.eq_ignore_ascii_case("WITH")
                    }
                    _ => false,
                });
                let follows_name = self
                    .out
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ']' | '"' | '`'));
                if !item.space_before && follows_name {
                    self.glue();
                } else {
                    self.space();
                }
                self.out.push('(');
                self.parens.push(subquery);
                if subquery {
                    self.level += 1;
                    self.clauses.push("");
                }
                self.prev_operand = false;
            }
            "[" => {
                let follows_operand = self
                    .out
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ']' | ')' | '`'));
                if !item.space_before && follows_operand {
                    self.glue();
                } else {
                    self.space();
                }
                self.out.push('[');
                self.parens.push(false);
                self.prev_operand = false;
            }
            "]" => {
                self.parens.pop();
                self.glue();
                self.trim_trailing_spaces();
                self.out.push(']');
                self.prev_operand = true;
            }
            ")" => {
                let subquery = self.parens.pop().unwrap_or(false);
                if subquery {
                    self.level = self.level.saturating_sub(1);
                    self.clauses.pop();
                    self.break_line(self.level);
                } else if self.break_next {
                    self.break_line(self.level);
                } else {
                    self.trim_trailing_spaces();
                }
                self.glue_next = false;
                self.out.push(')');
                self.prev_operand = true;
            }
            "," => {
                self.glue();
                self.trim_trailing_spaces();
                self.out.push(',');
                if !self.in_expression() && self.clause() == "SELECT" {
                    self.break_line(self.level + 1);
                }
                self.prev_operand = false;
            }
            ";" => {
                self.glue();
                self.trim_trailing_spaces();
                self.out.push_str(";\n\n");
                self.level = 0;
                self.parens.clear();
                self.clauses = vec![""];
                self.between = false;
                self.prev_word = None;
                self.prev_operand = false;
            }
            "." | "::" => {
                self.glue();
                self.trim_trailing_spaces();
                self.out.push_str(text);
                self.glue_next = true;
                self.prev_operand = false;
            }
            "-" | "+" => {
                let unary = !self.prev_operand;
                self.space();
                self.out.push_str(text);
                self.glue_next = unary;
                self.prev_operand = false;
            }
            _ if SPACED_OPERATORS.contains(&text) => {
                self.space();
                self.out.push_str(text);
                self.prev_operand = text == "*" && self.prev_word.as_deref() == Some("SELECT");
            }
            _ => {
                self.keep_spacing(item, next);
                self.out.push_str(text);
                self.prev_operand = false;
            }
        }
        if text != "*" {
            self.prev_word = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_is_sorted() {
        let mut sorted = KEYWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, KEYWORDS);
    }

    #[test]
    fn function_calls_stay_glued() {
        let out = relayout("select count(*), left(name, 3) from t").expect("tokenize");
        assert!(out.contains("count(*)"), "{out}");
        assert!(out.contains("LEFT(name, 3)"), "{out}");
    }

    #[test]
    fn left_join_starts_one_line() {
        let out = relayout("select a from t left outer join u on t.id = u.id").expect("tokenize");
        assert!(out.contains("\nLEFT OUTER JOIN u ON t.id = u.id"), "{out}");
    }

    #[test]
    fn between_keeps_its_and() {
        let out = relayout("select a from t where x between 1 and 5 and y = 2").expect("tokenize");
        assert!(out.contains("WHERE x BETWEEN 1 AND 5\n    AND y = 2"), "{out}");
    }

    #[test]
    fn unary_minus_binds_to_operand() {
        let out = relayout("select a - 1 from t where b = -1").expect("tokenize");
        assert!(out.contains("a - 1"), "{out}");
        assert!(out.contains("b = -1"), "{out}");
    }

    #[test]
    fn clause_words_inside_calls_do_not_break() {
        let out = relayout("select extract(year from d) from t").expect("tokenize");
        assert!(out.contains("extract(year FROM d)"), "{out}");
    }

    #[test]
    fn line_comment_forces_a_break() {
        let out = relayout("select a -- first\n, b from t").expect("tokenize");
        assert!(out.contains("-- first\n"), "{out}");
    }

    #[test]
    fn table_hint_is_not_a_cte() {
        let out = relayout("select a from t with (nolock)").expect("tokenize");
        assert!(out.contains("FROM t WITH (nolock)"), "{out}");
    }

    #[test]
    fn json_path_keeps_its_spacing() {
        let out = relayout("select raw:owner.name, raw:items[0] from t").expect("tokenize");
        assert!(out.contains("raw:owner.name"), "{out}");
        assert!(out.contains("raw:items[0]"), "{out}");
    }
}
