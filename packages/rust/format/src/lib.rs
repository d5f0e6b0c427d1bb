//! Token-level SQL post-formatter.
//!
//! Converted scripts are tidied before they are wrapped into notebooks:
//! keywords are upper-cased, each top-level clause starts on its own line,
//! and whitespace is normalised. Tokens come from sqlparser's Databricks
//! tokenizer; no parse tree is built, and the text of every token is kept
//! verbatim.

mod layout;
mod tokens;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{instrument, warn};

/// Format one SQL script. Empty or whitespace-only input yields an empty
/// string. Input the tokenizer rejects is returned unchanged; anything else
/// ends with exactly one newline.
#[instrument(skip_all, fields(bytes = sql.len()))]
pub fn format_sql(sql: &str) -> String {
    if sql.trim().is_empty() {
        return String::new();
    }

    let Some(mut result) = layout::relayout(sql) else {
        warn!("could not tokenize SQL, leaving it unformatted");
        return sql.to_string();
    };

    result = strip_trailing_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Trailing whitespace
// ---------------------------------------------------------------------------

fn strip_trailing_whitespace(sql: &str) -> String {
    static TRAILING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)[ \t]+$").expect("valid regex"));

    TRAILING_RE.replace_all(sql, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Blank lines
// ---------------------------------------------------------------------------

/// At most one blank line between statements.
fn collapse_blank_lines(sql: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(sql, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Trailing newline
// ---------------------------------------------------------------------------

fn ensure_trailing_newline(sql: &str) -> String {
    let trimmed = sql.trim_end();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_with_where_and_order() {
        let sql = "select a, b from t where x = 1 and y = 'and or' order by a;";
        assert_eq!(
            format_sql(sql),
            "SELECT a,\n    b\nFROM t\nWHERE x = 1\n    AND y = 'and or'\nORDER BY a;\n"
        );
    }

    #[test]
    fn subquery_is_indented() {
        let sql = "select * from (select a from t) x";
        assert_eq!(
            format_sql(sql),
            "SELECT *\nFROM (\n    SELECT a\n    FROM t\n) x\n"
        );
    }

    #[test]
    fn comments_and_strings_keep_their_case() {
        let sql = "-- select from where\nselect 'from where' as s /* join on */ from t";
        let out = format_sql(sql);
        assert!(out.starts_with("-- select from where\nSELECT 'from where' AS s /* join on */\nFROM t"), "{out}");
    }

    #[test]
    fn statements_are_separated_by_one_blank_line() {
        let out = format_sql("select 1;\n\n\n\nselect 2;");
        assert_eq!(out, "SELECT 1;\n\nSELECT 2;\n");
    }

    #[test]
    fn cte_and_insert() {
        let sql = "with c as (select a from t) insert into x (a, b) select a, 1 from c";
        assert_eq!(
            format_sql(sql),
            "WITH c AS (\n    SELECT a\n    FROM t\n)\nINSERT INTO x (a, b)\nSELECT a,\n    1\nFROM c\n"
        );
    }

    #[test]
    fn window_clauses_stay_inline() {
        let out = format_sql("select row_number() over (partition by a order by b) rn from t");
        assert!(
            out.contains("row_number() OVER (PARTITION BY a ORDER BY b) rn"),
            "{out}"
        );
    }

    #[test]
    fn qualified_names_are_not_split() {
        let out = format_sql("select t.`Order`, dbo.f(x) from dbo.orders t");
        assert!(out.contains("t.`Order`"), "{out}");
        assert!(out.contains("dbo.f(x)"), "{out}");
        assert!(out.contains("FROM dbo.orders t"), "{out}");
    }

    #[test]
    fn blank_input_stays_blank() {
        assert_eq!(format_sql("  \n\t"), "");
    }

    #[test]
    fn lambda_arrow_is_kept() {
        assert_eq!(
            format_sql("select transform(arr, x -> x + 1) as y from t"),
            "SELECT transform(arr, x -> x + 1) AS y\nFROM t\n"
        );
    }

    #[test]
    fn null_safe_equality_is_kept() {
        assert_eq!(
            format_sql("select a from t where a <=> b"),
            "SELECT a\nFROM t\nWHERE a <=> b\n"
        );
    }

    #[test]
    fn scientific_notation_is_one_literal() {
        let out = format_sql("select 1.5e-3 as eps, 2E+10 as big from t");
        assert!(out.contains("1.5e-3 AS eps"), "{out}");
        assert!(out.contains("2E+10 AS big"), "{out}");
    }

    #[test]
    fn template_variables_are_untouched() {
        assert_eq!(
            format_sql("select a from ${catalog}.sales where e = ${limit} limit ${limit}"),
            "SELECT a\nFROM ${catalog}.sales\nWHERE e = ${limit}\nLIMIT ${limit}\n"
        );
    }

    #[test]
    fn named_parameters_are_untouched() {
        assert_eq!(
            format_sql("select a from t where id = :id and n < :limit"),
            "SELECT a\nFROM t\nWHERE id = :id\n    AND n < :limit\n"
        );
    }

    #[test]
    fn array_subscripts_stay_glued() {
        let out = format_sql("select arr[0], m['k'] from t");
        assert!(out.contains("arr[0]"), "{out}");
        assert!(out.contains("m['k']"), "{out}");
    }

    #[test]
    fn untokenizable_input_is_returned_unchanged() {
        let sql = "select 'unterminated from t";
        assert_eq!(format_sql(sql), sql);
    }

    #[test]
    fn formatting_is_stable() {
        let once = format_sql("select a, b from t where x in (1, 2) and y is not null;");
        assert_eq!(format_sql(&once), once);
    }
}
