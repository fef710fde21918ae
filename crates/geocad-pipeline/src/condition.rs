//! Filter expression language: parser and evaluator.
//!
//! Grammar:
//! ```text
//! FilterExpr  ::= Clause ( '&&' Clause )*
//! Clause      ::= Key Operator Literal
//! Key         ::= '$'? identifier ( '.' identifier )*
//! Operator    ::= '=' | '!=' | '>' | '>=' | '<' | '<=' | '~'
//! Literal     ::= QuotedString | BareWord | Number
//! ```
//!
//! Keys name feature attributes; `$`-prefixed keys name computed values
//! (`$area`, `$perimeter`, `$type`) supplied by the caller's resolver.

use geocad_types::GeocadError;
use regex::Regex;

/// A parsed filter expression consisting of one or more clauses joined by `&&`.
#[derive(Debug, Clone)]
pub struct FilterExpr {
    pub clauses: Vec<Clause>,
}

/// A single comparison clause: `key op value`.
#[derive(Debug, Clone)]
pub struct Clause {
    pub key: String,
    pub operator: Operator,
    pub value: String,
    /// Compiled pattern, present only for `~`.
    pattern: Option<Regex>,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Match,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Match => "~",
        }
    }
}

/// Parse a filter string into a [`FilterExpr`].
///
/// An empty or whitespace-only input produces an expression with zero clauses,
/// which [`evaluate_filter`] treats as always true.
pub fn parse_filter(input: &str) -> Result<FilterExpr, GeocadError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(FilterExpr {
            clauses: Vec::new(),
        });
    }

    let clauses = split_clauses(trimmed)
        .into_iter()
        .map(|part| parse_clause(part.trim()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FilterExpr { clauses })
}

fn parse_clause(input: &str) -> Result<Clause, GeocadError> {
    if input.is_empty() {
        return Err(make_error("empty clause"));
    }

    let (key_end, operator, op_len) = find_operator(input)?;

    let key = input[..key_end].trim().to_string();
    if key.is_empty() {
        return Err(make_error("missing key before operator"));
    }
    let bare = key.strip_prefix('$').unwrap_or(&key);
    for seg in bare.split('.') {
        if seg.is_empty() || !seg.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(make_error(&format!("invalid key segment: '{seg}'")));
        }
    }

    let raw_value = input[key_end + op_len..].trim();
    if raw_value.is_empty() {
        return Err(make_error(&format!("missing value after operator in '{input}'")));
    }
    let value = strip_quotes(raw_value);

    let pattern = match operator {
        Operator::Match => Some(
            Regex::new(&value)
                .map_err(|e| make_error(&format!("invalid pattern '{value}': {e}")))?,
        ),
        _ => None,
    };

    Ok(Clause {
        key,
        operator,
        value,
        pattern,
    })
}

/// Index just past the quoted region opening at `start`.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != quote {
        i += 1;
    }
    i + 1
}

/// Split on `&&` outside quoted regions.
fn split_clauses(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i),
            b'&' if bytes.get(i + 1) == Some(&b'&') => {
                parts.push(&input[start..i]);
                i += 2;
                start = i;
            }
            _ => i += 1,
        }
    }
    parts.push(&input[start..]);
    parts
}

fn find_operator(input: &str) -> Result<(usize, Operator, usize), GeocadError> {
    // Scan for the first operator, skipping quoted regions.
    let bytes = input.as_bytes();
    let next_is_eq = |i: usize| i + 1 < bytes.len() && bytes[i + 1] == b'=';
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_quoted(bytes, i),
            b'!' if next_is_eq(i) => return Ok((i, Operator::NotEq, 2)),
            b'>' if next_is_eq(i) => return Ok((i, Operator::Ge, 2)),
            b'<' if next_is_eq(i) => return Ok((i, Operator::Le, 2)),
            b'>' => return Ok((i, Operator::Gt, 1)),
            b'<' => return Ok((i, Operator::Lt, 1)),
            b'=' => return Ok((i, Operator::Eq, 1)),
            b'~' => return Ok((i, Operator::Match, 1)),
            _ => i += 1,
        }
    }
    Err(make_error(&format!("no operator found in '{input}'")))
}

fn strip_quotes(s: &str) -> String {
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        if (bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'')
        {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn make_error(msg: &str) -> GeocadError {
    GeocadError::InvalidParameter {
        op_type: "filter".into(),
        message: format!("expression parse error: {msg}"),
    }
}

/// Evaluate a filter expression against values provided by a resolver function.
///
/// The `resolve` function maps a key to its string value; keys not found
/// should resolve to an empty string. Ordering operators compare numerically
/// when both sides parse as numbers and lexically otherwise.
pub fn evaluate_filter(expr: &FilterExpr, resolve: &dyn Fn(&str) -> String) -> bool {
    expr.clauses.iter().all(|clause| {
        let actual = resolve(&clause.key);
        match clause.operator {
            Operator::Eq => values_equal(&actual, &clause.value),
            Operator::NotEq => !values_equal(&actual, &clause.value),
            Operator::Match => clause
                .pattern
                .as_ref()
                .is_some_and(|re| re.is_match(&actual)),
            op => {
                let ordering = match (actual.parse::<f64>(), clause.value.parse::<f64>()) {
                    (Ok(a), Ok(b)) => a.partial_cmp(&b),
                    _ => Some(actual.as_str().cmp(clause.value.as_str())),
                };
                match ordering {
                    Some(o) => match op {
                        Operator::Gt => o.is_gt(),
                        Operator::Ge => o.is_ge(),
                        Operator::Lt => o.is_lt(),
                        Operator::Le => o.is_le(),
                        _ => false,
                    },
                    None => false,
                }
            }
        }
    })
}

fn values_equal(actual: &str, expected: &str) -> bool {
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => actual == expected,
    }
}
