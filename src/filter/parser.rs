//! Tokenizer, recursive-descent parser, and shorthand expander for filter
//! expression text. Grounded on `original_source/expr.c` (`tokenize`,
//! `get_token`/`get_int_or_key`/`get_str`, `parse`/`parse_one`/`add`,
//! `expand_short_expr`, `map_short2long`, `expr_is_short`), reimplemented as
//! safe Rust over `Vec<char>` instead of cmus's manual buffer arithmetic.
//! The left-fold `parse_expr` loop below produces the exact same tree shape
//! as cmus's incremental `add()` splicing (AND/OR share one precedence
//! level, strictly left-associative) without needing to port the splicing
//! itself.

use std::cell::RefCell;

use super::{CmpOp, Expr, KeyType, StrOp};
use crate::filter::{glob::Glob, lookup_key_type};

thread_local! {
    static LAST_ERROR: RefCell<String> = RefCell::new(String::new());
}

/// A parse failure. The message is also stashed in a thread-local buffer,
/// mirroring cmus's process-wide `error_buf` / `expr_error()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ParseError {}

fn err(msg: impl Into<String>) -> ParseError {
    let e = ParseError(msg.into());
    LAST_ERROR.with(|c| *c.borrow_mut() = e.0.clone());
    e
}

/// Last parse error recorded on this thread, mirroring `expr_error()`.
pub fn last_error() -> String {
    LAST_ERROR.with(|c| c.borrow().clone())
}

/// Short-key to long-key mapping for the `~k...` shorthand syntax.
pub const SHORT_KEYS: &[(char, &str)] = &[
    ('A', "albumartist"),
    ('D', "discnumber"),
    ('T', "tag"),
    ('a', "artist"),
    ('c', "comment"),
    ('d', "duration"),
    ('f', "filename"),
    ('g', "genre"),
    ('l', "album"),
    ('n', "tracknumber"),
    ('X', "play_count"),
    ('s', "stream"),
    ('t', "title"),
    ('y', "date"),
];

fn lookup_long_key(c: char) -> Option<&'static str> {
    SHORT_KEYS.iter().find(|(k, _)| *k == c).map(|(_, v)| *v)
}

/// Whether `input` uses the `~key` shorthand syntax at all: a leading run of
/// `!`/`(`/space is skipped; the first other character decides — `~` means
/// yes, anything else means no (matches cmus's `expr_is_short`).
fn is_shorthand(input: &str) -> bool {
    for c in input.chars() {
        if c == '~' {
            return true;
        }
        if c != '!' && c != '(' && c != ' ' {
            return false;
        }
    }
    false
}

/// Expand `~key value` shorthand into the long-form `key=value`/`key>=a` etc
/// syntax that the main parser understands.
///
/// Differs from cmus's `expand_short_expr` in one place, per spec §4.3/§8
/// scenario C: a quoted shorthand body (`~a"Miles Davis"`) is wrapped in the
/// same `*...*` wildcards a bare word gets, where cmus leaves quoted bodies
/// unwrapped. See DESIGN.md Open Question resolution 3.
pub fn expand_shorthand(input: &str) -> Result<String, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    let mut i = 0usize;
    let mut out = String::new();
    let mut level: i32 = 0;

    fn skip_space(chars: &[char], i: &mut usize) {
        while *i < chars.len() && chars[*i] == ' ' {
            *i += 1;
        }
    }

    fn maybe_implicit_and(chars: &[char], i: usize, out: &mut String) {
        if matches!(chars.get(i), Some('~') | Some('(') | Some('!')) {
            out.push('&');
        }
    }

    loop {
        skip_space(&chars, &mut i);
        if i >= n {
            if level > 0 {
                return Err(err("')' expected"));
            }
            break;
        }
        match chars[i] {
            '(' => {
                level += 1;
                out.push('(');
                i += 1;
            }
            '!' | '|' => {
                out.push(chars[i]);
                i += 1;
            }
            ')' => {
                level -= 1;
                if level < 0 {
                    return Err(err("unexpected ')'"));
                }
                out.push(')');
                i += 1;
                skip_space(&chars, &mut i);
                maybe_implicit_and(&chars, i, &mut out);
            }
            '~' => {
                i += 1;
                let key_char = *chars.get(i).ok_or_else(|| err("key expected"))?;
                i += 1;
                let key = lookup_long_key(key_char)
                    .ok_or_else(|| err(format!("unknown short key {key_char}")))?;
                let ty = lookup_key_type(key).expect("short key table only names builtin keys");
                skip_space(&chars, &mut i);
                match ty {
                    KeyType::Bool => out.push_str(key),
                    KeyType::Int => expand_shorthand_int(&chars, &mut i, key, &mut out)?,
                    KeyType::Str => expand_shorthand_str(&chars, &mut i, key, &mut out)?,
                }
                skip_space(&chars, &mut i);
                maybe_implicit_and(&chars, i, &mut out);
            }
            c => return Err(err(format!("unexpected '{c}'"))),
        }
    }
    Ok(out)
}

/// Five shorthand forms per spec §4.3: `<N`/`>N` pass through, leading `-N`
/// is `<=N`, `N-M` is a closed range, trailing `N-` is `>=N`, bare `N` is
/// `=N`.
fn expand_shorthand_int(chars: &[char], i: &mut usize, key: &str, out: &mut String) -> Result<(), ParseError> {
    let n = chars.len();

    if *i < n && (chars[*i] == '<' || chars[*i] == '>') {
        let op = chars[*i];
        *i += 1;
        let start = *i;
        while *i < n && chars[*i].is_ascii_digit() {
            *i += 1;
        }
        if *i == start {
            return Err(err("integer expected"));
        }
        let val: String = chars[start..*i].iter().collect();
        out.push('(');
        out.push_str(key);
        out.push(op);
        out.push_str(&val);
        out.push(')');
        return Ok(());
    }

    if *i < n && chars[*i] == '-' {
        *i += 1;
        let start = *i;
        while *i < n && chars[*i].is_ascii_digit() {
            *i += 1;
        }
        if *i == start {
            return Err(err("integer expected"));
        }
        let val: String = chars[start..*i].iter().collect();
        out.push('(');
        out.push_str(key);
        out.push_str("<=");
        out.push_str(&val);
        out.push(')');
        return Ok(());
    }

    let start = *i;
    while *i < n && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    if *i == start {
        return Err(err("integer expected"));
    }
    let first: String = chars[start..*i].iter().collect();
    if *i < n && chars[*i] == '-' {
        *i += 1;
        let start2 = *i;
        while *i < n && chars[*i].is_ascii_digit() {
            *i += 1;
        }
        if *i > start2 {
            let second: String = chars[start2..*i].iter().collect();
            out.push('(');
            out.push_str(key);
            out.push_str(">=");
            out.push_str(&first);
            out.push('&');
            out.push_str(key);
            out.push_str("<=");
            out.push_str(&second);
            out.push(')');
        } else {
            out.push('(');
            out.push_str(key);
            out.push_str(">=");
            out.push_str(&first);
            out.push(')');
        }
    } else {
        out.push('(');
        out.push_str(key);
        out.push('=');
        out.push_str(&first);
        out.push(')');
    }
    Ok(())
}

fn expand_shorthand_str(chars: &[char], i: &mut usize, key: &str, out: &mut String) -> Result<(), ParseError> {
    let n = chars.len();
    out.push_str(key);
    out.push('=');
    out.push('"');
    out.push('*');
    if *i < n && chars[*i] == '"' {
        *i += 1;
        let start = *i;
        loop {
            if *i >= n {
                return Err(err("end of expression at middle of string"));
            }
            if chars[*i] == '"' && chars[*i - 1] != '\\' {
                break;
            }
            if chars[*i] == '\\' && *i + 1 < n {
                *i += 2;
                continue;
            }
            *i += 1;
        }
        let body: String = chars[start..*i].iter().collect();
        out.push_str(&body);
        *i += 1; // consume closing quote
    } else {
        let start = *i;
        while *i < n && !matches!(chars[*i], '~' | '!' | '|' | '(' | ')') {
            *i += 1;
        }
        let mut end = *i;
        while end > start && chars[end - 1] == ' ' {
            end -= 1;
        }
        let word: String = chars[start..end].iter().collect();
        out.push_str(&word);
    }
    out.push('*');
    out.push('"');
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Int(i64),
    Str(String),
    And,
    Or,
    Not,
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = input.chars().collect();
    let n = chars.len();
    let mut i = 0usize;
    let mut toks = Vec::new();
    while i < n {
        let c = chars[i];
        if c == ' ' || c == '\t' {
            i += 1;
            continue;
        }
        match c {
            '&' => {
                toks.push(Token::And);
                i += 1;
            }
            '|' => {
                toks.push(Token::Or);
                i += 1;
            }
            '(' => {
                toks.push(Token::LParen);
                i += 1;
            }
            ')' => {
                toks.push(Token::RParen);
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Token::Ne);
                    i += 2;
                } else {
                    toks.push(Token::Not);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Token::Le);
                    i += 2;
                } else {
                    toks.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    toks.push(Token::Ge);
                    i += 2;
                } else {
                    toks.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                toks.push(Token::Eq);
                i += 1;
            }
            '"' => {
                i += 1;
                let start = i;
                loop {
                    if i >= n {
                        return Err(err("end of expression at middle of string"));
                    }
                    if chars[i] == '"' {
                        break;
                    }
                    if chars[i] == '\\' {
                        if i + 1 >= n {
                            return Err(err("end of expression at middle of string"));
                        }
                        i += 2;
                        continue;
                    }
                    i += 1;
                }
                toks.push(Token::Str(chars[start..i].iter().collect()));
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < n && chars[i].is_ascii_digit() {
                    i += 1;
                }
                // a key may start with digits (e.g. "8bit") but not be all-digit
                if i < n && is_key_continue(chars[i]) {
                    while i < n && is_key_continue(chars[i]) {
                        i += 1;
                    }
                    i = consume_key_hyphen_tail(&chars, i)?;
                    toks.push(Token::Key(chars[start..i].iter().collect()));
                } else {
                    let text: String = chars[start..i].iter().collect();
                    let val: i64 = text.parse().map_err(|_| err("integer expected"))?;
                    toks.push(Token::Int(val));
                }
            }
            c if is_key_start(c) => {
                let start = i;
                while i < n && is_key_continue(chars[i]) {
                    i += 1;
                }
                i = consume_key_hyphen_tail(&chars, i)?;
                toks.push(Token::Key(chars[start..i].iter().collect()));
            }
            '-' => return Err(err("unexpected character '-'")),
            other => return Err(err(format!("unexpected '{other}'"))),
        }
    }
    Ok(toks)
}

fn is_key_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':' || c == '.' || c == '/'
}

fn is_key_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':' || c == '.' || c == '/'
}

/// Keys may contain a single `-` only between two identifier-character runs;
/// a trailing hyphen is a parse error (spec §9 Open Question 1 / DESIGN.md
/// resolution 1).
fn consume_key_hyphen_tail(chars: &[char], mut i: usize) -> Result<usize, ParseError> {
    let n = chars.len();
    if i < n && chars[i] == '-' {
        if i + 1 < n && is_key_continue(chars[i + 1]) {
            i += 1;
            while i < n && (is_key_continue(chars[i]) || chars[i] == '-') {
                i += 1;
            }
        } else {
            return Err(err("key expected"));
        }
    }
    Ok(i)
}

struct Parser<'a> {
    toks: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.toks.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_expr(&mut self, level: u32) -> Result<Expr, ParseError> {
        let mut acc = self.parse_one(level)?;
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.pos += 1;
                    let rhs = self.parse_one(level)?;
                    acc = Expr::And(Box::new(acc), Box::new(rhs));
                }
                Some(Token::Or) => {
                    self.pos += 1;
                    let rhs = self.parse_one(level)?;
                    acc = Expr::Or(Box::new(acc), Box::new(rhs));
                }
                Some(Token::RParen) => {
                    if level == 0 {
                        return Err(err("unexpected ')'"));
                    }
                    self.pos += 1;
                    return Ok(acc);
                }
                None => {
                    if level > 0 {
                        return Err(err("')' expected"));
                    }
                    return Ok(acc);
                }
                _ => return Err(err("'&' or '|' expected")),
            }
        }
    }

    fn parse_one(&mut self, level: u32) -> Result<Expr, ParseError> {
        match self.advance() {
            Some(Token::Not) => {
                let inner = self.parse_one(level)?;
                Ok(Expr::Not(Box::new(inner)))
            }
            Some(Token::LParen) => self.parse_expr(level + 1),
            Some(Token::Key(key)) => self.parse_key_tail(key.clone()),
            _ => Err(err("key expected")),
        }
    }

    fn parse_key_tail(&mut self, key: String) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ge) => Some(CmpOp::Ge),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ne) => Some(CmpOp::Ne),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(Expr::Bool { key });
        };
        self.pos += 1;
        match self.advance() {
            Some(Token::Str(s)) => {
                if !matches!(op, CmpOp::Eq | CmpOp::Ne) {
                    return Err(err(format!("invalid string operator '{}'", op.name())));
                }
                let str_op = if op == CmpOp::Eq { StrOp::Eq } else { StrOp::Ne };
                Ok(Expr::Str { key, glob: Glob::compile(s), op: str_op })
            }
            Some(Token::Int(v)) => Ok(Expr::Int { key, val: *v, op }),
            Some(Token::Key(other)) => Ok(Expr::Ident { key, other: other.clone(), op }),
            _ => {
                if matches!(op, CmpOp::Eq | CmpOp::Ne) {
                    Err(err("integer or string expected"))
                } else {
                    Err(err("integer expected"))
                }
            }
        }
    }
}

/// Parse filter expression text, expanding `~key` shorthand first when the
/// text uses it, and rejecting raw control characters throughout.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    if let Some(c) = input.chars().find(|c| (*c as u32) < 0x20) {
        return Err(err(format!("filter contains control characters (0x{:02x})", c as u32)));
    }
    let expanded;
    let text = if is_shorthand(input) {
        expanded = expand_shorthand(input)?;
        expanded.as_str()
    } else {
        input
    };
    let toks = tokenize(text)?;
    let mut parser = Parser { toks: &toks, pos: 0 };
    parser.parse_expr(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_string_leaf() {
        let e = parse(r#"artist="*davis*""#).unwrap();
        assert!(matches!(e, Expr::Str { .. }));
    }

    #[test]
    fn parses_and_or_left_fold() {
        // a & b | c == (a & b) | c
        let e = parse("tag & stream | tag").unwrap();
        match e {
            Expr::Or(l, r) => {
                assert!(matches!(*l, Expr::And(_, _)));
                assert!(matches!(*r, Expr::Bool { .. }));
            }
            _ => panic!("expected Or at root"),
        }
    }

    #[test]
    fn parses_not_and_parens() {
        let e = parse("!(tag & stream)").unwrap();
        assert!(matches!(e, Expr::Not(_)));
    }

    #[test]
    fn rejects_trailing_hyphen_in_key() {
        let err = parse("foo-=1").unwrap_err();
        assert!(err.0.contains("key expected"));
    }

    #[test]
    fn rejects_unbalanced_paren() {
        assert!(parse("(tag").is_err());
        assert!(parse("tag)").is_err());
    }

    #[test]
    fn shorthand_bool_key() {
        let e = parse("~T").unwrap();
        assert_eq!(e, Expr::Bool { key: "tag".into() });
    }

    #[test]
    fn shorthand_int_single_value() {
        let e = parse("~n5").unwrap();
        assert_eq!(e, Expr::Int { key: "tracknumber".into(), val: 5, op: CmpOp::Eq });
    }

    #[test]
    fn shorthand_int_range() {
        let e = parse("~n1-2").unwrap();
        let expected = Expr::And(
            Box::new(Expr::Int { key: "tracknumber".into(), val: 1, op: CmpOp::Ge }),
            Box::new(Expr::Int { key: "tracknumber".into(), val: 2, op: CmpOp::Le }),
        );
        assert_eq!(e, expected);
    }

    #[test]
    fn shorthand_int_trailing_hyphen_is_ge() {
        let expanded = expand_shorthand("~n5-").unwrap();
        assert_eq!(expanded, "(tracknumber>=5)");
        let e = parse("~n5-").unwrap();
        assert_eq!(e, Expr::Int { key: "tracknumber".into(), val: 5, op: CmpOp::Ge });
    }

    #[test]
    fn shorthand_int_leading_hyphen_is_le() {
        let expanded = expand_shorthand("~n-5").unwrap();
        assert_eq!(expanded, "(tracknumber<=5)");
        let e = parse("~n-5").unwrap();
        assert_eq!(e, Expr::Int { key: "tracknumber".into(), val: 5, op: CmpOp::Le });
    }

    #[test]
    fn shorthand_int_lt_passes_through() {
        let expanded = expand_shorthand("~n<5").unwrap();
        assert_eq!(expanded, "(tracknumber<5)");
        let e = parse("~n<5").unwrap();
        assert_eq!(e, Expr::Int { key: "tracknumber".into(), val: 5, op: CmpOp::Lt });
    }

    #[test]
    fn shorthand_int_gt_passes_through() {
        let expanded = expand_shorthand("~n>5").unwrap();
        assert_eq!(expanded, "(tracknumber>5)");
        let e = parse("~n>5").unwrap();
        assert_eq!(e, Expr::Int { key: "tracknumber".into(), val: 5, op: CmpOp::Gt });
    }

    #[test]
    fn shorthand_bare_word_wraps_wildcards() {
        let e = parse("~aDavis").unwrap();
        match e {
            Expr::Str { key, glob, op } => {
                assert_eq!(key, "artist");
                assert_eq!(op, StrOp::Eq);
                assert!(glob.matches("Miles Davis"));
            }
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn shorthand_quoted_word_also_wraps_wildcards() {
        // Deliberate deviation from cmus: quoted shorthand bodies wrap too.
        let e = parse(r#"~a"Miles Davis""#).unwrap();
        match e {
            Expr::Str { glob, .. } => assert!(glob.matches("Miles Davis Quintet")),
            _ => panic!("expected Str"),
        }
    }

    #[test]
    fn shorthand_implicit_and_between_terms() {
        let e = parse("~aDavis~lBlue").unwrap();
        assert!(matches!(e, Expr::And(_, _)));
    }

    #[test]
    fn shorthand_detection_ignores_leading_bang_and_parens() {
        assert!(is_shorthand("!(~T)"));
        assert!(!is_shorthand("tag"));
    }

    #[test]
    fn control_characters_rejected() {
        assert!(parse("tag\x01").is_err());
    }
}
