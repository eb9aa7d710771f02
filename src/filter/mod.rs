//! Filter expression AST, the builtin key table, and expression evaluation
//! against a [`Track`](crate::track::Track). Grounded on spec §4.3/§4.4 and
//! `original_source/expr.c` (`builtin[]`, `expr_get_match_type`,
//! `expr_is_harmless`, `str_val`/`int_val`/`expr_eval`).

use std::cmp::Ordering;

use crate::track::Track;

pub mod glob;
pub mod parser;

use glob::Glob;

/// String-leaf comparison operator (`=` / `!=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOp {
    Eq,
    Ne,
}

/// Integer/identifier-leaf comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl CmpOp {
    fn apply(self, res: i64) -> bool {
        match self {
            CmpOp::Lt => res < 0,
            CmpOp::Le => res <= 0,
            CmpOp::Eq => res == 0,
            CmpOp::Ge => res >= 0,
            CmpOp::Gt => res > 0,
            CmpOp::Ne => res != 0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "=",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
            CmpOp::Ne => "!=",
        }
    }
}

/// Filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Str { key: String, glob: Glob, op: StrOp },
    Int { key: String, val: i64, op: CmpOp },
    Ident { key: String, other: String, op: CmpOp },
    Bool { key: String },
}

/// The type a builtin (or resolved) filter key evaluates as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Str,
    Int,
    Bool,
}

impl KeyType {
    fn describe(self) -> &'static str {
        match self {
            KeyType::Str => "a string",
            KeyType::Int => "an integer",
            KeyType::Bool => "a boolean",
        }
    }
}

/// Builtin filter keys and their type, sorted for direct port of cmus's
/// `lookup_key_type` (a linear scan that breaks early on sorted order —
/// not load-bearing here since Rust's linear `find` doesn't need the
/// early-exit, but the order is kept for fidelity).
pub const BUILTIN_KEYS: &[(&str, KeyType)] = &[
    ("album", KeyType::Str),
    ("albumartist", KeyType::Str),
    ("artist", KeyType::Str),
    ("bitrate", KeyType::Int),
    ("bpm", KeyType::Int),
    ("codec", KeyType::Str),
    ("codec_profile", KeyType::Str),
    ("comment", KeyType::Str),
    ("date", KeyType::Int),
    ("discnumber", KeyType::Int),
    ("duration", KeyType::Int),
    ("filename", KeyType::Str),
    ("genre", KeyType::Str),
    ("media", KeyType::Str),
    ("originaldate", KeyType::Int),
    ("play_count", KeyType::Int),
    ("stream", KeyType::Bool),
    ("tag", KeyType::Bool),
    ("title", KeyType::Str),
    ("tracknumber", KeyType::Int),
];

/// Look up a builtin key's type.
pub fn lookup_key_type(key: &str) -> Option<KeyType> {
    BUILTIN_KEYS.iter().find(|(k, _)| *k == key).map(|(_, t)| *t)
}

/// Bitset of which metadata classes an expression can match against, used by
/// the library coordinator to decide whether a live-add filter needs the
/// artist/album tree nodes it mentions auto-expanded.
pub const MATCH_ARTIST: u8 = 1 << 0;
pub const MATCH_ALBUM: u8 = 1 << 1;
pub const MATCH_TITLE: u8 = 1 << 2;

/// Which of [`MATCH_ARTIST`]/[`MATCH_ALBUM`]/[`MATCH_TITLE`] an expression
/// touches.
pub fn match_types(expr: &Expr) -> u8 {
    match expr {
        Expr::And(l, r) | Expr::Or(l, r) => match_types(l) | match_types(r),
        Expr::Not(e) => match_types(e),
        Expr::Str { key, .. } | Expr::Int { key, .. } | Expr::Ident { key, .. } | Expr::Bool { key } => {
            match_type_for_key(key)
        }
    }
}

fn match_type_for_key(key: &str) -> u8 {
    match key {
        "artist" | "albumartist" => MATCH_ARTIST,
        "album" | "discnumber" => MATCH_ALBUM,
        "title" | "tracknumber" => MATCH_TITLE,
        _ => 0,
    }
}

/// Whether dropping this filter could only ever narrow (never widen) the
/// result set relative to removing it — used to decide whether adding a new
/// track can be checked incrementally against the existing view instead of
/// forcing a full tree rebuild.
pub fn is_harmless(expr: &Expr) -> bool {
    match expr {
        Expr::Or(_, _) | Expr::Not(_) => false,
        Expr::And(_, r) => is_harmless(r),
        Expr::Int { op, .. } => !matches!(op, CmpOp::Lt | CmpOp::Eq | CmpOp::Le),
        Expr::Ident { .. } => false,
        Expr::Str { .. } | Expr::Bool { .. } => true,
    }
}

/// Errors raised while validating or resolving a parsed expression's leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    Parse(String),
    TypeMismatch { key: String, expected: &'static str },
    UnknownKey(String),
    UnknownFilter(String),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::Parse(msg) => write!(f, "{msg}"),
            FilterError::TypeMismatch { key, expected } => write!(f, "{key} is {expected}"),
            FilterError::UnknownKey(key) => write!(f, "unknown key {key}"),
            FilterError::UnknownFilter(key) => write!(f, "unknown filter or boolean {key}"),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<parser::ParseError> for FilterError {
    fn from(e: parser::ParseError) -> Self {
        FilterError::Parse(e.0)
    }
}

/// Walk every leaf, checking builtin keys against [`BUILTIN_KEYS`] and
/// expanding bare boolean leaves that name a user-defined filter (via
/// `resolve`) into that filter's own parsed expression, recursively.
pub fn check_leaves(
    expr: &mut Expr,
    resolve: &mut dyn FnMut(&str) -> Option<String>,
) -> Result<(), FilterError> {
    match expr {
        Expr::And(l, r) | Expr::Or(l, r) => {
            check_leaves(l, resolve)?;
            check_leaves(r, resolve)
        }
        Expr::Not(e) => check_leaves(e, resolve),
        Expr::Str { key, .. } => match lookup_key_type(key) {
            Some(KeyType::Str) => Ok(()),
            Some(other) => Err(FilterError::TypeMismatch { key: key.clone(), expected: other.describe() }),
            None => Err(FilterError::UnknownKey(key.clone())),
        },
        Expr::Int { key, .. } => match lookup_key_type(key) {
            Some(KeyType::Int) => Ok(()),
            Some(other) => Err(FilterError::TypeMismatch { key: key.clone(), expected: other.describe() }),
            None => Err(FilterError::UnknownKey(key.clone())),
        },
        Expr::Ident { key, other, .. } => {
            // Both sides are read via str_val-with-int_val-fallback at eval
            // time (see `evaluate`), so leaf validation only requires both
            // keys to be known, not that they share a single type.
            if lookup_key_type(key).is_none() {
                return Err(FilterError::UnknownKey(key.clone()));
            }
            if lookup_key_type(other).is_none() {
                return Err(FilterError::UnknownKey(other.clone()));
            }
            Ok(())
        }
        Expr::Bool { key } => match lookup_key_type(key) {
            Some(KeyType::Bool) => Ok(()),
            Some(other) => Err(FilterError::TypeMismatch { key: key.clone(), expected: other.describe() }),
            None => {
                let source = resolve(key).ok_or_else(|| FilterError::UnknownFilter(key.clone()))?;
                let mut sub = parser::parse(&source)?;
                check_leaves(&mut sub, resolve)?;
                *expr = sub;
                Ok(())
            }
        },
    }
}

/// Evaluate an already-validated expression against `track`.
pub fn evaluate(expr: &Expr, track: &Track) -> bool {
    match expr {
        Expr::And(l, r) => evaluate(l, track) && evaluate(r, track),
        Expr::Or(l, r) => evaluate(l, track) || evaluate(r, track),
        Expr::Not(e) => !evaluate(e, track),
        Expr::Str { key, glob, op } => {
            let val = track.field_string(key).unwrap_or_default();
            let matched = glob.matches(&val);
            match op {
                StrOp::Eq => matched,
                StrOp::Ne => !matched,
            }
        }
        Expr::Int { key, val, op } => {
            let field = track.field_int(key);
            if *val == -1 {
                // -1 is "not set"; only (in)equality against it is meaningful.
                return match op {
                    CmpOp::Eq => field == -1,
                    CmpOp::Ne => field != -1,
                    _ => false,
                };
            }
            if field == -1 {
                return false;
            }
            op.apply(field - val)
        }
        Expr::Ident { key, other, op } => evaluate_ident(key, other, *op, track),
        Expr::Bool { key } => match key.as_str() {
            "stream" => track.is_stream(),
            "tag" => track.has_tag(),
            _ => false,
        },
    }
}

fn evaluate_ident(key: &str, other: &str, op: CmpOp, track: &Track) -> bool {
    if let (Some(a), Some(b)) = (track.field_string(key), track.field_string(other)) {
        let res = match a.cmp(&b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        return op.apply(res);
    }
    let a = track.field_int(key);
    let b = track.field_int(other);
    if a == -1 || b == -1 {
        return match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => false,
        };
    }
    op.apply(a - b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{Locator, Track};
    use std::path::PathBuf;

    fn track(comments: &[(&str, &str)]) -> Track {
        let mut t = Track::new(Locator::Path(PathBuf::from("/music/song.flac")));
        t.attach_comments(comments.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
        t
    }

    #[test]
    fn match_types_union_across_and() {
        let e = Expr::And(
            Box::new(Expr::Str { key: "artist".into(), glob: Glob::compile("x"), op: StrOp::Eq }),
            Box::new(Expr::Int { key: "discnumber".into(), val: 1, op: CmpOp::Eq }),
        );
        assert_eq!(match_types(&e), MATCH_ARTIST | MATCH_ALBUM);
    }

    #[test]
    fn harmless_and_keeps_right_only() {
        let harmless_right = Expr::And(
            Box::new(Expr::Int { key: "bitrate".into(), val: 100, op: CmpOp::Gt }),
            Box::new(Expr::Str { key: "title".into(), glob: Glob::compile("x"), op: StrOp::Eq }),
        );
        assert!(is_harmless(&harmless_right));

        let harmful_right = Expr::And(
            Box::new(Expr::Bool { key: "tag".into() }),
            Box::new(Expr::Int { key: "bitrate".into(), val: 100, op: CmpOp::Lt }),
        );
        assert!(!is_harmless(&harmful_right));
    }

    #[test]
    fn or_and_not_are_never_harmless() {
        let e = Expr::Or(Box::new(Expr::Bool { key: "tag".into() }), Box::new(Expr::Bool { key: "stream".into() }));
        assert!(!is_harmless(&e));
    }

    #[test]
    fn string_leaf_matches_glob() {
        let t = track(&[("artist", "Miles Davis")]);
        let e = Expr::Str { key: "artist".into(), glob: Glob::compile("*davis*"), op: StrOp::Eq };
        assert!(evaluate(&e, &t));
    }

    #[test]
    fn int_leaf_missing_tag_is_false_except_not_set_check() {
        let t = track(&[]);
        let e = Expr::Int { key: "discnumber".into(), val: 1, op: CmpOp::Eq };
        assert!(!evaluate(&e, &t));
        let e2 = Expr::Int { key: "discnumber".into(), val: -1, op: CmpOp::Eq };
        assert!(evaluate(&e2, &t));
    }

    #[test]
    fn check_leaves_rejects_type_mismatch() {
        let mut e = Expr::Str { key: "bitrate".into(), glob: Glob::compile("x"), op: StrOp::Eq };
        let err = check_leaves(&mut e, &mut |_| None).unwrap_err();
        assert!(matches!(err, FilterError::TypeMismatch { .. }));
    }

    #[test]
    fn check_leaves_resolves_named_filter() {
        let mut e = Expr::Bool { key: "my-filter".into() };
        check_leaves(&mut e, &mut |k| (k == "my-filter").then(|| "artist=\"*davis*\"".to_string())).unwrap();
        assert!(matches!(e, Expr::Str { .. }));
    }

    #[test]
    fn check_leaves_errors_on_unknown_filter() {
        let mut e = Expr::Bool { key: "nope".into() };
        let err = check_leaves(&mut e, &mut |_| None).unwrap_err();
        assert!(matches!(err, FilterError::UnknownFilter(_)));
    }
}
