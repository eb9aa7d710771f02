//! Decision logic for the three filter slots (add-filter, view-filter,
//! live-filter) described in spec §4.9: whether a filter change can be
//! applied by incrementally pruning the current views, or requires a full
//! clear-and-rebuild from the locator hash. Grounded on
//! `ompl/src/library/mod.rs`'s filter-tag rebuild path
//! (`force_build_filters`/`rebuild_filters`), generalized to the
//! expression-AST filters this crate's `filter` module compiles.

use crate::filter::{is_harmless, match_types, Expr, MATCH_ALBUM, MATCH_TITLE};
use crate::unicode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Drop every view and re-walk the hash, re-admitting tracks that pass.
    Rebuild,
    /// Keep the existing views, just drop the tracks that now fail.
    Prune,
}

/// Decide how to apply a change to a compiled filter slot (view-filter or
/// add-filter). A change can be applied as an incremental prune only when
/// it's provably a narrowing of the slot's current contents: either going
/// from no filter to a harmless one, or conjoining a harmless clause onto
/// the existing expression. Anything else — including relaxing the filter,
/// or swapping in an expression we can't prove is a narrowing — rebuilds.
pub fn decide_expr_transition(old: Option<&Expr>, new: Option<&Expr>) -> Transition {
    match (old, new) {
        (None, None) => Transition::Prune,
        (Some(_), None) => Transition::Rebuild,
        (None, Some(new_expr)) => {
            if is_harmless(new_expr) {
                Transition::Prune
            } else {
                Transition::Rebuild
            }
        }
        (Some(old_expr), Some(new_expr)) => {
            if old_expr == new_expr {
                Transition::Prune
            } else if is_harmless(new_expr) && conjoins(old_expr, new_expr) {
                Transition::Prune
            } else {
                Transition::Rebuild
            }
        }
    }
}

/// Whether `new` is `old` with one or more extra `AND`-ed clauses, i.e. a
/// structural tightening of `old` that can only shrink its matches.
fn conjoins(old: &Expr, new: &Expr) -> bool {
    if new == old {
        return true;
    }
    match new {
        Expr::And(l, r) => conjoins(old, l) || conjoins(old, r),
        _ => false,
    }
}

/// Decide how to apply a change to the live (free-text) filter slot: a
/// rebuild unless the new string is a superstring of the old one, per
/// scenario F.
pub fn decide_live_filter_transition(old: Option<&str>, new: Option<&str>) -> Transition {
    match (old, new) {
        (None, None) => Transition::Prune,
        (Some(_), None) => Transition::Rebuild,
        (None, Some(_)) => Transition::Prune,
        (Some(old_s), Some(new_s)) => {
            if unicode::contains_fold(new_s, old_s) {
                Transition::Prune
            } else {
                Transition::Rebuild
            }
        }
    }
}

const LIVE_FILTER_FIELDS: &[&str] = &["artist", "album", "title", "albumartist", "filename"];

/// Build the filter expression a live-filter string compiles to: either its
/// shorthand expansion (if it contains `~`) or a substring OR across the
/// fields a live filter searches, per spec §4.9.
pub fn compile_live_filter(text: &str) -> Result<Expr, crate::filter::FilterError> {
    if text.contains('~') {
        return crate::filter::parser::parse(text).map_err(Into::into);
    }
    let escaped = escape_glob_meta(text);
    let clause = |field: &str| format!(r#"{field}="*{escaped}*""#);
    let joined = LIVE_FILTER_FIELDS
        .iter()
        .map(|f| clause(f))
        .collect::<Vec<_>>()
        .join("|");
    crate::filter::parser::parse(&joined).map_err(Into::into)
}

fn escape_glob_meta(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | '\\' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Whether a live filter's compiled expression should also auto-expand
/// tree nodes (it mentions album or title fields).
pub fn live_filter_expands_tree(expr: &Expr) -> bool {
    let bits = match_types(expr);
    bits & (MATCH_ALBUM | MATCH_TITLE) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse;

    #[test]
    fn no_filter_to_filter_is_prune_when_harmless() {
        let new = parse(r#"artist="Miles*""#).unwrap();
        assert_eq!(decide_expr_transition(None, Some(&new)), Transition::Prune);
    }

    #[test]
    fn filter_to_no_filter_is_rebuild() {
        let old = parse(r#"artist="Miles*""#).unwrap();
        assert_eq!(decide_expr_transition(Some(&old), None), Transition::Rebuild);
    }

    #[test]
    fn conjunctive_tightening_is_prune() {
        let old = parse(r#"artist="Miles*""#).unwrap();
        let new = parse(r#"artist="Miles*" & date>=1959"#).unwrap();
        assert_eq!(decide_expr_transition(Some(&old), Some(&new)), Transition::Prune);
    }

    #[test]
    fn unrelated_swap_is_rebuild() {
        let old = parse(r#"artist="Miles*""#).unwrap();
        let new = parse(r#"artist="Chet*""#).unwrap();
        assert_eq!(decide_expr_transition(Some(&old), Some(&new)), Transition::Rebuild);
    }

    #[test]
    fn scenario_f_live_filter_superstring_is_prune_then_rebuild_on_clear() {
        assert_eq!(decide_live_filter_transition(Some("miles"), Some("miles d")), Transition::Prune);
        assert_eq!(decide_live_filter_transition(Some("miles d"), None), Transition::Rebuild);
    }

    #[test]
    fn live_filter_text_compiles_to_substring_or_across_fields() {
        let expr = compile_live_filter("miles").unwrap();
        assert!(matches!(expr, Expr::Or(_, _)));
    }

    #[test]
    fn live_filter_with_tilde_uses_shorthand_expansion() {
        let expr = compile_live_filter("~amiles").unwrap();
        assert!(matches!(expr, Expr::Str { .. }));
    }
}
