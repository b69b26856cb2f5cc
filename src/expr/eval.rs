use std::collections::HashSet;

use super::Expr;

/// Membership predicate for one request: maps a group name to a truth value.
///
/// Three synthetic names are always answered first: `logged` reflects whether
/// a session was resolved, and `true`/`false` let callers hard-code outcomes.
/// Any other name is true iff it is in the session's group set; unknown names
/// are false, never an error.
#[derive(Debug, Clone)]
pub struct Membership {
    logged: bool,
    groups: HashSet<String>,
}

impl Membership {
    /// Predicate for a request with no resolved session.
    pub fn anonymous() -> Self {
        Self { logged: false, groups: HashSet::new() }
    }

    /// Predicate for a resolved session with the given group set.
    pub fn logged_in(groups: HashSet<String>) -> Self {
        Self { logged: true, groups }
    }

    pub fn holds(&self, name: &str) -> bool {
        match name {
            "true" => true,
            "false" => false,
            "logged" => self.logged,
            _ => self.groups.contains(name),
        }
    }
}

/// Evaluate an AST against a membership predicate. Total over any tree the
/// parser produces; operands are evaluated left to right.
pub fn evaluate(expr: &Expr, membership: &Membership) -> bool {
    match expr {
        Expr::Ident(name) => membership.holds(name),
        Expr::And(l, r) => {
            let lv = evaluate(l, membership);
            let rv = evaluate(r, membership);
            lv && rv
        }
        Expr::Or(l, r) => {
            let lv = evaluate(l, membership);
            let rv = evaluate(r, membership);
            lv || rv
        }
        Expr::Not(inner) => !evaluate(inner, membership),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    fn member_of(names: &[&str]) -> Membership {
        Membership::logged_in(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn identifier_truth_tracks_group_set() {
        let m = member_of(&["g1", "g2"]);
        for name in ["g1", "g2"] {
            assert!(evaluate(&parse(name).unwrap(), &m));
        }
        assert!(!evaluate(&parse("g3").unwrap(), &m));
    }

    #[test]
    fn connective_laws() {
        let m = member_of(&["yes"]);
        let t = Expr::ident("yes");
        let f = Expr::ident("no");
        // Not
        assert_eq!(evaluate(&Expr::not(t.clone()), &m), !evaluate(&t, &m));
        assert_eq!(evaluate(&Expr::not(f.clone()), &m), !evaluate(&f, &m));
        // And / Or over all operand combinations
        for a in [t.clone(), f.clone()] {
            for b in [t.clone(), f.clone()] {
                let av = evaluate(&a, &m);
                let bv = evaluate(&b, &m);
                assert_eq!(evaluate(&Expr::and(a.clone(), b.clone()), &m), av && bv);
                assert_eq!(evaluate(&Expr::or(a.clone(), b.clone()), &m), av || bv);
            }
        }
    }

    #[test]
    fn synthetic_names_for_logged_in_session() {
        let m = member_of(&["g1"]);
        assert!(m.holds("true"));
        assert!(!m.holds("false"));
        assert!(m.holds("logged"));
        assert!(evaluate(&parse("logged && g1").unwrap(), &m));
        assert!(!evaluate(&parse("logged && !g1").unwrap(), &m));
    }

    #[test]
    fn anonymous_denies_everything_but_true() {
        let m = Membership::anonymous();
        assert!(evaluate(&parse("true").unwrap(), &m));
        assert!(!evaluate(&parse("g1").unwrap(), &m));
        assert!(!evaluate(&parse("logged").unwrap(), &m));
        assert!(evaluate(&parse("!logged").unwrap(), &m));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let m = member_of(&["a", "c"]);
        let ast = parse("(a || b) && !(c && d)").unwrap();
        let first = evaluate(&ast, &m);
        for _ in 0..10 {
            assert_eq!(evaluate(&ast, &m), first);
        }
    }
}
