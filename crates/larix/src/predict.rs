//! FIRST/FOLLOW predictive-set computation.
//!
//! Reduce augmentation consumes this as an opaque, total service: every
//! declared nonterminal has an entry.

use crate::grammar::{Grammar, NonterminalID, SymbolID, TerminalSet};
use crate::util::{Map, Set};

/// Predictive information for one nonterminal.
#[derive(Debug, Clone)]
pub struct PredictiveSet {
    /// Terminals that can begin a derivation of the nonterminal.
    pub first: TerminalSet,
    /// Terminals that can immediately follow the nonterminal in some
    /// derivation from the root.
    pub follow: TerminalSet,
    /// Whether the nonterminal can appear at the very end of the input.
    pub may_precede_eof: bool,
}

#[derive(Debug)]
pub struct PredictiveSets {
    entries: Map<NonterminalID, PredictiveSet>,
    nullables: Set<NonterminalID>,
}

impl PredictiveSets {
    pub fn compute(g: &Grammar) -> Self {
        let nullables = nullable_set(g);
        let firsts = first_sets(g, &nullables);
        let (follows, eofs) = follow_sets(g, &nullables, &firsts);

        let entries = g
            .nonterminals
            .keys()
            .map(|&n| {
                (
                    n,
                    PredictiveSet {
                        first: firsts[&n].clone(),
                        follow: follows[&n].clone(),
                        may_precede_eof: eofs.contains(&n),
                    },
                )
            })
            .collect();

        Self { entries, nullables }
    }

    pub fn get(&self, n: NonterminalID) -> &PredictiveSet {
        &self.entries[&n]
    }

    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nullables.contains(&n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NonterminalID, &PredictiveSet)> + '_ {
        self.entries.iter().map(|(&n, entry)| (n, entry))
    }
}

/// A nonterminal is nullable iff some production's right-hand side consists
/// of nullable nonterminals only (the empty right-hand side included).
fn nullable_set(g: &Grammar) -> Set<NonterminalID> {
    let mut nullables = Set::default();
    loop {
        let mut changed = false;
        for p in g.productions.values() {
            if nullables.contains(&p.left) {
                continue;
            }
            if p.right
                .iter()
                .all(|s| matches!(s, SymbolID::N(n) if nullables.contains(n)))
            {
                changed |= nullables.insert(p.left);
            }
        }
        if !changed {
            break;
        }
    }
    nullables
}

fn first_sets(g: &Grammar, nullables: &Set<NonterminalID>) -> Map<NonterminalID, TerminalSet> {
    let mut firsts: Map<NonterminalID, TerminalSet> = g
        .nonterminals
        .keys()
        .map(|&n| (n, TerminalSet::default()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for p in g.productions.values() {
            // scan the right-hand side through its nullable prefix
            let mut added = TerminalSet::default();
            for s in &p.right {
                match s {
                    SymbolID::T(t) => {
                        added.insert(*t);
                        break;
                    }
                    SymbolID::N(n) => {
                        added.union_with(&firsts[n]);
                        if !nullables.contains(n) {
                            break;
                        }
                    }
                }
            }

            let slot = &mut firsts[&p.left];
            let before = slot.len();
            slot.union_with(&added);
            changed |= slot.len() != before;
        }
    }

    firsts
}

fn follow_sets(
    g: &Grammar,
    nullables: &Set<NonterminalID>,
    firsts: &Map<NonterminalID, TerminalSet>,
) -> (Map<NonterminalID, TerminalSet>, Set<NonterminalID>) {
    let mut follows: Map<NonterminalID, TerminalSet> = g
        .nonterminals
        .keys()
        .map(|&n| (n, TerminalSet::default()))
        .collect();
    let mut eofs = Set::default();
    eofs.insert(g.root);

    let mut changed = true;
    while changed {
        changed = false;
        for p in g.productions.values() {
            let lhs_follow = follows[&p.left].clone();
            let lhs_eof = eofs.contains(&p.left);

            for (i, s) in p.right.iter().enumerate() {
                let SymbolID::N(n) = *s else { continue };

                let mut added = TerminalSet::default();
                let mut tail_nullable = true;
                for t in &p.right[i + 1..] {
                    match t {
                        SymbolID::T(term) => {
                            added.insert(*term);
                            tail_nullable = false;
                            break;
                        }
                        SymbolID::N(m) => {
                            added.union_with(&firsts[m]);
                            if !nullables.contains(m) {
                                tail_nullable = false;
                                break;
                            }
                        }
                    }
                }
                // a nullable tail lets the left-hand side's context through
                if tail_nullable {
                    added.union_with(&lhs_follow);
                    if lhs_eof {
                        changed |= eofs.insert(n);
                    }
                }

                let slot = &mut follows[&n];
                let before = slot.len();
                slot.union_with(&added);
                changed |= slot.len() != before;
            }
        }
    }

    (follows, eofs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{examples, TerminalID};

    fn terminals(set: &TerminalSet) -> Vec<u16> {
        set.iter().map(|t| t.index() as u16).collect()
    }

    #[test]
    fn arithmetic_sets() {
        let g = Grammar::define(examples::arithmetic).unwrap();
        let ps = PredictiveSets::compute(&g);

        let expr = NonterminalID::from_raw(0);
        let term = NonterminalID::from_raw(1);

        assert!(!ps.is_nullable(expr));

        // LPAREN=0 RPAREN=1 PLUS=2 MINUS=3 STAR=4 SLASH=5 NUM=6
        assert_eq!(terminals(&ps.get(expr).first), vec![0, 3, 6]);
        assert_eq!(terminals(&ps.get(expr).follow), vec![1, 2, 3]);
        assert!(ps.get(expr).may_precede_eof);

        assert_eq!(terminals(&ps.get(term).follow), vec![1, 2, 3, 4, 5]);
        assert!(ps.get(term).may_precede_eof);
    }

    #[test]
    fn braced_list_sets() {
        let g = Grammar::define(examples::braced_list).unwrap();
        let ps = PredictiveSets::compute(&g);

        let block = NonterminalID::from_raw(0);
        let stmts = NonterminalID::from_raw(1);
        let stmt = NonterminalID::from_raw(2);

        assert!(ps.is_nullable(stmts));
        assert!(!ps.is_nullable(block));
        assert!(!ps.is_nullable(stmt));

        // LBRACE=0 RBRACE=1 SEMI=2
        assert_eq!(terminals(&ps.get(block).first), vec![0]);
        assert_eq!(terminals(&ps.get(stmts).first), vec![2]);
        assert_eq!(terminals(&ps.get(stmts).follow), vec![1, 2]);
        assert_eq!(terminals(&ps.get(stmt).follow), vec![1, 2]);

        assert!(ps.get(block).may_precede_eof);
        assert!(!ps.get(stmts).may_precede_eof);
        assert!(!ps.get(stmt).may_precede_eof);
    }

    #[test]
    fn nullable_pair_sets() {
        // S -> A A; A -> a | ε
        let g = Grammar::define(|g| {
            use crate::grammar::SymbolID::*;
            let a = g.terminal("a");
            let s = g.nonterminal("S");
            let nt_a = g.nonterminal("A");
            g.start_symbol(s);
            g.production(s, [N(nt_a), N(nt_a)])?;
            g.production(nt_a, [T(a)])?;
            g.production(nt_a, [])?;
            Ok(())
        })
        .unwrap();
        let ps = PredictiveSets::compute(&g);

        let s = NonterminalID::from_raw(0);
        let nt_a = NonterminalID::from_raw(1);
        let a = TerminalID::from_raw(0);

        assert!(ps.is_nullable(s));
        assert!(ps.is_nullable(nt_a));

        assert!(ps.get(s).first.contains(a));
        assert!(ps.get(s).follow.is_empty());
        assert!(ps.get(s).may_precede_eof);

        assert!(ps.get(nt_a).follow.contains(a));
        assert!(ps.get(nt_a).may_precede_eof);

        assert_eq!(ps.iter().count(), 2);
    }
}
