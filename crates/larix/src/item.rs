//! LR(0) items, item sets, closure enumeration, and the goto function.

use crate::grammar::{Grammar, NonterminalID, ProductionID, SymbolID};
use crate::util::display_fn;
use std::{collections::VecDeque, fmt};

/// An LR(0) item: a production with a cursor into its right-hand side.
///
/// The derived ordering (production, then cursor) is what makes item sets
/// comparable; nothing downstream depends on it beyond consistency with
/// equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Item {
    pub production: ProductionID,
    pub cursor: u16,
}

impl Item {
    /// The symbol immediately after the cursor, or `None` for a finalized
    /// item.
    pub fn next_symbol(self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production)
            .right
            .get(self.cursor as usize)
            .copied()
    }

    /// Kernel items define a state's identity before closure: any item with
    /// an advanced cursor, plus the root symbol's entry items.
    pub fn is_kernel(self, g: &Grammar) -> bool {
        self.cursor > 0 || g.production(self.production).left == g.root
    }

    /// A fully matched production, ready to reduce.
    pub fn is_finalized(self, g: &Grammar) -> bool {
        self.cursor as usize == g.production(self.production).right.len()
    }

    fn validate(self, g: &Grammar) -> Result<(), StructuralViolation> {
        let p = g
            .get_production(self.production)
            .ok_or(StructuralViolation::DanglingProduction(self.production))?;
        if self.cursor as usize > p.right.len() {
            return Err(StructuralViolation::CursorOutOfBounds {
                production: self.production,
                cursor: self.cursor,
            });
        }
        Ok(())
    }

    // `"expr -> expr . PLUS term"`
    pub fn display<'g>(self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let p = g.production(self.production);
            write!(f, "{} ->", g.nonterminals[&p.left])?;
            for (i, r) in p.right.iter().enumerate() {
                if i == self.cursor as usize {
                    f.write_str(" .")?;
                }
                match r {
                    SymbolID::N(n) => write!(f, " {}", g.nonterminals[n])?,
                    SymbolID::T(t) => write!(f, " {}", g.terminals[t])?,
                }
            }
            if self.cursor as usize == p.right.len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A malformed item relative to the grammar. Indicates a defect in the
/// caller, not a recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralViolation {
    #[error("item references the unknown production {0:?}")]
    DanglingProduction(ProductionID),

    #[error("cursor {cursor} is out of bounds for production {production:?}")]
    CursorOutOfBounds { production: ProductionID, cursor: u16 },
}

/// A deduplicated set of items held in content order, so that equality,
/// ordering, and hashing are insertion-order independent. Item sets identify
/// automaton states and serve as the canonical lookup key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet {
    items: Vec<Item>,
}

impl ItemSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Item> + '_ {
        self.items.iter().copied()
    }

    pub fn contains(&self, item: Item) -> bool {
        self.items.binary_search(&item).is_ok()
    }

    pub fn insert(&mut self, item: Item) -> bool {
        match self.items.binary_search(&item) {
            Ok(_) => false,
            Err(pos) => {
                self.items.insert(pos, item);
                true
            }
        }
    }

    fn validate(&self, g: &Grammar) -> Result<(), StructuralViolation> {
        self.items.iter().try_for_each(|item| item.validate(g))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            f.write_str("{")?;
            for (i, item) in self.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "[{}]", item.display(g))?;
            }
            f.write_str("}")
        })
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Item>,
    {
        let mut items: Vec<_> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        Self { items }
    }
}

/// The initial kernel item set: every production of the root at cursor zero.
pub fn initial_item_set(g: &Grammar) -> ItemSet {
    g.productions_of(g.root)
        .iter()
        .map(|&id| Item {
            production: id,
            cursor: 0,
        })
        .collect()
}

/// Enumerate the closure of a kernel item set: every kernel item exactly
/// once, then every non-kernel closure item exactly once. Consumers must not
/// rely on any finer ordering.
pub fn closure<'g>(
    g: &'g Grammar,
    kernel: &'g ItemSet,
) -> Result<ClosureItems<'g>, StructuralViolation> {
    kernel.validate(g)?;
    Ok(closure_unchecked(g, kernel))
}

pub(crate) fn closure_unchecked<'g>(g: &'g Grammar, kernel: &'g ItemSet) -> ClosureItems<'g> {
    ClosureItems {
        grammar: g,
        kernel: kernel.items.iter(),
        visited: vec![false; g.nonterminals.len()],
        emitted: vec![false; g.productions.len()],
        unvisited: Vec::new(),
        pending: VecDeque::new(),
    }
}

/// Lazy producer of closure items, driven by a per-nonterminal visited array
/// and a worklist. Each nonterminal is expanded at most once, so the
/// enumeration is finite even for recursive grammars.
///
/// The `emitted` guard records cursor-zero items already seen in the kernel
/// (the initial state carries the root's entry items there), so expanding a
/// nonterminal never re-derives them.
#[derive(Debug)]
pub struct ClosureItems<'g> {
    grammar: &'g Grammar,
    kernel: std::slice::Iter<'g, Item>,
    visited: Vec<bool>,
    emitted: Vec<bool>,
    unvisited: Vec<NonterminalID>,
    pending: VecDeque<Item>,
}

impl ClosureItems<'_> {
    fn mark(&mut self, symbol: SymbolID) {
        if let SymbolID::N(n) = symbol {
            if !self.visited[n.index()] {
                self.visited[n.index()] = true;
                self.unvisited.push(n);
            }
        }
    }
}

impl Iterator for ClosureItems<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        if let Some(&item) = self.kernel.next() {
            if item.cursor == 0 {
                self.emitted[item.production.index()] = true;
            }
            if let Some(symbol) = item.next_symbol(self.grammar) {
                self.mark(symbol);
            }
            return Some(item);
        }

        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            let lhs = self.unvisited.pop()?;
            for &id in self.grammar.productions_of(lhs) {
                if std::mem::replace(&mut self.emitted[id.index()], true) {
                    continue;
                }
                self.pending.push_back(Item {
                    production: id,
                    cursor: 0,
                });
                if let Some(&first) = self.grammar.production(id).right.first() {
                    self.mark(first);
                }
            }
        }
    }
}

/// The kernel item set reached from `src` over `symbol`, unclosed. An empty
/// result means the automaton has no transition on `symbol` and must not be
/// registered as a state.
pub fn goto(g: &Grammar, src: &ItemSet, symbol: SymbolID) -> Result<ItemSet, StructuralViolation> {
    src.validate(g)?;
    Ok(goto_unchecked(g, src, symbol))
}

pub(crate) fn goto_unchecked(g: &Grammar, src: &ItemSet, symbol: SymbolID) -> ItemSet {
    let mut next = ItemSet::default();
    for item in closure_unchecked(g, src) {
        if item.next_symbol(g) == Some(symbol) {
            next.insert(Item {
                production: item.production,
                cursor: item.cursor + 1,
            });
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarDefError, SymbolID::*, TerminalID};

    // S -> A A; A -> a | ε
    fn nullable_pair() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a");
            let s = g.nonterminal("S");
            let nt_a = g.nonterminal("A");
            g.start_symbol(s);
            g.production(s, [N(nt_a), N(nt_a)])?;
            g.production(nt_a, [T(a)])?;
            g.production(nt_a, [])?;
            Ok(())
        })
        .unwrap()
    }

    // E -> E + a | a
    fn left_recursive() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("PLUS");
            let a = g.terminal("a");
            let e = g.nonterminal("E");
            g.start_symbol(e);
            g.production(e, [N(e), T(plus), T(a)])?;
            g.production(e, [T(a)])?;
            Ok(())
        })
        .unwrap()
    }

    fn item(production: u16, cursor: u16) -> Item {
        Item {
            production: ProductionID::from_raw(production),
            cursor,
        }
    }

    #[test]
    fn item_ordering() {
        assert!(item(0, 2) < item(1, 0));
        assert!(item(1, 0) < item(1, 1));
        assert_eq!(item(1, 1), item(1, 1));
    }

    #[test]
    fn item_set_is_insertion_order_independent() {
        let forward: ItemSet = [item(0, 0), item(1, 0), item(2, 1)].into_iter().collect();
        let shuffled: ItemSet = [item(2, 1), item(0, 0), item(1, 0), item(0, 0)]
            .into_iter()
            .collect();
        assert_eq!(forward, shuffled);
        assert_eq!(shuffled.len(), 3);

        let mut incremental = ItemSet::default();
        assert!(incremental.insert(item(2, 1)));
        assert!(incremental.insert(item(0, 0)));
        assert!(!incremental.insert(item(0, 0)));
        assert!(incremental.insert(item(1, 0)));
        assert_eq!(incremental, forward);
    }

    #[test]
    fn closure_emits_epsilon_item_as_non_kernel() {
        let g = nullable_pair();
        let kernel = initial_item_set(&g);
        let items: Vec<_> = closure(&g, &kernel).unwrap().collect();

        // {S -> . A A} plus the two productions of A, each exactly once
        assert_eq!(items.len(), 3);
        let set: ItemSet = items.iter().copied().collect();
        assert_eq!(set.len(), 3);
        assert!(set.contains(item(0, 0)));
        assert!(set.contains(item(1, 0)));
        assert!(set.contains(item(2, 0)));

        let epsilon = item(2, 0);
        assert!(epsilon.is_finalized(&g));
        assert!(!epsilon.is_kernel(&g));
        assert!(item(0, 0).is_kernel(&g), "root entry items are kernel");
    }

    #[test]
    fn closure_terminates_on_left_recursion() {
        let g = left_recursive();
        let kernel = initial_item_set(&g);
        // entry items already in the kernel are not re-derived
        let items: Vec<_> = closure(&g, &kernel).unwrap().collect();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn goto_advances_matching_items() {
        let g = left_recursive();
        let kernel = initial_item_set(&g);

        let a = TerminalID::from_raw(1);
        let on_a = goto(&g, &kernel, T(a)).unwrap();
        assert_eq!(on_a, [item(1, 1)].into_iter().collect());

        let on_e = goto(&g, &kernel, N(g.root)).unwrap();
        assert_eq!(on_e, [item(0, 1)].into_iter().collect());

        let plus = TerminalID::from_raw(0);
        assert!(goto(&g, &kernel, T(plus)).unwrap().is_empty());
    }

    #[test]
    fn goto_agrees_on_kernel_and_closed_sets() {
        let g = nullable_pair();
        let kernel = initial_item_set(&g);
        let closed: ItemSet = closure(&g, &kernel).unwrap().collect();

        let a = TerminalID::from_raw(0);
        for symbol in [T(a), N(NonterminalID::from_raw(0)), N(NonterminalID::from_raw(1))] {
            assert_eq!(
                goto(&g, &kernel, symbol).unwrap(),
                goto(&g, &closed, symbol).unwrap(),
            );
        }
    }

    #[test]
    fn dangling_production_is_reported() {
        let g = nullable_pair();
        let bogus: ItemSet = [item(99, 0)].into_iter().collect();
        assert_eq!(
            closure(&g, &bogus).map(|_| ()).unwrap_err(),
            StructuralViolation::DanglingProduction(ProductionID::from_raw(99)),
        );
    }

    #[test]
    fn out_of_bounds_cursor_is_reported() {
        let g = nullable_pair();
        let bogus: ItemSet = [item(1, 5)].into_iter().collect();
        let err = goto(&g, &bogus, T(TerminalID::from_raw(0))).unwrap_err();
        assert_eq!(
            err,
            StructuralViolation::CursorOutOfBounds {
                production: ProductionID::from_raw(1),
                cursor: 5,
            },
        );
    }

    #[test]
    fn display_renders_cursor_position() {
        let g = left_recursive();
        assert_eq!(item(0, 0).display(&g).to_string(), "E -> . E PLUS a");
        assert_eq!(item(0, 2).display(&g).to_string(), "E -> E PLUS . a");
        assert_eq!(item(1, 1).display(&g).to_string(), "E -> a .");
    }

    #[test]
    fn epsilon_display() -> Result<(), GrammarDefError> {
        let g = Grammar::define(|g| {
            let s = g.nonterminal("S");
            g.production(s, [])?;
            Ok(())
        })?;
        assert_eq!(item(0, 0).display(&g).to_string(), "S -> .");
        Ok(())
    }
}
