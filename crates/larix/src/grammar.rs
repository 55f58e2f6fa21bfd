//! Context-free grammar model.

use crate::util::{display_fn, Map};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TerminalID(u16);
impl TerminalID {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Position of this terminal in the dense terminal numbering.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalID(u16);
impl NonterminalID {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Position of this nonterminal in the dense nonterminal numbering.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductionID(u16);
impl ProductionID {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Position of this production in the dense production numbering.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.0)
    }
}

/// A set of terminal symbols, backed by a bit set over the dense terminal
/// numbering.
#[derive(Debug, Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.index())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.index())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| raw.try_into().map(TerminalID).unwrap())
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.index()).collect(),
        }
    }
}

/// A production rule. `right` may be empty (an epsilon production).
#[derive(Debug)]
pub struct Production {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
}
impl Production {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} -> ", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                f.write_str("ε")?;
            } else {
                for (i, r) in self.right.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    match r {
                        SymbolID::N(n) => f.write_str(&g.nonterminals[n])?,
                        SymbolID::T(t) => f.write_str(&g.terminals[t])?,
                    }
                }
            }
            Ok(())
        })
    }
}

/// An immutable grammar: symbol tables, productions, and a designated root
/// nonterminal whose productions are the automaton's entry points.
#[derive(Debug)]
pub struct Grammar {
    pub terminals: Map<TerminalID, String>,
    pub nonterminals: Map<NonterminalID, String>,
    pub productions: Map<ProductionID, Production>,
    pub root: NonterminalID,
    by_lhs: Map<NonterminalID, Vec<ProductionID>>,
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            root: None,
            next_terminal: 0,
            next_nonterminal: 0,
            next_production: 0,
        };

        f(&mut def)?;

        // The root defaults to the first declared nonterminal.
        let root = def
            .root
            .or_else(|| def.nonterminals.keys().next().copied())
            .ok_or(GrammarDefError::EmptyGrammar)?;

        let mut by_lhs: Map<NonterminalID, Vec<ProductionID>> = def
            .nonterminals
            .keys()
            .map(|&n| (n, Vec::new()))
            .collect();
        for (&id, p) in &def.productions {
            by_lhs[&p.left].push(id);
        }

        Ok(Self {
            terminals: def.terminals,
            nonterminals: def.nonterminals,
            productions: def.productions,
            root,
            by_lhs,
        })
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    pub fn get_production(&self, id: ProductionID) -> Option<&Production> {
        self.productions.get(&id)
    }

    /// The productions whose left-hand side is `n`, in declaration order.
    pub fn productions_of(&self, n: NonterminalID) -> &[ProductionID] {
        self.by_lhs.get(&n).map_or(&[], Vec::as_slice)
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        for (i, t) in self.terminals.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "\n#### nonterminals: ")?;
        for (i, (id, n)) in self.nonterminals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", n)?;
            if *id == self.root {
                f.write_str(" (root)")?;
            }
        }
        writeln!(f, "\n#### productions:")?;
        for p in self.productions.values() {
            writeln!(f, "- {}", p.display(self))?;
        }
        Ok(())
    }
}

/// The contextual values for building a [`Grammar`].
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    productions: Map<ProductionID, Production>,
    root: Option<NonterminalID>,
    next_terminal: u16,
    next_nonterminal: u16,
    next_production: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol.
    pub fn terminal(&mut self, name: &str) -> TerminalID {
        let id = TerminalID(self.next_terminal);
        self.next_terminal += 1;
        self.terminals.insert(id, name.into());
        id
    }

    /// Declare a nonterminal symbol.
    pub fn nonterminal(&mut self, name: &str) -> NonterminalID {
        let id = NonterminalID(self.next_nonterminal);
        self.next_nonterminal += 1;
        self.nonterminals.insert(id, name.into());
        id
    }

    /// Declare a production rule. Every referenced symbol must have been
    /// declared on this builder, and the same `left`/`right` pair may be
    /// declared only once.
    pub fn production<I>(
        &mut self,
        left: NonterminalID,
        right: I,
    ) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if !self.nonterminals.contains_key(&left) {
            return Err(GrammarDefError::UnknownSymbol {
                symbol: SymbolID::N(left),
            });
        }

        let right: Vec<_> = right.into_iter().collect();
        for &symbol in &right {
            let known = match symbol {
                SymbolID::T(t) => self.terminals.contains_key(&t),
                SymbolID::N(n) => self.nonterminals.contains_key(&n),
            };
            if !known {
                return Err(GrammarDefError::UnknownSymbol { symbol });
            }
        }

        for p in self.productions.values() {
            if p.left == left && p.right == right {
                return Err(GrammarDefError::DuplicateProduction { left });
            }
        }

        let id = ProductionID(self.next_production);
        self.next_production += 1;
        self.productions.insert(id, Production { left, right });
        Ok(id)
    }

    /// Designate the root nonterminal.
    pub fn start_symbol(&mut self, root: NonterminalID) {
        self.root.replace(root);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("the grammar does not declare any nonterminal symbol")]
    EmptyGrammar,

    #[error("duplicate production rule for {left:?}")]
    DuplicateProduction { left: NonterminalID },

    #[error("production references the undeclared symbol {symbol:?}")]
    UnknownSymbol { symbol: SymbolID },
}

/// Shared grammars for tests and benchmarks.
pub mod examples {
    use super::*;
    use SymbolID::*;

    /// The usual arithmetic-expression grammar with unary minus.
    pub fn arithmetic(g: &mut GrammarDef) -> Result<(), GrammarDefError> {
        let lparen = g.terminal("LPAREN");
        let rparen = g.terminal("RPAREN");
        let plus = g.terminal("PLUS");
        let minus = g.terminal("MINUS");
        let star = g.terminal("STAR");
        let slash = g.terminal("SLASH");
        let num = g.terminal("NUM");

        let expr = g.nonterminal("expr");
        let term = g.nonterminal("term");
        let factor = g.nonterminal("factor");
        let atom = g.nonterminal("atom");

        g.start_symbol(expr);

        g.production(expr, [N(expr), T(plus), N(term)])?;
        g.production(expr, [N(expr), T(minus), N(term)])?;
        g.production(expr, [N(term)])?;

        g.production(term, [N(term), T(star), N(factor)])?;
        g.production(term, [N(term), T(slash), N(factor)])?;
        g.production(term, [N(factor)])?;

        g.production(factor, [T(minus), N(factor)])?;
        g.production(factor, [N(atom)])?;

        g.production(atom, [T(num)])?;
        g.production(atom, [T(lparen), N(expr), T(rparen)])?;

        Ok(())
    }

    /// A braced statement list with an epsilon production for the empty list.
    pub fn braced_list(g: &mut GrammarDef) -> Result<(), GrammarDefError> {
        let lbrace = g.terminal("LBRACE");
        let rbrace = g.terminal("RBRACE");
        let semi = g.terminal("SEMI");

        let block = g.nonterminal("block");
        let stmts = g.nonterminal("stmts");
        let stmt = g.nonterminal("stmt");

        g.start_symbol(block);

        g.production(block, [T(lbrace), N(stmts), T(rbrace)])?;
        g.production(stmts, [N(stmts), N(stmt)])?;
        g.production(stmts, [])?;
        g.production(stmt, [T(semi)])?;

        Ok(())
    }

    /// A left-recursive key/value sequence.
    pub fn key_value_list(g: &mut GrammarDef) -> Result<(), GrammarDefError> {
        let key = g.terminal("KEY");
        let eq = g.terminal("EQ");
        let value = g.terminal("VALUE");

        let config = g.nonterminal("config");
        let entry = g.nonterminal("entry");

        g.start_symbol(config);

        g.production(config, [N(config), N(entry)])?;
        g.production(config, [N(entry)])?;
        g.production(entry, [T(key), T(eq), T(value)])?;

        Ok(())
    }

    /// The dangling-else grammar. Not SLR(1): the state after `IF stmt` has a
    /// shift and a reduce competing on `ELSE`.
    pub fn dangling_else(g: &mut GrammarDef) -> Result<(), GrammarDefError> {
        let r#if = g.terminal("IF");
        let r#else = g.terminal("ELSE");
        let expr = g.terminal("EXPR");

        let stmt = g.nonterminal("stmt");

        g.start_symbol(stmt);

        g.production(stmt, [T(r#if), N(stmt)])?;
        g.production(stmt, [T(r#if), N(stmt), T(r#else), N(stmt)])?;
        g.production(stmt, [T(expr)])?;

        Ok(())
    }
}
