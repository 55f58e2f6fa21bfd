//! SLR(1) parsing-automaton construction.
//!
//! Phase one ([`lr0`]) discovers all reachable states and their shift/goto
//! transitions with a breadth-first worklist over item-set content. Phase two
//! ([`slr`]) assigns reduce actions from the predictive sets and rejects any
//! grammar whose action table would be non-deterministic.

use crate::grammar::{Grammar, NonterminalID, ProductionID, SymbolID, TerminalID};
use crate::item::{self, ItemSet};
use crate::predict::PredictiveSets;
use crate::util::{display_fn, Map};
use indexmap::map::Entry;
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);
impl StateID {
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
}
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

/// One automaton state. The shift and goto tables are populated by [`lr0`],
/// the reduce tables by [`slr`]; all tables are frozen afterwards.
#[derive(Debug)]
pub struct ParsingState {
    /// The kernel item set that identifies this state.
    pub kernels: ItemSet,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
    pub reduces: Map<TerminalID, ProductionID>,
    pub eof_reduce: Option<ProductionID>,
}

impl ParsingState {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "## kernels:")?;
            for item in self.kernels.iter() {
                writeln!(f, "- {}", item.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminals[t], to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminals[n], to)?;
                }
            }
            if !self.reduces.is_empty() {
                writeln!(f, "## reduces:")?;
                for (t, p) in &self.reduces {
                    writeln!(f, "- {} => {}", g.terminals[t], g.production(*p).display(g))?;
                }
            }
            if let Some(p) = self.eof_reduce {
                writeln!(f, "## on end of input: reduce {}", g.production(p).display(g))?;
            }
            Ok(())
        })
    }
}

/// The finished automaton: an arena of states and the initial state.
#[derive(Debug)]
pub struct ParsingAutomaton {
    pub states: Map<StateID, ParsingState>,
    pub initial: StateID,
}

impl ParsingAutomaton {
    pub fn state(&self, id: StateID) -> &ParsingState {
        &self.states[&id]
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, state) in &self.states {
                writeln!(f, "#### {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Lookahead on which a reduce action fires.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum Lookahead {
    Terminal(TerminalID),
    EndOfInput,
}
impl fmt::Debug for Lookahead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminal(t) => write!(f, "{:?}", t),
            Self::EndOfInput => f.write_str("$eof"),
        }
    }
}

/// A shift-reduce or reduce-reduce conflict. The grammar is not SLR(1);
/// construction aborts and no partially augmented automaton escapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "grammar is not SLR(1): conflicting actions in {state:?} on {lookahead:?} \
     (shift: {shift:?}, reduces: {productions:?})"
)]
pub struct GrammarAmbiguous {
    pub state: StateID,
    pub lookahead: Lookahead,
    pub shift: Option<StateID>,
    pub productions: Vec<ProductionID>,
}

/// Discover the canonical LR(0) automaton of the grammar.
///
/// Returns the automaton with its reduce tables still empty, together with
/// the canonical lookup from kernel item-set content to state. The lookup
/// guarantees one state per distinct reachable item-set content; both it and
/// the worklist are locals of this call.
#[tracing::instrument(skip_all)]
pub fn lr0(g: &Grammar) -> (ParsingAutomaton, Map<ItemSet, StateID>) {
    let mut states = Map::<StateID, ParsingState>::default();
    let mut state_id = {
        let mut next = 0u16;
        move || {
            let id = StateID(next);
            next += 1;
            id
        }
    };

    let initial_set = item::initial_item_set(g);
    let initial = state_id();
    let mut lookup = Map::<ItemSet, StateID>::default();
    lookup.insert(initial_set.clone(), initial);

    let mut pending = VecDeque::new();
    pending.push_back((initial, initial_set));

    while let Some((current, kernels)) = pending.pop_front() {
        let mut shifts = Map::default();
        let mut gotos = Map::default();

        let symbols = g
            .terminals
            .keys()
            .map(|&t| SymbolID::T(t))
            .chain(g.nonterminals.keys().map(|&n| SymbolID::N(n)));
        for symbol in symbols {
            let target_set = item::goto_unchecked(g, &kernels, symbol);

            // an empty item set is not a valid state
            if target_set.is_empty() {
                continue;
            }

            let target = match lookup.get(&target_set) {
                Some(&existing) => existing,
                None => {
                    let id = state_id();
                    tracing::trace!("create {:?} for {}", id, target_set.display(g));
                    lookup.insert(target_set.clone(), id);
                    pending.push_back((id, target_set));
                    id
                }
            };

            // goto is a function of (item set, symbol), so each pair gets
            // exactly one target
            let prev = match symbol {
                SymbolID::T(t) => shifts.insert(t, target),
                SymbolID::N(n) => gotos.insert(n, target),
            };
            debug_assert!(prev.is_none());
        }

        states.insert(
            current,
            ParsingState {
                kernels,
                shifts,
                gotos,
                reduces: Map::default(),
                eof_reduce: None,
            },
        );
    }

    tracing::debug!("LR(0) automaton has {} states", states.len());
    (ParsingAutomaton { states, initial }, lookup)
}

/// Construct the finished SLR(1) automaton: run [`lr0`], compute the
/// predictive sets, and assign reduce actions.
#[tracing::instrument(skip_all)]
pub fn slr(g: &Grammar) -> Result<ParsingAutomaton, GrammarAmbiguous> {
    let (mut automaton, _lookup) = lr0(g);
    let predictive = PredictiveSets::compute(g);
    assign_reduces(g, &mut automaton, &predictive)?;
    Ok(automaton)
}

fn assign_reduces(
    g: &Grammar,
    automaton: &mut ParsingAutomaton,
    predictive: &PredictiveSets,
) -> Result<(), GrammarAmbiguous> {
    let ids: Vec<StateID> = automaton.states.keys().copied().collect();
    for id in ids {
        // Reduce actions come from the full closure of the kernel set: a
        // finalized epsilon item never reaches any kernel set.
        let finalized: Vec<ProductionID> = {
            let state = &automaton.states[&id];
            item::closure_unchecked(g, &state.kernels)
                .filter(|item| item.is_finalized(g))
                .map(|item| item.production)
                .collect()
        };

        for production in finalized {
            let info = predictive.get(g.production(production).left);
            let state = &mut automaton.states[&id];
            for terminal in info.follow.iter() {
                register_reduce(state, id, terminal, production)?;
            }
            if info.may_precede_eof {
                register_eof_reduce(state, id, production)?;
            }
        }
    }
    Ok(())
}

fn register_reduce(
    state: &mut ParsingState,
    id: StateID,
    terminal: TerminalID,
    production: ProductionID,
) -> Result<(), GrammarAmbiguous> {
    if let Some(&shift) = state.shifts.get(&terminal) {
        return Err(GrammarAmbiguous {
            state: id,
            lookahead: Lookahead::Terminal(terminal),
            shift: Some(shift),
            productions: vec![production],
        });
    }

    match state.reduces.entry(terminal) {
        Entry::Occupied(entry) => {
            let prev = *entry.get();
            if prev != production {
                return Err(GrammarAmbiguous {
                    state: id,
                    lookahead: Lookahead::Terminal(terminal),
                    shift: None,
                    productions: vec![prev, production],
                });
            }
        }
        Entry::Vacant(entry) => {
            entry.insert(production);
        }
    }
    Ok(())
}

fn register_eof_reduce(
    state: &mut ParsingState,
    id: StateID,
    production: ProductionID,
) -> Result<(), GrammarAmbiguous> {
    match state.eof_reduce {
        Some(prev) if prev != production => Err(GrammarAmbiguous {
            state: id,
            lookahead: Lookahead::EndOfInput,
            shift: None,
            productions: vec![prev, production],
        }),
        _ => {
            state.eof_reduce = Some(production);
            Ok(())
        }
    }
}
