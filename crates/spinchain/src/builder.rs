//! Term list → MPO via a finite-state automaton.
//!
//! A term `c · A(i_1) B(i_2) ... Z(i_k)` is a path through the automaton:
//! it leaves the *start* state at site `i_1` (picking up `c · A`), walks
//! through intermediate states carrying identities on untouched sites, and
//! enters the *final* state at `i_k`. The intermediate state on bond `b` is
//! keyed by the operators that remain to be placed on sites `> b`, so all
//! terms sharing a remaining suffix share a state. For nearest-neighbour
//! chains this gives bond dimension `2 + (#distinct couplings)`, independent
//! of the chain length.

use std::collections::HashMap;

use crate::error::{InvalidTermError, Result};
use crate::lattice::Lattice;
use crate::operators::{by_name, LocalOp};
use crate::terms::TermList;
use tn::tensor::{C64, Tensor4};
use tn::MPO;

type SuffixKey = Vec<(usize, String)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Mid(usize),
    Final,
}

struct PlacedTerm {
    coef: f64,
    // sorted by site, one entry per site, 0-based
    ops: Vec<(usize, String, LocalOp)>,
}

impl PlacedTerm {
    fn span(&self) -> (usize, usize) {
        (self.ops[0].0, self.ops[self.ops.len() - 1].0)
    }

    fn suffix_after(&self, bond: usize) -> SuffixKey {
        self.ops
            .iter()
            .filter(|(s, _, _)| *s > bond)
            .map(|(s, name, _)| (*s, name.clone()))
            .collect()
    }
}

#[derive(Default)]
struct BondStates {
    index: HashMap<SuffixKey, usize>,
}

impl BondStates {
    fn intern(&mut self, key: SuffixKey) -> usize {
        let next = self.index.len();
        *self.index.entry(key).or_insert(next)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

pub struct HamiltonianBuilder<'a> {
    lattice: &'a Lattice,
}

impl<'a> HamiltonianBuilder<'a> {
    pub fn new(lattice: &'a Lattice) -> Self {
        Self { lattice }
    }

    pub fn build(&self, terms: &TermList) -> Result<MPO> {
        let n = self.lattice.len();
        let dims = self.lattice.dims();
        let placed = self.place(terms)?;

        // Intermediate state of every term on every bond it spans.
        let mut bonds: Vec<BondStates> = (0..n.saturating_sub(1)).map(|_| BondStates::default()).collect();
        let mut paths: Vec<Vec<usize>> = Vec::with_capacity(placed.len());
        for t in &placed {
            let (first, last) = t.span();
            paths.push((first..last).map(|b| bonds[b].intern(t.suffix_after(b))).collect());
        }

        // Bond b holds [start, mid..., final]; the two outer boundaries have one slot.
        let width = |b: usize| bonds[b].len() + 2;
        let slot = |bond: Option<usize>, st: State| -> usize {
            match (bond, st) {
                (None, _) | (Some(_), State::Start) => 0,
                (Some(_), State::Mid(k)) => 1 + k,
                (Some(b), State::Final) => width(b) - 1,
            }
        };
        let left_bond = |s: usize| if s == 0 { None } else { Some(s - 1) };
        let right_bond = |s: usize| if s + 1 == n { None } else { Some(s) };

        let mut sites: Vec<Tensor4> = (0..n)
            .map(|s| {
                let dl = left_bond(s).map_or(1, width);
                let dr = right_bond(s).map_or(1, width);
                Tensor4::zeros(dl, dims[s], dims[s], dr)
            })
            .collect();

        for s in 0..n {
            let id = LocalOp::identity(dims[s]);
            if s + 1 < n {
                let (l, r) = (slot(left_bond(s), State::Start), slot(right_bond(s), State::Start));
                write_block(&mut sites[s], l, r, &id, false);
            }
            if s > 0 {
                let (l, r) = (slot(left_bond(s), State::Final), slot(right_bond(s), State::Final));
                write_block(&mut sites[s], l, r, &id, false);
            }
        }

        for (t, path) in placed.iter().zip(&paths) {
            let (first, last) = t.span();
            let mut cursor = 0;
            for s in first..=last {
                let from = if s == first { State::Start } else { State::Mid(path[s - 1 - first]) };
                let to = if s == last { State::Final } else { State::Mid(path[s - first]) };

                let op = match t.ops.get(cursor) {
                    Some((site, _, op)) if *site == s => {
                        cursor += 1;
                        op.clone()
                    }
                    _ => LocalOp::identity(dims[s]),
                };

                let (l, r) = (slot(left_bond(s), from), slot(right_bond(s), to));
                if s == first {
                    // coefficients of terms entering the same state add up
                    write_block(&mut sites[s], l, r, &op.scaled(C64::new(t.coef, 0.0)), true);
                } else {
                    write_block(&mut sites[s], l, r, &op, false);
                }
            }
        }

        let mpo = MPO::new(sites)?;
        log::debug!(
            "built MPO for {} terms on {} sites, bond dims {:?}",
            placed.len(),
            n,
            mpo.bond_dims()
        );
        Ok(mpo)
    }

    // Validates every term and rewrites it as one operator per site, sorted by site.
    fn place(&self, terms: &TermList) -> Result<Vec<PlacedTerm>> {
        let n = self.lattice.len();
        let mut placed = Vec::with_capacity(terms.len());

        for (ti, term) in terms.iter().enumerate() {
            if !term.coef.is_finite() {
                return Err(InvalidTermError::NonFiniteCoefficient { term: ti, coef: term.coef }.into());
            }
            if term.ops.is_empty() {
                return Err(InvalidTermError::Empty { term: ti }.into());
            }

            let mut per_site: Vec<(usize, String, LocalOp)> = Vec::new();
            for (name, site) in &term.ops {
                let Some(s) = self.lattice.site(*site) else {
                    return Err(InvalidTermError::SiteOutOfRange { term: ti, site: *site, n }.into());
                };
                let op = by_name(name, s.dim).ok_or_else(|| InvalidTermError::UnknownOperator {
                    term: ti,
                    name: name.clone(),
                    dim: s.dim,
                })?;
                let idx = site - 1;
                match per_site.iter_mut().find(|(i, _, _)| *i == idx) {
                    Some((_, label, acc)) => {
                        *acc = acc.compose(&op);
                        label.push('*');
                        label.push_str(name);
                    }
                    None => per_site.push((idx, name.clone(), op)),
                }
            }
            per_site.sort_by_key(|(i, _, _)| *i);

            if term.coef == 0.0 {
                continue;
            }
            placed.push(PlacedTerm {
                coef: term.coef,
                ops: per_site,
            });
        }
        Ok(placed)
    }
}

fn write_block(w: &mut Tensor4, l: usize, r: usize, op: &LocalOp, accumulate: bool) {
    for o in 0..op.dim {
        for i in 0..op.dim {
            if accumulate {
                w.add(l, o, i, r, op.get(o, i));
            } else {
                w.set(l, o, i, r, op.get(o, i));
            }
        }
    }
}
