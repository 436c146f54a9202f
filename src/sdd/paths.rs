//! Path enumeration: every way to reach `|1|` from a node, yielding one
//! value *set* per flat level (the whole arc valuation, not each individual
//! value in it) and a recursively-enumerated sub-path per hierarchical level
//! (spec.md §4.5 "paths": "a lazy cooperative producer yielding vectors of
//! value sets, one per level along a path"). Hand-rolled as an explicit
//! stack of frames rather than a generator -- stable Rust has no
//! coroutines -- mirroring how bex's `Walkable::walk`/`as_heap` drive a
//! worklist by hand instead of recursing directly on the call stack.
use crate::sdd::{Sdd, SddNode};
use crate::values::ValueSet;

/// One step of a path: a flat level's whole arc valuation, or a full path
/// through a nested SDD at a hierarchical level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step<V: ValueSet> {
    Flat(V),
    Hier(Path<V>),
}

pub type Path<V> = Vec<Step<V>>;

enum NodeArcs<V: ValueSet> {
    Flat(Vec<(V, Sdd<V>)>),
    Hier(Vec<(Sdd<V>, Sdd<V>)>),
}

struct Frame<V: ValueSet> {
    arcs: NodeArcs<V>,
    arc_idx: usize,
    choices: std::vec::IntoIter<(Step<V>, Sdd<V>)>,
    prefix: Path<V>,
}

/// Iterates every path from a node to `|1|`.
pub struct Paths<V: ValueSet> {
    stack: Vec<Frame<V>>,
    /// `true` until the single empty path of a bare `|1|` root has been emitted.
    emit_root_one: bool,
}

/// All paths from `sdd` to `|1|`, one `Vec<Step<V>>` per path.
pub fn paths<V: ValueSet>(sdd: &Sdd<V>) -> Paths<V> {
    let mut stack = Vec::new();
    let mut emit_root_one = false;
    if sdd.is_one() {
        emit_root_one = true;
    } else if !sdd.is_zero() {
        stack.push(frame_for(sdd, Vec::new()));
    }
    Paths { stack, emit_root_one }
}

fn choices_for_arcs<V: ValueSet>(arcs: &NodeArcs<V>, idx: usize) -> std::vec::IntoIter<(Step<V>, Sdd<V>)> {
    match arcs {
        NodeArcs::Flat(list) => {
            let (val, succ) = &list[idx];
            vec![(Step::Flat(val.clone()), succ.clone())].into_iter()
        }
        NodeArcs::Hier(list) => {
            let (nested, succ) = &list[idx];
            paths(nested).map(|p| (Step::Hier(p), succ.clone())).collect::<Vec<_>>().into_iter()
        }
    }
}

fn frame_for<V: ValueSet>(node: &Sdd<V>, prefix: Path<V>) -> Frame<V> {
    let arcs = match &*node.0 {
        SddNode::Flat { arcs, .. } => NodeArcs::Flat(arcs.clone()),
        SddNode::Hier { arcs, .. } => NodeArcs::Hier(arcs.clone()),
        _ => NodeArcs::Flat(Vec::new()),
    };
    let choices = choices_for_arcs(&arcs, 0);
    Frame { arcs, arc_idx: 0, choices, prefix }
}

impl<V: ValueSet> Iterator for Paths<V> {
    type Item = Path<V>;

    fn next(&mut self) -> Option<Path<V>> {
        if self.emit_root_one {
            self.emit_root_one = false;
            return Some(Vec::new());
        }
        loop {
            let Some(top) = self.stack.last_mut() else { return None };
            match top.choices.next() {
                Some((step, succ)) => {
                    let mut prefix = top.prefix.clone();
                    prefix.push(step);
                    if succ.is_one() {
                        return Some(prefix);
                    }
                    if succ.is_zero() {
                        continue;
                    }
                    self.stack.push(frame_for(&succ, prefix));
                }
                None => {
                    let len = match &top.arcs {
                        NodeArcs::Flat(list) => list.len(),
                        NodeArcs::Hier(list) => list.len(),
                    };
                    top.arc_idx += 1;
                    if top.arc_idx >= len {
                        self.stack.pop();
                        if self.stack.is_empty() {
                            return None;
                        }
                    } else {
                        top.choices = choices_for_arcs(&top.arcs, top.arc_idx);
                    }
                }
            }
        }
    }
}
