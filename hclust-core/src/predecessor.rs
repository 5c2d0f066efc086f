//! All-pairs predecessor table over a spanning tree.
//!
//! A tree has exactly one path between any two nodes, so a breadth-first
//! traversal from each source recovers it; edge weights never change which
//! path is found. Each source fills its own row, which lets the traversals run
//! in parallel.
//!
//! TODO: replace per-pair path walks with binary-lifting LCA and path-maximum
//! tables once universes grow past a few hundred labels.

use crate::domain::LabelSet;
use crate::error::{CoreError, Stage};
use crate::mst::SpanningTree;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredecessorTable {
    labels: Arc<LabelSet>,
    n: usize,
    /// Row-major `[source * n + destination]`; `None` for the source's own entry.
    predecessors: Vec<Option<usize>>,
}

impl PredecessorTable {
    /// Run one BFS per source over the tree.
    pub fn from_tree(tree: &SpanningTree) -> Self {
        let n = tree.node_count();
        let mut predecessors = vec![None; n * n];

        if n > 0 {
            predecessors
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(source, row)| bfs_row(tree, source, row));
        }

        Self {
            labels: tree.labels().clone(),
            n,
            predecessors,
        }
    }

    pub fn labels(&self) -> &Arc<LabelSet> {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Node immediately before `destination` on the path from `source`.
    pub fn predecessor(&self, source: usize, destination: usize) -> Option<usize> {
        if source >= self.n || destination >= self.n {
            return None;
        }
        self.predecessors[source * self.n + destination]
    }

    pub fn predecessor_by_label(&self, source: &str, destination: &str) -> Option<&str> {
        let s = self.labels.index_of(source)?;
        let d = self.labels.index_of(destination)?;
        self.predecessor(s, d).map(|p| self.labels.name(p))
    }

    /// Nodes on the unique tree path `from → to`, both endpoints included.
    ///
    /// # Panics
    ///
    /// `from == to` violates the calling contract: a path needs two distinct
    /// endpoints, and callers must handle the diagonal themselves.
    pub fn path(&self, from: usize, to: usize) -> Result<Vec<usize>, CoreError> {
        assert_ne!(
            from, to,
            "path reconstruction requires distinct endpoints (got {from} twice)"
        );
        if from >= self.n || to >= self.n {
            return Err(CoreError::InvalidPair {
                stage: Stage::Predecessors,
                from: self.labels.get(from).unwrap_or("?").to_string(),
                to: self.labels.get(to).unwrap_or("?").to_string(),
            });
        }

        let mut path = vec![to];
        let mut current = to;
        while current != from {
            // A tree never leaves a node unreached; a gap means the table was
            // built from something that was not connected.
            let prev = self.predecessor(from, current).ok_or_else(|| {
                CoreError::DisconnectedGraph {
                    stage: Stage::Predecessors,
                    root: self.labels.name(from).to_string(),
                    unreachable: vec![self.labels.name(to).to_string()],
                }
            })?;
            path.push(prev);
            current = prev;
            if path.len() > self.n {
                return Err(CoreError::invalid_input(
                    Stage::Predecessors,
                    "predecessor chain does not terminate",
                ));
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Label form of [`path`](Self::path). Unknown labels give `InvalidPair`.
    ///
    /// # Panics
    ///
    /// Same contract as `path`: `from` and `to` must differ.
    pub fn path_by_label(&self, from: &str, to: &str) -> Result<Vec<String>, CoreError> {
        let (i, j) = self.resolve_pair(from, to, Stage::Predecessors)?;
        let nodes = self.path(i, j)?;
        Ok(nodes
            .into_iter()
            .map(|k| self.labels.name(k).to_string())
            .collect())
    }

    /// Positions of both labels; `stage` is reported when either is unknown.
    pub(crate) fn resolve_pair(
        &self,
        from: &str,
        to: &str,
        stage: Stage,
    ) -> Result<(usize, usize), CoreError> {
        match (self.labels.index_of(from), self.labels.index_of(to)) {
            (Some(i), Some(j)) => Ok((i, j)),
            _ => Err(CoreError::InvalidPair {
                stage,
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

fn bfs_row(tree: &SpanningTree, source: usize, row: &mut [Option<usize>]) {
    let mut visited = vec![false; row.len()];
    let mut queue = VecDeque::with_capacity(row.len());
    visited[source] = true;
    queue.push_back(source);

    while let Some(node) = queue.pop_front() {
        for &(next, _) in tree.neighbors(node) {
            if !visited[next] {
                visited[next] = true;
                row[next] = Some(node);
                queue.push_back(next);
            }
        }
    }
}
