//! Connected components over faces.
//!
//! Components are computed either over plain mesh adjacency or over a custom
//! predicate on the shared edge; UV islands are the components under the
//! overlay's element adjacency.

use std::collections::{HashSet, VecDeque};

use super::halfedge::HalfEdgeMesh;
use super::index::{EdgeId, FaceId, MeshIndex};
use super::overlay::UvOverlay;

/// Union-find (disjoint-set) over `0..n` with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Create `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Find the representative of the set containing `x`.
    pub fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    /// Merge the sets containing `x` and `y`.
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }

    /// All sets, ordered by their smallest member; members are ascending.
    pub fn groups(&mut self) -> Vec<Vec<usize>> {
        let mut slot = vec![usize::MAX; self.parent.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for x in 0..self.parent.len() {
            let root = self.find(x);
            if slot[root] == usize::MAX {
                slot[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot[root]].push(x);
        }
        groups
    }
}

/// Group `faces` into components, joining neighbours across edges accepted by `connected`.
///
/// Faces outside `faces` are never visited. Components are listed in order of
/// their first face in `faces`.
pub fn face_components<I, F>(
    mesh: &HalfEdgeMesh<I>,
    faces: &[FaceId<I>],
    connected: F,
) -> Vec<Vec<FaceId<I>>>
where
    I: MeshIndex,
    F: Fn(EdgeId<I>, FaceId<I>, FaceId<I>) -> bool,
{
    let in_set: HashSet<FaceId<I>> = faces.iter().copied().collect();
    let mut visited: HashSet<FaceId<I>> = HashSet::with_capacity(faces.len());
    let mut components = Vec::new();

    for &seed in faces {
        if !visited.insert(seed) {
            continue;
        }
        let mut component = vec![seed];
        let mut queue = VecDeque::from([seed]);
        while let Some(f) = queue.pop_front() {
            for e in mesh.face_edges(f) {
                let g = mesh.opposite_face(e, f);
                if !g.is_valid() || !in_set.contains(&g) || visited.contains(&g) {
                    continue;
                }
                if connected(e, f, g) {
                    visited.insert(g);
                    component.push(g);
                    queue.push_back(g);
                }
            }
        }
        components.push(component);
    }

    components
}

/// Connected components of the whole mesh under plain edge adjacency.
pub fn mesh_components<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Vec<Vec<FaceId<I>>> {
    let faces: Vec<FaceId<I>> = mesh.face_ids().collect();
    face_components(mesh, &faces, |_, _, _| true)
}

/// UV islands: components of faces with UVs under element adjacency.
///
/// Only faces with UVs take part. When `faces` is `None` every face of the
/// mesh is considered.
pub fn uv_islands<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    overlay: &UvOverlay<I>,
    faces: Option<&[FaceId<I>]>,
) -> Vec<Vec<FaceId<I>>> {
    let candidates: Vec<FaceId<I>> = match faces {
        Some(faces) => faces
            .iter()
            .copied()
            .filter(|&f| overlay.is_set_triangle(f))
            .collect(),
        None => overlay.set_triangle_ids().collect(),
    };
    face_components(mesh, &candidates, |e, _, _| overlay.is_uv_connected(mesh, e))
}
