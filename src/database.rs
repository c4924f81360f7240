use std::collections::BTreeMap;
use std::sync::Arc;
use crate::array::{self, Array3};




/**
 * Identifies the part of the mesh where a field's data resides along the
 * radial axis. `Cell` fields have one entry per zone; `Node` fields have one
 * entry per vertex plane, so adjacent blocks share their boundary plane.
 */
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MeshLocation {
    Cell,
    Node,
}




/**
 * The per-patch field arrays held by the database. Only `Conserved` is
 * mutable after initialization; the geometric fields are fixed for the
 * lifetime of the run.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Conserved,
    VertCoords,
    CellCoords,
    CellVolume,
    FaceAreaI,
    FaceAreaJ,
}




// ============================================================================
impl Field {

    pub fn all() -> [Field; 6] {
        [
            Field::Conserved,
            Field::VertCoords,
            Field::CellCoords,
            Field::CellVolume,
            Field::FaceAreaI,
            Field::FaceAreaJ,
        ]
    }

    /**
     * The name used for this field's file in a checkpoint tree.
     */
    pub fn name(self) -> &'static str {
        match self {
            Field::Conserved => "conserved",
            Field::VertCoords => "vert_coords",
            Field::CellCoords => "cell_coords",
            Field::CellVolume => "cell_volume",
            Field::FaceAreaI => "face_area_i",
            Field::FaceAreaJ => "face_area_j",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::all().into_iter().find(|f| f.name() == name)
    }

    /**
     * Where this field's data lives along the radial axis. Radial face areas
     * and vertex coordinates are node-like: adjacent blocks duplicate one
     * plane, which `assemble` drops when concatenating.
     */
    pub fn location_i(self) -> MeshLocation {
        match self {
            Field::VertCoords | Field::FaceAreaI => MeshLocation::Node,
            _ => MeshLocation::Cell,
        }
    }
}




/**
 * Identifies a patch's block position in the (here, purely radial)
 * decomposition.
 */
pub type BlockIndex = (i64, i64, i64);


/**
 * Tags which edge of a patch a boundary slab is requested for.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Il,
    Ir,
    Jl,
    Jr,
}


/**
 * Produces a guard-zone slab for a patch edge with no neighbor: arguments
 * are the patch's block index, the edge, the requested depth, and the
 * patch's own conserved array. Returning an empty array declines to produce
 * data, in which case the fetched guard region is left zeroed and must not
 * be consumed downstream.
 */
pub type BoundaryValue = Box<dyn Fn(BlockIndex, Edge, usize, &Array3) -> Array3 + Send + Sync>;




/**
 * Keyed store of the per-patch field arrays. The database owns all patch
 * data exclusively: solvers receive copies (conserved data, via `fetch`) or
 * shared immutable references (geometry, via `Arc`), and results are
 * committed back through the coordinator under a Runge-Kutta mixing rule.
 */
pub struct Database {
    block_size: (usize, usize),
    patches: BTreeMap<(BlockIndex, Field), Arc<Array3>>,
    boundary_value: Option<BoundaryValue>,
}




// ============================================================================
impl Database {

    /**
     * Create an empty database for patches of the given interior shape.
     */
    pub fn new(ni: usize, nj: usize) -> Self {
        Self {
            block_size: (ni, nj),
            patches: BTreeMap::new(),
            boundary_value: None,
        }
    }


    pub fn block_size(&self) -> (usize, usize) {
        self.block_size
    }


    /**
     * Install the callback that supplies guard-zone slabs at patch edges
     * with no neighbor.
     */
    pub fn set_boundary_value(&mut self, callback: BoundaryValue) {
        self.boundary_value = Some(callback)
    }


    /**
     * Store or replace a field array.
     */
    pub fn insert(&mut self, block: BlockIndex, field: Field, array: Array3) {
        self.patches.insert((block, field), Arc::new(array));
    }


    /**
     * Borrow a field array. Panics if the patch is not present; requesting a
     * missing patch is a logic error, not a runtime condition.
     */
    pub fn at(&self, block: BlockIndex, field: Field) -> &Arc<Array3> {
        self.patches
            .get(&(block, field))
            .unwrap_or_else(|| panic!("no patch {:?}/{}", block, field.name()))
    }


    /**
     * Enumerate the patches holding the given field, in block order.
     */
    pub fn all(&self, field: Field) -> impl Iterator<Item = (BlockIndex, &Arc<Array3>)> + '_ {
        self.patches
            .iter()
            .filter(move |((_, f), _)| *f == field)
            .map(|((b, _), array)| (*b, array))
    }


    /**
     * Enumerate every patch-field entry, in key order.
     */
    pub fn iter(&self) -> impl Iterator<Item = ((BlockIndex, Field), &Arc<Array3>)> + '_ {
        self.patches.iter().map(|(k, v)| (*k, v))
    }


    /**
     * The total number of entries (cells times fields per cell is not
     * counted; this is the zone count) held in the given field.
     */
    pub fn num_cells(&self, field: Field) -> usize {
        self.all(field).map(|(_, a)| a.dim().0 * a.dim().1).sum()
    }


    /**
     * Return a copy of the patch's conserved array, padded with guard zones
     * of the requested depths on the four edges. Radial guards come from the
     * neighbor blocks at `i - 1` and `i + 1` where present, and from the
     * boundary callback otherwise. Polar guards have no neighbors in this
     * decomposition and always go through the callback.
     */
    pub fn fetch(&self, block: BlockIndex, gi0: usize, gi1: usize, gj0: usize, gj1: usize) -> Array3 {
        let interior = self.at(block, Field::Conserved);
        let (ni, nj, nk) = interior.dim();
        let mut result = Array3::zeros((ni + gi0 + gi1, nj + gj0 + gj1, nk));

        let mut paste = |slab: &Array3, i0: usize, j0: usize| {
            let (si, sj, _) = slab.dim();
            for i in 0..si {
                for j in 0..sj {
                    result
                        .slice_mut(i0 + i, j0 + j)
                        .copy_from_slice(slab.slice(i, j))
                }
            }
        };

        paste(interior, gi0, gj0);

        if gi0 > 0 {
            let slab = match self.patches.get(&(left_of(block), Field::Conserved)) {
                Some(neighbor) => neighbor.select(ni - gi0..ni, 0..nj).to_owned(),
                None => self.boundary_slab(block, Edge::Il, gi0, interior),
            };
            if !slab.is_empty() {
                paste(&slab, 0, gj0)
            }
        }
        if gi1 > 0 {
            let slab = match self.patches.get(&(right_of(block), Field::Conserved)) {
                Some(neighbor) => neighbor.select(0..gi1, 0..nj).to_owned(),
                None => self.boundary_slab(block, Edge::Ir, gi1, interior),
            };
            if !slab.is_empty() {
                paste(&slab, gi0 + ni, gj0)
            }
        }
        if gj0 > 0 {
            let slab = self.boundary_slab(block, Edge::Jl, gj0, interior);
            if !slab.is_empty() {
                paste(&slab, gi0, 0)
            }
        }
        if gj1 > 0 {
            let slab = self.boundary_slab(block, Edge::Jr, gj1, interior);
            if !slab.is_empty() {
                paste(&slab, gi0, gj0 + nj)
            }
        }
        result
    }


    fn boundary_slab(&self, block: BlockIndex, edge: Edge, depth: usize, patch: &Array3) -> Array3 {
        match &self.boundary_value {
            Some(callback) => callback(block, edge, depth, patch),
            None => Array3::empty(),
        }
    }


    /**
     * Replace the patch's conserved array with the Runge-Kutta average
     * `w * old + (1 - w) * new`. A weight of zero is plain replacement; a
     * weight of one half is the corrector step of Heun's method.
     */
    pub fn commit(&mut self, block: BlockIndex, new_conserved: Array3, weight: f64) {
        let mixed = if weight == 0.0 {
            new_conserved
        } else {
            let old = self.at(block, Field::Conserved);
            array::zip(old.view(), new_conserved.view(), old.dim().2, |c0, c1, c| {
                for q in 0..c.len() {
                    c[q] = c0[q] * weight + c1[q] * (1.0 - weight)
                }
            })
        };
        self.insert(block, Field::Conserved, mixed);
    }


    /**
     * Concatenate the given field over a range of blocks into one
     * contiguous array, in ascending block order along axis 0. Node-like
     * fields drop the leading plane of each block after the first, so the
     * result spans the range without duplicated planes. Used for global
     * output only.
     */
    pub fn assemble(&self, i0: i64, i1: i64, j0: i64, j1: i64, k0: i64, field: Field) -> Array3 {
        // Only the radial direction is decomposed here, so the selected
        // j-range must be a single block.
        assert!(j1 == j0 + 1, "assembly spans more than one block in j");

        let parts: Vec<_> = (i0..i1)
            .map(|i| self.at((i, j0, k0), field).as_ref())
            .collect();

        match field.location_i() {
            MeshLocation::Cell => array::concat_axis0(&parts),
            MeshLocation::Node => {
                let trimmed: Vec<_> = parts
                    .iter()
                    .enumerate()
                    .map(|(n, p)| {
                        if n == 0 {
                            (*p).clone()
                        } else {
                            p.select(1..p.dim().0, 0..p.dim().1).to_owned()
                        }
                    })
                    .collect();
                array::concat_axis0(&trimmed.iter().collect::<Vec<_>>())
            }
        }
    }
}




fn left_of(block: BlockIndex) -> BlockIndex {
    (block.0 - 1, block.1, block.2)
}

fn right_of(block: BlockIndex) -> BlockIndex {
    (block.0 + 1, block.1, block.2)
}




// ============================================================================
impl std::fmt::Display for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for ((block, field), array) in self.patches.iter() {
            let name = format!("{}-{}-{}/{}", block.0, block.1, block.2, field.name());
            writeln!(f, "{:.<32} {:?}", name, array.dim())?
        }
        Ok(())
    }
}
