use core::ops::Range;




/**
 * A dense rank-3 array of `f64`, indexed `(i, j, k)` in row-major order (`k`
 * increases fastest). The first two axes span a logically 2D grid of cells,
 * nodes, or faces; the third axis holds the data components residing there.
 *
 * The backing storage is a flat `Vec`. Sub-regions over the leading two axes
 * are accessed through non-owning `ArrayView3` objects which share the base
 * storage; the component axis is never sliced.
 */
#[derive(Clone, Debug, PartialEq)]
pub struct Array3 {
    dim: (usize, usize, usize),
    data: Vec<f64>,
}




// ============================================================================
impl Array3 {

    /**
     * Create an array of zeros with the given dimensions.
     */
    pub fn zeros(dim: (usize, usize, usize)) -> Self {
        Self {
            dim,
            data: vec![0.0; dim.0 * dim.1 * dim.2],
        }
    }


    /**
     * Create an array with no elements. Empty arrays are used as a sentinel
     * value by boundary callbacks which decline to produce data.
     */
    pub fn empty() -> Self {
        Self::zeros((0, 0, 0))
    }


    /**
     * Generate an array over a 2D extent, with the component slice at each
     * index filled in by a closure.
     */
    pub fn from_slice_function<F>(dim: (usize, usize, usize), mut f: F) -> Self
    where
        F: FnMut((usize, usize), &mut [f64]),
    {
        let mut result = Self::zeros(dim);
        for i in 0..dim.0 {
            for j in 0..dim.1 {
                f((i, j), result.slice_mut(i, j))
            }
        }
        result
    }


    /**
     * Adopt a data buffer with the given dimensions. The buffer length must
     * equal the product of the dimensions.
     */
    pub fn from_vec(dim: (usize, usize, usize), data: Vec<f64>) -> Self {
        assert!(
            data.len() == dim.0 * dim.1 * dim.2,
            "buffer length {} does not match dimensions {:?}",
            data.len(),
            dim);

        Self { dim, data }
    }


    pub fn dim(&self) -> (usize, usize, usize) {
        self.dim
    }


    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }


    pub fn data(&self) -> &[f64] {
        &self.data
    }


    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }


    /**
     * Return the component slice at index `(i, j)`.
     */
    pub fn slice(&self, i: usize, j: usize) -> &[f64] {
        let n = (i * self.dim.1 + j) * self.dim.2;
        &self.data[n..n + self.dim.2]
    }


    pub fn slice_mut(&mut self, i: usize, j: usize) -> &mut [f64] {
        let n = (i * self.dim.1 + j) * self.dim.2;
        &mut self.data[n..n + self.dim.2]
    }


    /**
     * Return a view of the whole array.
     */
    pub fn view(&self) -> ArrayView3 {
        ArrayView3 {
            dim: self.dim,
            stride_i: self.dim.1 * self.dim.2,
            stride_j: self.dim.2,
            data: &self.data,
        }
    }


    /**
     * Return a non-owning view of the sub-region covering the given index
     * ranges on the leading two axes.
     */
    pub fn select(&self, di: Range<usize>, dj: Range<usize>) -> ArrayView3 {
        self.view().select(di, dj)
    }


    /**
     * Serialize to bytes: the three dimensions as little-endian `u64`,
     * followed by the elements as little-endian `f64`.
     */
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(24 + self.data.len() * 8);
        bytes.extend_from_slice(&(self.dim.0 as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.dim.1 as u64).to_le_bytes());
        bytes.extend_from_slice(&(self.dim.2 as u64).to_le_bytes());
        for x in &self.data {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
        bytes
    }


    /**
     * Inverse of `to_bytes`. Fails if the buffer is truncated or its length
     * is inconsistent with the dimensions in the header.
     */
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, std::io::Error> {
        use std::io::{Error, ErrorKind};

        let invalid = || Error::new(ErrorKind::InvalidData, "malformed array file");

        if bytes.len() < 24 {
            return Err(invalid());
        }
        let word = |n: usize| {
            u64::from_le_bytes(bytes[n * 8..(n + 1) * 8].try_into().unwrap()) as usize
        };
        let dim = (word(0), word(1), word(2));

        if bytes.len() != 24 + dim.0 * dim.1 * dim.2 * 8 {
            return Err(invalid());
        }
        let data = bytes[24..]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok(Self { dim, data })
    }
}




impl core::ops::Index<(usize, usize, usize)> for Array3 {
    type Output = f64;
    fn index(&self, index: (usize, usize, usize)) -> &f64 {
        &self.data[(index.0 * self.dim.1 + index.1) * self.dim.2 + index.2]
    }
}

impl core::ops::IndexMut<(usize, usize, usize)> for Array3 {
    fn index_mut(&mut self, index: (usize, usize, usize)) -> &mut f64 {
        &mut self.data[(index.0 * self.dim.1 + index.1) * self.dim.2 + index.2]
    }
}




/**
 * A non-owning rectangular view into an `Array3`, restricted on the leading
 * two axes. Views share the base array's storage; element access goes through
 * the base strides.
 */
#[derive(Clone, Copy)]
pub struct ArrayView3<'a> {
    dim: (usize, usize, usize),
    stride_i: usize,
    stride_j: usize,
    data: &'a [f64],
}




// ============================================================================
impl<'a> ArrayView3<'a> {

    pub fn dim(&self) -> (usize, usize, usize) {
        self.dim
    }


    /**
     * Return the component slice at view-local index `(i, j)`.
     */
    pub fn slice(&self, i: usize, j: usize) -> &'a [f64] {
        let n = i * self.stride_i + j * self.stride_j;
        &self.data[n..n + self.dim.2]
    }


    /**
     * Narrow this view to the given index ranges, measured relative to the
     * view's own origin.
     */
    pub fn select(&self, di: Range<usize>, dj: Range<usize>) -> ArrayView3<'a> {
        assert!(
            di.end <= self.dim.0 && dj.end <= self.dim.1,
            "selection ({:?} {:?}) out of bounds on view of dim {:?}",
            di,
            dj,
            self.dim);

        ArrayView3 {
            dim: (di.end - di.start, dj.end - dj.start, self.dim.2),
            stride_i: self.stride_i,
            stride_j: self.stride_j,
            data: &self.data[di.start * self.stride_i + dj.start * self.stride_j..],
        }
    }


    /**
     * Copy this view into a newly owned array.
     */
    pub fn to_owned(&self) -> Array3 {
        map(*self, self.dim.2, |x, y| y.copy_from_slice(x))
    }
}




// ============================================================================
/**
 * The elementwise combinators below lift a function of per-cell component
 * slices to a function of whole arrays: they iterate the leading two axes of
 * their operands (which must agree there) and delegate to the scalar
 * function, writing `num_output` components per cell. Each call site
 * monomorphises its own loop; there is no dynamic dispatch.
 */
pub fn map<F>(a: ArrayView3, num_output: usize, mut f: F) -> Array3
where
    F: FnMut(&[f64], &mut [f64]),
{
    Array3::from_slice_function((a.dim.0, a.dim.1, num_output), |(i, j), out| {
        f(a.slice(i, j), out)
    })
}


pub fn try_map<F, E>(a: ArrayView3, num_output: usize, mut f: F) -> Result<Array3, E>
where
    F: FnMut(&[f64], &mut [f64]) -> Result<(), E>,
{
    let mut result = Array3::zeros((a.dim.0, a.dim.1, num_output));
    for i in 0..a.dim.0 {
        for j in 0..a.dim.1 {
            f(a.slice(i, j), result.slice_mut(i, j))?
        }
    }
    Ok(result)
}


pub fn zip<F>(a: ArrayView3, b: ArrayView3, num_output: usize, mut f: F) -> Array3
where
    F: FnMut(&[f64], &[f64], &mut [f64]),
{
    assert_same_extent(a.dim, b.dim);
    Array3::from_slice_function((a.dim.0, a.dim.1, num_output), |(i, j), out| {
        f(a.slice(i, j), b.slice(i, j), out)
    })
}


pub fn try_zip<F, E>(
    a: ArrayView3,
    b: ArrayView3,
    num_output: usize,
    mut f: F,
) -> Result<Array3, E>
where
    F: FnMut(&[f64], &[f64], &mut [f64]) -> Result<(), E>,
{
    assert_same_extent(a.dim, b.dim);
    let mut result = Array3::zeros((a.dim.0, a.dim.1, num_output));
    for i in 0..a.dim.0 {
        for j in 0..a.dim.1 {
            f(a.slice(i, j), b.slice(i, j), result.slice_mut(i, j))?
        }
    }
    Ok(result)
}


pub fn zip3<F>(
    a: ArrayView3,
    b: ArrayView3,
    c: ArrayView3,
    num_output: usize,
    mut f: F,
) -> Array3
where
    F: FnMut(&[f64], &[f64], &[f64], &mut [f64]),
{
    assert_same_extent(a.dim, b.dim);
    assert_same_extent(a.dim, c.dim);
    Array3::from_slice_function((a.dim.0, a.dim.1, num_output), |(i, j), out| {
        f(a.slice(i, j), b.slice(i, j), c.slice(i, j), out)
    })
}


fn assert_same_extent(a: (usize, usize, usize), b: (usize, usize, usize)) {
    assert!(
        a.0 == b.0 && a.1 == b.1,
        "operand extents disagree on the leading axes: {:?} vs {:?}",
        a,
        b);
}


/**
 * Concatenate arrays along axis 0. The trailing two dimensions of all parts
 * must agree.
 */
pub fn concat_axis0(parts: &[&Array3]) -> Array3 {
    let (_, nj, nk) = parts[0].dim();
    let ni = parts.iter().map(|p| p.dim().0).sum();
    let mut data = Vec::with_capacity(ni * nj * nk);

    for part in parts {
        assert!(
            part.dim().1 == nj && part.dim().2 == nk,
            "parts disagree on the trailing axes");
        data.extend_from_slice(part.data());
    }
    Array3::from_vec((ni, nj, nk), data)
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;


    #[test]
    fn indexing_is_row_major() {
        let mut a = Array3::zeros((2, 3, 2));
        a[(1, 2, 1)] = 9.0;
        assert_eq!(a.data()[1 * 3 * 2 + 2 * 2 + 1], 9.0);
        assert_eq!(a.slice(1, 2), &[0.0, 9.0]);
    }


    #[test]
    fn views_share_base_storage() {
        let a = Array3::from_slice_function((4, 4, 1), |(i, j), x| {
            x[0] = (i * 10 + j) as f64
        });
        let v = a.select(1..3, 2..4);
        assert_eq!(v.dim(), (2, 2, 1));
        assert_eq!(v.slice(0, 0), &[12.0]);
        assert_eq!(v.slice(1, 1), &[23.0]);

        let w = v.select(1..2, 0..2);
        assert_eq!(w.slice(0, 0), &[22.0]);
        assert_eq!(w.to_owned().data(), &[22.0, 23.0]);
    }


    #[test]
    fn zip_applies_the_scalar_function_per_cell() {
        let a = Array3::from_slice_function((2, 2, 2), |(i, j), x| {
            x[0] = i as f64;
            x[1] = j as f64;
        });
        let b = Array3::from_slice_function((2, 2, 1), |_, x| x[0] = 2.0);
        let c = zip(a.view(), b.view(), 1, |x, y, z| {
            z[0] = (x[0] + x[1]) * y[0]
        });
        assert_eq!(c[(1, 1, 0)], 4.0);
        assert_eq!(c[(0, 1, 0)], 2.0);
    }


    #[test]
    fn try_map_propagates_the_first_error() {
        let a = Array3::from_slice_function((2, 2, 1), |(i, j), x| {
            x[0] = if (i, j) == (1, 0) { -1.0 } else { 1.0 }
        });
        let result: Result<Array3, String> = try_map(a.view(), 1, |x, y| {
            if x[0] < 0.0 {
                Err("negative".to_string())
            } else {
                y[0] = x[0].sqrt();
                Ok(())
            }
        });
        assert!(result.is_err());
    }


    #[test]
    fn concatenation_stacks_along_axis_0() {
        let a = Array3::from_slice_function((2, 2, 1), |_, x| x[0] = 1.0);
        let b = Array3::from_slice_function((3, 2, 1), |_, x| x[0] = 2.0);
        let c = concat_axis0(&[&a, &b]);
        assert_eq!(c.dim(), (5, 2, 1));
        assert_eq!(c[(1, 1, 0)], 1.0);
        assert_eq!(c[(2, 0, 0)], 2.0);
    }


    #[test]
    fn byte_round_trip_is_exact() {
        let a = Array3::from_slice_function((3, 4, 5), |(i, j), x| {
            for (k, x) in x.iter_mut().enumerate() {
                *x = (i + j + k) as f64 / 7.0
            }
        });
        let b = Array3::from_bytes(&a.to_bytes()).unwrap();
        assert_eq!(a, b);
    }


    #[test]
    fn malformed_bytes_are_rejected() {
        let a = Array3::zeros((2, 2, 2));
        let mut bytes = a.to_bytes();
        bytes.pop();
        assert!(Array3::from_bytes(&bytes).is_err());
        assert!(Array3::from_bytes(&bytes[..12]).is_err());
    }
}
