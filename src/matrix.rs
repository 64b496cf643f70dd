use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::sync::{PoisonError, RwLock};

/// Parameter matrix shared by the training workers. Each row sits behind its own
/// lock, so workers only contend when they touch the same term or document, and
/// no method ever holds more than one row lock at a time.
pub struct SharedMatrix {
    dim: usize,
    rows: Vec<RwLock<Array1<f32>>>,
}

impl SharedMatrix {

    pub fn from_array(w: Array2<f32>) -> SharedMatrix {
        let dim = w.ncols();
        let rows = w.axis_iter(Axis(0)).map(|row| RwLock::new(row.to_owned())).collect();
        SharedMatrix { dim, rows }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, i: usize) -> Array1<f32> {
        self.rows[i].read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// acc += row[i]
    pub fn add_row_into(&self, i: usize, acc: &mut Array1<f32>) {
        *acc += &*self.rows[i].read().unwrap_or_else(PoisonError::into_inner);
    }

    /// row[i] += alpha * v
    pub fn scaled_add(&self, i: usize, alpha: f32, v: &ArrayView1<f32>) {
        self.rows[i].write().unwrap_or_else(PoisonError::into_inner).scaled_add(alpha, v);
    }

    pub fn set_row(&self, i: usize, v: &ArrayView1<f32>) {
        self.rows[i].write().unwrap_or_else(PoisonError::into_inner).assign(v);
    }

    pub fn to_array(&self) -> Array2<f32> {
        let mut w = Array2::zeros((self.nrows(), self.dim));
        for (i, mut row) in w.axis_iter_mut(Axis(0)).enumerate() {
            row.assign(&*self.rows[i].read().unwrap_or_else(PoisonError::into_inner));
        }
        w
    }

    pub fn into_array(self) -> Array2<f32> {
        let mut w = Array2::zeros((self.rows.len(), self.dim));
        for (mut dst, src) in w.axis_iter_mut(Axis(0)).zip(self.rows) {
            dst.assign(&src.into_inner().unwrap_or_else(PoisonError::into_inner));
        }
        w
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;
    use rayon::prelude::*;

    #[test]
    fn row_updates_stay_in_their_row() {
        let m = SharedMatrix::from_array(Array2::zeros((3, 2)));
        m.scaled_add(1, 2.0, &array![1.0, -1.0].view());
        assert_eq!(m.to_array(), array![[0.0, 0.0], [2.0, -2.0], [0.0, 0.0]]);
        assert_eq!(m.row(1).dot(&array![1.0, 1.0]), 0.0);
    }

    #[test]
    fn concurrent_disjoint_rows_do_not_conflict() {
        let m = SharedMatrix::from_array(Array2::zeros((64, 4)));
        let ones = Array1::<f32>::ones(4);
        (0..64usize).into_par_iter().for_each(|i| {
            for _ in 0..100 {
                m.scaled_add(i, 1.0, &ones.view());
            }
        });
        let w = m.into_array();
        assert!(w.iter().all(|x| *x == 100.0));
    }

    #[test]
    fn round_trips_through_array() {
        let w = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let m = SharedMatrix::from_array(w.clone());
        assert_eq!(m.row(1), array![4.0, 5.0, 6.0]);
        m.set_row(0, &array![0.0, 0.0, 0.0].view());
        assert_eq!(m.into_array(), array![[0.0, 0.0, 0.0], [4.0, 5.0, 6.0]]);
    }
}
