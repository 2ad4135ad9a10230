use std::sync::Arc;

use nalgebra::{DMatrix, DMatrixView};

use crate::Layout;

/// Columns of the inverse of a converged Jacobian, in physical units.
///
/// For each extracted variable `k`, the stored matrix has one row per
/// unknown and one column per component of `k`. Its block at the rows of
/// `y` is `∂Δy / ∂R_k`: how the increment of `y` responds to a perturbation
/// of the residual equations of `k`. Tangent operators are assembled from
/// these blocks, typically when a driving variable enters the residual of
/// `k` linearly.
#[derive(Debug, Clone)]
pub struct Sensitivities {
    layout: Arc<Layout>,
    columns: Vec<(String, DMatrix<f64>)>,
}

impl Sensitivities {
    #[must_use]
    pub fn new(layout: Arc<Layout>) -> Self {
        Self {
            layout,
            columns: Vec::new(),
        }
    }

    /// Stores the columns extracted for `variable`.
    ///
    /// # Panics
    ///
    /// Panics if `variable` is unknown or if `columns` is not
    /// `len × size(variable)`.
    pub fn insert(&mut self, variable: &str, columns: DMatrix<f64>) {
        let range = self.layout.range(variable);
        assert_eq!(columns.shape(), (self.layout.len(), range.len()));
        self.columns.retain(|(name, _)| name != variable);
        self.columns.push((variable.to_owned(), columns));
    }

    /// Returns `∂Δrow / ∂R_col`, or `None` if `col` was not extracted.
    ///
    /// # Panics
    ///
    /// Panics if `row` is unknown.
    #[must_use]
    pub fn block(&self, row: &str, col: &str) -> Option<DMatrixView<'_, f64>> {
        let rows = self.layout.range(row);
        self.columns(col)
            .map(|columns| columns.view((rows.start, 0), (rows.len(), columns.ncols())))
    }

    /// Returns every extracted column for `col`.
    #[must_use]
    pub fn columns(&self, col: &str) -> Option<&DMatrix<f64>> {
        self.columns
            .iter()
            .find(|(name, _)| name == col)
            .map(|(_, columns)| columns)
    }

    /// Names of the extracted variables, in extraction order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}
