use std::{collections::HashSet, ops::Range};

use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};
use thiserror::Error;

use crate::{Hypothesis, StateVariable, Variable, VariableKind};

/// Errors detected while resolving a layout.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("variable names must not be empty")]
    EmptyName,

    #[error("variable `{0}` is declared more than once")]
    Duplicate(String),

    #[error("variable `{0}` has an array size of zero")]
    EmptyArray(String),

    #[error("normalization factor of `{0}` must be finite and positive")]
    Normalization(String),

    #[error("bounds of `{0}` are not ordered or not finite")]
    Bounds(String),
}

/// The position of one variable inside a flat buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    name: String,
    kind: VariableKind,
    array_size: usize,
    component_size: usize,
    offset: usize,
}

impl Slot {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    #[must_use]
    pub fn array_size(&self) -> usize {
        self.array_size
    }

    /// Number of components of a single array element.
    #[must_use]
    pub fn component_size(&self) -> usize {
        self.component_size
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total number of components, all array elements included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.component_size * self.array_size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }
}

/// An offset table mapping named variables onto one flat numeric buffer.
///
/// Variables are laid out in declaration order, array elements contiguous,
/// so the offsets partition `[0, len)` with no gaps or overlaps and stay
/// stable for a given variable list and hypothesis.
///
/// Lookups by name panic on unknown names: a wrong name is a configuration
/// defect, not a runtime condition. Use [`Layout::try_range`] to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    hypothesis: Hypothesis,
    slots: Vec<Slot>,
    len: usize,
}

impl Layout {
    /// Resolves the layout of plain variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty or duplicated, or if an array size
    /// is zero.
    pub fn new<'a, I>(hypothesis: Hypothesis, variables: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        let mut seen = HashSet::new();
        let mut slots = Vec::new();
        let mut offset = 0;

        for variable in variables {
            let name = variable.name();
            if name.is_empty() {
                return Err(LayoutError::EmptyName);
            }
            if !seen.insert(name.to_owned()) {
                return Err(LayoutError::Duplicate(name.to_owned()));
            }
            if variable.array_size() == 0 {
                return Err(LayoutError::EmptyArray(name.to_owned()));
            }

            let slot = Slot {
                name: name.to_owned(),
                kind: variable.kind(),
                array_size: variable.array_size(),
                component_size: variable.kind().size(hypothesis),
                offset,
            };
            offset += slot.len();
            slots.push(slot);
        }

        Ok(Self {
            hypothesis,
            slots,
            len: offset,
        })
    }

    /// Resolves the layout of the unknowns.
    ///
    /// # Errors
    ///
    /// In addition to the checks of [`Layout::new`], returns an error if a
    /// normalization factor is not finite and positive or if bounds are not
    /// finite and ordered.
    pub fn for_state(
        hypothesis: Hypothesis,
        variables: &[StateVariable],
    ) -> Result<Self, LayoutError> {
        for variable in variables {
            let f = variable.normalization();
            if !f.is_finite() || f <= 0.0 {
                return Err(LayoutError::Normalization(variable.name().to_owned()));
            }

            let bounds = variable.bounds();
            let finite = bounds.lower.is_none_or(f64::is_finite)
                && bounds.upper.is_none_or(f64::is_finite);
            let ordered = match (bounds.lower, bounds.upper) {
                (Some(lower), Some(upper)) => lower <= upper,
                _ => true,
            };
            if !finite || !ordered {
                return Err(LayoutError::Bounds(variable.name().to_owned()));
            }
        }

        Self::new(hypothesis, variables.iter().map(StateVariable::variable))
    }

    #[must_use]
    pub fn hypothesis(&self) -> Hypothesis {
        self.hypothesis
    }

    /// Total number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    /// Returns the index range of a variable, or `None` if it is unknown.
    #[must_use]
    pub fn try_range(&self, name: &str) -> Option<Range<usize>> {
        self.slot(name).map(Slot::range)
    }

    /// Returns the index range of a variable.
    ///
    /// # Panics
    ///
    /// Panics if no variable is named `name`.
    #[must_use]
    pub fn range(&self, name: &str) -> Range<usize> {
        self.expect_slot(name).range()
    }

    /// Returns the index range of one array element of a variable.
    ///
    /// # Panics
    ///
    /// Panics if no variable is named `name` or if `index` is out of range.
    #[must_use]
    pub fn element_range(&self, name: &str, index: usize) -> Range<usize> {
        let slot = self.expect_slot(name);
        assert!(
            index < slot.array_size,
            "element {index} of `{name}` is out of range (array size {})",
            slot.array_size
        );
        let start = slot.offset + index * slot.component_size;
        start..start + slot.component_size
    }

    /// Returns the sub-vector of `buffer` holding `name`.
    ///
    /// # Panics
    ///
    /// Panics if no variable is named `name` or if `buffer` is too short.
    #[must_use]
    pub fn view<'b>(&self, buffer: &'b DVector<f64>, name: &str) -> DVectorView<'b, f64> {
        let range = self.range(name);
        buffer.rows(range.start, range.len())
    }

    /// Returns the mutable sub-vector of `buffer` holding `name`.
    ///
    /// # Panics
    ///
    /// Panics if no variable is named `name` or if `buffer` is too short.
    #[must_use]
    pub fn view_mut<'b>(&self, buffer: &'b mut DVector<f64>, name: &str) -> DVectorViewMut<'b, f64> {
        let range = self.range(name);
        buffer.rows_mut(range.start, range.len())
    }

    /// Returns the block of `matrix` at rows of `row` and columns of `col`.
    ///
    /// # Panics
    ///
    /// Panics if either name is unknown or if `matrix` is too small.
    #[must_use]
    pub fn block<'b>(&self, matrix: &'b DMatrix<f64>, row: &str, col: &str) -> DMatrixView<'b, f64> {
        let rows = self.range(row);
        let cols = self.range(col);
        matrix.view((rows.start, cols.start), (rows.len(), cols.len()))
    }

    /// Returns the mutable block of `matrix` at rows of `row` and columns of `col`.
    ///
    /// # Panics
    ///
    /// Panics if either name is unknown or if `matrix` is too small.
    #[must_use]
    pub fn block_mut<'b>(
        &self,
        matrix: &'b mut DMatrix<f64>,
        row: &str,
        col: &str,
    ) -> DMatrixViewMut<'b, f64> {
        let rows = self.range(row);
        let cols = self.range(col);
        matrix.view_mut((rows.start, cols.start), (rows.len(), cols.len()))
    }

    fn expect_slot(&self, name: &str) -> &Slot {
        match self.slot(name) {
            Some(slot) => slot,
            None => panic!("no variable named `{name}` in layout"),
        }
    }
}
