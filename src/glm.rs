//! Ordinary least squares general linear model.
//!
//! Data matrices hold one row per fixel and one column per subject. The design
//! matrix holds one row per subject. Computations are carried out in double
//! precision.

use crate::error::{FixelError, Result};
use nalgebra::{DMatrix, DVector};

const PINV_EPS: f64 = 1e-10;

fn pinv(design: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    design
        .clone()
        .pseudo_inverse(PINV_EPS)
        .map_err(FixelError::LinearAlgebra)
}

fn residual_dof(design: &DMatrix<f64>) -> usize {
    design.nrows().saturating_sub(design.rank(PINV_EPS))
}

fn check_shapes(data: &DMatrix<f64>, design: &DMatrix<f64>) -> Result<()> {
    if data.ncols() != design.nrows() {
        return Err(FixelError::SubjectCountMismatch(data.ncols(), design.nrows()));
    }
    Ok(())
}

/// Pad a contrast row with zeros up to `num_cols`, rejecting wider contrasts.
pub fn pad_contrast(contrast: &[f64], num_cols: usize) -> Result<DVector<f64>> {
    if contrast.len() > num_cols {
        return Err(FixelError::TooManyContrasts(contrast.len(), num_cols));
    }
    let mut c = DVector::zeros(num_cols);
    for (i, v) in contrast.iter().enumerate() {
        c[i] = *v;
    }
    Ok(c)
}

/// Least squares fit of every fixel: one row of betas per fixel, one column
/// per design column.
pub fn solve_betas(data: &DMatrix<f64>, design: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_shapes(data, design)?;
    Ok(data * pinv(design)?.transpose())
}

/// Contrast of the betas of every fixel.
pub fn abs_effect_size(data: &DMatrix<f64>, design: &DMatrix<f64>, contrast: &DVector<f64>) -> Result<DVector<f64>> {
    Ok(solve_betas(data, design)? * contrast)
}

/// Residual standard deviation of every fixel.
///
/// The residual degrees of freedom are the number of subjects minus the rank
/// of the design. Without any residual degree of freedom the deviation is 0.
pub fn stdev(data: &DMatrix<f64>, design: &DMatrix<f64>) -> Result<DVector<f64>> {
    let betas = solve_betas(data, design)?;
    Ok(residual_stdev(data, design, &betas, residual_dof(design)))
}

fn residual_stdev(data: &DMatrix<f64>, design: &DMatrix<f64>, betas: &DMatrix<f64>, dof: usize) -> DVector<f64> {
    if dof == 0 {
        return DVector::zeros(data.nrows());
    }
    let residuals = data - betas * design.transpose();
    DVector::from_iterator(
        data.nrows(),
        residuals.row_iter().map(|r| (r.norm_squared() / dof as f64).sqrt()),
    )
}

/// Effect size in units of the residual standard deviation. Fixels with a
/// null deviation get 0.
pub fn std_effect_size(data: &DMatrix<f64>, design: &DMatrix<f64>, contrast: &DVector<f64>) -> Result<DVector<f64>> {
    let effect = abs_effect_size(data, design, contrast)?;
    let sd = stdev(data, design)?;
    Ok(effect.zip_map(&sd, |e, s| if s > 0.0 { e / s } else { 0.0 }))
}

/// Per-fixel t statistics of a contrast under relabelings of the subjects.
#[derive(Debug, Clone)]
pub struct GlmTTest {
    data: DMatrix<f64>,
    design: DMatrix<f64>,
    contrast: DVector<f64>,
    dof: usize,
}

impl GlmTTest {
    /// Set up the test. `contrast` must have one entry per design column.
    pub fn new(data: DMatrix<f64>, design: DMatrix<f64>, contrast: DVector<f64>) -> Result<Self> {
        check_shapes(&data, &design)?;
        if contrast.len() != design.ncols() {
            return Err(FixelError::TooManyContrasts(contrast.len(), design.ncols()));
        }
        let dof = residual_dof(&design);
        Ok(GlmTTest {
            data,
            design,
            contrast,
            dof,
        })
    }

    /// Number of subjects.
    pub fn num_subjects(&self) -> usize {
        self.design.nrows()
    }

    /// Number of fixels.
    pub fn num_fixels(&self) -> usize {
        self.data.nrows()
    }

    /// Compute the t statistic of every fixel, with row `i` of the design
    /// replaced by row `perm[i]`.
    ///
    /// A fixel with a null standard error gets a t statistic of 0.
    pub fn tvalues(&self, perm: &[usize]) -> Result<Vec<f32>> {
        if perm.len() != self.num_subjects() {
            return Err(FixelError::SubjectCountMismatch(perm.len(), self.num_subjects()));
        }
        let design = self.design.select_rows(perm);
        let pinv = pinv(&design)?;
        let betas = &self.data * pinv.transpose();
        let effect = &betas * &self.contrast;
        let sd = residual_stdev(&self.data, &design, &betas, self.dof);
        // c (X'X)^+ c' == |pinv(X)' c|^2
        let scale = (pinv.transpose() * &self.contrast).norm();

        Ok(effect
            .iter()
            .zip(sd.iter())
            .map(|(&e, &s)| {
                let se = s * scale;
                if se > 0.0 {
                    (e / se) as f32
                } else {
                    0.0
                }
            })
            .collect())
    }
}
