//! End-to-end connectivity-based fixel enhancement analysis.

use crate::config::CfeConfig;
use crate::connectivity::{build_connectivity, normalise};
use crate::error::{FixelError, Result};
use crate::glm::{self, pad_contrast, GlmTTest};
use crate::image::FixelImage;
use crate::index::FixelIndex;
use crate::mapping::TrackMapper;
use crate::matrix_io::{load_matrix, save_vector};
use crate::output::write_fixel_output;
use crate::permutation::{generate_permutations, rng_from_config, run_permutations};
use crate::subject::{load_subjects, read_subject_list};
use crate::tfce::ConnectivityEnhancer;
use crate::tracks::{TckReader, TrackSource};
use log::info;
use std::path::PathBuf;

/// File extension of written fixel images.
pub const OUTPUT_EXTENSION: &str = "fxl";

/// Input files of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CfeInputs {
    /// Text file listing one subject fixel image per line
    pub subjects: PathBuf,
    /// Fixel mask defining the fixels of interest
    pub template: PathBuf,
    /// Design matrix, one row per subject
    pub design: PathBuf,
    /// Contrast matrix; its first row is tested
    pub contrast: PathBuf,
    /// Track file used to derive fixel connectivity
    pub tracks: PathBuf,
    /// Prefix of every output file name
    pub output_prefix: String,
}

impl CfeInputs {
    fn output(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}_{}", self.output_prefix, suffix))
    }

    fn image_output(&self, name: &str) -> PathBuf {
        self.output(&format!("{}.{}", name, OUTPUT_EXTENSION))
    }
}

/// Run the analysis, reading streamlines from the track file of `inputs`.
///
/// Returns the paths of every file written.
pub fn run_analysis(inputs: &CfeInputs, config: &CfeConfig) -> Result<Vec<PathBuf>> {
    let tracks = TckReader::open(&inputs.tracks)?;
    run_analysis_with_tracks(inputs, tracks, config)
}

/// Run the analysis with streamlines from an arbitrary source. The track file
/// named in `inputs` is ignored.
pub fn run_analysis_with_tracks<S>(inputs: &CfeInputs, tracks: S, config: &CfeConfig) -> Result<Vec<PathBuf>>
where
    S: TrackSource + Send,
{
    config.validate()?;

    let subjects = read_subject_list(&inputs.subjects)?;
    let design = load_matrix(&inputs.design)?;
    if subjects.len() != design.nrows() {
        return Err(FixelError::SubjectCountMismatch(subjects.len(), design.nrows()));
    }
    let contrast_table = load_matrix(&inputs.contrast)?;
    if contrast_table.ncols() > design.ncols() {
        return Err(FixelError::TooManyContrasts(contrast_table.ncols(), design.ncols()));
    }
    let contrast_row: Vec<f64> = contrast_table.row(0).iter().copied().collect();
    let contrast = pad_contrast(&contrast_row, design.ncols())?;

    let template = FixelImage::from_file(&inputs.template)?;
    let index = FixelIndex::new(&template)?;

    let mapper = TrackMapper::new(template.dim(), template.pixdim(), template.affine())?;
    let raw = build_connectivity(tracks, &mapper, &index, config)?;
    let (connectivity, weights) = normalise(&raw, index.positions(), config);
    drop(raw);

    let data = load_subjects(&subjects, &template, &index, &weights, config)?;
    let data = data.map(f64::from);
    info!("{} subjects loaded", subjects.len());

    let mut written = Vec::new();
    let mut write = |path: PathBuf, values: &[f32]| -> Result<()> {
        write_fixel_output(&path, values, &template, &index)?;
        written.push(path);
        Ok(())
    };

    let betas = glm::solve_betas(&data, &design)?;
    for (i, column) in betas.column_iter().enumerate() {
        write(inputs.image_output(&format!("beta{}", i)), &to_f32(column.iter())[..])?;
    }
    let abs_effect = glm::abs_effect_size(&data, &design, &contrast)?;
    write(inputs.image_output("abs_effect"), &to_f32(abs_effect.iter())[..])?;
    let std_effect = glm::std_effect_size(&data, &design, &contrast)?;
    write(inputs.image_output("std_effect"), &to_f32(std_effect.iter())[..])?;
    let std_dev = glm::stdev(&data, &design)?;
    write(inputs.image_output("std_dev"), &to_f32(std_dev.iter())[..])?;

    if config.get_notest() {
        info!("permutation testing skipped");
        return Ok(written);
    }

    let num_subjects = design.nrows();
    let test = GlmTTest::new(data, design, contrast)?;
    let enhancer = ConnectivityEnhancer::from_config(&connectivity, config);
    let perms = generate_permutations(config.get_num_perms(), num_subjects, &mut rng_from_config(config));
    let results = run_permutations(&test, &enhancer, &perms)?;

    write(inputs.image_output("tfce_pos"), &results.tfce_pos[..])?;
    write(inputs.image_output("tfce_neg"), &results.tfce_neg[..])?;
    write(inputs.image_output("tvalue"), &results.tvalues[..])?;
    write(inputs.image_output("pvalue_pos"), &results.pvalues_pos()[..])?;
    write(inputs.image_output("pvalue_neg"), &results.pvalues_neg()[..])?;

    for (name, dist) in &[
        ("perm_dist_pos.txt", &results.perm_dist_pos),
        ("perm_dist_neg.txt", &results.perm_dist_neg),
    ] {
        let path = inputs.output(name);
        save_vector(&path, dist)?;
        written.push(path);
    }
    Ok(written)
}

fn to_f32<'a, I: Iterator<Item = &'a f64>>(values: I) -> Vec<f32> {
    values.map(|&v| v as f32).collect()
}

