use fixelcfe::tracks::write_tck;
use fixelcfe::{CfeInputs, FixelImage, FixelIndex, FixelMetric, WriterOptions};
use nalgebra::Vector3;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of voxels of the synthetic template, all along x.
pub const NUM_VOXELS: usize = 6;

/// A row of voxels, each holding an x fixel then a y fixel.
pub fn template() -> FixelImage {
    let mut img = FixelImage::with_spacing([NUM_VOXELS, 1, 1], [2.0; 3]);
    for x in 0..NUM_VOXELS {
        img.push_fixel([x, 0, 0], FixelMetric::new(Vector3::x(), 1.0)).unwrap();
        img.push_fixel([x, 0, 0], FixelMetric::new(Vector3::y(), 1.0)).unwrap();
    }
    img
}

/// Subject image for subject `s` of a two-group study with `group_size`
/// subjects per group. The x fixels of the second group are larger by 1,
/// the y fixels do not differ between groups.
///
/// Fixels are stored in reverse order and with flipped directions, so that
/// values can only be recovered by matching directions.
pub fn subject_image(s: usize, group_size: usize) -> FixelImage {
    let tpl = template();
    let mut img = FixelImage::empty_like(&tpl);
    let within = (s % group_size) as f32 * 0.1;
    let group = if s < group_size { 1.0 } else { 2.0 };
    for x in 0..NUM_VOXELS {
        img.push_fixel([x, 0, 0], FixelMetric::new(-Vector3::y(), 0.5 + within))
            .unwrap();
        img.push_fixel([x, 0, 0], FixelMetric::new(Vector3::new(-0.99, 0.02, 0.0), group + within))
            .unwrap();
    }
    img
}

/// Per-fixel values of an image on the template grid, in fixel index order.
#[allow(dead_code)]
pub fn fixel_values(img: &FixelImage) -> Vec<f32> {
    img.iter_voxels()
        .flat_map(|(_, fixels)| fixels.iter().map(|f| f.value))
        .collect()
}

/// Index of the x fixel of a voxel of the template.
#[allow(dead_code)]
pub fn x_fixel(voxel: usize) -> usize {
    let index = FixelIndex::new(&template()).unwrap();
    index.fixels_in([voxel, 0, 0]).unwrap().start
}

/// Write a complete two-group study to `dir`, returning its inputs.
#[allow(dead_code)]
pub fn write_study(dir: &Path, group_size: usize, num_tracks: usize) -> CfeInputs {
    let tpl = template();
    WriterOptions::new(dir.join("template.fxl")).write_fixel_image(&tpl).unwrap();

    fs::create_dir_all(dir.join("subjects")).unwrap();
    let mut listing = String::new();
    let mut design = String::new();
    for s in 0..2 * group_size {
        let name = if s % 2 == 0 {
            format!("subjects/s{}.fxl", s)
        } else {
            format!("subjects/s{}.fxl.gz", s)
        };
        WriterOptions::new(dir.join(&name))
            .write_fixel_image(&subject_image(s, group_size))
            .unwrap();
        listing.push_str(&name);
        listing.push('\n');
        design.push_str(if s < group_size { "1 0\n" } else { "0 1\n" });
    }
    fs::write(dir.join("subjects.txt"), listing).unwrap();
    fs::write(dir.join("design.txt"), design).unwrap();
    fs::write(dir.join("contrast.txt"), "-1 1\n").unwrap();

    let start = tpl.voxel_to_scanner([0, 0, 0]);
    let end = tpl.voxel_to_scanner([NUM_VOXELS - 1, 0, 0]);
    let tracks: Vec<_> = (0..num_tracks).map(|_| vec![start, end]).collect();
    write_tck(dir.join("tracks.tck"), &tracks).unwrap();

    CfeInputs {
        subjects: dir.join("subjects.txt"),
        template: dir.join("template.fxl"),
        design: dir.join("design.txt"),
        contrast: dir.join("contrast.txt"),
        tracks: dir.join("tracks.tck"),
        output_prefix: dir.join("out").to_string_lossy().into_owned(),
    }
}

/// Paths of the files an analysis writes, in writing order.
#[allow(dead_code)]
pub fn expected_outputs(inputs: &CfeInputs, num_design_cols: usize, notest: bool) -> Vec<PathBuf> {
    let mut names: Vec<String> = (0..num_design_cols).map(|i| format!("beta{}.fxl", i)).collect();
    let mut extra = vec!["abs_effect.fxl", "std_effect.fxl", "std_dev.fxl"];
    if !notest {
        extra.extend(&[
            "tfce_pos.fxl",
            "tfce_neg.fxl",
            "tvalue.fxl",
            "pvalue_pos.fxl",
            "pvalue_neg.fxl",
            "perm_dist_pos.txt",
            "perm_dist_neg.txt",
        ]);
    }
    names.extend(extra.iter().map(|s| s.to_string()));
    names
        .iter()
        .map(|n| PathBuf::from(format!("{}_{}", inputs.output_prefix, n)))
        .collect()
}
