mod util;

use approx::assert_abs_diff_eq;
use fixelcfe::matrix_io::load_matrix;
use fixelcfe::tracks::write_tck;
use fixelcfe::{run_analysis, run_analysis_with_tracks, CfeConfig, FixelError, FixelImage, VecTrackSource};
use std::fs;
use tempfile::tempdir;
use util::{expected_outputs, fixel_values, subject_image, write_study, x_fixel, NUM_VOXELS};

const GROUP_SIZE: usize = 4;

#[test]
fn population_statistics_only() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 50);
    let config = CfeConfig::default().num_perms(1).notest(true);

    let written = run_analysis(&inputs, &config).unwrap();
    assert_eq!(written, expected_outputs(&inputs, 2, true));
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }
    assert!(!dir.path().join("out_tvalue.fxl").exists());

    let abs_effect = fixel_values(&FixelImage::from_file(dir.path().join("out_abs_effect.fxl")).unwrap());
    let beta0 = fixel_values(&FixelImage::from_file(dir.path().join("out_beta0.fxl")).unwrap());
    assert_eq!(abs_effect.len(), 2 * NUM_VOXELS);
    for v in 0..NUM_VOXELS {
        let x = x_fixel(v);
        // group difference on x fixels only
        assert_abs_diff_eq!(abs_effect[x], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(abs_effect[x + 1], 0.0, epsilon = 1e-3);
        // first group mean of 1 + (0 + 0.1 + 0.2 + 0.3) / 4
        assert_abs_diff_eq!(beta0[x], 1.15, epsilon = 1e-3);
    }
}

#[test]
fn permutation_testing() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 50);
    let num_perms = 20;
    let config = CfeConfig::default().num_perms(num_perms).seed(11);

    let written = run_analysis(&inputs, &config).unwrap();
    assert_eq!(written, expected_outputs(&inputs, 2, false));

    for name in &["out_perm_dist_pos.txt", "out_perm_dist_neg.txt"] {
        let dist = load_matrix(dir.path().join(name)).unwrap();
        assert_eq!(dist.len(), num_perms - 1);
    }

    let read = |name: &str| fixel_values(&FixelImage::from_file(dir.path().join(name)).unwrap());
    let tvalue = read("out_tvalue.fxl");
    let tfce_pos = read("out_tfce_pos.fxl");
    let tfce_neg = read("out_tfce_neg.fxl");
    let pvalue_pos = read("out_pvalue_pos.fxl");
    let pvalue_neg = read("out_pvalue_neg.fxl");
    for p in pvalue_pos.iter().chain(&pvalue_neg) {
        assert!(*p >= 1.0 / num_perms as f32 - 1e-6 && *p <= 1.0);
    }
    for v in 0..NUM_VOXELS {
        let x = x_fixel(v);
        assert!(tvalue[x] > 5.0);
        assert!(tfce_pos[x] > 0.0);
        assert_eq!(tfce_neg[x], 0.0);
        assert!(pvalue_pos[x] < pvalue_pos[x + 1]);
        assert_eq!(pvalue_neg[x], 1.0);
    }
}

#[test]
fn reproducible_with_seed() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 20);
    let config = CfeConfig::default().num_perms(10).seed(5);
    let _ = run_analysis(&inputs, &config).unwrap();
    let first = fs::read(dir.path().join("out_perm_dist_pos.txt")).unwrap();
    let _ = run_analysis(&inputs, &config).unwrap();
    let second = fs::read(dir.path().join("out_perm_dist_pos.txt")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn subject_count_must_match_design() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 10);
    fs::write(&inputs.design, "1 0\n1 0\n0 1\n").unwrap();
    match run_analysis(&inputs, &CfeConfig::default().notest(true)) {
        Err(FixelError::SubjectCountMismatch(8, 3)) => {}
        e => panic!("unexpected result {:?}", e),
    }
}

#[test]
fn contrast_wider_than_design() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 10);
    fs::write(&inputs.contrast, "-1 1 0\n").unwrap();
    match run_analysis(&inputs, &CfeConfig::default().notest(true)) {
        Err(FixelError::TooManyContrasts(3, 2)) => {}
        e => panic!("unexpected result {:?}", e),
    }
}

#[test]
fn short_contrast_is_padded() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 10);
    fs::write(&inputs.contrast, "1\n").unwrap();
    let _ = run_analysis(&inputs, &CfeConfig::default().notest(true)).unwrap();
    let abs_effect = fixel_values(&FixelImage::from_file(dir.path().join("out_abs_effect.fxl")).unwrap());
    assert_abs_diff_eq!(abs_effect[x_fixel(0)], 1.15, epsilon = 1e-3);
}

#[test]
fn empty_track_file_is_fatal() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 10);
    write_tck(&inputs.tracks, &[]).unwrap();
    match run_analysis(&inputs, &CfeConfig::default().notest(true)) {
        Err(FixelError::NoTracks) => {}
        e => panic!("unexpected result {:?}", e),
    }
}

#[test]
fn subject_on_another_grid_is_fatal() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 10);
    let mut other = FixelImage::with_spacing([NUM_VOXELS, 2, 1], [2.0; 3]);
    for f in subject_image(0, GROUP_SIZE).voxel([0, 0, 0]) {
        other.push_fixel([0, 0, 0], *f).unwrap();
    }
    fixelcfe::WriterOptions::new(dir.path().join("subjects/s0.fxl"))
        .write_fixel_image(&other)
        .unwrap();
    match run_analysis(&inputs, &CfeConfig::default().notest(true)) {
        Err(FixelError::DimensionMismatch(_, _)) => {}
        e => panic!("unexpected result {:?}", e),
    }
}

#[test]
fn invalid_configuration_is_rejected() {
    let dir = tempdir().unwrap();
    let inputs = write_study(dir.path(), GROUP_SIZE, 10);
    let source = VecTrackSource::new(vec![]);
    match run_analysis_with_tracks(&inputs, source, &CfeConfig::default().angle(120.0)) {
        Err(FixelError::InvalidParameter("angle", _)) => {}
        e => panic!("unexpected result {:?}", e),
    }
}
