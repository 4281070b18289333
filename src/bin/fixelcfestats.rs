//! Fixel-based analysis using connectivity-based fixel enhancement and
//! non-parametric permutation testing.

use clap::Parser;
use fixelcfe::{run_analysis, CfeConfig, CfeInputs};
use log::error;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "fixelcfestats",
    about = "Statistical analysis of fixel-specific measures using fixel-based connectivity enhancement and non-parametric permutation testing."
)]
struct Args {
    /// Text file listing one input fixel image per line, relative to the file's directory
    input: PathBuf,

    /// Template fixel mask defining the fixels of interest
    template: PathBuf,

    /// Design matrix (one row per subject)
    design: PathBuf,

    /// Contrast matrix; its first row is tested
    contrast: PathBuf,

    /// Tracks used to determine fixel-fixel connectivity
    tracks: PathBuf,

    /// Prefix of all output file names
    output: String,

    /// Only output population statistics (effect size, stdev etc), skip permutation testing
    #[arg(long)]
    notest: bool,

    /// Number of permutations
    #[arg(long, default_value_t = 5000)]
    nperms: usize,

    /// Height increment used in the TFCE integration
    #[arg(long, default_value_t = 0.1)]
    dh: f32,

    /// TFCE extent exponent
    #[arg(long = "tfce-e", default_value_t = 2.0)]
    tfce_e: f32,

    /// TFCE height exponent
    #[arg(long = "tfce-h", default_value_t = 1.0)]
    tfce_h: f32,

    /// TFCE connectivity exponent
    #[arg(long = "tfce-c", default_value_t = 0.5)]
    tfce_c: f32,

    /// Maximum angle (degrees) between corresponding fixels
    #[arg(long, default_value_t = 30.0)]
    angle: f32,

    /// Fraction of shared connections required to include a fixel in the neighbourhood
    #[arg(long, default_value_t = 0.01)]
    connectivity: f32,

    /// FWHM (mm) of the connectivity-weighted smoothing kernel, 0 to disable
    #[arg(long, default_value_t = 10.0)]
    smooth: f32,

    /// Random seed, for reproducible permutations
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn config(&self) -> CfeConfig {
        let config = CfeConfig::default()
            .num_perms(self.nperms)
            .dh(self.dh)
            .tfce_e(self.tfce_e)
            .tfce_h(self.tfce_h)
            .tfce_c(self.tfce_c)
            .angle(self.angle)
            .connectivity_threshold(self.connectivity)
            .smooth_fwhm(self.smooth)
            .notest(self.notest);
        match self.seed {
            Some(seed) => config.seed(seed),
            None => config,
        }
    }

    fn inputs(&self) -> CfeInputs {
        CfeInputs {
            subjects: self.input.clone(),
            template: self.template.clone(),
            design: self.design.clone(),
            contrast: self.contrast.clone(),
            tracks: self.tracks.clone(),
            output_prefix: self.output.clone(),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run_analysis(&args.inputs(), &args.config()) {
        Ok(written) => log::info!("{} output files written", written.len()),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
