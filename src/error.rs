//! Types for error handling go here.

use std::io::Error as IOError;

quick_error! {
    /// Error type for all error variants originated by this crate.
    #[derive(Debug)]
    pub enum FixelError {
        /// An invalid fixel container was read
        InvalidFormat {
            display("Invalid fixel image file")
        }
        /// The value type code in a fixel container header is not supported
        UnsupportedValueType(code: i16) {
            display("Unsupported fixel value type code {}", code)
        }
        /// A track file header could not be understood
        InvalidTrackFile(reason: String) {
            display("Invalid track file: {}", reason)
        }
        /// The track source declares no streamlines at all
        NoTracks {
            display("No tracks found in input file")
        }
        /// The template mask does not hold a single fixel
        EmptyTemplate {
            display("Template fixel mask contains no fixels")
        }
        /// Subject listing and design matrix disagree on the number of subjects
        SubjectCountMismatch(subjects: usize, rows: usize) {
            display("Number of subjects ({}) does not match number of rows in design matrix ({})",
                    subjects, rows)
        }
        /// The contrast matrix has more columns than the design matrix
        TooManyContrasts(contrast: usize, design: usize) {
            display("Too many contrasts for design matrix ({} columns, design has {})",
                    contrast, design)
        }
        /// A fixel image does not match the template's voxel grid
        DimensionMismatch(expected: [usize; 3], got: [usize; 3]) {
            display("Fixel image dimensions {:?} do not match template {:?}", got, expected)
        }
        /// Attempted to access a voxel outside of the grid
        OutOfBounds(voxel: [usize; 3]) {
            display("Out of bounds access to voxel {:?}", voxel)
        }
        /// A numeric text table could not be parsed
        MalformedMatrix(reason: String) {
            display("Malformed numeric table: {}", reason)
        }
        /// A configuration parameter lies outside its accepted range
        InvalidParameter(name: &'static str, value: f64) {
            display("Invalid value {} for parameter `{}`", value, name)
        }
        /// Permutation testing was requested with too few permutations
        InsufficientPermutations(n: usize) {
            display("At least 2 permutations are required for testing, got {}", n)
        }
        /// A dense linear algebra step failed
        LinearAlgebra(reason: &'static str) {
            display("Linear algebra failure: {}", reason)
        }
        /// A worker of the connectivity pipeline terminated abnormally
        PipelineFailure(stage: &'static str) {
            display("Connectivity pipeline stage `{}` terminated abnormally", stage)
        }
        /// I/O Error
        Io(err: IOError) {
            from()
            source(err)
            display("I/O error: {}", err)
        }
    }
}

/// Alias type for results originated from this crate.
pub type Result<T> = ::std::result::Result<T, FixelError>;
