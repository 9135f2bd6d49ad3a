//! Subcommands of the `payslip` binary.

pub mod analyze;
pub mod batch;
pub mod config;
pub mod process;
pub mod text;

use payslip_core::Purpose;

/// Purpose of an extraction as given on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PurposeArg {
    /// Every field plus validated totals
    Full,
    /// First page only
    Preview,
    /// Personal, tax and banking fields only
    Metadata,
}

impl From<PurposeArg> for Purpose {
    fn from(arg: PurposeArg) -> Self {
        match arg {
            PurposeArg::Full => Purpose::FullExtraction,
            PurposeArg::Preview => Purpose::Preview,
            PurposeArg::Metadata => Purpose::MetadataOnly,
        }
    }
}
