//! Helpers to parse CLI arguments in the accompanying
//! binaries.
//!
//! APIs here shouldn't be considered stable / used as a
//! library.

use std::fs::File;

use anyhow::{Context, Result};
pub use clap::{App, Arg};
use indicatif::{ProgressBar, ProgressStyle};
pub use inflector::Inflector;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{read_thermogram, Thermogram, WindowSpec};

#[macro_export]
macro_rules! args_parser {
    ($name:expr) => {{
        $crate::cli::App::new($name)
            .version(clap::crate_version!())
            .author(clap::crate_authors!())
    }};
}

#[macro_export]
macro_rules! arg {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name).value_name(&$name.to_screaming_snake_case())
    }};
}

#[macro_export]
macro_rules! opt {
    ($name:expr) => {{
        use $crate::cli::Inflector;
        $crate::cli::Arg::with_name($name)
            .long(&$name.to_kebab_case())
            .value_name(&$name.to_screaming_snake_case())
    }};
}

/// A recording loaded from disk, tagged with its path.
pub struct RisInput {
    pub filename: String,
    pub thermogram: Thermogram,
}

impl RisInput {
    fn try_from_path(filename: String, window: WindowSpec) -> Result<Self> {
        let mut file =
            File::open(&filename).with_context(|| format!("could not open {}", filename))?;
        let thermogram = read_thermogram(&mut file, window)
            .with_context(|| format!("could not read RIS recording {}", filename))?;
        Ok(RisInput {
            filename,
            thermogram,
        })
    }
}

/// Loads the given recordings in parallel, one file handle per worker,
/// behind a progress bar.
pub fn process_paths_par(
    paths: Vec<String>,
    window: WindowSpec,
) -> impl IntoParallelIterator<Item = Result<RisInput>> {
    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar:cyan/blue} {pos:>7}/{len:7}"),
    );

    paths
        .into_par_iter()
        .map(move |p| RisInput::try_from_path(p, window))
        .inspect(move |_| bar.inc(1))
}
