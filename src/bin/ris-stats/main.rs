mod args;

use anyhow::Result;
use args::Args;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde_derive::*;

use ris_processing::cli::{process_paths_par, RisInput};
use ris_processing::stats::Stats;

fn main() -> Result<()> {
    let Args { paths, window } = Args::from_cmd_line()?;

    let (stats, cumulative) = process_paths_par(paths, window)
        .into_par_iter()
        .map(|try_input| -> Result<_> { Ok(FileStats::from_input(&try_input?)) })
        .try_fold(
            || (vec![], Stats::default()),
            |mut acc, try_item| -> Result<_> {
                let item = try_item?;
                acc.1 += &item.stats;
                acc.0.push(item);
                Ok(acc)
            },
        )
        .try_reduce(
            || (vec![], Stats::default()),
            |mut acc1, acc2| -> Result<_> {
                acc1.0.extend(acc2.0);
                acc1.1 += &acc2.1;
                Ok(acc1)
            },
        )?;

    #[derive(Debug, Serialize)]
    struct OutputJson {
        file_stats: Vec<FileStats>,
        cumulative: Stats,
    }

    serde_json::to_writer(
        std::io::stdout().lock(),
        &OutputJson {
            file_stats: stats,
            cumulative,
        },
    )?;

    Ok(())
}

#[derive(Serialize, Debug)]
pub struct FileStats {
    path: String,
    frames: usize,
    height: usize,
    width: usize,
    pub(crate) stats: Stats,
}

impl FileStats {
    pub fn from_input(input: &RisInput) -> Self {
        let (frames, height, width) = input.thermogram.dim();

        let mut stats = Stats::default();
        for &raw in input.thermogram.data.iter() {
            stats += raw as f64;
        }
        FileStats {
            path: input.filename.clone(),
            frames,
            height,
            width,
            stats,
        }
    }
}
