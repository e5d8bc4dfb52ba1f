use anyhow::Result;
use clap::value_t_or_exit;
use ris_processing::{arg, args_parser, opt, WindowSpec};

pub struct Args {
    pub paths: Vec<String>,
    pub window: WindowSpec,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        let matches = args_parser!("ris-stats")
            .about("Compute pixel stats from RIS thermal recordings.")
            .arg(opt!("x start").help("First column of the window (default 0)"))
            .arg(opt!("width").short("W").help("Window width in columns"))
            .arg(opt!("y start").help("First row of the window (default 0)"))
            .arg(opt!("height").short("H").help("Window height in rows"))
            .arg(opt!("frame start").help("First frame of the window (default 0)"))
            .arg(opt!("frame count").short("n").help("Number of frames to read"))
            .arg(
                arg!("recordings")
                    .required(true)
                    .multiple(true)
                    .help("RIS file paths"),
            )
            .get_matches();

        let paths = matches
            .values_of("recordings")
            .unwrap()
            .map(|f| f.into())
            .collect();

        let window = WindowSpec {
            x_start: matches
                .is_present("x start")
                .then(|| value_t_or_exit!(matches, "x start", u32))
                .unwrap_or(0),
            width: matches
                .is_present("width")
                .then(|| value_t_or_exit!(matches, "width", u32)),
            y_start: matches
                .is_present("y start")
                .then(|| value_t_or_exit!(matches, "y start", u32))
                .unwrap_or(0),
            height: matches
                .is_present("height")
                .then(|| value_t_or_exit!(matches, "height", u32)),
            frame_start: matches
                .is_present("frame start")
                .then(|| value_t_or_exit!(matches, "frame start", u32))
                .unwrap_or(0),
            frame_count: matches
                .is_present("frame count")
                .then(|| value_t_or_exit!(matches, "frame count", u32)),
        };

        Ok(Args { paths, window })
    }
}
