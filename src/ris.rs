//! Parse RIS thermal camera recordings.
//!
//! A `.ris` file starts with a short text block: one free-form line,
//! then `<metaitem name="..." value="..."/>` lines carrying the recorded
//! image width, image height and frame count, closed by a line containing
//! `</description>`. The closing `</ris>` marker shares its line with the
//! first pixel byte, so it is a fixed 6-byte tail rather than a line of
//! its own. Everything after it is raw pixel data: one `u16` per sample,
//! host endian, stored frame-major then row-major, no padding and no
//! compression.
//!
//! [`RisHeader::parse`] recovers the recording bounds and the pixel data
//! offset; [`read_thermogram`] decodes a caller-selected window of the
//! pixel data into a [`Thermogram`].

use std::io::{self, Read, Seek, SeekFrom};

use byteordered::byteorder::{NativeEndian, ReadBytesExt};
use lazy_static::lazy_static;
use ndarray::{aview1, s, Array3};
use regex::Regex;
use thiserror::Error;

use crate::thermogram::Thermogram;

const WIDTH_TAG: &str = "<metaitem name=\"imageWidth\" value=";
const HEIGHT_TAG: &str = "<metaitem name=\"imageHeight\" value=";
const FRAMES_TAG: &str = "<metaitem name=\"numberOfFrames\" value=";
const DESCRIPTION_END: &str = "</description>";

/// Length of the `</ris>` marker trailing the description block.
const CONTAINER_END_LEN: usize = 6;

/// Errors raised while parsing a RIS recording.
#[derive(Debug, Error)]
pub enum RisError {
    /// A required metaitem was missing, or the header markers never
    /// appeared before the stream ended.
    #[error("malformed RIS header: {0}")]
    MalformedHeader(String),

    /// The stream ended before an expected pixel read completed.
    #[error("truncated RIS data: {0}")]
    TruncatedData(String),

    /// Computing a file offset overflowed; the requested frame or row
    /// index is far outside any plausible recording.
    #[error("file offset overflow locating frame {frame}, row {row}")]
    OffsetOverflow { frame: u64, row: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Recording bounds parsed from the text header of a `.ris` stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RisHeader {
    /// Stored width of every frame, in samples.
    pub width_max: u32,
    /// Stored height of every frame, in rows.
    pub height_max: u32,
    /// Number of frames in the recording.
    pub frame_count_max: u32,
    /// Byte offset of the first pixel sample, just past `</ris>`.
    pub data_start: u64,
}

impl RisHeader {
    /// Parses the header from a stream positioned at offset 0.
    ///
    /// Consumes the header block and the 6-byte container marker,
    /// leaving the cursor on the first pixel byte. When a metaitem
    /// recurs, the last occurrence before `</description>` wins.
    pub fn parse<R: Read + Seek>(reader: &mut R) -> Result<Self, RisError> {
        // The leading line is free-form and carries no metaitems.
        if read_text_line(reader)?.is_none() {
            return Err(RisError::MalformedHeader("empty stream".into()));
        }

        let mut width = None;
        let mut height = None;
        let mut frames = None;
        loop {
            let line = read_text_line(reader)?.ok_or_else(|| {
                RisError::MalformedHeader(format!(
                    "stream ended before `{}` marker",
                    DESCRIPTION_END
                ))
            })?;
            if line.contains(WIDTH_TAG) {
                width = Some(tag_value(&line, "imageWidth")?);
            }
            if line.contains(HEIGHT_TAG) {
                height = Some(tag_value(&line, "imageHeight")?);
            }
            if line.contains(FRAMES_TAG) {
                frames = Some(tag_value(&line, "numberOfFrames")?);
            }
            if line.contains(DESCRIPTION_END) {
                break;
            }
        }

        // `</ris>` shares a line with the first pixel byte, so it cannot
        // be consumed as a line.
        let mut tail = [0u8; CONTAINER_END_LEN];
        reader.read_exact(&mut tail).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => RisError::MalformedHeader(
                "stream ended inside the closing container marker".into(),
            ),
            _ => RisError::Io(e),
        })?;
        let data_start = reader.stream_position()?;

        let mut missing = vec![];
        if width.is_none() {
            missing.push("imageWidth");
        }
        if height.is_none() {
            missing.push("imageHeight");
        }
        if frames.is_none() {
            missing.push("numberOfFrames");
        }
        if !missing.is_empty() {
            return Err(RisError::MalformedHeader(format!(
                "missing metaitem(s): {}",
                missing.join(", ")
            )));
        }

        Ok(RisHeader {
            width_max: width.unwrap(),
            height_max: height.unwrap(),
            frame_count_max: frames.unwrap(),
            data_start,
        })
    }

    /// Byte offset of `row` within `frame`. Rows in the container are
    /// always `width_max` samples wide, so the stride ignores any window
    /// narrowing.
    fn row_offset(&self, frame: u64, row: u64) -> Result<u64, RisError> {
        let frame_samples = self.width_max as u64 * self.height_max as u64;
        frame_samples
            .checked_mul(frame)
            .and_then(|base| {
                (self.width_max as u64)
                    .checked_mul(row)
                    .and_then(|r| base.checked_add(r))
            })
            .and_then(|samples| samples.checked_mul(2))
            .and_then(|bytes| self.data_start.checked_add(bytes))
            .ok_or(RisError::OffsetOverflow { frame, row })
    }
}

/// A rectangular, temporal sub-window of a recording.
///
/// `None` spans mean "up to the recorded maximum"; the default value
/// selects the full recording. The arithmetic matches the camera
/// vendor's reference reader: each start is added to its span and
/// clamped against the recorded maximum, and that combined value serves
/// as both the output extent and the loop bound. The column start does
/// not shift the read offset, rows are always read from column 0. With
/// zero starts (the common case) this behaves as a plain crop; with
/// non-zero starts the trailing frames and rows run past the recording
/// and surface as [`RisError::TruncatedData`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSpec {
    pub x_start: u32,
    pub width: Option<u32>,
    pub y_start: u32,
    pub height: Option<u32>,
    pub frame_start: u32,
    pub frame_count: Option<u32>,
}

/// Decodes the selected window of a `.ris` stream into a [`Thermogram`].
///
/// The stream is rewound and its header re-parsed on every call; the
/// returned thermogram owns its samples and outlives the stream. Each
/// row is one seek plus one bounded read, so I/O volume scales with
/// `frames x rows`.
pub fn read_thermogram<R: Read + Seek>(
    reader: &mut R,
    window: WindowSpec,
) -> Result<Thermogram, RisError> {
    reader.seek(SeekFrom::Start(0))?;
    let header = RisHeader::parse(reader)?;

    let eff_width = resolve_extent(window.x_start, window.width, header.width_max);
    let eff_height = resolve_extent(window.y_start, window.height, header.height_max);
    let eff_frames = resolve_extent(window.frame_start, window.frame_count, header.frame_count_max);

    let mut data = Array3::<u16>::zeros((
        eff_frames as usize,
        eff_height as usize,
        eff_width as usize,
    ));
    let mut row_buf = vec![0u16; eff_width as usize];

    let frame_start = window.frame_start as u64;
    let y_start = window.y_start as u64;
    for frame in frame_start..frame_start + eff_frames as u64 {
        for row in y_start..y_start + eff_height as u64 {
            reader.seek(SeekFrom::Start(header.row_offset(frame, row)?))?;
            reader
                .read_u16_into::<NativeEndian>(&mut row_buf)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::UnexpectedEof => RisError::TruncatedData(format!(
                        "stream ended reading frame {}, row {}",
                        frame, row
                    )),
                    _ => RisError::Io(e),
                })?;
            data.slice_mut(s![
                (frame - frame_start) as usize,
                (row - y_start) as usize,
                ..
            ])
            .assign(&aview1(&row_buf));
        }
    }

    Ok(Thermogram { data })
}

/// Folds a window start and span into the clamped bound used for both
/// the output extent and the read loop.
fn resolve_extent(start: u32, span: Option<u32>, max: u32) -> u32 {
    match span {
        Some(span) => (start as u64 + span as u64).min(max as u64) as u32,
        None => max,
    }
}

/// Reads one newline-terminated line, byte by byte so the cursor never
/// runs past the header. Returns `None` at a clean end of stream.
fn read_text_line<R: Read>(reader: &mut R) -> Result<Option<String>, RisError> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                buf.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RisError::Io(e)),
        }
    }
    if buf.is_empty() {
        Ok(None)
    } else {
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

/// Extracts the metaitem value as the first run of decimal digits in
/// the line.
fn tag_value(line: &str, name: &str) -> Result<u32, RisError> {
    lazy_static! {
        static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();
    }

    let run = DIGITS.find(line).ok_or_else(|| {
        RisError::MalformedHeader(format!("no numeric value in `{}` metaitem", name))
    })?;
    run.as_str().parse().map_err(|_| {
        RisError::MalformedHeader(format!("`{}` value out of range: {}", name, run.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_text(width: &str, height: &str, frames: &str) -> String {
        format!(
            "<ris version=\"1.0\">\n\
             <description>\n\
             <metaitem name=\"imageWidth\" value=\"{}\"/>\n\
             <metaitem name=\"imageHeight\" value=\"{}\"/>\n\
             <metaitem name=\"numberOfFrames\" value=\"{}\"/>\n\
             </description>\n\
             </ris>",
            width, height, frames
        )
    }

    fn container(width: u32, height: u32, frames: u32, pixels: &[u16]) -> Vec<u8> {
        let mut bytes = header_text(
            &width.to_string(),
            &height.to_string(),
            &frames.to_string(),
        )
        .into_bytes();
        for px in pixels {
            bytes.extend_from_slice(&px.to_ne_bytes());
        }
        bytes
    }

    /// 4 x 3 x 2 recording with samples 0..24 in storage order.
    fn small_container() -> Vec<u8> {
        let pixels: Vec<u16> = (0..24).collect();
        container(4, 3, 2, &pixels)
    }

    #[test]
    fn parses_header_fields() {
        let bytes = small_container();
        let header_len = header_text("4", "3", "2").len() as u64;
        let mut cursor = Cursor::new(bytes);

        let header = RisHeader::parse(&mut cursor).unwrap();
        assert_eq!(header.width_max, 4);
        assert_eq!(header.height_max, 3);
        assert_eq!(header.frame_count_max, 2);
        assert_eq!(header.data_start, header_len);
        assert_eq!(cursor.position(), header_len);
    }

    #[test]
    fn last_tag_occurrence_wins() {
        let text = "<ris version=\"1.0\">\n\
                    <description>\n\
                    <metaitem name=\"imageWidth\" value=\"99\"/>\n\
                    <metaitem name=\"imageWidth\" value=\"7\"/>\n\
                    <metaitem name=\"imageHeight\" value=\"3\"/>\n\
                    <metaitem name=\"numberOfFrames\" value=\"1\"/>\n\
                    </description>\n\
                    </ris>";
        let header = RisHeader::parse(&mut Cursor::new(text.as_bytes().to_vec())).unwrap();
        assert_eq!(header.width_max, 7);
    }

    #[test]
    fn missing_frame_count_is_malformed() {
        let text = "<ris version=\"1.0\">\n\
                    <description>\n\
                    <metaitem name=\"imageWidth\" value=\"4\"/>\n\
                    <metaitem name=\"imageHeight\" value=\"3\"/>\n\
                    </description>\n\
                    </ris>\0\0";
        let err = RisHeader::parse(&mut Cursor::new(text.as_bytes().to_vec())).unwrap_err();
        match err {
            RisError::MalformedHeader(msg) => assert!(msg.contains("numberOfFrames")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn missing_closing_marker_is_malformed() {
        let text = "<ris version=\"1.0\">\n\
                    <metaitem name=\"imageWidth\" value=\"4\"/>\n";
        let err = RisHeader::parse(&mut Cursor::new(text.as_bytes().to_vec())).unwrap_err();
        assert!(matches!(err, RisError::MalformedHeader(_)));
    }

    #[test]
    fn short_container_marker_is_malformed() {
        let text = "<ris version=\"1.0\">\n\
                    <metaitem name=\"imageWidth\" value=\"4\"/>\n\
                    <metaitem name=\"imageHeight\" value=\"3\"/>\n\
                    <metaitem name=\"numberOfFrames\" value=\"1\"/>\n\
                    </description>\n\
                    </r";
        let err = RisHeader::parse(&mut Cursor::new(text.as_bytes().to_vec())).unwrap_err();
        assert!(matches!(err, RisError::MalformedHeader(_)));
    }

    #[test]
    fn header_value_overflow_is_malformed() {
        let text = header_text("4294967296", "3", "1");
        let err = RisHeader::parse(&mut Cursor::new(text.into_bytes())).unwrap_err();
        match err {
            RisError::MalformedHeader(msg) => assert!(msg.contains("imageWidth")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn full_window_round_trip() {
        let mut cursor = Cursor::new(small_container());
        let thermogram = read_thermogram(&mut cursor, WindowSpec::default()).unwrap();

        assert_eq!(thermogram.dim(), (2, 3, 4));
        let expected: Vec<u16> = (0..24).collect();
        assert_eq!(
            thermogram.data.iter().copied().collect::<Vec<_>>(),
            expected
        );
        assert_eq!(thermogram.frame(0).row(1).to_vec(), vec![4, 5, 6, 7]);
        assert_eq!(thermogram.frame(1).row(0).to_vec(), vec![12, 13, 14, 15]);
        assert_eq!(thermogram.frame(1).row(2).to_vec(), vec![20, 21, 22, 23]);
    }

    #[test]
    fn oversize_spans_clamp_to_recording() {
        let mut cursor = Cursor::new(small_container());
        let window = WindowSpec {
            width: Some(100),
            height: Some(100),
            frame_count: Some(10),
            ..WindowSpec::default()
        };
        let thermogram = read_thermogram(&mut cursor, window).unwrap();
        assert_eq!(thermogram.dim(), (2, 3, 4));
    }

    #[test]
    fn repeated_reads_are_identical() {
        let mut cursor = Cursor::new(small_container());
        let window = WindowSpec {
            width: Some(2),
            height: Some(2),
            ..WindowSpec::default()
        };
        let first = read_thermogram(&mut cursor, window).unwrap();
        let second = read_thermogram(&mut cursor, window).unwrap();
        assert_eq!(first.data, second.data);
    }

    #[test]
    fn cropped_window_reads_leading_columns() {
        let mut cursor = Cursor::new(small_container());
        let window = WindowSpec {
            width: Some(2),
            height: Some(2),
            frame_count: Some(1),
            ..WindowSpec::default()
        };
        let thermogram = read_thermogram(&mut cursor, window).unwrap();

        assert_eq!(thermogram.dim(), (1, 2, 2));
        assert_eq!(thermogram.frame(0).row(0).to_vec(), vec![0, 1]);
        assert_eq!(thermogram.frame(0).row(1).to_vec(), vec![4, 5]);
    }

    #[test]
    fn window_starts_fold_into_bounds() {
        // Starts widen the clamped extent instead of shifting the read
        // offset; columns still come from the left edge of each row.
        let mut cursor = Cursor::new(small_container());
        let window = WindowSpec {
            x_start: 1,
            width: Some(2),
            y_start: 1,
            height: Some(1),
            ..WindowSpec::default()
        };
        let thermogram = read_thermogram(&mut cursor, window).unwrap();

        assert_eq!(thermogram.dim(), (2, 2, 3));
        assert_eq!(thermogram.frame(0).row(0).to_vec(), vec![4, 5, 6]);
        assert_eq!(thermogram.frame(0).row(1).to_vec(), vec![8, 9, 10]);
        assert_eq!(thermogram.frame(1).row(0).to_vec(), vec![16, 17, 18]);
        assert_eq!(thermogram.frame(1).row(1).to_vec(), vec![20, 21, 22]);
    }

    #[test]
    fn frame_start_past_recording_is_truncated() {
        // A non-zero frame start keeps the clamped frame bound, so the
        // loop walks past the last recorded frame and hits end of stream.
        let mut cursor = Cursor::new(small_container());
        let window = WindowSpec {
            frame_start: 1,
            frame_count: Some(1),
            ..WindowSpec::default()
        };
        let err = read_thermogram(&mut cursor, window).unwrap_err();
        assert!(matches!(err, RisError::TruncatedData(_)));
    }

    #[test]
    fn zero_extent_window_is_empty() {
        let mut cursor = Cursor::new(small_container());
        let window = WindowSpec {
            width: Some(0),
            ..WindowSpec::default()
        };
        let thermogram = read_thermogram(&mut cursor, window).unwrap();
        assert_eq!(thermogram.dim(), (2, 3, 0));
    }

    #[test]
    fn short_pixel_data_is_truncated() {
        // Declares two frames but stores only one.
        let pixels: Vec<u16> = (0..12).collect();
        let mut cursor = Cursor::new(container(4, 3, 2, &pixels));
        let err = read_thermogram(&mut cursor, WindowSpec::default()).unwrap_err();
        assert!(matches!(err, RisError::TruncatedData(_)));
    }

    #[test]
    fn huge_indices_overflow_offsets() {
        let bytes = header_text("4294967295", "4294967295", "3").into_bytes();
        let mut cursor = Cursor::new(bytes);
        let window = WindowSpec {
            width: Some(0),
            height: Some(1),
            frame_start: 2,
            frame_count: Some(1),
            ..WindowSpec::default()
        };
        let err = read_thermogram(&mut cursor, window).unwrap_err();
        assert!(matches!(err, RisError::OffsetOverflow { frame: 2, row: 0 }));
    }
}
