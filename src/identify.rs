//! Reading image metadata back through `identify -format`.

use crate::{
    arguments::ExecArguments, error::MagickError, mt_err, settings::Binaries,
};

/// What `identify` tells us about a file. One instance describes the first frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    /// ImageMagick's format name, e.g. `PNG`
    pub format: String,
    pub width: u32,
    pub height: u32,
    /// Uppercased, e.g. `SRGB`. GraphicsMagick cannot report it, so it stays `None` there.
    pub colorspace: Option<String>,
    pub frames: usize,
}

// https://imagemagick.org/script/escape.php
// `\n` is expanded by identify itself, one line per frame.
const IMAGEMAGICK_FORMAT: &str = "format:%m|width:%w|height:%h|colorspace:%[colorspace]\\n";
const GRAPHICSMAGICK_FORMAT: &str = "format:%m|width:%w|height:%h\\n";

pub fn format_string(binaries: Binaries) -> &'static str {
    match binaries {
        Binaries::ImageMagick => IMAGEMAGICK_FORMAT,
        Binaries::GraphicsMagick => GRAPHICSMAGICK_FORMAT,
    }
}

/// Adds the `-format` option that [`parse`] understands.
pub fn add_format_argument(arguments: &mut ExecArguments) {
    let format = format_string(arguments.settings().binaries);
    let token = format!("-format {}", arguments.escape(format));
    arguments.add(token);
}

pub fn parse(output: &str) -> Result<FileMetadata, MagickError> {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let Some(first) = lines.first() else {
        return Err(mt_err!("identify produced no output"));
    };

    let mut metadata = FileMetadata {
        frames: lines.len(),
        ..Default::default()
    };
    let mut seen_width = false;
    let mut seen_height = false;
    for field in first.split('|') {
        let Some((key, value)) = field.split_once(':') else {
            return Err(mt_err!("malformed identify field `{}'", field));
        };
        let value = value.trim();
        match key.trim() {
            "format" => metadata.format = value.to_string(),
            "width" => {
                metadata.width = parse_dimension(key, value)?;
                seen_width = true;
            }
            "height" => {
                metadata.height = parse_dimension(key, value)?;
                seen_height = true;
            }
            "colorspace" => {
                metadata.colorspace = Some(value.to_uppercase()).filter(|c| !c.is_empty())
            }
            _ => {} // newer format strings may carry more than we read
        }
    }

    if metadata.format.is_empty() || !seen_width || !seen_height {
        return Err(mt_err!("incomplete identify output `{}'", first));
    }
    Ok(metadata)
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, MagickError> {
    value
        .parse()
        .map_err(|_| mt_err!("invalid {} `{}' in identify output", key, value))
}
