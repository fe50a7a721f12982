//! Assembly of the argument list handed to `convert` and `identify`.
//!
//! The command line is split in two around the source image:
//!
//! ```text
//! convert <PRE_SOURCE> source.png <POST_SOURCE> destination.png
//! ```
//!
//! Tokens added by callers keep their relative order. Tokens that come from the
//! settings (`prepend`, `-quality`, `-density`, `-colorspace`) are not stored in
//! the list; they are injected each time a segment is rendered, so rendering
//! never mutates anything and always gives the same answer.

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use image::ImageFormat;
use strum::{EnumString, IntoStaticStr, VariantArray};

use crate::{exec::ExecCommand, platform::Platform, settings::Settings};

/// The two segments of the command line.
#[derive(EnumString, IntoStaticStr, VariantArray, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum ArgMode {
    PreSource,
    PostSource,
}

#[derive(Debug, Clone)]
pub struct ExecArguments {
    command: ExecCommand,
    settings: Settings,
    platform: Platform,
    pre_source: Vec<String>,
    post_source: Vec<String>,
    source: Option<PathBuf>,
    /// e.g. `[0]` to read only the first frame
    source_frames: Option<String>,
    destination: Option<PathBuf>,
    destination_format: Option<ImageFormat>,
}

impl ExecArguments {
    pub fn new(command: ExecCommand, settings: Settings, platform: Platform) -> Self {
        Self {
            command,
            settings,
            platform,
            pre_source: Vec::new(),
            post_source: Vec::new(),
            source: None,
            source_frames: None,
            destination: None,
            destination_format: None,
        }
    }

    pub fn command(&self) -> ExecCommand {
        self.command
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Appends a token after the source image. The token is used verbatim.
    pub fn add(&mut self, token: impl Into<String>) -> &mut Self {
        self.add_with_mode(token, ArgMode::PostSource)
    }

    pub fn add_with_mode(&mut self, token: impl Into<String>, mode: ArgMode) -> &mut Self {
        self.segment_mut(mode).push(token.into());
        self
    }

    /// Inserts a token at `index` within the segment. Indices past the end append.
    pub fn insert(&mut self, index: usize, token: impl Into<String>, mode: ArgMode) -> &mut Self {
        let segment = self.segment_mut(mode);
        let index = index.min(segment.len());
        segment.insert(index, token.into());
        self
    }

    /// Positions of the tokens in `mode` for which `predicate` holds.
    pub fn find(&self, mode: ArgMode, predicate: impl Fn(&str) -> bool) -> Vec<usize> {
        self.segment(mode)
            .iter()
            .enumerate()
            .filter(|(_, token)| predicate(token))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn remove(&mut self, mode: ArgMode, index: usize) -> Option<String> {
        let segment = self.segment_mut(mode);
        if index < segment.len() {
            Some(segment.remove(index))
        } else {
            None
        }
    }

    /// Drops every added token. Source and destination are kept.
    pub fn reset(&mut self) {
        self.pre_source.clear();
        self.post_source.clear();
    }

    /// Tokens added to `mode`, without anything injected from the settings.
    pub fn tokens(&self, mode: ArgMode) -> &[String] {
        self.segment(mode)
    }

    pub fn escape(&self, value: &str) -> String {
        self.platform.escape_shell_arg(value)
    }

    /// Renders one segment of the command line, settings-driven tokens included.
    pub fn to_string(&self, mode: ArgMode) -> String {
        let prepend = self.settings.prepend();
        let mut out: Vec<Cow<'_, str>> = Vec::new();

        match mode {
            ArgMode::PreSource => {
                if self.settings.prepend_pre_source {
                    out.extend(prepend.map(Cow::Borrowed));
                }
                out.extend(self.pre_source.iter().map(|t| Cow::Borrowed(t.as_str())));
            }
            ArgMode::PostSource => {
                if !self.settings.prepend_pre_source {
                    out.extend(prepend.map(Cow::Borrowed));
                }
                out.extend(self.post_source.iter().map(|t| Cow::Borrowed(t.as_str())));
                if self.command == ExecCommand::Convert {
                    self.push_convert_settings(&mut out);
                }
            }
        }

        out.join(" ")
    }

    fn push_convert_settings(&self, out: &mut Vec<Cow<'_, str>>) {
        if let Some(quality) = self.settings.quality() {
            if !self.has_option("-quality") {
                out.push(Cow::Owned(format!("-quality {quality}")));
            }
        }
        if let Some(density) = self.settings.density() {
            out.push(Cow::Owned(format!("-density {density} -units PixelsPerInch")));
        }
        // must stay last so it applies to the final pixels
        if let Some(colorspace) = self.settings.colorspace() {
            out.push(Cow::Owned(format!("-colorspace {}", self.escape(colorspace))));
        }
    }

    /// Whether `option` appears as a word anywhere in the added tokens.
    /// A single token may carry several options, e.g. `-resize 10x10 -quality 40`.
    fn has_option(&self, option: &str) -> bool {
        self.pre_source
            .iter()
            .chain(self.post_source.iter())
            .any(|t| t.split_whitespace().any(|word| word == option))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.source = Some(path.into());
        self
    }

    pub fn source_frames(&self) -> Option<&str> {
        self.source_frames.as_deref()
    }

    pub fn set_source_frames(&mut self, frames: Option<String>) -> &mut Self {
        self.source_frames = frames;
        self
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn set_destination(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.destination = Some(path.into());
        self
    }

    pub fn destination_format(&self) -> Option<ImageFormat> {
        self.destination_format
    }

    pub fn set_destination_format(&mut self, format: Option<ImageFormat>) -> &mut Self {
        self.destination_format = format;
        self
    }

    /// The `FORMAT:` prefix that forces the encoder regardless of the file extension.
    pub fn destination_format_prefix(&self) -> Option<String> {
        self.destination_format
            .and_then(|f| f.extensions_str().first())
            .map(|ext| format!("{}:", ext.to_uppercase()))
    }

    fn segment(&self, mode: ArgMode) -> &Vec<String> {
        match mode {
            ArgMode::PreSource => &self.pre_source,
            ArgMode::PostSource => &self.post_source,
        }
    }

    fn segment_mut(&mut self, mode: ArgMode) -> &mut Vec<String> {
        match mode {
            ArgMode::PreSource => &mut self.pre_source,
            ArgMode::PostSource => &mut self.post_source,
        }
    }
}
