//! Running the external binaries.
//!
//! Commands go through the platform shell because the argument tokens are
//! shell text (`-colorspace 'GRAY'`), not pre-split argv entries.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use strum::{EnumString, IntoStaticStr, VariantArray};
use tracing::{debug, info, warn};

use crate::{
    arguments::{ArgMode, ExecArguments},
    error::MagickError,
    mt_err,
    platform::Platform,
    settings::{Binaries, Settings},
};

#[derive(EnumString, IntoStaticStr, VariantArray, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum ExecCommand {
    Convert,
    Identify,
}

/// What a finished process left behind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a complete command line. Swapped out in tests for a recorder.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command_line: &str, platform: Platform) -> Result<ExecOutput, MagickError>;
}

/// Hands the command line to `sh -c` or `cmd /C`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command_line: &str, platform: Platform) -> Result<ExecOutput, MagickError> {
        let mut cmd = match platform {
            Platform::Windows => windows_shell(command_line)?,
            Platform::Unix => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command_line);
                cmd
            }
        };
        let output = cmd
            .output()
            .map_err(|e| mt_err!("unable to spawn shell for `{}': {}", command_line, e))?;
        Ok(ExecOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// `cmd` does not understand the C runtime's `\"` escapes that `Command::arg`
/// would add, so the line is passed through untouched.
#[cfg(windows)]
fn windows_shell(command_line: &str) -> Result<Command, MagickError> {
    use std::os::windows::process::CommandExt;

    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(command_line);
    Ok(cmd)
}

#[cfg(not(windows))]
fn windows_shell(command_line: &str) -> Result<Command, MagickError> {
    Err(mt_err!(
        "a Windows command line cannot run on this host: {}",
        command_line
    ))
}

pub struct ExecManager {
    settings: Settings,
    platform: Platform,
    runner: Box<dyn CommandRunner>,
}

impl ExecManager {
    pub fn new(settings: Settings, platform: Platform, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            settings,
            platform,
            runner,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// A fresh argument list for `command`, wired to these settings.
    pub fn arguments(&self, command: ExecCommand) -> ExecArguments {
        ExecArguments::new(command, self.settings.clone(), self.platform)
    }

    /// The program part of the command line, e.g. `'/usr/bin/convert'` or `gm identify`.
    pub fn program(&self, command: ExecCommand) -> String {
        program(&self.settings, self.platform, command)
    }

    /// Verifies the configured package can be run, returning its version banner.
    ///
    /// `path` overrides the configured directory, so a candidate path can be
    /// tested before it is saved. An empty path means the shell path.
    pub fn check_path(&self, path: Option<&Path>) -> Result<String, MagickError> {
        let mut settings = self.settings.clone();
        if let Some(path) = path {
            settings.path_to_binaries =
                Some(path.to_path_buf()).filter(|p| !p.as_os_str().is_empty());
        }

        if let Some(dir) = &settings.path_to_binaries {
            if !dir.is_dir() {
                return Err(mt_err!("the path `{}' is not a directory", dir.display()));
            }
        }
        let (executable, banner) = match settings.binaries {
            Binaries::ImageMagick => ("convert", "ImageMagick"),
            Binaries::GraphicsMagick => ("gm", "GraphicsMagick"),
        };
        if let Some(path) = executable_path(&settings, self.platform, executable) {
            if !path.is_file() {
                return Err(mt_err!(
                    "the {} binary `{}' does not exist",
                    settings.binaries,
                    path.display()
                ));
            }
        }

        // `gm convert -version` is not supported, so ask the bare executable
        let program = match executable_path(&settings, self.platform, executable) {
            Some(path) => self.platform.escape_shell_arg(&path.to_string_lossy()),
            None => executable.to_string(),
        };
        let command_line = format!("{program} -version");
        let output = self.runner.run(&command_line, self.platform)?;
        if !output.success || !output.stdout.contains(banner) {
            return Err(mt_err!(
                "{} binaries are not available on the shell path: `{}' returned {:?}: {}",
                banner,
                command_line,
                output.exit_code,
                output.stderr.trim()
            ));
        }
        Ok(output.stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// The full command line for `arguments`. Empty segments are left out.
    pub fn command_line(&self, arguments: &ExecArguments) -> Result<String, MagickError> {
        let command = arguments.command();
        let source = arguments
            .source()
            .ok_or_else(|| mt_err!("no source image set for {:?}", command))?;
        let mut source = source.to_string_lossy().into_owned();
        if let Some(frames) = arguments.source_frames() {
            source.push_str(frames);
        }
        let source = self.platform.escape_shell_arg(&source);

        let pre = arguments.to_string(ArgMode::PreSource);
        let post = arguments.to_string(ArgMode::PostSource);

        let mut parts = vec![self.program(command)];
        match command {
            ExecCommand::Convert => {
                let destination = arguments
                    .destination()
                    .ok_or_else(|| mt_err!("no destination set for convert"))?;
                let mut destination_arg = arguments.destination_format_prefix().unwrap_or_default();
                destination_arg.push_str(&destination.to_string_lossy());

                parts.extend([pre, source, post]);
                parts.push(self.platform.escape_shell_arg(&destination_arg));
            }
            ExecCommand::Identify => parts.extend([pre, post, source]),
        }
        parts.retain(|p| !p.is_empty());
        Ok(parts.join(" "))
    }

    /// Runs the command described by `arguments`. A non-zero exit status is an error.
    pub fn execute(&self, arguments: &ExecArguments) -> Result<ExecOutput, MagickError> {
        let command_line = self.command_line(arguments)?;
        if self.settings.debug {
            info!(%command_line, "executing");
        } else {
            debug!(%command_line, "executing");
        }

        let output = self.runner.run(&command_line, self.platform)?;
        if !output.success {
            return Err(mt_err!(
                "`{}' failed with exit code {:?}: {}",
                command_line,
                output.exit_code,
                output.stderr.trim()
            ));
        }
        if !output.stderr.trim().is_empty() {
            warn!(%command_line, stderr = output.stderr.trim(), "command reported warnings");
        }
        Ok(output)
    }
}

fn program(settings: &Settings, platform: Platform, command: ExecCommand) -> String {
    let (executable, subcommand) = match (settings.binaries, command) {
        (Binaries::ImageMagick, ExecCommand::Convert) => ("convert", None),
        (Binaries::ImageMagick, ExecCommand::Identify) => ("identify", None),
        (Binaries::GraphicsMagick, ExecCommand::Convert) => ("gm", Some("convert")),
        (Binaries::GraphicsMagick, ExecCommand::Identify) => ("gm", Some("identify")),
    };
    let executable = match executable_path(settings, platform, executable) {
        Some(path) => platform.escape_shell_arg(&path.to_string_lossy()),
        None => executable.to_string(),
    };
    match subcommand {
        Some(sub) => format!("{executable} {sub}"),
        None => executable,
    }
}

fn executable_path(settings: &Settings, platform: Platform, executable: &str) -> Option<PathBuf> {
    let dir = settings.path_to_binaries.as_ref()?;
    let name = match platform {
        Platform::Windows => format!("{executable}.exe"),
        Platform::Unix => executable.to_string(),
    };
    Some(dir.join(name))
}
