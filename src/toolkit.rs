//! Derivative generation: read a source image, collect operations, write the result.
//!
//! ```text
//! load(source)        EnsureSourceLocalPath -> PreIdentifyExecute -> identify
//! arguments_mut()     callers add -resize, -crop, ...
//! save(destination)   PreConvertExecute -> convert -> PostSave -> identify destination
//! ```

use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::debug;

use crate::{
    arguments::ExecArguments,
    error::MagickError,
    events::{EventDispatcher, EventSubscriber, ExecutionEvent},
    exec::{CommandRunner, ExecCommand, ExecManager, ShellRunner},
    identify::{self, FileMetadata},
    mt_err,
    platform::Platform,
    settings::Settings,
};

pub struct Toolkit {
    exec: ExecManager,
    dispatcher: EventDispatcher,
    arguments: ExecArguments,
    metadata: Option<FileMetadata>,
}

impl Toolkit {
    pub fn new(settings: Settings, platform: Platform, runner: Box<dyn CommandRunner>) -> Self {
        let exec = ExecManager::new(settings, platform, runner);
        let arguments = exec.arguments(ExecCommand::Convert);
        Self {
            exec,
            dispatcher: EventDispatcher::new(),
            arguments,
            metadata: None,
        }
    }

    /// A toolkit that runs the real binaries through the shell of the build target.
    pub fn with_shell(settings: Settings) -> Self {
        Self::new(settings, Platform::current(), Box::new(ShellRunner))
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn EventSubscriber>) -> &mut Self {
        self.dispatcher.subscribe(subscriber);
        self
    }

    pub fn exec_manager(&self) -> &ExecManager {
        &self.exec
    }

    /// See [`ExecManager::check_path`]. Callers should skip their work when this fails.
    pub fn check_path(&self) -> Result<String, MagickError> {
        self.exec.check_path(None)
    }

    /// Reads the source image's metadata and starts a fresh argument list for it.
    pub fn load(&mut self, source: impl Into<PathBuf>) -> Result<&FileMetadata, MagickError> {
        let mut arguments = self.exec.arguments(ExecCommand::Convert);
        arguments.set_source(source.into());
        self.dispatcher
            .dispatch(ExecutionEvent::EnsureSourceLocalPath, &mut arguments)?;

        let source = arguments
            .source()
            .ok_or_else(|| mt_err!("a subscriber cleared the source path"))?;
        let metadata = self.identify(source, arguments.source_frames())?;
        debug!(source = %source.display(), ?metadata, "loaded");

        self.arguments = arguments;
        Ok(self.metadata.insert(metadata))
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    /// The source colorspace, when the binaries can report it.
    pub fn colorspace(&self) -> Option<&str> {
        self.metadata.as_ref()?.colorspace.as_deref()
    }

    pub fn arguments(&self) -> &ExecArguments {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut ExecArguments {
        &mut self.arguments
    }

    /// Forces the output encoder, e.g. `webp`, whatever the destination's extension.
    pub fn set_destination_format(&mut self, extension: &str) -> Result<(), MagickError> {
        let format = ImageFormat::from_extension(extension)
            .ok_or_else(|| mt_err!("unknown image format `{}'", extension))?;
        self.arguments.set_destination_format(Some(format));
        Ok(())
    }

    /// Runs `convert` with the collected arguments and returns the metadata of
    /// the written file. The arguments stay available for inspection.
    ///
    /// Subscribers edit a copy that is executed and then dropped, so saving the
    /// same image twice runs the same command twice.
    pub fn save(&mut self, destination: impl Into<PathBuf>) -> Result<FileMetadata, MagickError> {
        if self.metadata.is_none() {
            return Err(mt_err!("no image loaded"));
        }
        let destination = destination.into();
        self.arguments.set_destination(destination.clone());

        let mut arguments = self.arguments.clone();
        self.dispatcher
            .dispatch(ExecutionEvent::PreConvertExecute, &mut arguments)?;
        self.exec.execute(&arguments)?;
        self.dispatcher
            .dispatch(ExecutionEvent::PostSave, &mut arguments)?;

        self.identify(&destination, None)
    }

    fn identify(&self, path: &Path, frames: Option<&str>) -> Result<FileMetadata, MagickError> {
        let mut arguments = self.exec.arguments(ExecCommand::Identify);
        arguments
            .set_source(path)
            .set_source_frames(frames.map(str::to_string));
        identify::add_format_argument(&mut arguments);
        self.dispatcher
            .dispatch(ExecutionEvent::PreIdentifyExecute, &mut arguments)?;
        let output = self.exec.execute(&arguments)?;
        identify::parse(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        arguments::ArgMode,
        exec::tests::{ok, RecordingRunner},
        settings::Binaries,
    };

    const SOURCE_MD: &str = "format:PNG|width:40|height:20|colorspace:sRGB\n";
    const GRAY_MD: &str = "format:PNG|width:100|height:75|colorspace:Gray\n";

    fn make_toolkit(settings: Settings, platform: Platform) -> (Toolkit, RecordingRunner) {
        let runner = RecordingRunner::default();
        runner
            .respond("image-test.png.derived", ok(GRAY_MD))
            .respond("identify", ok(SOURCE_MD));
        let toolkit = Toolkit::new(settings, platform, Box::new(runner.clone()));
        (toolkit, runner)
    }

    fn derive(toolkit: &mut Toolkit) -> FileMetadata {
        toolkit.load("image-test.png").unwrap();
        toolkit
            .arguments_mut()
            .add("-resize 100x75!")
            .add("-quality 75");
        toolkit.save("image-test.png.derived").unwrap()
    }

    #[test]
    fn test_colorspace_setting_reaches_the_command_line() {
        let settings = Settings {
            colorspace: Some("GRAY".into()),
            ..Default::default()
        };
        let (mut toolkit, runner) = make_toolkit(settings, Platform::Unix);
        let derived = derive(&mut toolkit);

        assert_eq!(toolkit.colorspace(), Some("SRGB"));
        assert_eq!(derived.colorspace.as_deref(), Some("GRAY"));
        assert_eq!(
            toolkit.arguments().to_string(ArgMode::PostSource),
            "-resize 100x75! -quality 75 -colorspace 'GRAY'"
        );
        assert_eq!(
            runner.calls(),
            vec![
                "identify -format 'format:%m|width:%w|height:%h|colorspace:%[colorspace]\\n' 'image-test.png'",
                "convert 'image-test.png' -resize 100x75! -quality 75 -colorspace 'GRAY' 'image-test.png.derived'",
                "identify -format 'format:%m|width:%w|height:%h|colorspace:%[colorspace]\\n' 'image-test.png.derived'",
            ]
        );
    }

    #[test]
    fn test_colorspace_quoting_on_windows() {
        let settings = Settings {
            colorspace: Some("GRAY".into()),
            ..Default::default()
        };
        let (mut toolkit, _) = make_toolkit(settings, Platform::Windows);
        derive(&mut toolkit);
        assert_eq!(
            toolkit.arguments().to_string(ArgMode::PostSource),
            "-resize 100x75! -quality 75 -colorspace \"GRAY\""
        );
    }

    #[test]
    fn test_prepend_positions() {
        let mut settings = Settings {
            colorspace: Some("GRAY".into()),
            prepend: Some("-debug All".into()),
            prepend_pre_source: true,
            ..Default::default()
        };
        let (mut toolkit, _) = make_toolkit(settings.clone(), Platform::Unix);
        derive(&mut toolkit);
        assert_eq!(toolkit.arguments().to_string(ArgMode::PreSource), "-debug All");
        assert_eq!(
            toolkit.arguments().to_string(ArgMode::PostSource),
            "-resize 100x75! -quality 75 -colorspace 'GRAY'"
        );

        settings.prepend_pre_source = false;
        let (mut toolkit, _) = make_toolkit(settings, Platform::Unix);
        derive(&mut toolkit);
        assert_eq!(toolkit.arguments().to_string(ArgMode::PreSource), "");
        assert_eq!(
            toolkit.arguments().to_string(ArgMode::PostSource),
            "-debug All -resize 100x75! -quality 75 -colorspace 'GRAY'"
        );
    }

    #[test]
    fn test_graphicsmagick_reports_no_colorspace() {
        let settings = Settings {
            binaries: Binaries::GraphicsMagick,
            ..Default::default()
        };
        let runner = RecordingRunner::default();
        runner.respond("identify", ok("format:PNG|width:40|height:20\n"));
        let mut toolkit = Toolkit::new(settings, Platform::Unix, Box::new(runner.clone()));
        toolkit.load("image-test.png").unwrap();
        assert_eq!(toolkit.colorspace(), None);
        assert_eq!(
            runner.calls(),
            vec!["gm identify -format 'format:%m|width:%w|height:%h\\n' 'image-test.png'"]
        );
    }

    #[test]
    fn test_save_without_load() {
        let (mut toolkit, runner) = make_toolkit(Settings::default(), Platform::Unix);
        assert!(toolkit.save("out.png").is_err());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_load_starts_fresh_arguments() {
        let (mut toolkit, _) = make_toolkit(Settings::default(), Platform::Unix);
        toolkit.load("image-test.png").unwrap();
        toolkit.arguments_mut().add("-strip");
        toolkit.load("image-test.png").unwrap();
        assert!(toolkit.arguments().tokens(ArgMode::PostSource).is_empty());
    }

    #[test]
    fn test_destination_format() {
        let (mut toolkit, runner) = make_toolkit(Settings::default(), Platform::Unix);
        toolkit.load("image-test.png").unwrap();
        assert!(toolkit.set_destination_format("nope").is_err());
        toolkit.set_destination_format("webp").unwrap();
        toolkit.save("image-test.png.derived").unwrap();
        assert!(runner.calls()[1].ends_with("'WEBP:image-test.png.derived'"));
    }

    struct LocalCopy;

    impl EventSubscriber for LocalCopy {
        fn subscribed_events(&self) -> Vec<(ExecutionEvent, i32)> {
            vec![
                (ExecutionEvent::EnsureSourceLocalPath, 0),
                (ExecutionEvent::PreConvertExecute, 0),
            ]
        }

        fn handle(
            &self,
            event: ExecutionEvent,
            arguments: &mut ExecArguments,
        ) -> Result<(), MagickError> {
            match event {
                ExecutionEvent::EnsureSourceLocalPath => {
                    arguments.set_source("/cache/image-test.png");
                }
                _ => {
                    arguments.add("-strip");
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_subscribers_shape_the_commands() {
        let (mut toolkit, runner) = make_toolkit(Settings::default(), Platform::Unix);
        toolkit.subscribe(Box::new(LocalCopy));
        derive(&mut toolkit);
        let calls = runner.calls();
        assert!(calls[0].ends_with("'/cache/image-test.png'"));
        assert_eq!(
            calls[1],
            "convert '/cache/image-test.png' -resize 100x75! -quality 75 -strip 'image-test.png.derived'"
        );
    }

    #[test]
    fn test_saving_twice_runs_the_same_convert() {
        let (mut toolkit, runner) = make_toolkit(Settings::default(), Platform::Unix);
        toolkit.subscribe(Box::new(LocalCopy));
        derive(&mut toolkit);
        toolkit.save("image-test.png.derived").unwrap();
        let calls = runner.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[3], calls[1]);
        assert_eq!(calls[3].matches("-strip").count(), 1);
        assert_eq!(
            toolkit.arguments().to_string(ArgMode::PostSource),
            "-resize 100x75! -quality 75"
        );
    }
}
