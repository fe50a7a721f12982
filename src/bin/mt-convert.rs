use std::{ffi::OsString, path::PathBuf};

use magick_toolkit::{
    error::MagickError,
    help::{self, CONFIG_ENV},
    logging, mt_err,
    settings::Settings,
    toolkit::Toolkit,
};

fn main() {
    help::maybe_print_help_and_exit("mt-convert");
    logging::init_logging();
    let arguments: Vec<_> = std::env::args_os().collect();

    if let Err(e) = real_main(arguments) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn real_main(mut args: Vec<OsString>) -> Result<(), MagickError> {
    if args.len() < 3 {
        return Err(mt_err!("Usage: mt-convert source [options ...] destination"));
    }
    let destination = PathBuf::from(args.pop().unwrap_or_default());
    let mut rest = args.into_iter().skip(1); // skip argv[0]
    let source = PathBuf::from(rest.next().unwrap_or_default());

    let settings = match std::env::var_os(CONFIG_ENV) {
        Some(path) => Settings::load(&PathBuf::from(path))?,
        None => Settings::default(),
    };
    let mut toolkit = Toolkit::with_shell(settings);
    toolkit.check_path()?;

    toolkit.load(source)?;
    for token in rest {
        let token = token
            .into_string()
            .map_err(|t| mt_err!("option is not valid UTF-8: {}", t.to_string_lossy()))?;
        toolkit.arguments_mut().add(token);
    }
    let written = toolkit.save(destination)?;
    println!("{} {}x{}", written.format, written.width, written.height);
    Ok(())
}
