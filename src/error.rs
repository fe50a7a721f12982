use std::fmt::{Debug, Display};

/// Every failure the toolkit reports: unreadable settings, a missing binary,
/// a command that exited with an error, or output we could not make sense of.
pub struct MagickError(pub String);

impl Display for MagickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for MagickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MagickError").field(&self.0).finish()
    }
}

impl std::error::Error for MagickError {}

#[macro_export]
macro_rules! mt_err {
    ($($arg:tt)+) => {
        $crate::error::MagickError(format!(
            "magick-toolkit: {} @ {}:{}:{}",
            format_args!($($arg)+),
            file!(),
            line!(),
            column!()
        ))
    };
}

#[macro_export]
macro_rules! mt_try {
    ($expr:expr $(,)?) => {
        match $expr {
            std::result::Result::Ok(val) => val,
            std::result::Result::Err(err) => {
                return std::result::Result::Err($crate::mt_err!("{}", err));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails() -> Result<u32, MagickError> {
        let n: u32 = mt_try!("not a number".parse::<u32>());
        Ok(n)
    }

    #[test]
    fn test_error_carries_message_and_location() {
        let err = mt_err!("binary `{}' not found", "convert");
        assert!(err.0.starts_with("magick-toolkit: binary `convert' not found @ "));
        assert!(err.0.contains("error.rs"));
    }

    #[test]
    fn test_try_wraps_foreign_errors() {
        let err = fails().unwrap_err();
        assert!(err.to_string().contains("invalid digit"));
    }
}
