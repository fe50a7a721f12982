//! The shell the command line will be handed to.
//!
//! Quoting differs between `cmd.exe` and POSIX shells, so every renderer takes
//! the target platform explicitly instead of peeking at the host.

use current_platform::CURRENT_PLATFORM;
use strum::{Display, EnumString, IntoStaticStr};

#[derive(EnumString, IntoStaticStr, Display, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Windows,
    #[default]
    Unix,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_target_triple(CURRENT_PLATFORM)
    }

    pub fn from_target_triple(triple: &str) -> Self {
        if triple.split('-').any(|part| part == "windows") {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// The character used to wrap a single shell argument.
    pub fn quote_char(&self) -> char {
        match self {
            Platform::Windows => '"',
            Platform::Unix => '\'',
        }
    }

    /// Quotes `arg` so the target shell passes it through as one argument.
    ///
    /// On Windows `%` is left alone so `identify -format` strings survive, which
    /// means `cmd /C` still expands `%VAR%` sequences inside the quotes. A path
    /// such as `C:\%TEMP%\a.png` reaches the binary with the variable expanded.
    pub fn escape_shell_arg(&self, arg: &str) -> String {
        let q = self.quote_char();
        let mut escaped = String::with_capacity(arg.len() + 2);
        escaped.push(q);
        match self {
            // the C runtime reads a doubled quote inside quotes as a literal one
            Platform::Windows => escaped.push_str(&arg.replace('"', "\"\"")),
            Platform::Unix => {
                for c in arg.chars() {
                    if c == '\'' {
                        escaped.push_str("'\\''");
                    } else {
                        escaped.push(c);
                    }
                }
            }
        }
        escaped.push(q);
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_triples() {
        assert_eq!(
            Platform::from_target_triple("x86_64-pc-windows-msvc"),
            Platform::Windows
        );
        assert_eq!(
            Platform::from_target_triple("aarch64-pc-windows-gnullvm"),
            Platform::Windows
        );
        assert_eq!(
            Platform::from_target_triple("x86_64-unknown-linux-gnu"),
            Platform::Unix
        );
        assert_eq!(
            Platform::from_target_triple("aarch64-apple-darwin"),
            Platform::Unix
        );
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(Platform::Unix.escape_shell_arg("GRAY"), "'GRAY'");
        assert_eq!(Platform::Windows.escape_shell_arg("GRAY"), "\"GRAY\"");
    }

    #[test]
    fn test_embedded_quotes() {
        assert_eq!(
            Platform::Unix.escape_shell_arg("it's.png"),
            "'it'\\''s.png'"
        );
        assert_eq!(
            Platform::Windows.escape_shell_arg("say \"hi\".png"),
            "\"say \"\"hi\"\".png\""
        );
        assert_eq!(
            Platform::Windows.escape_shell_arg("%m|%w"),
            "\"%m|%w\""
        );
    }

    #[test]
    fn test_percent_is_left_for_cmd() {
        // `cmd` expands this before convert sees it
        assert_eq!(
            Platform::Windows.escape_shell_arg("C:\\%TEMP%\\a.png"),
            "\"C:\\%TEMP%\\a.png\""
        );
        assert_eq!(
            Platform::Unix.escape_shell_arg("/tmp/%TEMP%.png"),
            "'/tmp/%TEMP%.png'"
        );
    }

    #[test]
    fn test_parse_name() {
        assert_eq!("windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!(Platform::Unix.to_string(), "unix");
    }
}
