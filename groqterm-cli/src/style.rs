//! ANSI colours, switched off for streams that are not a terminal.

use std::io::IsTerminal;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Palette {
    pub dim: &'static str,
    pub red: &'static str,
    pub yellow: &'static str,
    pub green: &'static str,
    pub user: &'static str,
    pub assistant: &'static str,
    pub reset: &'static str,
}

const ANSI: Palette = Palette {
    dim: "\x1b[2m",
    red: "\x1b[31m",
    yellow: "\x1b[33m",
    green: "\x1b[32m",
    user: "\x1b[1;34m",
    assistant: "\x1b[1;32m",
    reset: "\x1b[0m",
};

const PLAIN: Palette = Palette {
    dim: "",
    red: "",
    yellow: "",
    green: "",
    user: "",
    assistant: "",
    reset: "",
};

impl Palette {
    fn for_terminal(is_terminal: bool) -> Self {
        if is_terminal {
            ANSI
        } else {
            PLAIN
        }
    }
}

/// Colours for text written to stdout.
pub(crate) fn out() -> Palette {
    static OUT: OnceLock<Palette> = OnceLock::new();
    *OUT.get_or_init(|| Palette::for_terminal(std::io::stdout().is_terminal()))
}

/// Colours for text written to stderr.
pub(crate) fn err() -> Palette {
    static ERR: OnceLock<Palette> = OnceLock::new();
    *ERR.get_or_init(|| Palette::for_terminal(std::io::stderr().is_terminal()))
}
