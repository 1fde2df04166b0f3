//! A trivial tracing facility: each pipeline stage reports to
//! standard error when its level is enabled.

use bitmask_enum::bitmask;

#[bitmask]
pub enum Trace {
    All,
    Analyze,
    Rewrite,
    Ground,
    Solve,
    Parse,
}

impl Trace {
    /// Parse a comma-separated list of level names, e.g., `"ground,solve"`.
    /// Unknown names are returned as the error.
    pub fn from_levels(levels: &str) -> Result<Self, String> {
        levels
            .split(',')
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .try_fold(Trace::none(), |trace, level| {
                Ok(trace
                    | match level.to_ascii_lowercase().as_str() {
                        "all" => Trace::all(),
                        "analyze" => Trace::Analyze,
                        "rewrite" => Trace::Rewrite,
                        "ground" => Trace::Ground,
                        "solve" => Trace::Solve,
                        "parse" => Trace::Parse,
                        _ => return Err(level.to_owned()),
                    })
            })
    }
}

#[macro_export]
macro_rules! trace {
    ($trace:expr, $level:ident, $fmt:literal $(,)? $($arg:expr),* $(,)?) => {
        if $trace.intersects(Trace::$level) {
            eprintln!($fmt, $($arg),*);
        }
    }
}
