pub mod unit;

/// A macro to unwrap an option to its `Some` value, and bail out of the current
/// function with an [anyhow::Error] if not. Can only be used in functions that
/// return an [anyhow::Result].
#[macro_export]
macro_rules! unwrap_or_bail {
    ($opt:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        match $opt {
            Some(v) => v,
            None => return Err(anyhow::anyhow!($fmt $(, $arg)*)),
        }
    };
}

/// A macro to measure the evaluation time of an expression. Wraps an
/// expression, logs how long it took to evaluate (at debug level unless a
/// level is given), and evaluates to the value of the expression.
#[macro_export]
macro_rules! timed {
    ($label:expr, $ex:expr) => {
        $crate::timed!($label, log::Level::Debug, $ex)
    };
    ($label:expr, $log_level:expr, $ex:expr) => {{
        let now = std::time::Instant::now();
        let value = $ex;
        let elapsed = now.elapsed();
        log::log!($log_level, "{} took {} ms", $label, elapsed.as_millis());
        value
    }};
}

/// Number of vertices in a uniformly subdivided icosahedron. Level 0 is the
/// bare icosahedron (12 vertices); every level quadruples the face count and
/// adds one vertex per edge, which reduces to `10 * 4^level + 2`.
pub fn icosphere_len(level: u8) -> usize {
    10 * 4usize.pow(level as u32) + 2
}
