/// Log a lifecycle step at `info` if the verbosity shows steps, else at
/// `debug`.
#[macro_export]
macro_rules! progress {
    ($verbosity:expr, $($arg:tt)+) => {
        if $verbosity.shows_steps() {
            ::tracing::info!($($arg)+)
        } else {
            ::tracing::debug!($($arg)+)
        }
    };
}
