/// Per-invocation mode flags, built once from the command line and threaded
/// by reference into every flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    pub verbose: bool,
    pub quiet: bool,
    pub assume_yes: bool,
    pub simulate: bool,
    pub download_only: bool,
}
