/// Everything that can change the session goes through the command queue as one of these. The
/// processing loop is the only consumer, which keeps a single writer for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerCommand {
    /// A counted key or mouse press.
    Action,
    /// The minute timer of the session started at `epoch` fired.
    MinuteTick { epoch: u64 },
    /// The second timer of the session started at `epoch` fired.
    SecondTick { epoch: u64 },
    ToggleStartPause,
    Stop,
    /// Settings changed on disk.
    ReloadHotkeys,
}
