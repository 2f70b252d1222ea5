use serde::Deserialize;

/// Commands bound to keys in the `[bind]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Cmd {
    #[serde(rename = "BRUSH_UP")]
    BrushUp,
    #[serde(rename = "BRUSH_DOWN")]
    BrushDown,
    /// Shows or hides the hand preview inset.
    #[serde(rename = "TOGGLE_WEBCAM")]
    ToggleWebcam,
    #[serde(rename = "CLEAR")]
    Clear,
    #[serde(rename = "SAVE")]
    Save,
    #[serde(rename = "QUIT")]
    Quit,
}

/// Work the controller hands back to the host because it involves the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    /// Write the current canvas to disk.
    Save,
    /// Close the window and exit.
    Quit,
}
