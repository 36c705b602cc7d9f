//! On-screen status line.
//!
//! The host draws whatever [`StatusView::text`] returns once per frame.

/// What the status line shows this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView {
    /// Logging; the dot count animates to show the session is alive.
    Enabled {
        /// Number of dots to draw.
        dots: u32,
    },
    /// The last enable attempt could not open a log file.
    FileError,
    /// Motion was detected and the prompt is flashing.
    Flashing {
        /// Whether the prompt text is shown this frame.
        visible: bool,
    },
    /// Not logging, nothing to report.
    Idle,
}

const LABEL: &str = "Data Logger ::";
const CLICK_TO_ENABLE: &str = "Data Logger :: Click To Enable...";

impl StatusView {
    /// Text to draw.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Enabled { dots } => {
                format!("{LABEL} Enabled {}", ".".repeat(*dots as usize))
            }
            Self::FileError => format!("{LABEL} Error Opening File."),
            Self::Flashing { visible: false } => LABEL.to_string(),
            Self::Flashing { visible: true } | Self::Idle => CLICK_TO_ENABLE.to_string(),
        }
    }
}

impl std::fmt::Display for StatusView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
