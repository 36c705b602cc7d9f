//! The flashing "click to enable" prompt.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

/// Prompt state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptState {
    /// Not flashing.
    #[default]
    Hidden,
    /// Flashing; `elapsed` ticks so far, message currently shown or not.
    Flashing {
        /// Ticks since activation.
        elapsed: u32,
        /// Whether the message is shown this tick.
        visible: bool,
    },
}

impl PromptState {
    /// Freshly activated prompt; the message starts hidden.
    pub const ACTIVATED: Self = Self::Flashing {
        elapsed: 0,
        visible: false,
    };

    /// State after one flasher tick. Flashing ends on tick `flash_ticks`.
    #[must_use]
    pub fn step(self, flash_ticks: u32) -> Self {
        match self {
            Self::Hidden => Self::Hidden,
            Self::Flashing { elapsed, visible } => {
                let elapsed = elapsed.saturating_add(1);
                if elapsed >= flash_ticks {
                    Self::Hidden
                } else {
                    Self::Flashing {
                        elapsed,
                        visible: !visible,
                    }
                }
            }
        }
    }

    /// Whether the message is currently shown.
    #[must_use]
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Flashing { visible: true, .. })
    }

    // 0 is Hidden; otherwise 1 + (elapsed << 1 | visible)
    fn to_bits(self) -> u32 {
        match self {
            Self::Hidden => 0,
            Self::Flashing { elapsed, visible } => {
                1 + ((elapsed.min(u32::MAX >> 2) << 1) | u32::from(visible))
            }
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Hidden,
            n => Self::Flashing {
                elapsed: (n - 1) >> 1,
                visible: (n - 1) & 1 == 1,
            },
        }
    }
}

/// Bounded flashing of the enable prompt, driven by the status tick.
#[derive(Debug)]
pub struct PromptFlasher {
    flash_ticks: u32,
    state: AtomicU32,
}

impl PromptFlasher {
    /// Create an inactive flasher that settles after `flash_ticks` ticks.
    #[must_use]
    pub fn new(flash_ticks: u32) -> Self {
        Self {
            flash_ticks,
            state: AtomicU32::new(PromptState::Hidden.to_bits()),
        }
    }

    /// Start flashing (motion was just confirmed).
    pub fn activate(&self) {
        debug!("Prompt flashing for {} ticks", self.flash_ticks);
        self.store(PromptState::ACTIVATED);
    }

    /// Advance one tick, returning whether the message is visible.
    ///
    /// A concurrent [`PromptFlasher::cancel`] is never undone.
    pub fn tick(&self) -> bool {
        let step = |bits| PromptState::from_bits(bits).step(self.flash_ticks);
        let previous = match self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some(step(bits).to_bits())
            }) {
            Ok(bits) | Err(bits) => bits,
        };
        step(previous).is_visible()
    }

    /// Stop flashing immediately.
    pub fn cancel(&self) {
        self.store(PromptState::Hidden);
    }

    /// Whether the prompt is flashing.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() != PromptState::Hidden
    }

    /// Whether the message is shown right now.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state().is_visible()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> PromptState {
        PromptState::from_bits(self.state.load(Ordering::SeqCst))
    }

    fn store(&self, state: PromptState) {
        self.state.store(state.to_bits(), Ordering::SeqCst);
    }
}
