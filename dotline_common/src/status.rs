//! Printer status register flags.
//!
//! The coprocessor ORs flags into the status word while it runs a batch.
//! Nothing clears a flag except coprocessor (re)initialization, so a set
//! flag means "happened at least once since the session started".

use bitflags::bitflags;

bitflags! {
    /// Sticky status flags, bit 0 upward.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PrinterStatus: u32 {
        /// A Halt-Request item was processed; the session ends after this batch.
        const HALT_REQUESTED      = 0x0001;
        /// An item carried an unknown command code.
        const ILLEGAL_COMMAND     = 0x0002;
        /// A Motor-Half-Step count exceeded the configured maximum.
        const ILLEGAL_PARAMETER   = 0x0004;
        /// A print line carried more black dots than one strobe pass allows.
        const TOO_MANY_BLACK_DOTS = 0x0008;
        /// The motor driver reported over-temperature.
        const THERMAL_ALARM       = 0x0010;
        /// The paper sensor reported no paper.
        const PAPER_OUT           = 0x0020;
    }
}

impl PrinterStatus {
    /// Every flag that signals a fault.
    pub const ERROR_MASK: Self = Self::from_bits_truncate(
        Self::ILLEGAL_COMMAND.bits()
            | Self::ILLEGAL_PARAMETER.bits()
            | Self::TOO_MANY_BLACK_DOTS.bits()
            | Self::THERMAL_ALARM.bits()
            | Self::PAPER_OUT.bits(),
    );

    /// Returns true if any fault flag is set.
    #[inline]
    pub const fn has_error(&self) -> bool {
        self.intersects(Self::ERROR_MASK)
    }

    /// Returns true if the coprocessor will halt after the current batch.
    #[inline]
    pub const fn halt_requested(&self) -> bool {
        self.contains(Self::HALT_REQUESTED)
    }

    /// Human-readable message for every set fault flag, in bit order.
    pub fn describe(&self) -> impl Iterator<Item = &'static str> + '_ {
        const MESSAGES: [(PrinterStatus, &str); 5] = [
            (PrinterStatus::ILLEGAL_COMMAND, "Illegal command error occurred"),
            (PrinterStatus::ILLEGAL_PARAMETER, "Illegal parameter error occurred"),
            (PrinterStatus::TOO_MANY_BLACK_DOTS, "Too many black dots error occurred"),
            (PrinterStatus::THERMAL_ALARM, "Thermal alarm error occurred"),
            (PrinterStatus::PAPER_OUT, "Paper out error occurred"),
        ];
        MESSAGES
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, msg)| msg)
    }
}

impl Default for PrinterStatus {
    fn default() -> Self {
        Self::empty()
    }
}
