//! Job item command codes.
//!
//! The numeric codes are part of the shared memory protocol and must not
//! change without rebuilding both sides.

/// Command carried in the first word of a job item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    /// Power up the head logic, paper sensor supply and stepper.
    Open = 0x01,
    /// Shift, latch and strobe one line of dot data.
    PrintLine = 0x02,
    /// Advance the stepper by a number of half-steps.
    MotorHalfStep = 0x03,
    /// Cycle every output forever. Only with no head attached.
    TestSignals = 0x04,
    /// De-energize the stepper and power down the head.
    Close = 0x05,
    /// Ask the coprocessor to shut down after the current batch.
    HaltRequest = 0xFE,
    /// End of the current batch.
    Eos = 0xFF,
}

impl Command {
    /// All commands, in code order.
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::PrintLine,
        Self::MotorHalfStep,
        Self::TestSignals,
        Self::Close,
        Self::HaltRequest,
        Self::Eos,
    ];

    /// Raw protocol code.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Convert from a raw protocol code. Returns `None` for unknown codes.
    #[inline]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0x01 => Some(Self::Open),
            0x02 => Some(Self::PrintLine),
            0x03 => Some(Self::MotorHalfStep),
            0x04 => Some(Self::TestSignals),
            0x05 => Some(Self::Close),
            0xFE => Some(Self::HaltRequest),
            0xFF => Some(Self::Eos),
            _ => None,
        }
    }
}
