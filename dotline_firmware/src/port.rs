//! Hardware Port.
//!
//! The printer is wired to a handful of general-purpose output and input
//! bits on the coprocessor core. Everything above this module talks in
//! logical signal names; which physical register bit carries a signal is
//! [`PinMap`] data.

use bitflags::bitflags;

bitflags! {
    /// Logical output signals. `_N` signals are active low.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Outputs: u32 {
        /// Supply for the paper-out photo sensor.
        const PAPER_SENSE = 1 << 0;
        /// Strobe for dots 321..=384.
        const STB1_N      = 1 << 1;
        /// Strobe for dots 193..=320.
        const STB23_N     = 1 << 2;
        /// Strobe for dots 129..=192.
        const STB4_N      = 1 << 3;
        /// Strobe for dots 1..=128.
        const STB56_N     = 1 << 4;
        /// Serial clock.
        const CLK         = 1 << 5;
        /// Latch.
        const LAT_N       = 1 << 6;
        /// Serial data.
        const MOSI        = 1 << 7;
        const A1          = 1 << 8;
        const A2          = 1 << 9;
        const B1          = 1 << 10;
        const B2          = 1 << 11;
        /// Head logic power.
        const PWR_N       = 1 << 12;
    }
}

bitflags! {
    /// Logical input signals.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Inputs: u32 {
        /// Motor driver over-temperature, active low.
        const ALARM_N   = 1 << 0;
        /// High when no paper is under the sensor.
        const PAPER_OUT = 1 << 1;
    }
}

impl Outputs {
    /// All four strobe lines.
    pub const STROBES: Self = Self::from_bits_truncate(
        Self::STB1_N.bits() | Self::STB23_N.bits() | Self::STB4_N.bits() | Self::STB56_N.bits(),
    );

    /// All four stepper coil lines.
    pub const COILS: Self = Self::from_bits_truncate(
        Self::A1.bits() | Self::A2.bits() | Self::B1.bits() | Self::B2.bits(),
    );

    /// Unpowered, nothing energized: active-low lines released high,
    /// everything else low.
    pub const SAFE: Self = Self::from_bits_truncate(
        Self::STROBES.bits() | Self::LAT_N.bits() | Self::PWR_N.bits(),
    );
}

/// Capability-scoped access to the printer signals.
pub trait HardwarePort {
    /// Current output levels.
    fn outputs(&self) -> Outputs;

    /// Drive every output in one register write.
    fn write_outputs(&mut self, outputs: Outputs);

    /// Current input levels.
    fn inputs(&self) -> Inputs;

    #[inline]
    fn set(&mut self, signals: Outputs) {
        let next = self.outputs() | signals;
        self.write_outputs(next);
    }

    #[inline]
    fn clear(&mut self, signals: Outputs) {
        let next = self.outputs() - signals;
        self.write_outputs(next);
    }

    /// Clear then set in a single write, so no intermediate level is visible.
    #[inline]
    fn update(&mut self, clear: Outputs, set: Outputs) {
        let next = (self.outputs() - clear) | set;
        self.write_outputs(next);
    }

    /// True while the motor driver reports over-temperature.
    #[inline]
    fn thermal_alarm(&self) -> bool {
        !self.inputs().contains(Inputs::ALARM_N)
    }

    /// True while the paper sensor sees no paper.
    #[inline]
    fn paper_out(&self) -> bool {
        self.inputs().contains(Inputs::PAPER_OUT)
    }
}

impl<P: HardwarePort> HardwarePort for &mut P {
    fn outputs(&self) -> Outputs {
        (**self).outputs()
    }

    fn write_outputs(&mut self, outputs: Outputs) {
        (**self).write_outputs(outputs);
    }

    fn inputs(&self) -> Inputs {
        (**self).inputs()
    }
}

/// Raw core output/input registers.
pub trait CoreRegisters {
    fn read_output(&self) -> u32;
    fn write_output(&mut self, value: u32);
    fn read_input(&self) -> u32;
}

/// Logical signal to physical register bit mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    /// `(logical signal, physical bit)` for every output.
    pub outputs: [(Outputs, u8); 13],
    /// `(logical signal, physical bit)` for every input.
    pub inputs: [(Inputs, u8); 2],
}

impl PinMap {
    /// Reference board wiring.
    pub const REFERENCE: Self = Self {
        outputs: [
            (Outputs::PAPER_SENSE, 0),
            (Outputs::STB1_N, 1),
            (Outputs::STB23_N, 2),
            (Outputs::STB4_N, 3),
            (Outputs::STB56_N, 4),
            (Outputs::CLK, 5),
            (Outputs::LAT_N, 6),
            (Outputs::MOSI, 7),
            (Outputs::A1, 8),
            (Outputs::A2, 9),
            (Outputs::B1, 10),
            (Outputs::B2, 11),
            (Outputs::PWR_N, 12),
        ],
        inputs: [(Inputs::ALARM_N, 13), (Inputs::PAPER_OUT, 16)],
    };

    /// Physical bits owned by the printer outputs.
    pub fn output_mask(&self) -> u32 {
        self.outputs.iter().fold(0, |mask, &(_, bit)| mask | (1 << bit))
    }

    pub fn to_physical(&self, outputs: Outputs) -> u32 {
        self.outputs
            .iter()
            .filter(|(signal, _)| outputs.contains(*signal))
            .fold(0, |word, &(_, bit)| word | (1 << bit))
    }

    pub fn outputs_from_physical(&self, word: u32) -> Outputs {
        self.outputs
            .iter()
            .filter(|&&(_, bit)| word & (1 << bit) != 0)
            .fold(Outputs::empty(), |acc, &(signal, _)| acc | signal)
    }

    pub fn inputs_from_physical(&self, word: u32) -> Inputs {
        self.inputs
            .iter()
            .filter(|&&(_, bit)| word & (1 << bit) != 0)
            .fold(Inputs::empty(), |acc, &(signal, _)| acc | signal)
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// [`HardwarePort`] over raw core registers.
///
/// Register bits outside the pin map are preserved on every write.
#[derive(Debug)]
pub struct RegisterPort<R> {
    registers: R,
    pins: PinMap,
}

impl<R: CoreRegisters> RegisterPort<R> {
    pub fn new(registers: R, pins: PinMap) -> Self {
        Self { registers, pins }
    }

    pub fn registers(&self) -> &R {
        &self.registers
    }
}

impl<R: CoreRegisters> HardwarePort for RegisterPort<R> {
    fn outputs(&self) -> Outputs {
        self.pins.outputs_from_physical(self.registers.read_output())
    }

    fn write_outputs(&mut self, outputs: Outputs) {
        let keep = self.registers.read_output() & !self.pins.output_mask();
        self.registers
            .write_output(keep | self.pins.to_physical(outputs));
    }

    fn inputs(&self) -> Inputs {
        self.pins.inputs_from_physical(self.registers.read_input())
    }
}
