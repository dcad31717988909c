use crate::{
    cartridge::CartridgeError,
    cpu::{Cpu, CpuFault},
    mmu::Mmu,
};

/// A CPU and memory map wired together. Hosts drive the machine by calling
/// [`GameBoy::step`] and advancing their own peripherals off the returned
/// machine-cycle count.
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
        }
    }

    pub fn load_rom(&mut self, data: Vec<u8>) -> Result<(), CartridgeError> {
        self.mmu.load_rom(data)
    }

    /// Return the machine to its post-boot state while preserving the
    /// loaded cartridge ROM.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.mmu.reset();
    }

    pub fn step(&mut self) -> Result<u8, CpuFault> {
        self.cpu.step(&mut self.mmu)
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
