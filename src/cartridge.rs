use thiserror::Error;

pub const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

// Fallback when the image is too short to carry a header (synthetic test
// ROMs): 4 banks, matching the largest header-declared size.
const DEFAULT_RAM_SIZE: usize = 0x8000;

/// Load-time cartridge faults.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CartridgeError {
    /// Header byte 0x0147 names a mapper outside the supported set.
    #[error("unsupported cartridge type {0:#04X}")]
    UnsupportedMbc(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    mbc_state: MbcState,
}

#[derive(Debug)]
enum MbcState {
    NoMbc,
    Mbc1 {
        ram_enable: bool,
        /// ROM bank register bits 0-4. Writing 0 latches 1.
        rom_bank_low: u8,
        /// ROM bank bits 5-6 (doubles as the RAM bank in mode 1).
        rom_bank_high: u8,
        /// 0 = simple ROM banking, 1 = advanced RAM/large-ROM banking.
        mode: u8,
    },
}

impl Cartridge {
    /// Parse a flat ROM image. MBC registers come up in their power-on
    /// defaults; external RAM is sized from the header.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        let header = Header::parse(&data);
        let cart_type = header.cart_type();
        let ram_size = header.ram_size();
        let title = header.title();

        let mbc = match cart_type {
            0x00 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            other => return Err(CartridgeError::UnsupportedMbc(other)),
        };

        let mbc_state = match mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                ram_enable: false,
                rom_bank_low: 1,
                rom_bank_high: 0,
                mode: 0,
            },
        };

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            title,
            mbc_state,
        })
    }

    /// Zero external RAM and return the MBC registers to their load
    /// defaults. The ROM image is untouched.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.mbc_state = match self.mbc {
            MbcType::NoMbc => MbcState::NoMbc,
            MbcType::Mbc1 => MbcState::Mbc1 {
                ram_enable: false,
                rom_bank_low: 1,
                rom_bank_high: 0,
                mode: 0,
            },
        };
    }

    pub fn read(&self, addr: u16) -> u8 {
        match (&self.mbc_state, addr) {
            (MbcState::NoMbc, 0x0000..=0x7FFF) => {
                self.rom.get(addr as usize).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc1 { .. }, 0x0000..=0x3FFF) => {
                self.rom.get(addr as usize).copied().unwrap_or(0xFF)
            }
            (MbcState::Mbc1 { .. }, 0x4000..=0x7FFF) => {
                let offset = self.rom_bank() * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            (MbcState::NoMbc, 0xA000..=0xBFFF) => self
                .ram
                .get(addr as usize - 0xA000)
                .copied()
                .unwrap_or(0xFF),
            (MbcState::Mbc1 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if !*ram_enable {
                    0xFF
                } else {
                    self.ram.get(self.ram_index(addr)).copied().unwrap_or(0xFF)
                }
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match (&mut self.mbc_state, addr) {
            (MbcState::NoMbc, 0xA000..=0xBFFF) => {
                if let Some(b) = self.ram.get_mut(addr as usize - 0xA000) {
                    *b = val;
                }
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (MbcState::Mbc1 { rom_bank_low, .. }, 0x2000..=0x3FFF) => {
                *rom_bank_low = val & 0x1F;
                if *rom_bank_low == 0 {
                    *rom_bank_low = 1;
                }
            }
            (MbcState::Mbc1 { rom_bank_high, .. }, 0x4000..=0x5FFF) => {
                *rom_bank_high = val & 0x03;
            }
            (MbcState::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => {
                *mode = val & 0x01;
            }
            (MbcState::Mbc1 { ram_enable, .. }, 0xA000..=0xBFFF) => {
                if *ram_enable {
                    let idx = self.ram_index(addr);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            _ => {}
        }
    }

    /// Effective switchable ROM bank, masked to the image's bank count.
    /// The low-5 field is latched non-zero at write time, so banks
    /// 0x00/0x20/0x40/0x60 are never selected.
    fn rom_bank(&self) -> usize {
        let bank_count = (self.rom.len() / ROM_BANK_SIZE).max(1);
        match &self.mbc_state {
            MbcState::NoMbc => 1,
            MbcState::Mbc1 {
                rom_bank_low,
                rom_bank_high,
                ..
            } => {
                let bank = ((*rom_bank_high as usize) << 5) | *rom_bank_low as usize;
                bank % bank_count
            }
        }
    }

    fn ram_index(&self, addr: u16) -> usize {
        match &self.mbc_state {
            MbcState::NoMbc => addr as usize - 0xA000,
            MbcState::Mbc1 {
                rom_bank_high,
                mode,
                ..
            } => {
                let bank = if *mode == 0 { 0 } else { *rom_bank_high as usize };
                bank * RAM_BANK_SIZE + (addr as usize - 0xA000)
            }
        }
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let end = 0x0143.min(self.data.len());
        let mut slice = &self.data[0x0134.min(self.data.len())..end];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cart_type(&self) -> u8 {
        if self.data.len() < 0x150 {
            return 0x00;
        }
        self.data.get(0x0147).copied().unwrap_or(0)
    }

    fn ram_size(&self) -> usize {
        if self.data.len() < 0x150 {
            return DEFAULT_RAM_SIZE;
        }

        match self.data.get(0x0149).copied().unwrap_or(0) {
            0x00 => 0,
            0x01 => 0x800,  // 2KB
            0x02 => 0x2000, // 8KB
            0x03 => 0x8000, // 32KB (4 banks)
            _ => DEFAULT_RAM_SIZE,
        }
    }
}
