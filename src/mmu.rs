use log::info;

use crate::cartridge::{Cartridge, CartridgeError};
use crate::interrupts::Interrupt;

const VRAM_SIZE: usize = 0x2000;
const WRAM_BANK_SIZE: usize = 0x1000;
const OAM_SIZE: usize = 0xA0;
const IO_SIZE: usize = 0x80;
const HRAM_SIZE: usize = 0x7F;

/// The 16-bit memory map. Every CPU memory operation and every collaborator
/// register access routes through here, so region side effects (MBC1 control
/// writes, the OAM DMA trigger) always apply.
pub struct Mmu {
    pub cart: Option<Cartridge>,
    pub vram: [u8; VRAM_SIZE],
    pub wram: [[u8; WRAM_BANK_SIZE]; 2],
    pub oam: [u8; OAM_SIZE],
    io: [u8; IO_SIZE],
    pub hram: [u8; HRAM_SIZE],
    pub if_reg: u8,
    pub ie_reg: u8,
}

impl Mmu {
    pub fn new() -> Self {
        Self {
            cart: None,
            vram: [0; VRAM_SIZE],
            wram: [[0; WRAM_BANK_SIZE]; 2],
            oam: [0; OAM_SIZE],
            io: [0; IO_SIZE],
            hram: [0; HRAM_SIZE],
            if_reg: 0,
            ie_reg: 0,
        }
    }

    /// Parse and install a cartridge image. The MBC registers come up in
    /// their power-on defaults and external RAM is sized from the header.
    pub fn load_rom(&mut self, data: Vec<u8>) -> Result<(), CartridgeError> {
        let cart = Cartridge::load(data)?;
        info!(
            "loaded ROM: {:?} ({:?}, {} banks)",
            cart.title,
            cart.mbc,
            cart.rom.len() / crate::cartridge::ROM_BANK_SIZE
        );
        self.cart = Some(cart);
        Ok(())
    }

    /// Zero every writable region plus `IF`/`IE`, and return the cartridge
    /// (RAM and MBC registers) to its load state. ROM contents survive.
    pub fn reset(&mut self) {
        self.vram = [0; VRAM_SIZE];
        self.wram = [[0; WRAM_BANK_SIZE]; 2];
        self.oam = [0; OAM_SIZE];
        self.io = [0; IO_SIZE];
        self.hram = [0; HRAM_SIZE];
        self.if_reg = 0;
        self.ie_reg = 0;
        if let Some(cart) = self.cart.as_mut() {
            cart.reset();
        }
    }

    pub fn read_byte(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => self.vram[(addr - 0x8000) as usize],
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize],
            0xD000..=0xDFFF => self.wram[1][(addr - 0xD000) as usize],
            // Echo RAM: a true alias of 0xC000-0xDDFF.
            0xE000..=0xFDFF => self.read_byte(addr - 0x2000),
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize],
            0xFEA0..=0xFEFF => 0xFF,
            0xFF0F => self.if_reg,
            0xFF00..=0xFF7F => self.io[(addr - 0xFF00) as usize],
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            // ROM-range writes drive the MBC state machine, never storage.
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => self.vram[(addr - 0x8000) as usize] = val,
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize] = val,
            0xD000..=0xDFFF => self.wram[1][(addr - 0xD000) as usize] = val,
            0xE000..=0xFDFF => self.write_byte(addr - 0x2000, val),
            0xFE00..=0xFE9F => self.oam[(addr - 0xFE00) as usize] = val,
            0xFEA0..=0xFEFF => {}
            0xFF46 => self.oam_dma(val),
            0xFF0F => self.if_reg = val & 0x1F,
            0xFF00..=0xFF7F => self.io[(addr - 0xFF00) as usize] = val,
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
        }
    }

    /// OAM DMA: copy 160 bytes from `src_high << 8` into OAM through the
    /// normal read dispatch, then latch the register so it reads back.
    fn oam_dma(&mut self, src_high: u8) {
        let src = (src_high as u16) << 8;
        for i in 0..OAM_SIZE as u16 {
            self.oam[i as usize] = self.read_byte(src.wrapping_add(i));
        }
        self.io[0x46] = src_high;
    }

    /// Set a source's request bit in `IF`. Collaborators (and tests) raise
    /// interrupts through this so the CPU's gating logic sees them.
    pub fn request_interrupt(&mut self, int: Interrupt) {
        self.if_reg |= int.bit();
    }

    /// Acknowledge a source by clearing its `IF` bit.
    pub fn clear_interrupt(&mut self, int: Interrupt) {
        self.if_reg &= !int.bit();
    }

    /// Enabled pending requests: `IF & IE & 0x1F`.
    #[inline]
    pub fn pending_interrupts(&self) -> u8 {
        self.if_reg & self.ie_reg & 0x1F
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
