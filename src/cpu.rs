use thiserror::Error;

use crate::interrupts::Interrupt;
use crate::mmu::Mmu;

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
const FLAG_Z: u8 = 0x80; // Zero
const FLAG_N: u8 = 0x40; // Subtract
const FLAG_H: u8 = 0x20; // Half Carry
const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

/// Fatal fault raised by [`Cpu::step`].
///
/// The only runtime fault is dispatching one of the officially undefined
/// opcodes; it is not recoverable and execution should stop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuFault {
    #[error("illegal opcode {opcode:#04X} at PC={pc:#06X}")]
    IllegalOpcode { opcode: u8, pc: u16 },
}

pub struct Cpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub pc: u16,
    pub sp: u16,
    /// Monotonic machine-cycle counter across the CPU's lifetime.
    pub cycles: u64,
    pub ime: bool,
    pub halted: bool,
    halt_bug: bool,
    /// Countdown for EI's one-instruction enable delay.
    ime_enable_delay: u8,
    /// Machine cycles consumed by the step in progress.
    step_cycles: u8,
}

impl Cpu {
    /// Create a CPU in the post-boot state (as if the boot ROM had just
    /// handed off control).
    pub fn new() -> Self {
        Self {
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            pc: BOOT_PC,
            sp: BOOT_SP,
            cycles: 0,
            ime: false,
            halted: false,
            halt_bug: false,
            ime_enable_delay: 0,
            step_cycles: 0,
        }
    }

    /// Return every register and latch to the post-boot state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn get_bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn get_de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn get_hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    pub fn get_af(&self) -> u16 {
        ((self.a as u16) << 8) | (self.f as u16 & 0xF0)
    }

    fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        // Bits 3-0 of F do not exist in hardware.
        self.f = (val as u8) & 0xF0;
    }

    /// Sole flag-register setter; keeps the low nibble clear.
    #[inline]
    fn set_f(&mut self, val: u8) {
        self.f = val & 0xF0;
    }

    #[inline]
    fn tick(&mut self, m_cycles: u8) {
        self.step_cycles += m_cycles;
        self.cycles += m_cycles as u64;
    }

    #[inline(always)]
    fn fetch8(&mut self, mmu: &mut Mmu) -> u8 {
        let val = mmu.read_byte(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.tick(1);
        val
    }

    #[inline(always)]
    fn fetch16(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.fetch8(mmu) as u16;
        let hi = self.fetch8(mmu) as u16;
        (hi << 8) | lo
    }

    #[inline(always)]
    fn read8(&mut self, mmu: &mut Mmu, addr: u16) -> u8 {
        let val = mmu.read_byte(addr);
        self.tick(1);
        val
    }

    #[inline(always)]
    fn write8(&mut self, mmu: &mut Mmu, addr: u16, val: u8) {
        mmu.write_byte(addr, val);
        self.tick(1);
    }

    fn push_stack(&mut self, mmu: &mut Mmu, val: u16) {
        self.sp = self.sp.wrapping_sub(1);
        self.write8(mmu, self.sp, (val >> 8) as u8);
        self.sp = self.sp.wrapping_sub(1);
        self.write8(mmu, self.sp, val as u8);
    }

    fn pop_stack(&mut self, mmu: &mut Mmu) -> u16 {
        let lo = self.read8(mmu, self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        let hi = self.read8(mmu, self.sp) as u16;
        self.sp = self.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// Formatted CPU state string for debugging.
    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.get_af(),
            self.get_bc(),
            self.get_de(),
            self.get_hl(),
            self.pc,
            self.sp,
            self.cycles
        )
    }

    /// 8-bit operand by index 0..7 = B,C,D,E,H,L,(HL),A. Index 6 reads
    /// through HL and costs a machine cycle.
    fn read_reg(&mut self, mmu: &mut Mmu, index: u8) -> u8 {
        match index {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            6 => self.read8(mmu, self.get_hl()),
            7 => self.a,
            _ => unreachable!(),
        }
    }

    fn write_reg(&mut self, mmu: &mut Mmu, index: u8, val: u8) {
        match index {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            6 => {
                let addr = self.get_hl();
                self.write8(mmu, addr, val);
            }
            7 => self.a = val,
            _ => unreachable!(),
        }
    }

    /// 16-bit pair by index 0..3 = BC,DE,HL,SP.
    fn read_rp(&self, index: u8) -> u16 {
        match index {
            0 => self.get_bc(),
            1 => self.get_de(),
            2 => self.get_hl(),
            3 => self.sp,
            _ => unreachable!(),
        }
    }

    fn write_rp(&mut self, index: u8, val: u16) {
        match index {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_hl(val),
            3 => self.sp = val,
            _ => unreachable!(),
        }
    }

    /// Branch condition by index 0..3 = NZ,Z,NC,C.
    fn condition(&self, index: u8) -> bool {
        match index {
            0 => self.f & FLAG_Z == 0,
            1 => self.f & FLAG_Z != 0,
            2 => self.f & FLAG_C == 0,
            3 => self.f & FLAG_C != 0,
            _ => unreachable!(),
        }
    }

    fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        self.set_f(
            (self.f & FLAG_C)
                | if res == 0 { FLAG_Z } else { 0 }
                | if val & 0x0F == 0x0F { FLAG_H } else { 0 },
        );
        res
    }

    fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        self.set_f(
            (self.f & FLAG_C)
                | FLAG_N
                | if res == 0 { FLAG_Z } else { 0 }
                | if val & 0x0F == 0 { FLAG_H } else { 0 },
        );
        res
    }

    /// The eight accumulator operations of the 0x80-0xBF column, by
    /// y-index 0..7 = ADD,ADC,SUB,SBC,AND,XOR,OR,CP.
    fn alu(&mut self, op: u8, val: u8) {
        let a = self.a;
        let carry_in = if self.f & FLAG_C != 0 { 1u8 } else { 0 };
        match op {
            0 | 1 => {
                let carry = if op == 1 { carry_in } else { 0 };
                let sum = a as u16 + val as u16 + carry as u16;
                let res = sum as u8;
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) + (val & 0x0F) + carry > 0x0F {
                            FLAG_H
                        } else {
                            0
                        }
                        | if sum > 0xFF { FLAG_C } else { 0 },
                );
                self.a = res;
            }
            2 | 3 | 7 => {
                let carry = if op == 3 { carry_in } else { 0 };
                let res = a.wrapping_sub(val).wrapping_sub(carry);
                self.set_f(
                    FLAG_N
                        | if res == 0 { FLAG_Z } else { 0 }
                        | if (a & 0x0F) < (val & 0x0F) + carry {
                            FLAG_H
                        } else {
                            0
                        }
                        | if (a as u16) < val as u16 + carry as u16 {
                            FLAG_C
                        } else {
                            0
                        },
                );
                // CP leaves A untouched.
                if op != 7 {
                    self.a = res;
                }
            }
            4 => {
                self.a &= val;
                self.set_f(if self.a == 0 { FLAG_Z } else { 0 } | FLAG_H);
            }
            5 => {
                self.a ^= val;
                self.set_f(if self.a == 0 { FLAG_Z } else { 0 });
            }
            6 => {
                self.a |= val;
                self.set_f(if self.a == 0 { FLAG_Z } else { 0 });
            }
            _ => unreachable!(),
        }
    }

    fn add_hl(&mut self, val: u16) {
        let hl = self.get_hl();
        let res = hl.wrapping_add(val);
        self.set_f(
            (self.f & FLAG_Z)
                | if ((hl & 0x0FFF) + (val & 0x0FFF)) & 0x1000 != 0 {
                    FLAG_H
                } else {
                    0
                }
                | if hl as u32 + val as u32 > 0xFFFF {
                    FLAG_C
                } else {
                    0
                },
        );
        self.set_hl(res);
    }

    /// SP plus a sign-extended immediate, with the H/C flags computed on the
    /// unsigned low byte (shared by ADD SP,r8 and LD HL,SP+r8).
    fn sp_plus_r8(&mut self, offset: u8) -> u16 {
        let val = offset as i8 as i16 as u16;
        let sp = self.sp;
        self.set_f(
            if ((sp & 0x0F) + (val & 0x0F)) > 0x0F {
                FLAG_H
            } else {
                0
            } | if ((sp & 0xFF) + (val & 0xFF)) > 0xFF {
                FLAG_C
            } else {
                0
            },
        );
        sp.wrapping_add(val)
    }

    /// Advance by one observable event: service one interrupt, idle one
    /// cycle while halted, or execute one instruction. Returns the machine
    /// cycles consumed.
    pub fn step(&mut self, mmu: &mut Mmu) -> Result<u8, CpuFault> {
        self.step_cycles = 0;

        // Commit a delayed EI. The instruction after EI still ran with IME
        // clear; the commit lands here, before this step's interrupt check.
        if self.ime_enable_delay > 0 {
            self.ime_enable_delay -= 1;
            if self.ime_enable_delay == 0 {
                self.ime = true;
            }
        }

        let pending = mmu.pending_interrupts();
        if pending != 0 {
            self.halted = false;
            if self.ime {
                if let Some(int) = Interrupt::highest_priority(pending) {
                    self.ime = false;
                    mmu.clear_interrupt(int);
                    self.tick(2);
                    self.push_stack(mmu, self.pc);
                    self.pc = int.vector();
                    self.tick(1);
                    return Ok(self.step_cycles);
                }
            }
        }

        if self.halted {
            self.tick(1);
            return Ok(self.step_cycles);
        }

        let opcode = if self.halt_bug {
            // The byte after HALT is fetched without advancing PC, so it
            // gets read twice.
            self.halt_bug = false;
            self.read8(mmu, self.pc)
        } else {
            self.fetch8(mmu)
        };
        self.execute(mmu, opcode)?;
        Ok(self.step_cycles)
    }

    fn execute(&mut self, mmu: &mut Mmu, opcode: u8) -> Result<(), CpuFault> {
        match opcode {
            0x00 => {}
            0x10 => {
                // STOP consumes its operand byte; low-power mode itself is
                // not modeled.
                let _ = self.fetch8(mmu);
            }
            0x01 | 0x11 | 0x21 | 0x31 => {
                let val = self.fetch16(mmu);
                self.write_rp((opcode >> 4) & 0x03, val);
            }
            0x02 => {
                let addr = self.get_bc();
                self.write8(mmu, addr, self.a);
            }
            0x12 => {
                let addr = self.get_de();
                self.write8(mmu, addr, self.a);
            }
            0x22 => {
                let addr = self.get_hl();
                self.write8(mmu, addr, self.a);
                self.set_hl(addr.wrapping_add(1));
            }
            0x32 => {
                let addr = self.get_hl();
                self.write8(mmu, addr, self.a);
                self.set_hl(addr.wrapping_sub(1));
            }
            0x0A => {
                let addr = self.get_bc();
                self.a = self.read8(mmu, addr);
            }
            0x1A => {
                let addr = self.get_de();
                self.a = self.read8(mmu, addr);
            }
            0x2A => {
                let addr = self.get_hl();
                self.a = self.read8(mmu, addr);
                self.set_hl(addr.wrapping_add(1));
            }
            0x3A => {
                let addr = self.get_hl();
                self.a = self.read8(mmu, addr);
                self.set_hl(addr.wrapping_sub(1));
            }
            0x08 => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, self.sp as u8);
                self.write8(mmu, addr.wrapping_add(1), (self.sp >> 8) as u8);
            }
            0x03 | 0x13 | 0x23 | 0x33 => {
                let p = (opcode >> 4) & 0x03;
                self.write_rp(p, self.read_rp(p).wrapping_add(1));
                self.tick(1);
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let p = (opcode >> 4) & 0x03;
                self.write_rp(p, self.read_rp(p).wrapping_sub(1));
                self.tick(1);
            }
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.add_hl(self.read_rp((opcode >> 4) & 0x03));
                self.tick(1);
            }
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let r = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                let res = self.inc8(val);
                self.write_reg(mmu, r, res);
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let r = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                let res = self.dec8(val);
                self.write_reg(mmu, r, res);
            }
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let val = self.fetch8(mmu);
                self.write_reg(mmu, (opcode >> 3) & 0x07, val);
            }
            0x07 => {
                let carry = self.a & 0x80 != 0;
                self.a = self.a.rotate_left(1);
                self.set_f(if carry { FLAG_C } else { 0 });
            }
            0x0F => {
                let carry = self.a & 0x01 != 0;
                self.a = self.a.rotate_right(1);
                self.set_f(if carry { FLAG_C } else { 0 });
            }
            0x17 => {
                let carry = self.a & 0x80 != 0;
                self.a = (self.a << 1) | if self.f & FLAG_C != 0 { 1 } else { 0 };
                self.set_f(if carry { FLAG_C } else { 0 });
            }
            0x1F => {
                let carry = self.a & 0x01 != 0;
                self.a = (self.a >> 1) | if self.f & FLAG_C != 0 { 0x80 } else { 0 };
                self.set_f(if carry { FLAG_C } else { 0 });
            }
            0x18 => {
                let offset = self.fetch8(mmu) as i8;
                self.pc = self.pc.wrapping_add(offset as u16);
                self.tick(1);
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch8(mmu) as i8;
                if self.condition((opcode >> 3) & 0x03) {
                    self.pc = self.pc.wrapping_add(offset as u16);
                    self.tick(1);
                }
            }
            0x27 => {
                // DAA: adjust A back to BCD using the N/H/C trail of the
                // preceding add or subtract.
                let mut correction = 0u8;
                let mut carry = false;
                if self.f & FLAG_H != 0 || (self.f & FLAG_N == 0 && self.a & 0x0F > 0x09) {
                    correction |= 0x06;
                }
                if self.f & FLAG_C != 0 || (self.f & FLAG_N == 0 && self.a > 0x99) {
                    correction |= 0x60;
                    carry = true;
                }
                if self.f & FLAG_N == 0 {
                    self.a = self.a.wrapping_add(correction);
                } else {
                    self.a = self.a.wrapping_sub(correction);
                }
                self.set_f(
                    if self.a == 0 { FLAG_Z } else { 0 }
                        | (self.f & FLAG_N)
                        | if carry { FLAG_C } else { 0 },
                );
            }
            0x2F => {
                self.a = !self.a;
                self.set_f((self.f & (FLAG_Z | FLAG_C)) | FLAG_N | FLAG_H);
            }
            0x37 => {
                self.set_f((self.f & FLAG_Z) | FLAG_C);
            }
            0x3F => {
                self.set_f((self.f & FLAG_Z) | (!self.f & FLAG_C));
            }
            0x76 => {
                let pending = mmu.pending_interrupts();
                if !self.ime && pending != 0 {
                    // DMG HALT bug: the halt is skipped and the following
                    // byte executes twice.
                    self.halt_bug = true;
                } else {
                    self.halted = true;
                }
            }
            0x40..=0x7F => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.write_reg(mmu, (opcode >> 3) & 0x07, val);
            }
            0x80..=0xBF => {
                let val = self.read_reg(mmu, opcode & 0x07);
                self.alu((opcode >> 3) & 0x07, val);
            }
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let val = self.fetch8(mmu);
                self.alu((opcode >> 3) & 0x07, val);
            }
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                self.tick(1);
                if self.condition((opcode >> 3) & 0x03) {
                    self.pc = self.pop_stack(mmu);
                    self.tick(1);
                }
            }
            0xC9 => {
                self.pc = self.pop_stack(mmu);
                self.tick(1);
            }
            0xD9 => {
                // RETI enables interrupts immediately, without EI's delay.
                self.pc = self.pop_stack(mmu);
                self.ime = true;
                self.tick(1);
            }
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let val = self.pop_stack(mmu);
                match (opcode >> 4) & 0x03 {
                    0 => self.set_bc(val),
                    1 => self.set_de(val),
                    2 => self.set_hl(val),
                    _ => self.set_af(val),
                }
            }
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let val = match (opcode >> 4) & 0x03 {
                    0 => self.get_bc(),
                    1 => self.get_de(),
                    2 => self.get_hl(),
                    _ => self.get_af(),
                };
                self.tick(1);
                self.push_stack(mmu, val);
            }
            0xC3 => {
                let addr = self.fetch16(mmu);
                self.pc = addr;
                self.tick(1);
            }
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let addr = self.fetch16(mmu);
                if self.condition((opcode >> 3) & 0x03) {
                    self.pc = addr;
                    self.tick(1);
                }
            }
            0xCD => {
                let addr = self.fetch16(mmu);
                self.tick(1);
                self.push_stack(mmu, self.pc);
                self.pc = addr;
            }
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let addr = self.fetch16(mmu);
                if self.condition((opcode >> 3) & 0x03) {
                    self.tick(1);
                    self.push_stack(mmu, self.pc);
                    self.pc = addr;
                }
            }
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let target = (opcode & 0x38) as u16;
                self.tick(1);
                self.push_stack(mmu, self.pc);
                self.pc = target;
            }
            0xCB => {
                let op = self.fetch8(mmu);
                self.execute_cb(mmu, op);
            }
            0xE0 => {
                let offset = self.fetch8(mmu);
                self.write8(mmu, 0xFF00 | offset as u16, self.a);
            }
            0xF0 => {
                let offset = self.fetch8(mmu);
                self.a = self.read8(mmu, 0xFF00 | offset as u16);
            }
            0xE2 => {
                self.write8(mmu, 0xFF00 | self.c as u16, self.a);
            }
            0xF2 => {
                self.a = self.read8(mmu, 0xFF00 | self.c as u16);
            }
            0xE8 => {
                let offset = self.fetch8(mmu);
                self.sp = self.sp_plus_r8(offset);
                self.tick(2);
            }
            0xF8 => {
                let offset = self.fetch8(mmu);
                let res = self.sp_plus_r8(offset);
                self.set_hl(res);
                self.tick(1);
            }
            0xE9 => {
                self.pc = self.get_hl();
            }
            0xF9 => {
                self.sp = self.get_hl();
                self.tick(1);
            }
            0xEA => {
                let addr = self.fetch16(mmu);
                self.write8(mmu, addr, self.a);
            }
            0xFA => {
                let addr = self.fetch16(mmu);
                self.a = self.read8(mmu, addr);
            }
            0xF3 => {
                self.ime = false;
                self.ime_enable_delay = 0;
            }
            0xFB => {
                // IME is committed after the *next* instruction completes.
                self.ime_enable_delay = 2;
            }
            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                return Err(CpuFault::IllegalOpcode {
                    opcode,
                    pc: self.pc.wrapping_sub(1),
                });
            }
        }
        Ok(())
    }

    fn execute_cb(&mut self, mmu: &mut Mmu, opcode: u8) {
        let r = opcode & 0x07;
        match opcode {
            0x00..=0x07 => {
                let val = self.read_reg(mmu, r);
                let res = val.rotate_left(1);
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x80 != 0 { FLAG_C } else { 0 },
                );
            }
            0x08..=0x0F => {
                let val = self.read_reg(mmu, r);
                let res = val.rotate_right(1);
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 },
                );
            }
            0x10..=0x17 => {
                let val = self.read_reg(mmu, r);
                let res = (val << 1) | if self.f & FLAG_C != 0 { 1 } else { 0 };
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x80 != 0 { FLAG_C } else { 0 },
                );
            }
            0x18..=0x1F => {
                let val = self.read_reg(mmu, r);
                let res = (val >> 1) | if self.f & FLAG_C != 0 { 0x80 } else { 0 };
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 },
                );
            }
            0x20..=0x27 => {
                let val = self.read_reg(mmu, r);
                let res = val << 1;
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x80 != 0 { FLAG_C } else { 0 },
                );
            }
            0x28..=0x2F => {
                // SRA keeps the sign bit.
                let val = self.read_reg(mmu, r);
                let res = (val >> 1) | (val & 0x80);
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 },
                );
            }
            0x30..=0x37 => {
                let val = self.read_reg(mmu, r);
                let res = val.rotate_left(4);
                self.write_reg(mmu, r, res);
                self.set_f(if res == 0 { FLAG_Z } else { 0 });
            }
            0x38..=0x3F => {
                let val = self.read_reg(mmu, r);
                let res = val >> 1;
                self.write_reg(mmu, r, res);
                self.set_f(
                    if res == 0 { FLAG_Z } else { 0 } | if val & 0x01 != 0 { FLAG_C } else { 0 },
                );
            }
            0x40..=0x7F => {
                // BIT only reads; even the (HL) form never writes back.
                let bit = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                self.set_f(
                    (self.f & FLAG_C)
                        | FLAG_H
                        | if val & (1 << bit) == 0 { FLAG_Z } else { 0 },
                );
            }
            0x80..=0xBF => {
                let bit = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                self.write_reg(mmu, r, val & !(1 << bit));
            }
            0xC0..=0xFF => {
                let bit = (opcode >> 3) & 0x07;
                let val = self.read_reg(mmu, r);
                self.write_reg(mmu, r, val | (1 << bit));
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
