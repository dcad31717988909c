use dmg_core::{interrupts::Interrupt, mmu::Mmu};

fn mmu_with_rom(rom: Vec<u8>) -> Mmu {
    let mut mmu = Mmu::new();
    mmu.load_rom(rom).unwrap();
    mmu
}

/// 64-bank MBC1 image with the bank number stamped at each bank's first byte.
fn banked_rom(banks: usize) -> Vec<u8> {
    let mut rom = vec![0u8; banks * 0x4000];
    rom[0x0147] = 0x01; // MBC1
    for bank in 0..banks {
        rom[bank * 0x4000] = bank as u8;
    }
    rom
}

#[test]
fn rom_reads_map_bank0_and_bank1() {
    let mut rom = vec![0u8; 0x8000];
    for (i, byte) in rom.iter_mut().enumerate() {
        *byte = i as u8;
    }
    let mmu = mmu_with_rom(rom.clone());

    assert_eq!(mmu.read_byte(0x1234), 0x34);
    assert_eq!(mmu.read_byte(0x4100), rom[0x4100]);
}

#[test]
fn open_bus_without_a_cartridge() {
    let mmu = Mmu::new();
    assert_eq!(mmu.read_byte(0x0000), 0xFF);
    assert_eq!(mmu.read_byte(0x4000), 0xFF);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn writable_regions_round_trip() {
    let mut mmu = Mmu::new();
    for addr in [0x8000u16, 0x9FFF, 0xC000, 0xCFFF, 0xD000, 0xDFFF, 0xFE00, 0xFE9F, 0xFF80, 0xFFFE]
    {
        mmu.write_byte(addr, 0x5A);
        assert_eq!(mmu.read_byte(addr), 0x5A, "addr {addr:#06X}");
        mmu.write_byte(addr, 0xA5);
        assert_eq!(mmu.read_byte(addr), 0xA5, "addr {addr:#06X}");
    }
}

#[test]
fn rom_writes_never_hit_storage() {
    let mmu_rom = vec![0x11u8; 0x8000];
    let mut mmu = mmu_with_rom(mmu_rom);
    mmu.write_byte(0x0100, 0x99);
    assert_eq!(mmu.read_byte(0x0100), 0x11);
}

#[test]
fn echo_region_aliases_wram() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xC000, 0xAA);
    assert_eq!(mmu.read_byte(0xE000), 0xAA);

    mmu.write_byte(0xE123, 0xBB);
    assert_eq!(mmu.read_byte(0xC123), 0xBB);

    // Top of the echo window maps to 0xDDFF.
    mmu.write_byte(0xDDFF, 0xCC);
    assert_eq!(mmu.read_byte(0xFDFF), 0xCC);

    for addr in [0xE000u16, 0xE800, 0xF000, 0xFDFF] {
        assert_eq!(
            mmu.read_byte(addr),
            mmu.read_byte(addr - 0x2000),
            "echo mismatch at {addr:#06X}"
        );
    }
}

#[test]
fn prohibited_region_reads_ff_ignores_writes() {
    let mut mmu = Mmu::new();
    for addr in [0xFEA0u16, 0xFEC3, 0xFEFF] {
        mmu.write_byte(addr, 0x12);
        assert_eq!(mmu.read_byte(addr), 0xFF);
    }
}

#[test]
fn io_registers_are_pass_through_storage() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF40, 0x91);
    assert_eq!(mmu.read_byte(0xFF40), 0x91);
    mmu.write_byte(0xFF7F, 0x33);
    assert_eq!(mmu.read_byte(0xFF7F), 0x33);
}

#[test]
fn if_keeps_five_bits_ie_keeps_eight() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xFF0F, 0xFF);
    assert_eq!(mmu.read_byte(0xFF0F), 0x1F);
    mmu.write_byte(0xFFFF, 0xAA);
    assert_eq!(mmu.read_byte(0xFFFF), 0xAA);
}

#[test]
fn interrupt_raise_clear_pending() {
    let mut mmu = Mmu::new();
    mmu.request_interrupt(Interrupt::Timer);
    mmu.request_interrupt(Interrupt::Serial);
    assert_eq!(mmu.if_reg, 0x0C);

    // Pending is gated by IE.
    assert_eq!(mmu.pending_interrupts(), 0);
    mmu.write_byte(0xFFFF, 0x04);
    assert_eq!(mmu.pending_interrupts(), 0x04);

    mmu.clear_interrupt(Interrupt::Timer);
    assert_eq!(mmu.if_reg, 0x08);
    assert_eq!(mmu.pending_interrupts(), 0);
}

#[test]
fn oam_dma_copies_160_bytes() {
    let mut mmu = Mmu::new();
    for i in 0..0xA0u16 {
        mmu.write_byte(0xC000 + i, i as u8);
    }
    mmu.write_byte(0xFF46, 0xC0);
    assert_eq!(mmu.oam[0x00], 0x00);
    assert_eq!(mmu.oam[0x42], 0x42);
    assert_eq!(mmu.oam[0x9F], 0x9F);
    assert_eq!(mmu.read_byte(0xFE9F), 0x9F);
    // The register latches its last value.
    assert_eq!(mmu.read_byte(0xFF46), 0xC0);
}

#[test]
fn oam_dma_reads_from_rom_source() {
    let mut rom = vec![0u8; 0x8000];
    for (i, byte) in rom[0x2000..0x20A0].iter_mut().enumerate() {
        *byte = (0xA0 - i) as u8;
    }
    let mut mmu = mmu_with_rom(rom);
    mmu.write_byte(0xFF46, 0x20);
    assert_eq!(mmu.oam[0], 0xA0);
    assert_eq!(mmu.oam[0x9F], 0x01);
}

#[test]
fn mbc1_ram_enable_gates_external_ram() {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03; // MBC1 + RAM + Battery
    rom[0x0149] = 0x03; // 32KB RAM
    let mut mmu = mmu_with_rom(rom);

    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);

    mmu.write_byte(0x0000, 0x0A); // enable RAM
    mmu.write_byte(0xA000, 0x55);
    assert_eq!(mmu.read_byte(0xA000), 0x55);

    mmu.write_byte(0x0000, 0x00); // disable RAM
    assert_eq!(mmu.read_byte(0xA000), 0xFF);

    // Only the 0x0A pattern in the low nibble enables.
    mmu.write_byte(0x0000, 0xBA);
    assert_eq!(mmu.read_byte(0xA000), 0x55);
    mmu.write_byte(0x0000, 0x0B);
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
}

#[test]
fn mbc1_rom_bank_switching() {
    let mut mmu = mmu_with_rom(banked_rom(64));

    // Default bank 1 at 0x4000
    assert_eq!(mmu.read_byte(0x4000), 1);

    mmu.write_byte(0x2000, 0x02);
    assert_eq!(mmu.read_byte(0x4000), 2);

    mmu.write_byte(0x4000, 0x01); // high bits 1 -> bank 0x22
    assert_eq!(mmu.read_byte(0x4000), 0x22);

    mmu.write_byte(0x2000, 0x1F);
    mmu.write_byte(0x4000, 0x01);
    assert_eq!(mmu.read_byte(0x4000), 0x3F);

    // Bank 0 stays fixed at 0x0000 throughout.
    assert_eq!(mmu.read_byte(0x0000), 0);
}

#[test]
fn mbc1_zero_bank_writes_coerce_to_one() {
    let mut mmu = mmu_with_rom(banked_rom(64));

    for val in [0x00u8, 0x20, 0x40, 0x60] {
        mmu.write_byte(0x4000, 0x00);
        mmu.write_byte(0x2000, val);
        assert_eq!(mmu.read_byte(0x4000), 1, "wrote {val:#04X}");
    }

    // With high bits set the coerced low field still lands on an odd bank.
    mmu.write_byte(0x2000, 0x20);
    mmu.write_byte(0x4000, 0x01);
    assert_eq!(mmu.read_byte(0x4000), 0x21);
}

#[test]
fn mbc1_bank_number_masked_to_rom_size() {
    let mut mmu = mmu_with_rom(banked_rom(4));
    mmu.write_byte(0x2000, 0x05); // 5 % 4 banks
    assert_eq!(mmu.read_byte(0x4000), 1);
    mmu.write_byte(0x2000, 0x07);
    assert_eq!(mmu.read_byte(0x4000), 3);
}

#[test]
fn mbc1_ram_banking_mode() {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x03;
    rom[0x0149] = 0x03; // 4 RAM banks
    let mut mmu = mmu_with_rom(rom);

    mmu.write_byte(0x0000, 0x0A);
    mmu.write_byte(0x6000, 0x01); // advanced banking mode
    mmu.write_byte(0x4000, 0x02); // RAM bank 2
    mmu.write_byte(0xA000, 0x77);
    assert_eq!(mmu.read_byte(0xA000), 0x77);

    mmu.write_byte(0x4000, 0x00); // RAM bank 0
    assert_eq!(mmu.read_byte(0xA000), 0x00);
    mmu.write_byte(0xA000, 0x11);

    // Simple mode always maps bank 0.
    mmu.write_byte(0x4000, 0x02);
    mmu.write_byte(0x6000, 0x00);
    assert_eq!(mmu.read_byte(0xA000), 0x11);
}

#[test]
fn reset_clears_ram_but_keeps_rom() {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x02; // MBC1 + RAM
    rom[0x0149] = 0x02;
    rom[0x0100] = 0xDE;
    let mut mmu = mmu_with_rom(rom);

    mmu.write_byte(0x8000, 0x11);
    mmu.write_byte(0xC000, 0x22);
    mmu.write_byte(0xFE00, 0x33);
    mmu.write_byte(0xFF80, 0x44);
    mmu.write_byte(0xFFFF, 0x1F);
    mmu.request_interrupt(Interrupt::VBlank);
    mmu.write_byte(0x0000, 0x0A);
    mmu.write_byte(0xA000, 0x55);
    mmu.write_byte(0x2000, 0x02);

    mmu.reset();

    assert_eq!(mmu.read_byte(0x8000), 0x00);
    assert_eq!(mmu.read_byte(0xC000), 0x00);
    assert_eq!(mmu.read_byte(0xFE00), 0x00);
    assert_eq!(mmu.read_byte(0xFF80), 0x00);
    assert_eq!(mmu.read_byte(0xFFFF), 0x00);
    assert_eq!(mmu.if_reg, 0x00);
    // ROM image and bank registers back to power-on defaults.
    assert_eq!(mmu.read_byte(0x0100), 0xDE);
    assert_eq!(mmu.read_byte(0x4000), 0x00);
    // RAM enable latch was cleared and contents zeroed.
    assert_eq!(mmu.read_byte(0xA000), 0xFF);
    mmu.write_byte(0x0000, 0x0A);
    assert_eq!(mmu.read_byte(0xA000), 0x00);
}
