//! Macropad firmware entry point
//!
//! Hardware: Raspberry Pi Pico (RP2040)
//! USB: HID boot keyboard
//! Configuration: `config.json` in the flash volume
//!
//! The engine runs in thread mode and blocks freely. The USB stack runs on a
//! software-interrupt executor so it keeps answering the host meanwhile.

#![no_std]
#![no_main]

use core::mem::MaybeUninit;
use core::ptr::addr_of_mut;

use cortex_m_rt::entry;
use defmt::*;
use embassy_executor::InterruptExecutor;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::usb::Driver;
use embassy_time::Delay;
use embedded_alloc::LlffHeap as Heap;
use {defmt_rtt as _, panic_halt as _};

use macropad::boot;
use macropad::clock::SystemClock;
use macropad::constants::*;
use macropad::engine::{self, MainLoop};
use macropad::fault;
use macropad::hardware::{FlashStorage, RpPins, ScbReset};
use macropad::hid::ReportKeyboard;
use macropad::usb::{usb_task, Irqs, UsbReportSink};

#[global_allocator]
static HEAP: Heap = Heap::empty();

static EXECUTOR_USB: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_USB.on_interrupt()
}

// ===================================================================
// Main Application Entry Point
// ===================================================================

#[entry]
fn main() -> ! {
    {
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe { HEAP.init(addr_of_mut!(HEAP_MEM) as usize, HEAP_SIZE) }
    }

    info!("========================================");
    info!("Macropad v{}", env!("CARGO_PKG_VERSION"));
    info!("USB: VID=0x{:04X} PID=0x{:04X}", USB_VID, USB_PID);
    info!("========================================");

    let p = embassy_rp::init(Default::default());

    let mut storage = FlashStorage::new(p.FLASH);
    let mut pins = RpPins::new([
        Some(p.PIN_0.into()),
        Some(p.PIN_1.into()),
        Some(p.PIN_2.into()),
        Some(p.PIN_3.into()),
        Some(p.PIN_4.into()),
        Some(p.PIN_5.into()),
        Some(p.PIN_6.into()),
        Some(p.PIN_7.into()),
        Some(p.PIN_8.into()),
        Some(p.PIN_9.into()),
        Some(p.PIN_10.into()),
        Some(p.PIN_11.into()),
        Some(p.PIN_12.into()),
        Some(p.PIN_13.into()),
        Some(p.PIN_14.into()),
        Some(p.PIN_15.into()),
        Some(p.PIN_16.into()),
        Some(p.PIN_17.into()),
        Some(p.PIN_18.into()),
        Some(p.PIN_19.into()),
        Some(p.PIN_20.into()),
        Some(p.PIN_21.into()),
        Some(p.PIN_22.into()),
        Some(p.PIN_23.into()),
        Some(p.PIN_24.into()),
        Some(p.PIN_25.into()),
        Some(p.PIN_26.into()),
        Some(p.PIN_27.into()),
        Some(p.PIN_28.into()),
        Some(p.PIN_29.into()),
    ]);

    // Decide who owns the volume before anything else touches it
    match boot::precheck(&mut pins, &mut storage) {
        Ok(decision) => info!("Storage: {}", decision),
        Err(e) => {
            error!("{}", e);
            fault::halt();
        }
    }

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner = EXECUTOR_USB.start(interrupt::SWI_IRQ_1);
    if let Err(e) = spawner.spawn(usb_task(Driver::new(p.USB, Irqs))) {
        error!("Failed to spawn USB task: {}", e);
        fault::halt();
    }

    let mut main_loop = MainLoop::new(
        ReportKeyboard::new(UsbReportSink),
        Delay,
        SystemClock,
        storage,
        ScbReset,
    );
    let error = engine::start(&mut pins, &mut main_loop);
    warn!("Engine stopped: {}", error);

    // The on-board LED may belong to the configuration; nothing else runs now.
    let led = unsafe { embassy_rp::peripherals::PIN_25::steal() };
    fault::blink_forever(Output::new(led, Level::Low), Delay)
}
