//! USB HID keyboard
//!
//! A single boot-compatible keyboard interface. The engine side hands reports
//! to [`UsbReportSink`]; [`usb_task`] runs the device and forwards them.

use embassy_futures::block_on;
use embassy_futures::join::join;
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_rp::{bind_interrupts, peripherals};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config};
use static_cell::StaticCell;
use usbd_hid::descriptor::{KeyboardReport, SerializedDescriptor};

use crate::channels::KEYBOARD_REPORT_CHANNEL;
use crate::constants::*;
use crate::hid::{HidError, ReportSink};

bind_interrupts!(pub struct Irqs {
    USBCTRL_IRQ => InterruptHandler<peripherals::USB>;
});

// ===================================================================
// USB Configuration
// ===================================================================

const USB_BUF_SIZE: usize = 128;

fn create_usb_config() -> Config<'static> {
    let mut config = Config::new(USB_VID, USB_PID);
    config.manufacturer = Some(USB_MANUFACTURER);
    config.product = Some(USB_PRODUCT);
    config.serial_number = Some(USB_SERIAL);
    config.max_power = 100;
    config.max_packet_size_0 = 64;
    config
}

// ===================================================================
// Report Sink
// ===================================================================

/// Queues reports for [`usb_task`].
///
/// Blocks while the queue is full, so a host that stops polling stalls the
/// engine instead of dropping key releases.
pub struct UsbReportSink;

impl ReportSink for UsbReportSink {
    fn send(&mut self, report: &KeyboardReport) -> Result<(), HidError> {
        let report = KeyboardReport {
            modifier: report.modifier,
            reserved: 0,
            leds: 0,
            keycodes: report.keycodes,
        };
        block_on(KEYBOARD_REPORT_CHANNEL.send(report));
        Ok(())
    }
}

// ===================================================================
// USB Task Implementation
// ===================================================================

#[embassy_executor::task]
pub async fn usb_task(driver: Driver<'static, peripherals::USB>) {
    info!("USB task started");

    static CONFIG_DESC: StaticCell<[u8; USB_BUF_SIZE]> = StaticCell::new();
    static BOS_DESC: StaticCell<[u8; 16]> = StaticCell::new();
    static MSOS_DESC: StaticCell<[u8; 16]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; USB_BUF_SIZE]> = StaticCell::new();
    let mut builder = Builder::new(
        driver,
        create_usb_config(),
        &mut CONFIG_DESC.init([0; USB_BUF_SIZE])[..],
        &mut BOS_DESC.init([0; 16])[..],
        &mut MSOS_DESC.init([0; 16])[..],
        &mut CONTROL_BUF.init([0; USB_BUF_SIZE])[..],
    );

    static HID_STATE: StaticCell<State> = StaticCell::new();
    let hid_config = HidConfig {
        report_descriptor: KeyboardReport::desc(),
        request_handler: None,
        poll_ms: USB_POLL_RATE_MS,
        max_packet_size: 64,
    };
    let mut writer =
        HidWriter::<_, HID_REPORT_SIZE>::new(&mut builder, HID_STATE.init(State::new()), hid_config);

    let mut usb = builder.build();
    let usb_fut = usb.run();

    let report_fut = async {
        loop {
            let report = KEYBOARD_REPORT_CHANNEL.receive().await;
            match writer.write_serialize(&report).await {
                Ok(()) => trace!("Keyboard report sent: {:?}", report.keycodes),
                Err(e) => warn!("Failed to send keyboard report: {:?}", e),
            }
        }
    };

    join(usb_fut, report_fut).await;
}
