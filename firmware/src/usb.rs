//! USB composite device: XAC HID gamepad plus a CDC-ACM command port.

use breath_core::{GamepadSink, OutputError, XacReport};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::{self, CdcAcmClass};
use embassy_usb::class::hid::{self, HidWriter, ReportId, RequestHandler};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Handler};
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};

use crate::config::CDC_PACKET_SIZE;

/// RP2040 USB driver.
pub type UsbDriver = Driver<'static, USB>;

/// One CDC OUT packet.
pub type CommandPacket = Vec<u8, CDC_PACKET_SIZE>;

/// Set while the host has the device configured.
static USB_CONFIGURED: AtomicBool = AtomicBool::new(false);

/// Xbox Adaptive Controller compatible gamepad descriptor.
///
/// Report 5: X and Y as unsigned 8-bit axes, then buttons 1-8 as one byte.
pub const XAC_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x05, //   Report ID (5)
    //
    // --- Stick ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Buttons (8 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x08, //   Usage Maximum (Button 8)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

/// Tracks the configured state of the device for [`UsbGamepad::is_ready`].
pub struct UsbStateHandler;

impl Handler for UsbStateHandler {
    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED.store(configured, Ordering::Relaxed);
        if configured {
            defmt::info!("USB configured");
        } else {
            defmt::info!("USB unconfigured");
        }
    }

    fn reset(&mut self) {
        USB_CONFIGURED.store(false, Ordering::Relaxed);
    }
}

/// XAC gamepad over USB HID.
pub struct UsbGamepad {
    writer: HidWriter<'static, UsbDriver, { XacReport::SIZE }>,
}

impl UsbGamepad {
    #[must_use]
    pub fn new(writer: HidWriter<'static, UsbDriver, { XacReport::SIZE }>) -> Self {
        Self { writer }
    }
}

impl GamepadSink for UsbGamepad {
    async fn send(&mut self, report: &XacReport) -> Result<(), OutputError> {
        self.writer
            .write(&report.to_bytes())
            .await
            .map_err(endpoint_error_to_output_error)
    }

    fn is_ready(&self) -> bool {
        USB_CONFIGURED.load(Ordering::Relaxed)
    }
}

#[inline]
fn endpoint_error_to_output_error(e: EndpointError) -> OutputError {
    match e {
        EndpointError::Disabled => OutputError::NotReady,
        EndpointError::BufferOverflow => OutputError::Io,
    }
}

/// HID request handler. The gamepad has no output or feature reports.
pub struct GamepadRequestHandler;

impl RequestHandler for GamepadRequestHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Add the XAC HID interface to the builder.
pub fn configure_usb_hid(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut hid::State<'static>,
    handler: &'static mut GamepadRequestHandler,
) -> HidWriter<'static, UsbDriver, { XacReport::SIZE }> {
    let config = hid::Config {
        report_descriptor: XAC_REPORT_DESCRIPTOR,
        request_handler: Some(handler),
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: hid::HidSubclass::No,
        hid_boot_protocol: hid::HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}

/// Add the CDC-ACM command port to the builder.
pub fn configure_usb_cdc(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut cdc_acm::State<'static>,
) -> (cdc_acm::Sender<'static, UsbDriver>, cdc_acm::Receiver<'static, UsbDriver>) {
    CdcAcmClass::new(builder, state, CDC_PACKET_SIZE as u16).split()
}

/// Write one reply line as a sequence of CDC packets.
///
/// A reply that ends on a packet boundary is closed with a zero-length
/// packet so the host flushes it.
pub async fn write_reply(
    sender: &mut cdc_acm::Sender<'static, UsbDriver>,
    line: &str,
) -> Result<(), EndpointError> {
    let bytes = line.as_bytes();
    for packet in bytes.chunks(CDC_PACKET_SIZE) {
        sender.write_packet(packet).await?;
    }
    if bytes.len() % CDC_PACKET_SIZE == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}

/// Turns CDC packets into text chunks.
///
/// A UTF-8 sequence split across two packets is carried over to the next
/// one. A packet holding invalid UTF-8 is cut at the first bad byte.
#[derive(Default)]
pub struct PacketDecoder {
    carry: Vec<u8, 4>,
    scratch: Vec<u8, { CDC_PACKET_SIZE + 4 }>,
}

impl PacketDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `packet`, prefixed by any bytes carried from the last one.
    pub fn decode(&mut self, packet: &[u8]) -> &str {
        self.scratch.clear();
        // Both fit: carry is at most 3 bytes, packet at most one CDC packet
        let _ = self.scratch.extend_from_slice(&self.carry);
        let _ = self.scratch.extend_from_slice(packet);
        self.carry.clear();

        let valid = match core::str::from_utf8(&self.scratch) {
            Ok(_) => self.scratch.len(),
            Err(e) => {
                let valid = e.valid_up_to();
                match e.error_len() {
                    // Incomplete sequence at the end: keep it for the next packet
                    None => {
                        let _ = self.carry.extend_from_slice(&self.scratch[valid..]);
                    }
                    Some(_) => defmt::warn!("Dropped invalid UTF-8 from host"),
                }
                valid
            }
        };

        core::str::from_utf8(&self.scratch[..valid]).unwrap_or_default()
    }
}
