#![no_std]
#![no_main]

extern crate alloc;

use alloc::string::String;
use breath_core::{
    Actuators, BreathEngine, BreathSource, OutputError, Response, SettingsStore, Timestamp,
};
use breath_gamepad::config::{
    CDC_PACKET_SIZE, COMMAND_QUEUE_LEN, DFPLAYER_BAUDRATE, FAULT_PAUSE, HEAP_SIZE,
    MAX_OUTPUT_FAILURES, POLL_PERIOD, REPLY_QUEUE_LEN, SENSOR_BAUDRATE, USB_MANUFACTURER,
    USB_PID, USB_PRODUCT, USB_SERIAL, USB_VID,
};
use breath_gamepad::{
    configure_usb_cdc, configure_usb_hid, write_reply, CommandPacket, DfPlayer,
    FlashSettingsStore, GamepadRequestHandler, GpioTriggers, LedRing, PacketDecoder,
    StatusPixel, UartBreathSource, UsbDriver, UsbGamepad, UsbStateHandler,
};
use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_rp::bind_interrupts;
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{PIO0, UART0, USB};
use embassy_rp::pio::{self, Pio};
use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
use embassy_rp::uart::{self, Config as UartConfig, UartRx, UartTx};
use embassy_rp::usb::{self as rp_usb, Driver};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Instant, Ticker, Timer};
use embassy_usb::class::{cdc_acm, hid};
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART0_IRQ => uart::InterruptHandler<UART0>;
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
    USBCTRL_IRQ => rp_usb::InterruptHandler<USB>;
});

#[global_allocator]
static HEAP: Heap = Heap::empty();

type ReadingSignal = Signal<CriticalSectionRawMutex, f32>;
type CommandQueue = Channel<CriticalSectionRawMutex, CommandPacket, COMMAND_QUEUE_LEN>;
type ReplyQueue = Channel<CriticalSectionRawMutex, String, REPLY_QUEUE_LEN>;

/// Latest sensor reading. A reading not yet consumed is replaced by a
/// newer one.
static READING_SIGNAL: StaticCell<ReadingSignal> = StaticCell::new();

/// CDC packets waiting for the control loop.
static COMMAND_QUEUE: StaticCell<CommandQueue> = StaticCell::new();

/// Response lines waiting for the CDC writer.
static REPLY_QUEUE: StaticCell<ReplyQueue> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// USB class state.
static HID_STATE: StaticCell<hid::State> = StaticCell::new();
static CDC_STATE: StaticCell<cdc_acm::State> = StaticCell::new();
static HID_REQUEST_HANDLER: StaticCell<GamepadRequestHandler> = StaticCell::new();
static USB_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();

fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    // SAFETY: runs once, before the first allocation
    unsafe { HEAP.init(core::ptr::addr_of_mut!(HEAP_MEM) as usize, HEAP_SIZE) }
}

#[inline]
fn now() -> Timestamp {
    Timestamp::from_millis(Instant::now().as_millis())
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Breath gamepad starting...");
    init_heap();

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    let readings = READING_SIGNAL.init(Signal::new());
    let commands = COMMAND_QUEUE.init(Channel::new());
    let replies = REPLY_QUEUE.init(Channel::new());

    // --- Settings ---
    let mut storage = FlashSettingsStore::new(Flash::new_blocking(p.FLASH));
    let mut engine = BreathEngine::new(SettingsStore::new());
    if engine.load_settings(&mut storage) {
        info!("Settings loaded from flash");
    } else {
        info!("Using default settings");
    }

    // --- Sensor UART ---
    let mut sensor_config = UartConfig::default();
    sensor_config.baudrate = SENSOR_BAUDRATE;
    let sensor_rx = UartRx::new(p.UART0, p.PIN_1, Irqs, p.DMA_CH0, sensor_config);
    let sensor = UartBreathSource::new(sensor_rx);

    // --- DFPlayer UART ---
    let mut player_config = UartConfig::default();
    player_config.baudrate = DFPLAYER_BAUDRATE;
    let player_tx = UartTx::new(p.UART1, p.PIN_4, p.DMA_CH1, player_config);

    // --- LEDs ---
    let Pio {
        mut common, sm0, sm1, ..
    } = Pio::new(p.PIO0, Irqs);
    let ws2812 = PioWs2812Program::new(&mut common);
    let ring = LedRing::new(PioWs2812::new(&mut common, sm0, p.DMA_CH2, p.PIN_14, &ws2812));
    let status = StatusPixel::new(PioWs2812::new(&mut common, sm1, p.DMA_CH3, p.PIN_16, &ws2812));

    // --- Triggers ---
    let triggers = GpioTriggers::new(
        Output::new(p.PIN_8, Level::Low),
        Output::new(p.PIN_19, Level::Low),
    );

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some(USB_MANUFACTURER);
    usb_config.product = Some(USB_PRODUCT);
    usb_config.serial_number = Some(USB_SERIAL);
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;
    // Composite device: CDC needs an interface association descriptor
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );
    builder.handler(USB_HANDLER.init(UsbStateHandler));

    let (cdc_sender, cdc_receiver) =
        configure_usb_cdc(&mut builder, CDC_STATE.init(cdc_acm::State::new()));
    let hid_writer = configure_usb_hid(
        &mut builder,
        HID_STATE.init(hid::State::new()),
        HID_REQUEST_HANDLER.init(GamepadRequestHandler),
    );

    let usb_device = builder.build();

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(sensor_task(sensor, readings).unwrap());
    spawner.spawn(command_task(cdc_receiver, commands).unwrap());
    spawner.spawn(reply_task(cdc_sender, replies).unwrap());

    let mut actuators = Actuators {
        gamepad: Some(UsbGamepad::new(hid_writer)),
        ring: Some(ring),
        triggers: Some(triggers),
        audio: Some(DfPlayer::new(player_tx)),
        status: Some(status),
    };

    info!("Breath gamepad initialized, waiting for readings...");

    let mut decoder = PacketDecoder::new();
    let mut ticker = Ticker::every(POLL_PERIOD);
    let mut failures: u8 = 0;

    loop {
        let outputs = match select3(readings.wait(), commands.receive(), ticker.next()).await {
            Either3::First(value) => engine.process_reading(value, now()),
            Either3::Second(packet) => {
                engine.process_command(decoder.decode(&packet), now(), &mut storage)
            }
            Either3::Third(()) => engine.poll(now()),
        };

        if let Some(reply) = &outputs.reply {
            queue_reply(replies, reply);
        }

        match actuators.apply(&outputs).await {
            Ok(()) => failures = 0,
            // Host has not configured the gamepad yet; send everything again once it has
            Err(OutputError::NotReady) => engine.resync(),
            Err(e) => {
                warn!("Output error: {:?}", e);
                engine.resync();
                failures = failures.saturating_add(1);
                if failures >= MAX_OUTPUT_FAILURES {
                    error!("Outputs failing, pausing");
                    if let Err(e) = actuators.apply(&engine.fault()).await {
                        error!("Fault indicator failed: {:?}", e);
                    }
                    Timer::after(FAULT_PAUSE).await;
                    failures = 0;
                    engine.resync();
                }
            }
        }
    }
}

/// Hand a reply to the CDC writer. Sensor echoes are dropped silently when
/// the host is not reading.
fn queue_reply(replies: &ReplyQueue, reply: &Response) {
    if replies.try_send(reply.to_line()).is_err() && !matches!(reply, Response::BreathData(_)) {
        warn!("Reply dropped: {}", reply.tag());
    }
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Sensor task - reads sensor lines and signals the latest reading.
#[embassy_executor::task]
async fn sensor_task(mut sensor: UartBreathSource<'static>, readings: &'static ReadingSignal) {
    loop {
        match sensor.receive().await {
            Ok(value) => readings.signal(value),
            Err(e) => warn!("Sensor line dropped: {:?}", e),
        }
    }
}

/// Command task - forwards CDC packets to the control loop.
#[embassy_executor::task]
async fn command_task(
    mut receiver: cdc_acm::Receiver<'static, UsbDriver>,
    commands: &'static CommandQueue,
) {
    let mut buf = [0u8; CDC_PACKET_SIZE];
    loop {
        receiver.wait_connection().await;
        info!("Command port connected");

        while let Ok(len) = receiver.read_packet(&mut buf).await {
            // A packet never exceeds the buffer capacity
            if let Ok(packet) = CommandPacket::from_slice(&buf[..len]) {
                commands.send(packet).await;
            }
        }

        info!("Command port disconnected");
    }
}

/// Reply task - writes response lines to the CDC port.
#[embassy_executor::task]
async fn reply_task(
    mut sender: cdc_acm::Sender<'static, UsbDriver>,
    replies: &'static ReplyQueue,
) {
    loop {
        sender.wait_connection().await;

        loop {
            let line = replies.receive().await;
            if write_reply(&mut sender, &line).await.is_err() {
                break;
            }
        }
    }
}
