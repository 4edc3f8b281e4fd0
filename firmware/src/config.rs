//! Hardware map and compile-time constants.
//!
//! | Function         | GPIO | Peripheral  | Notes                    |
//! |------------------|------|-------------|--------------------------|
//! | Sensor TX        | 0    | UART0       | unused                   |
//! | Sensor RX        | 1    | UART0       | 115200 8N1, one value/line |
//! | DFPlayer TX      | 4    | UART1       | 9600 8N1                 |
//! | DFPlayer RX      | 5    | UART1       | unused                   |
//! | Blow trigger     | 8    | GPIO out    | high while exhaling      |
//! | LED ring         | 14   | PIO0 SM0    | 12 x WS2812              |
//! | Status pixel     | 16   | PIO0 SM1    | 1 x WS2812               |
//! | Inhale trigger   | 19   | GPIO out    | high while inhaling      |
//!
//! The `blow_gpio_pin`/`inhale_gpio_pin` settings are stored and exported
//! but the trigger pins are fixed by the board.

use embassy_time::Duration;

/// Sensor UART baud rate.
pub const SENSOR_BAUDRATE: u32 = 115_200;

/// DFPlayer UART baud rate.
pub const DFPLAYER_BAUDRATE: u32 = breath_proto::DFPLAYER_BAUDRATE;

/// Pixels on the feedback ring.
pub const LED_COUNT: usize = 12;

/// Control loop poll period (PEP blink steps, sensor timeout).
pub const POLL_PERIOD: Duration = Duration::from_millis(20);

/// Consecutive failed output ticks treated as a loop-level fault.
pub const MAX_OUTPUT_FAILURES: u8 = 10;

/// Pause after a loop-level fault before resuming.
pub const FAULT_PAUSE: Duration = Duration::from_secs(1);

/// Total flash on the Pico.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Settings record lives in the last erase sector.
pub const SETTINGS_OFFSET: u32 = (FLASH_SIZE - embassy_rp::flash::ERASE_SIZE) as u32;

/// Heap for settings JSON and command reassembly.
pub const HEAP_SIZE: usize = 32 * 1024;

/// Replies queued for the CDC writer before new ones are dropped.
pub const REPLY_QUEUE_LEN: usize = 8;

/// Raw CDC packets queued for the control loop.
pub const COMMAND_QUEUE_LEN: usize = 4;

/// CDC-ACM max packet size.
pub const CDC_PACKET_SIZE: usize = 64;

// pid.codes test VID/PID
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;
pub const USB_MANUFACTURER: &str = "Breath Gamepad";
pub const USB_PRODUCT: &str = "Breath XAC Controller";
pub const USB_SERIAL: &str = "001";
