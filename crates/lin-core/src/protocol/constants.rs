use std::time::Duration;

// Header
pub const SYNC_BYTE: u8 = 0x55;
/// A received break field reads back as a framing-error byte of all zeros.
pub const BREAK_BYTE: u8 = 0x00;
pub const BREAK_BIT_TIMES: u32 = 13;

// Identifier space
pub const MAX_IDENTIFIER: u8 = 0x3F;
pub const IDENTIFIER_MASK: u8 = 0x3F;
pub const LAST_SIGNAL_IDENTIFIER: u8 = 0x3B; // 59
pub const MASTER_REQUEST_ID: u8 = 0x3C; // 60, diagnostic
pub const SLAVE_RESPONSE_ID: u8 = 0x3D; // 61, diagnostic
pub const USER_DEFINED_ID: u8 = 0x3E; // 62

// Response
pub const MAX_DATA_LEN: usize = 8;

// Network management
pub const WAKE_UP_PULSE_MIN: Duration = Duration::from_micros(250);
pub const WAKE_UP_PULSE_MAX: Duration = Duration::from_millis(5);
pub const WAKE_UP_PULSE_DEFAULT: Duration = Duration::from_millis(1);
pub const WAKE_UP_READY_WINDOW: Duration = Duration::from_millis(100);
pub const BUS_IDLE_SLEEP_TIMEOUT: Duration = Duration::from_secs(4);

pub const GOTO_SLEEP_ID: u8 = MASTER_REQUEST_ID;
pub const GOTO_SLEEP_COMMAND: u8 = 0x00;
pub const SLEEP_FILLER_DEFAULT: u8 = 0xFF;

// Serial defaults
pub const DEFAULT_BAUD_RATE: u32 = 19_200;
pub const DEFAULT_DEVICE: &str = "/dev/serial0";
