//! Protocol constants

/// Line terminator used in both directions
pub const LINE_TERMINATOR: &str = "\r\n";

/// Parameter sentinel for "no value" (e.g. no active scene)
pub const NULL_PARAM: &str = "xx";

/// Longest partial frame kept while waiting for a terminator or prompt
pub const MAX_FRAME_LENGTH: usize = 1024;

/// Default integration (telnet) port
pub const DEFAULT_PORT: u16 = 23;

/// Default integration login
pub const DEFAULT_USERNAME: &str = "nwk";

/// Login prompt (matched case-insensitively)
pub const DEFAULT_LOGIN_PROMPT: &str = "login: ";

/// Ready prompts: Quantum / QS processors and GRAFIK Eye / RA2 main repeaters
pub const DEFAULT_READY_PROMPTS: &[&str] = &["QNET> ", "GNET> "];

/// Explicit login acknowledgement some firmware prints before the prompt
pub const DEFAULT_LOGIN_SUCCESS: &str = "login successful";

/// Processor accepts one command per tick (milliseconds)
pub const DISPATCH_INTERVAL_MS: u64 = 250;

/// Minimum level delta that counts as a change
pub const DEFAULT_LEVEL_TOLERANCE: f64 = 0.001;

/// Button hold time for press/release-driven shades (milliseconds)
pub const DEFAULT_SHADE_PULSE_MS: u64 = 500;

/// Receive poll interval used by the link driver (milliseconds)
pub const RECEIVE_POLL_MS: u64 = 50;

/// Capacity of the device event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Keypad LED component = button number + offset
pub const KEYPAD_LED_OFFSET: u32 = 80;

/// GRAFIK Eye scene controller component
pub const SCENE_CONTROLLER_COMPONENT: u32 = 141;

/// Action numbers per command family
pub mod actions {
    /// `OUTPUT` actions (zones and output-driven shades)
    pub mod output {
        pub const LEVEL: u32 = 1;
        pub const START_RAISING: u32 = 2;
        pub const START_LOWERING: u32 = 3;
        pub const STOP: u32 = 4;
    }

    /// `AREA` actions
    pub mod area {
        pub const LEVEL: u32 = 1;
        pub const START_RAISING: u32 = 2;
        pub const START_LOWERING: u32 = 3;
        pub const STOP: u32 = 4;
        pub const SCENE: u32 = 6;
        pub const OCCUPANCY: u32 = 8;
    }

    /// `SHADEGRP` actions
    pub mod shade_group {
        pub const LEVEL: u32 = 1;
        pub const START_RAISING: u32 = 2;
        pub const START_LOWERING: u32 = 3;
        pub const STOP: u32 = 4;
    }

    /// `DEVICE` actions (keypads and GRAFIK Eye units)
    pub mod device {
        pub const PRESS: u32 = 3;
        pub const RELEASE: u32 = 4;
        pub const SCENE: u32 = 7;
        pub const LED_STATE: u32 = 9;
        pub const ZONE_LEVEL: u32 = 14;
        pub const ZONE_START_RAISING: u32 = 18;
        pub const ZONE_START_LOWERING: u32 = 19;
        pub const ZONE_STOP: u32 = 20;
    }
}
