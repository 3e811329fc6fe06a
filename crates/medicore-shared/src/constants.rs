/// Application name
pub const APP_NAME: &str = "MediCore";

/// Tagline shown next to the brand name
pub const APP_TAGLINE: &str = "Streamline Care. Empower Healing.";

/// Session token lifetime in hours
pub const SESSION_TTL_HOURS: i64 = 24;

/// Storage key holding the encoded session token (one per tier)
pub const TOKEN_STORAGE_KEY: &str = "medicore_token";

/// Storage key holding the serialized user record (one per tier)
pub const USER_STORAGE_KEY: &str = "medicore_user";

/// Durable storage key holding the hex-encoded token signing key
pub const SIGNING_KEY_STORAGE_KEY: &str = "medicore_signing_key";

/// Durable storage key holding the JSON settings blob
pub const SETTINGS_STORAGE_KEY: &str = "medicore_settings";

/// Simulated network latency of the auth endpoints, in milliseconds
pub const LOGIN_LATENCY_MS: u64 = 1_000;
pub const REGISTER_LATENCY_MS: u64 = 1_500;
pub const RESET_PASSWORD_LATENCY_MS: u64 = 1_000;

/// Simulated device probe delays, in milliseconds
pub const CAMERA_CHECK_MS: u64 = 1_000;
pub const MICROPHONE_CHECK_MS: u64 = 1_500;
pub const SPEAKERS_CHECK_MS: u64 = 2_000;
pub const INTERNET_CHECK_MS: u64 = 2_500;

/// Delay before the simulated doctor flips from busy to ready
pub const DOCTOR_READY_SECS: u64 = 30;

/// Upper bound for a single device probe attempt
pub const DEVICE_CHECK_TIMEOUT_SECS: u64 = 10;

/// Attempts per device check before it is reported as failed
pub const DEVICE_CHECK_ATTEMPTS: u32 = 2;

/// How long the "call ended" view stays up before navigating back
pub const CALL_ENDED_DISPLAY_SECS: u64 = 3;

/// Expected wait in the virtual waiting room (progress bar full scale)
pub const EXPECTED_WAIT_SECS: u64 = 300;

/// Bookable day: first slot hour (inclusive) and last hour (exclusive)
pub const FIRST_SLOT_HOUR: u32 = 9;
pub const LAST_SLOT_HOUR: u32 = 17;

/// Slot length and default appointment duration in minutes
pub const SLOT_MINUTES: u32 = 30;
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 30;

/// Key derivation context for password hashing (BLAKE3)
pub const KDF_CONTEXT_PASSWORD: &str = "medicore-password-v1";

/// Password salt size in bytes
pub const PASSWORD_SALT_SIZE: usize = 16;

/// Sender id used for system chat messages
pub const SYSTEM_SENDER_ID: &str = "system";

/// Welcome text posted when a consultation starts
pub const CALL_WELCOME_MESSAGE: &str =
    "Welcome to your video consultation. The doctor will be with you shortly.";
