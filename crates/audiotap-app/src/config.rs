//! Configuration constants for audiotap app services

/// Application metadata
pub mod app {
    /// Application name (used for config directory, etc.)
    pub const NAME: &str = "audiotap";
}

/// Upload collaborator
pub mod upload {
    /// Base URL of the upload service
    pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

    /// Path appended to the base URL
    pub const UPLOAD_PATH: &str = "/upload";

    /// Multipart field carrying the file
    pub const UPLOAD_FIELD: &str = "file";
}

/// File-type gate
pub mod gate {
    /// MIME types the gate lets through
    pub const ALLOWED_TYPES: [&str; 3] = ["audio/mpeg", "audio/wav", "audio/mp4"];

    /// Shown when a file is rejected
    pub const REJECTION_MESSAGE: &str = "Please upload an MP3, WAV, or MP4 file";
}

/// HTTP client settings
pub mod network {
    pub const USER_AGENT: &str = concat!("audiotap/", env!("CARGO_PKG_VERSION"));

    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Whole-request timeout; uploads can be large
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
}
