//! Shared constants for the social publishing API

/// File extensions treated as video when classifying draft media
pub const VIDEO_EXTENSIONS: [&str; 6] = [".mp4", ".mov", ".avi", ".webm", ".mpeg", ".m4v"];

/// Title sent to the aggregation service when a draft has no text content
pub const DEFAULT_POST_TITLE: &str = "Shared via Meridian";

/// The aggregation service caps video titles
pub const MAX_TITLE_LEN: usize = 280;

/// Platforms offered in the connect flow when the caller doesn't pick any
pub const DEFAULT_CONNECT_PLATFORMS: [&str; 9] = [
    "linkedin",
    "instagram",
    "facebook",
    "x",
    "tiktok",
    "youtube",
    "threads",
    "pinterest",
    "bluesky",
];

/// Storage bucket for draft media
pub const MEDIA_BUCKET: &str = "social-media";

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];
pub const ALLOWED_VIDEO_TYPES: [&str; 4] =
    ["video/mp4", "video/quicktime", "video/webm", "video/mpeg"];

pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024; // 10 MB
pub const MAX_VIDEO_SIZE: usize = 100 * 1024 * 1024; // 100 MB

/// Request body cap for media uploads
pub const MAX_MEDIA_UPLOAD_SIZE: usize = 110 * 1024 * 1024;
