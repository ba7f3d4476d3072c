/// Application name
pub const APP_NAME: &str = "BukuKami";

/// Default base URL of the remote story service
pub const DEFAULT_API_BASE_URL: &str = "https://story-api.dicoding.dev/v1";

/// VAPID public key the story service signs push messages with (URL-safe base64)
pub const DEFAULT_VAPID_PUBLIC_KEY: &str =
    "BCCs2eonMI-6H2ctvFaWg-UYdDv387Vno_bzUzALpB442r2lCnsHmtrx8biyPi_E-1fSGABK_Qs_GlvPoJJqxbk";

/// Cache generation holding the install-time static asset snapshot
pub const STATIC_CACHE_NAME: &str = "pwa-cache-v1";

/// Cache generation holding network-first API responses
pub const API_CACHE_NAME: &str = "pwa-api-cache-v1";

/// Static asset manifest fetched on install, relative to the static origin
pub const STATIC_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./app.css",
    "./app.webmanifest",
    "./images/logo.png",
];

/// Icon and badge used for every notification
pub const NOTIFICATION_ICON: &str = "./images/logo.png";

/// Message body of the synthesized response served when neither the network
/// nor the API cache can answer
pub const OFFLINE_MESSAGE: &str = "Offline: data unavailable";

/// Header set on synthesized offline responses so clients can tell them
/// apart from a real 503 sent by the server
pub const OFFLINE_HEADER: &str = "x-bukukami-offline";

/// Notification action that deep-links into the compose view
pub const ACTION_OPEN_ADD_PAGE: &str = "open-add-page";

/// Deep link of the compose view
pub const ADD_PAGE_URL: &str = "#/add";

/// Deep link of the application root
pub const ROOT_URL: &str = "#/";

/// Default interval of the periodic "time to write" reminder in seconds
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 60;

/// Default page size of the story feed
pub const DEFAULT_PAGE_SIZE: u32 = 8;

/// Vibration pattern for locally-originated notifications (milliseconds)
pub const NOTIFICATION_VIBRATE: &[u32] = &[200, 100, 200];
