//! Per-IP rate limiting built on `tower_governor`.
//!
//! Limits are expressed as the interval after which one request of quota is replenished
//! plus a burst size. Client IPs are taken from `X-Forwarded-For`/`X-Real-IP`/`Forwarded`
//! when present, else from the peer address, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

/// Credential endpoints: one request every 200 ms (5/s)
pub const AUTH_REPLENISH_MS: u64 = 200;
pub const AUTH_BURST_SIZE: u32 = 10;

/// Everything else: one request every 50 ms (20/s)
pub const GENERAL_REPLENISH_MS: u64 = 50;
pub const GENERAL_BURST_SIZE: u32 = 50;

/// Build a [`tower_governor::GovernorLayer`] keyed on the client IP
///
/// ```ignore
/// Router::new()
///     .route("/auth/login", post(login))
///     .layer(make_rate_limit_layer!(
///         rate_limit::AUTH_REPLENISH_MS,
///         rate_limit::AUTH_BURST_SIZE
///     ));
/// ```
#[macro_export]
macro_rules! make_rate_limit_layer {
    ($replenish_ms:expr, $burst:expr) => {{
        let config = ::tower_governor::governor::GovernorConfigBuilder::default()
            .per_millisecond($replenish_ms)
            .burst_size($burst)
            .key_extractor(::tower_governor::key_extractor::SmartIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("rate limit period and burst size must be non-zero");
        ::tower_governor::GovernorLayer::new(config)
    }};
}
