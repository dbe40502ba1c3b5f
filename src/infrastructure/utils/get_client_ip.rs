use actix_web::HttpRequest;

use crate::constants::UNKNOWN_CLIENT;

/// Extract the key identifying the caller for rate limiting.
/// `trust_forwarded_headers`: use `X-Forwarded-For` (first hop) then `X-Real-IP`,
/// otherwise the socket peer address. Falls back to `"unknown"`.
pub fn get_client_ip(req: &HttpRequest, trust_forwarded_headers: bool) -> String {
    if trust_forwarded_headers {
        return forwarded_client(req).unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_client(req: &HttpRequest) -> Option<String> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    header("x-forwarded-for").or_else(|| header("x-real-ip"))
}
