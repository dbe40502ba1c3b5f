use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// `local@domain.tld`: no whitespace, one `@`, at least one `.` after it.
pub static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email shape regex is valid")
});

pub const UNKNOWN_CLIENT: &str = "unknown";

pub const DEFAULT_MAX_SUBMISSIONS: u32 = 5;
pub const DEFAULT_WINDOW_SECS: u64 = 60 * 60;

pub const MSG_SENT: &str = "Messaggio inviato con successo";
pub const MSG_RATE_LIMITED: &str = "Troppe richieste. Riprova più tardi.";
pub const MSG_INVALID_REQUEST: &str = "Richiesta non valida";
pub const MSG_INTERNAL_ERROR: &str = "Errore interno del server";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "Messaggio troppo lungo";
