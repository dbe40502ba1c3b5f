use std::sync::Arc;

use crate::{errors::DeliveryError, repositories::delivery::SubmissionDelivery, settings::AppConfig};

pub mod emailjs;
pub mod fallback;
pub mod logging;

pub use emailjs::EmailJsDelivery;
pub use fallback::FallbackDelivery;
pub use logging::LogDelivery;

/// EmailJS backed by the log when credentials are configured, the log alone
/// otherwise.
pub fn delivery_from_config(config: &AppConfig) -> Result<Arc<dyn SubmissionDelivery>, DeliveryError> {
    match EmailJsDelivery::from_config(config)? {
        Some(emailjs) => {
            tracing::info!("Contact submissions will be sent via EmailJS");
            Ok(Arc::new(FallbackDelivery::new(emailjs, LogDelivery)))
        }
        None => {
            tracing::warn!("EmailJS not configured, contact submissions will only be logged");
            Ok(Arc::new(LogDelivery))
        }
    }
}
