use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{BookingNotice, DeliveryReport, EmailMessage, NotificationError, RetryPolicy};
use crate::services::email::{EmailSender, HttpEmailSender, LoggingEmailSender};
use crate::services::templates;

/// Sends notification emails with bounded retry. Delivery is best-effort:
/// failures are reported to the caller and logged, never raised into the
/// operation that triggered them.
pub struct NotificationDispatcher {
    sender: Arc<dyn EmailSender>,
    from: String,
    policy: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn EmailSender>, from: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            sender,
            from: from.into(),
            policy,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let sender: Arc<dyn EmailSender> = match HttpEmailSender::new(config) {
            Ok(sender) => Arc::new(sender),
            Err(e) => {
                warn!("{}; notification emails will only be logged", e);
                Arc::new(LoggingEmailSender::new())
            }
        };

        Self::new(sender, config.email_from.clone(), RetryPolicy::default())
    }

    /// Returns the attempt number that succeeded.
    pub async fn send_with_retry(&self, message: &EmailMessage) -> Result<u32, NotificationError> {
        let mut backoff = self.policy.initial_backoff;
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            match timeout(self.policy.attempt_timeout, self.sender.send(message)).await {
                Ok(Ok(())) => {
                    debug!("Email '{}' delivered to {} on attempt {}", message.subject, message.to, attempt);
                    return Ok(attempt);
                }
                Ok(Err(e)) if !e.is_retryable() => {
                    warn!("Email to {} rejected: {}", message.to, e);
                    return Err(e);
                }
                Ok(Err(e)) => {
                    warn!(
                        "Email to {} failed (attempt {}/{}): {}",
                        message.to, attempt, self.policy.max_attempts, e
                    );
                    last_error = e.to_string();
                }
                Err(_) => {
                    let e = NotificationError::Timeout {
                        millis: self.policy.attempt_timeout.as_millis(),
                    };
                    warn!(
                        "Email to {} failed (attempt {}/{}): {}",
                        message.to, attempt, self.policy.max_attempts, e
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.policy.max_attempts {
                sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(NotificationError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }

    /// Confirms a booking to patient and doctor, each with its own retry budget.
    pub async fn notify_booking(&self, notice: &BookingNotice) -> DeliveryReport {
        let (patient_subject, patient_html) = templates::patient_confirmation(notice);
        let (doctor_subject, doctor_html) = templates::doctor_confirmation(notice);

        let to_patient = EmailMessage {
            from: self.from.clone(),
            to: notice.patient_email.clone(),
            subject: patient_subject,
            html: patient_html,
        };
        let to_doctor = EmailMessage {
            from: self.from.clone(),
            to: notice.doctor_email.clone(),
            subject: doctor_subject,
            html: doctor_html,
        };

        let (patient, doctor) = tokio::join!(
            self.send_with_retry(&to_patient),
            self.send_with_retry(&to_doctor)
        );

        let report = DeliveryReport { patient, doctor };
        if report.all_delivered() {
            info!("Booking {} confirmations delivered", notice.appointment_id);
        } else {
            warn!(
                "Booking {} confirmations incomplete: patient={:?} doctor={:?}",
                notice.appointment_id,
                report.patient.as_ref().err().map(ToString::to_string),
                report.doctor.as_ref().err().map(ToString::to_string)
            );
        }
        report
    }

    /// Runs [`notify_booking`](Self::notify_booking) off the request path.
    pub fn spawn_booking_notifications(self: &Arc<Self>, notice: BookingNotice) -> JoinHandle<DeliveryReport> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.notify_booking(&notice).await })
    }
}
