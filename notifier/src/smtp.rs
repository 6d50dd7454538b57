//! SMTP implementation of [`AlertNotifier`] using the `lettre` crate.
//!
//! The transport is built per instance rather than held in a global, so tests
//! and multi-tenant setups can construct notifiers with different credentials.

use crate::{AlertNotifier, GradeAlert, NotifyError, PlagiarismAlert};
use async_trait::async_trait;
use common::Config;
use lettre::message::{header, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::AsyncSmtpTransport;
use lettre::{AsyncTransport, Tokio1Executor};

pub struct SmtpAlertNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    from_name: String,
}

impl SmtpAlertNotifier {
    pub fn new(
        host: &str,
        username: &str,
        password: &str,
        from_name: &str,
    ) -> Result<Self, NotifyError> {
        let tls_parameters = TlsParameters::new(host.to_string())
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .port(587)
            .tls(Tls::Required(tls_parameters))
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            from: username.to_string(),
            from_name: from_name.to_string(),
        })
    }

    /// Build a notifier from the process-wide [`Config`].
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        Self::new(
            &config.smtp_host,
            &config.smtp_username,
            &config.smtp_password,
            &config.email_from_name,
        )
    }

    fn message(
        &self,
        to_email: &str,
        subject: &str,
        plain: String,
        html: String,
    ) -> Result<Message, NotifyError> {
        Message::builder()
            .from(
                format!("{} <{}>", self.from_name, self.from)
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| NotifyError::Address(format!("{e}")))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(plain),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| NotifyError::Compose(e.to_string()))
    }
}

pub(crate) fn grade_alert_bodies(alert: &GradeAlert, from_name: &str) -> (String, String) {
    let plain = format!(
        "Hello,\n\n\
        {student} has been graded on \"{task}\": {score}/{max}.\n\n\
        Log in to see the full per-criterion breakdown and feedback.\n\n\
        Best regards,\n\
        {from_name}",
        student = alert.student_name,
        task = alert.task_title,
        score = alert.scaled_score,
        max = alert.max_score,
    );
    let html = format!(
        "<html>\
        <body>\
        <p>Hello,</p>\
        <p><strong>{student}</strong> has been graded on \u{201c}{task}\u{201d}: \
        <strong>{score}/{max}</strong>.</p>\
        <p>Log in to see the full per-criterion breakdown and feedback.</p>\
        <p>Best regards,<br>{from_name}</p>\
        </body>\
        </html>",
        student = alert.student_name,
        task = alert.task_title,
        score = alert.scaled_score,
        max = alert.max_score,
    );
    (plain, html)
}

pub(crate) fn plagiarism_alert_bodies(alert: &PlagiarismAlert, from_name: &str) -> (String, String) {
    let plain = format!(
        "Hello,\n\n\
        A submission by {student} on \"{task}\" matched another student's \
        submission exactly and the task has been flagged for review.\n\n\
        Best regards,\n\
        {from_name}",
        student = alert.student_name,
        task = alert.task_title,
    );
    let html = format!(
        "<html>\
        <body>\
        <p>Hello,</p>\
        <p>A submission by <strong>{student}</strong> on \u{201c}{task}\u{201d} matched \
        another student's submission exactly and the task has been flagged for review.</p>\
        <p>Best regards,<br>{from_name}</p>\
        </body>\
        </html>",
        student = alert.student_name,
        task = alert.task_title,
    );
    (plain, html)
}

#[async_trait]
impl AlertNotifier for SmtpAlertNotifier {
    async fn send_grade_alert(&self, alert: &GradeAlert) -> Result<(), NotifyError> {
        let (plain, html) = grade_alert_bodies(alert, &self.from_name);
        let subject = format!("Grade published: {}", alert.task_title);
        let message = self.message(&alert.recipient_email, &subject, plain, html)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::debug!(to = %alert.recipient_email, task = %alert.task_title, "grade alert sent");
        Ok(())
    }

    async fn send_plagiarism_alert(&self, alert: &PlagiarismAlert) -> Result<(), NotifyError> {
        let (plain, html) = plagiarism_alert_bodies(alert, &self.from_name);
        let subject = format!("Submission flagged for review: {}", alert.task_title);
        let message = self.message(&alert.recipient_email, &subject, plain, html)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::debug!(to = %alert.recipient_email, task = %alert.task_title, "plagiarism alert sent");
        Ok(())
    }
}
