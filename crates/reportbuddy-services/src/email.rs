//! Report email composition and hand-off to the user's mail client.

use chrono::{DateTime, Local, Locale};
use reportbuddy_calendar::{Event, Settings};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to open mail client: {0}")]
    Launch(String),
}

impl EmailError {
    pub fn user_message(&self) -> &'static str {
        match self {
            EmailError::Launch(_) => "Could not open your mail application.",
        }
    }
}

/// Settings that shape a report email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    /// Language code such as `en`, `it` or `it_IT`.
    pub language: String,
    /// Subject with optional `$month` and `$year` placeholders.
    pub subject: String,
    pub recipient: String,
}

impl From<&Settings> for EmailTemplate {
    fn from(settings: &Settings) -> Self {
        Self {
            language: settings.email_language.clone(),
            subject: settings.email_subject.clone(),
            recipient: settings.email_recipient.clone(),
        }
    }
}

/// Email ready to be handed to a mail client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl ComposedEmail {
    /// `mailto:` URL carrying the subject and body.
    pub fn mailto_url(&self) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            self.recipients
                .iter()
                .map(|r| urlencoding::encode(r).into_owned())
                .collect::<Vec<_>>()
                .join(","),
            urlencoding::encode(&self.subject),
            urlencoding::encode(&self.body)
        )
    }
}

struct Labels {
    heading: &'static str,
    untitled: &'static str,
    total: &'static str,
}

const ENGLISH: Labels = Labels {
    heading: "Events Report",
    untitled: "Untitled",
    total: "Total events: ",
};

const ITALIAN: Labels = Labels {
    heading: "Report Eventi",
    untitled: "Senza titolo",
    total: "Totale eventi: ",
};

fn labels(language: &str) -> &'static Labels {
    if language.to_lowercase().starts_with("it") {
        &ITALIAN
    } else {
        &ENGLISH
    }
}

/// Resolve a language code to a chrono locale, falling back to English.
fn locale_for(language: &str) -> Locale {
    let normalized = language.replace('-', "_");
    let candidate = if normalized.contains('_') {
        normalized
    } else {
        format!("{}_{}", normalized.to_lowercase(), normalized.to_uppercase())
    };
    Locale::try_from(candidate.as_str()).unwrap_or(Locale::en_US)
}

/// Build the report email for `events`, rendering dates in the local zone.
pub fn compose_report(
    events: &[Event],
    template: &EmailTemplate,
    now: DateTime<Local>,
) -> ComposedEmail {
    let locale = locale_for(&template.language);
    let labels = labels(&template.language);

    let subject = template
        .subject
        .replace("$month", &now.format_localized("%B", locale).to_string())
        .replace("$year", &now.format("%Y").to_string());

    let lines: Vec<String> = events
        .iter()
        .map(|event| {
            let date = event
                .start
                .with_timezone(&Local)
                .format_localized("%-d %B %Y", locale);
            let title = event.title.as_deref().unwrap_or(labels.untitled);
            format!("• {}: {}", date, title)
        })
        .collect();

    let body = format!(
        "{}\n\n{}\n\n{}{}",
        labels.heading,
        lines.join("\n"),
        labels.total,
        events.len()
    );

    let recipients = if template.recipient.is_empty() {
        Vec::new()
    } else {
        vec![template.recipient.clone()]
    };

    ComposedEmail {
        recipients,
        subject,
        body,
    }
}

/// Hands a composed email to something that can send it.
pub trait MailLauncher: Send + Sync {
    /// # Errors
    /// Returns an error if the mail client cannot be opened.
    fn launch(&self, email: &ComposedEmail) -> Result<(), EmailError>;
}

/// Opens the system default mail client through a `mailto:` URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMailLauncher;

impl MailLauncher for SystemMailLauncher {
    fn launch(&self, email: &ComposedEmail) -> Result<(), EmailError> {
        let url = email.mailto_url();
        tracing::info!("Opening mail client for {:?}", email.subject);
        webbrowser::open(&url).map_err(|e| EmailError::Launch(e.to_string()))
    }
}
