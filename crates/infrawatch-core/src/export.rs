use crate::{notification::NotificationFeed, urgency::Urgency, Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Json,
    Csv,
    Markdown,
}

impl FeedFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FeedFormat::Json),
            "csv" => Some(FeedFormat::Csv),
            "md" | "markdown" => Some(FeedFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FeedFormat::Json => "json",
            FeedFormat::Csv => "csv",
            FeedFormat::Markdown => "md",
        }
    }
}

/// Renders a feed for humans or other tools
pub struct Exporter;

impl Exporter {
    /// Export a feed to a file, picking the format from the extension
    pub fn export_to_file<P: AsRef<Path>>(feed: &NotificationFeed, path: P) -> Result<()> {
        let path = path.as_ref();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FeedFormat::from_extension)
            .ok_or_else(|| {
                Error::ConfigError(
                    "Could not determine export format from extension. Use .json, .csv, or .md"
                        .to_string(),
                )
            })?;

        Self::export_to_file_with_format(feed, path, format)
    }

    pub fn export_to_file_with_format<P: AsRef<Path>>(
        feed: &NotificationFeed,
        path: P,
        format: FeedFormat,
    ) -> Result<()> {
        let content = Self::render(feed, format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }

    pub fn render(feed: &NotificationFeed, format: FeedFormat) -> Result<String> {
        match format {
            FeedFormat::Json => Self::to_json(feed),
            FeedFormat::Csv => Ok(Self::to_csv(feed)),
            FeedFormat::Markdown => Ok(Self::to_markdown(feed)),
        }
    }

    /// The same `{ notifications, summary }` payload the dashboard consumes
    pub fn to_json(feed: &NotificationFeed) -> Result<String> {
        Ok(serde_json::to_string_pretty(feed)?)
    }

    pub fn to_csv(feed: &NotificationFeed) -> String {
        let mut output = String::from("ID,Type,Urgency,Title,Message,Date,Auto Renew,Monthly Cost\n");

        for n in &feed.notifications {
            output.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                Self::escape_csv(&n.id),
                n.kind,
                n.urgency,
                Self::escape_csv(&n.title),
                Self::escape_csv(&n.message),
                Self::escape_csv(n.date.as_str()),
                n.auto_renew.map(|b| b.to_string()).unwrap_or_default(),
                n.recurring_cost.map(|c| c.to_string()).unwrap_or_default(),
            ));
        }

        output
    }

    pub fn to_markdown(feed: &NotificationFeed) -> String {
        let summary = &feed.summary;
        let mut output = String::from("# Infrastructure renewals\n\n");

        let tiers: Vec<String> = Urgency::all()
            .iter()
            .map(|urgency| format!("{} {}", summary.count(*urgency), urgency))
            .collect();
        output.push_str(&format!(
            "**{}** pending: {}\n\n",
            summary.total,
            tiers.join(", ")
        ));

        if feed.notifications.is_empty() {
            output.push_str("Nothing due in the next 30 days.\n");
            return output;
        }

        output.push_str("| Urgency | Type | Title | Message | Date |\n");
        output.push_str("|---------|------|-------|---------|------|\n");

        for n in &feed.notifications {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                n.urgency,
                n.kind,
                Self::escape_markdown(&n.title),
                Self::escape_markdown(&n.message),
                n.date
            ));
        }

        output
    }

    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }

    fn escape_markdown(s: &str) -> String {
        s.replace('|', "\\|")
    }
}
