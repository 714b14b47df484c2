//! Console event formatter with a per-file tree layout.

pub mod filters;
pub mod levels;

use chrono::Local;
use console::style;
use std::fmt::{self as std_fmt, Debug};
use tracing::Level;
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};

use crate::utils::logging::text_utils;
use filters::should_show_message;
use levels::ProcessingLevel;

const LINE_WIDTH: usize = 120;
const TIMESTAMP_WIDTH: usize = 11; // "[HH:MM:SS] "
const PREFIX_WIDTH: usize = 2; // "▶ "

pub struct CleanFormatter {
    show_timestamps: bool,
    use_color: bool,
}

impl CleanFormatter {
    pub fn new(show_timestamps: bool, use_color: bool) -> Self {
        Self {
            show_timestamps,
            use_color,
        }
    }

    /// WARN/ERROR/DEBUG tag; INFO has none.
    fn level_tag(&self, level: &Level) -> String {
        let (text, styled) = match *level {
            Level::INFO => return String::new(),
            Level::ERROR => ("ERROR", style("ERROR").red().bold()),
            Level::WARN => ("WARN ", style("WARN ").yellow()),
            Level::DEBUG => ("DEBUG", style("DEBUG").blue()),
            Level::TRACE => ("TRACE", style("TRACE").magenta()),
        };
        if self.use_color {
            styled.to_string()
        } else {
            text.to_string()
        }
    }

    fn format_message(&self, message: &str, level: &Level) -> String {
        let processing = ProcessingLevel::of(message);
        let tag = self.level_tag(level);
        let tag_width = if tag.is_empty() { 0 } else { 6 };
        let timestamp_width = if self.show_timestamps { TIMESTAMP_WIDTH } else { 0 };

        let available = LINE_WIDTH.saturating_sub(timestamp_width + PREFIX_WIDTH + tag_width);
        let wrapped = text_utils::wrap_text(message, available);
        let indent = " ".repeat(timestamp_width + PREFIX_WIDTH + tag_width);

        let mut lines = wrapped.lines();
        let first = lines.next().unwrap_or_default();
        let mut out = format!(
            "{} {}{}",
            processing.prefix(),
            if tag.is_empty() { String::new() } else { format!("{} ", tag) },
            processing.paint(first, self.use_color)
        );
        for line in lines {
            out.push('\n');
            out.push_str(&indent);
            out.push_str(&processing.paint(line, self.use_color));
        }
        out
    }
}

impl<S, N> FormatEvent<S, N> for CleanFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std_fmt::Result {
        let message = {
            let mut visitor = MessageVisitor::default();
            event.record(&mut visitor);
            visitor.message
        };

        if !should_show_message(&message) {
            return Ok(());
        }

        let mut output = String::new();
        if self.show_timestamps {
            let now = Local::now().format("%H:%M:%S").to_string();
            let timestamp = if self.use_color {
                style(now).dim().to_string()
            } else {
                now
            };
            output.push_str(&format!("[{}] ", timestamp));
        }
        output.push_str(&self.format_message(&message, event.metadata().level()));

        writeln!(writer, "{}", output)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value).trim_matches('"').to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_info_line() {
        let formatter = CleanFormatter::new(false, false);
        assert_eq!(
            formatter.format_message("Processing file: Movie.mkv", &Level::INFO),
            "▶ Processing file: Movie.mkv"
        );
    }

    #[test]
    fn test_warning_carries_tag() {
        let formatter = CleanFormatter::new(false, false);
        assert_eq!(
            formatter.format_message("Missing MaxCLL metadata, using default", &Level::WARN),
            "  WARN  Missing MaxCLL metadata, using default"
        );
    }

    #[test]
    fn test_wrapped_lines_are_indented() {
        let formatter = CleanFormatter::new(true, false);
        let long = "word ".repeat(60);
        let formatted = formatter.format_message(long.trim(), &Level::ERROR);
        let mut lines = formatted.lines();
        assert!(lines.next().unwrap().starts_with("  ERROR word"));
        assert!(lines.all(|l| l.starts_with(&" ".repeat(TIMESTAMP_WIDTH + PREFIX_WIDTH + 6))));
    }
}
