//! Colorful console output for host events.
//!
//! Provides a custom `tracing` layer that formats model lifecycle and solve
//! events with colors.
//!
//! ## Log Levels
//!
//! - **INFO**: Model load, registration and replacement
//! - **WARN**: Capability gaps, compile and solve failures
//! - **DEBUG**: Handle lifecycle and individual solves

use std::io::{self, Write};
use std::sync::OnceLock;

use owo_colors::OwoColorize;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the console subscriber.
///
/// Safe to call multiple times - only the first call has effect. The filter
/// defaults to `info` for the diffeq crates and honours `RUST_LOG`.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("diffeq=info,diffeq_runtime=info"));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(HostConsoleLayer)
            .try_init();
    });
}

/// A tracing layer that formats host events with colors.
pub struct HostConsoleLayer;

impl<S: Subscriber> Layer<S> for HostConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("diffeq") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *event.metadata().level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    model: Option<String>,
    export: Option<String>,
    kind: Option<String>,
    detail: Option<String>,
    error: Option<String>,
    message: Option<String>,
    bytes: Option<u64>,
    code: Option<i64>,
    released: Option<u64>,
    complete: Option<bool>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        match field.name() {
            "message" => self.message = Some(s),
            "detail" => self.detail = Some(s),
            "error" => self.error = Some(s),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        let value = Some(value.to_string());
        match field.name() {
            "event" => self.event = value,
            "model" => self.model = value,
            "export" => self.export = value,
            "kind" => self.kind = value,
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "bytes" => self.bytes = Some(value),
            "released" => self.released = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "code" {
            self.code = Some(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == "complete" {
            self.complete = Some(value);
        }
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    let model = v.model.as_deref().unwrap_or("default");

    match v.event.as_deref().unwrap_or("") {
        "model_loaded" => {
            let status = if v.complete.unwrap_or(false) {
                "complete".bright_green().to_string()
            } else {
                "partial".bright_yellow().to_string()
            };
            format!(
                "{} Loaded {} │ {} bytes │ {}",
                "▶".bright_green().bold(),
                model.white().bold(),
                v.bytes.unwrap_or(0).bright_yellow(),
                status
            )
        }
        "model_registered" => format!("{} Registered {}", "●".bright_cyan(), model.white().bold()),
        "model_replaced" => format!("{} Replaced {}", "●".bright_yellow(), model.white().bold()),
        "model_removed" => format!("{} Removed {}", "○".bright_black(), model.white().bold()),
        "capability_gap" => format!(
            "{} Missing export {}",
            "!".bright_yellow().bold(),
            v.export.as_deref().unwrap_or("?").yellow()
        ),
        "compile_failed" => format!(
            "{} Compile of {} failed │ {}",
            "✗".bright_red().bold(),
            model.white().bold(),
            v.error.as_deref().unwrap_or("").red()
        ),
        "solve_failed" => format!(
            "{} Solve on {} failed with code {} │ {}",
            "✗".bright_red().bold(),
            model.white().bold(),
            v.code.unwrap_or(0).bright_red(),
            v.detail.as_deref().unwrap_or("").red()
        ),
        "solve_complete" => {
            format!("{} Solved {}", "■".bright_cyan(), model.white().bold())
        }
        "scope_released" => format!(
            "{} Released {} leftover handles on {}",
            "◀".bright_blue(),
            v.released.unwrap_or(0),
            model.white().bold()
        ),
        "handle_created" | "handle_destroyed" if level == Level::DEBUG => format!(
            "{} {} {}",
            "·".bright_black(),
            v.event.as_deref().unwrap_or(""),
            v.kind.as_deref().unwrap_or("").bright_black()
        ),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        tracing::info!(event = "model_registered", model = "test");
    }

    #[test]
    fn test_format_known_events() {
        let loaded = EventVisitor {
            event: Some("model_loaded".into()),
            model: Some("logistic".into()),
            bytes: Some(1024),
            complete: Some(true),
            ..EventVisitor::default()
        };
        let output = format_event(&loaded, Level::INFO);
        assert!(output.contains("Loaded"));
        assert!(output.contains("logistic"));

        let unknown = EventVisitor {
            event: Some("something_else".into()),
            ..EventVisitor::default()
        };
        assert!(format_event(&unknown, Level::INFO).is_empty());
    }
}
