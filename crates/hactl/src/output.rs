//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, Write};

use hactl_core::HassEvent;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single item. Table and plain both use `detail_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Render one streamed event. Streams are line-oriented, so JSON is
/// always compact (one event per line) and YAML gets a document marker.
pub fn render_event(format: OutputFormat, event: &HassEvent) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => render_json(event, true),
        OutputFormat::Yaml => Ok(format!("---\n{}", render_yaml(event)?.trim_end())),
        OutputFormat::Table | OutputFormat::Plain => Ok(format_event_plain(event)),
    }
}

/// Compact human-readable description of an event.
///
/// `state_changed` becomes `entity: old -> new` (or `entity: new` when
/// there is no previous state); anything else is `event: <type>`.
pub fn format_event_plain(event: &HassEvent) -> String {
    match event.state_transition() {
        Some((old, new)) => {
            let entity = event.entity_id().unwrap_or_default();
            let new = new.unwrap_or_default();
            match old.filter(|s| !s.is_empty()) {
                Some(old) => format!("{entity}: {old} -> {new}"),
                None => format!("{entity}: {new}"),
            }
        }
        None => format!("event: {}", event.event_type),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> HassEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn plain_state_change_shows_transition() {
        let e = event(json!({
            "event_type": "state_changed",
            "data": {
                "entity_id": "light.kitchen",
                "old_state": {"state": "off"},
                "new_state": {"state": "on"}
            }
        }));
        assert_eq!(format_event_plain(&e), "light.kitchen: off -> on");
    }

    #[test]
    fn plain_state_change_without_old_state() {
        let e = event(json!({
            "event_type": "state_changed",
            "data": {"entity_id": "sensor.new", "old_state": null, "new_state": {"state": "12"}}
        }));
        assert_eq!(format_event_plain(&e), "sensor.new: 12");
    }

    #[test]
    fn plain_other_event_shows_type() {
        let e = event(json!({"event_type": "call_service", "data": {"domain": "light"}}));
        assert_eq!(format_event_plain(&e), "event: call_service");
    }

    #[test]
    fn json_events_are_single_lines() {
        let e = event(json!({"event_type": "call_service", "data": {"a": 1}, "origin": "LOCAL"}));
        for format in [OutputFormat::Json, OutputFormat::JsonCompact] {
            let line = render_event(format, &e).unwrap();
            assert!(!line.contains('\n'));
            let back: serde_json::Value = serde_json::from_str(&line).unwrap();
            assert_eq!(back["event_type"], "call_service");
        }
    }

    #[derive(Serialize)]
    struct Item {
        id: &'static str,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: &'static str,
    }

    #[test]
    fn list_formats() {
        let items = [Item { id: "a" }, Item { id: "b" }];
        let row = |i: &Item| ItemRow { id: i.id };
        let line = |i: &Item| i.id.to_string();

        assert_eq!(
            render_list(OutputFormat::Plain, &items, row, line).unwrap(),
            "a\nb"
        );
        assert_eq!(
            render_list(OutputFormat::JsonCompact, &items, row, line).unwrap(),
            r#"[{"id":"a"},{"id":"b"}]"#
        );
        let table = render_list(OutputFormat::Table, &items, row, line).unwrap();
        assert!(table.contains("ID"));
        assert!(table.contains('b'));
    }
}
