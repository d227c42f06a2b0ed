// SPDX-License-Identifier: MIT

//! `mb ps` — list current/pending jobs with colourised progress (spec §6,
//! scenario 4: "output contains one yellow line with `42.00%` and one
//! grey `pending` line").

use crate::client::Client;
use crate::color;
use crate::exit_error::ExitError;

pub async fn ps(client: &mut Client) -> Result<(), ExitError> {
    let value = client.call("ps", vec![], Default::default()).await?;
    let items = value.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();

    if items.is_empty() {
        println!("{}", color::header("no active or pending jobs"));
        return Ok(());
    }

    for item in items {
        let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("?");
        let status = item.get("status");
        println!("{}", format_row(title, status));
    }
    Ok(())
}

fn format_row(title: &str, status: Option<&serde_json::Value>) -> String {
    match status {
        Some(serde_json::Value::String(s)) if s == "Pending" => color::pending(&format!("{title}  pending")),
        Some(serde_json::Value::Object(obj)) => {
            if let Some(downloading) = obj.get("Downloading") {
                // `progress` is already a percentage (spec §4.6 / scenario 4's "42.00%"),
                // not a 0..1 fraction.
                let pct = downloading.get("progress").and_then(|v| v.as_f64()).unwrap_or(0.0);
                color::downloading(&format!("{title}  {pct:.2}%"))
            } else if obj.contains_key("Finished") {
                color::header(&format!("{title}  complete"))
            } else if obj.contains_key("Error") {
                color::error(&format!("{title}  error"))
            } else {
                format!("{title}  unknown")
            }
        }
        _ => format!("{title}  unknown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn formats_downloading_row_in_yellow() {
        std::env::set_var("COLOR", "1");
        let status = serde_json::json!({"Downloading": {"progress": 42.0, "bytes": 100, "speed": null, "eta": null}});
        let row = format_row("Example Video", Some(&status));
        assert!(row.contains("42.00%"));
        assert!(row.contains("38;5;220"));
        std::env::remove_var("COLOR");
    }

    #[test]
    fn formats_pending_row() {
        let status = serde_json::Value::String("Pending".to_string());
        let row = format_row("Example Video", Some(&status));
        assert!(row.contains("pending"));
    }
}
