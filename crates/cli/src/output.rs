//! End-of-run summary rendering.

use serde_json::{json, Value};
use storage::SinkReceipt;
use survey_core::models::BatchRun;

fn receipt_text(receipt: &Option<SinkReceipt>) -> String {
    match receipt {
        None => "nothing delivered".to_string(),
        Some(SinkReceipt::Acknowledged(body)) => format!("remote acknowledged: {}", body),
        Some(SinkReceipt::Written {
            path,
            appended,
            total_rows,
        }) => format!(
            "appended {} rows to {} ({} total)",
            appended,
            path.display(),
            total_rows
        ),
    }
}

fn receipt_json(receipt: &Option<SinkReceipt>) -> Value {
    match receipt {
        None => Value::Null,
        Some(SinkReceipt::Acknowledged(body)) => json!({ "kind": "remote", "ack": body }),
        Some(SinkReceipt::Written {
            path,
            appended,
            total_rows,
        }) => json!({
            "kind": "file",
            "path": path.display().to_string(),
            "appended": appended,
            "total_rows": total_rows,
        }),
    }
}

pub fn render_text(run: &BatchRun) -> String {
    let mut lines = vec![format!(
        "scanned {}, processed {}, failed {}",
        run.scanned,
        run.records.len(),
        run.failures.len()
    )];
    for failure in &run.failures {
        lines.push(format!(
            "  {} [{}]: {}",
            failure.file, failure.stage, failure.message
        ));
    }
    lines.push(receipt_text(&run.receipt));
    lines.join("\n")
}

pub fn render_json(run: &BatchRun) -> Value {
    json!({
        "status": "ok",
        "scanned": run.scanned,
        "processed": run.records.len(),
        "failed": run.failures.len(),
        "records": run.records,
        "failures": run.failures,
        "receipt": receipt_json(&run.receipt),
    })
}
