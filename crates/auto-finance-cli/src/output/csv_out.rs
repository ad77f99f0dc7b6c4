use serde_json::{Map, Value};
use std::io;

/// Row-valued fields, in the order they are looked for.
const SERIES_KEYS: [&str; 4] = ["periods", "points", "options", "offers"];

/// Nested results that carry a series of their own.
const NESTED_KEYS: [&str; 3] = ["accelerated", "schedule", "series"];

/// Write output as CSV to stdout.
///
/// Results that contain a period series (a schedule, a value curve, a GAP
/// series, a list of offers) are written one row per period; anything else
/// falls back to two-column `field,value` output.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let result = map.get("result").unwrap_or(value);
            if let Some(rows) = result.as_object().and_then(find_series) {
                write_array_csv(&mut wtr, rows);
            } else if let Value::Object(result) = result {
                write_fields_csv(&mut wtr, result);
            } else {
                write_fields_csv(&mut wtr, map);
            }
        }
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn find_series(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    for key in SERIES_KEYS {
        if let Some(Value::Array(rows)) = map.get(key) {
            return Some(rows);
        }
    }
    NESTED_KEYS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_object))
        .find_map(find_series)
}

fn write_fields_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
