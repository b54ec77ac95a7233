//! Request handlers - dispatch protocol messages to the session.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::protocol::{ClientMessage, Request, Response};
use sgmock_engine::{FindOptions, Record, Session, Value};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

/// Run one message against the session and return its result.
pub fn handle(session: &mut Session, config: &Config, message: ClientMessage) -> Result<serde_json::Value> {
    let result = match message {
        ClientMessage::Find {
            entity_type,
            filters,
            fields,
            limit,
            page,
            retired_only,
        } => {
            let mut options = FindOptions::new().retired_only(retired_only);
            if let Some(limit) = limit {
                options = options.limit(limit);
            }
            if let Some(page) = page {
                options = options.page(page);
            }
            let records = session.find_with(&entity_type, &Value::from(filters), fields.as_slice(), options)?;
            records_to_json(records)
        }
        ClientMessage::FindOne {
            entity_type,
            filters,
            fields,
            retired_only,
        } => session
            .find_one_with(&entity_type, &Value::from(filters), fields.as_slice(), retired_only)?
            .map_or(serde_json::Value::Null, record_to_json),
        ClientMessage::Create {
            entity_type,
            data,
            return_fields,
        } => {
            let return_fields: Vec<&str> = return_fields.iter().map(String::as_str).collect();
            record_to_json(session.create(&entity_type, data, &return_fields)?)
        }
        ClientMessage::Update {
            entity_type,
            entity_id,
            data,
        } => record_to_json(session.update(&entity_type, entity_id, data)?),
        ClientMessage::Delete {
            entity_type,
            entity_id,
        } => serde_json::Value::Bool(session.delete(&entity_type, entity_id)),
        ClientMessage::Revive {
            entity_type,
            entity_id,
        } => serde_json::Value::Bool(session.revive(&entity_type, entity_id)),
        ClientMessage::Batch { requests } => {
            let requests: Vec<Value> = requests.into_iter().map(Value::from).collect();
            serde_json::to_value(session.batch(&requests)?)?
        }
        ClientMessage::Info => session.info().to_json(),
        ClientMessage::Dump { path } => {
            if let Some(path) = path {
                write_dump(session, Path::new(&path), config.pretty_dump)?;
            }
            session.snapshot().to_json_value()
        }
        ClientMessage::Clear => {
            session.clear();
            serde_json::Value::Null
        }
    };
    Ok(result)
}

/// Answer a single request line. Never fails; errors become error responses.
pub fn respond(session: &mut Session, config: &Config, line: &str) -> Response {
    let document: serde_json::Value = match serde_json::from_str(line) {
        Ok(document) => document,
        Err(e) => return AppError::from(e).into_response(None),
    };
    let request_id = document
        .get("request_id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    let request: Request = match serde_json::from_value(document) {
        Ok(request) => request,
        Err(e) => return AppError::Protocol(e.to_string()).into_response(request_id),
    };

    let method = request.message.method();
    tracing::debug!(method, request_id = ?request.request_id, "handling request");
    match handle(session, config, request.message) {
        Ok(result) => Response::ok(result, request.request_id),
        Err(e) => e.into_response(request.request_id),
    }
}

/// Read requests from `input` until it ends, writing one response per
/// non-blank line to `output`. Returns the number of requests answered.
pub fn serve<R: BufRead, W: Write>(
    session: &mut Session,
    config: &Config,
    input: R,
    mut output: W,
) -> Result<usize> {
    let mut answered = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(session, config, &line);
        serde_json::to_writer(&mut output, &response)?;
        output.write_all(b"\n")?;
        output.flush()?;
        answered += 1;
    }
    Ok(answered)
}

/// Write the session's live records to `path`.
pub fn write_dump(session: &Session, path: &Path, pretty: bool) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    session.dump_json(&mut writer, pretty)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), "wrote snapshot");
    Ok(())
}

fn record_to_json(record: Record) -> serde_json::Value {
    Value::from(record).to_json()
}

fn records_to_json(records: Vec<Record>) -> serde_json::Value {
    serde_json::Value::Array(records.into_iter().map(record_to_json).collect())
}
