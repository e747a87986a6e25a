use http::StatusCode;

use super::dynamic::{write_xml, DynamicRecord};
use super::format::{media, negotiate_format, MessageFormat};
use crate::fault::ServiceError;
use crate::message::{Document, Reply, RequestContext, ResponseContext};

/// Render a handler reply into the response.
pub fn serialize_response(
    reply: Reply,
    request: &RequestContext,
    response: &mut ResponseContext,
) -> Result<(), ServiceError> {
    match reply {
        Reply::Empty => {
            if response.status().is_none() {
                response.set_status(StatusCode::NO_CONTENT);
            }
        }
        Reply::Text(text) => {
            if response.content_type().is_none() {
                response.set_content_type(media::TEXT_PLAIN);
            }
            response.set_body(text);
        }
        Reply::Stream(bytes) => {
            if response.content_type().is_none() {
                response.set_content_type(media::OCTET_STREAM);
            }
            response.set_body(bytes);
        }
        Reply::Document(doc) => serialize_document(doc.as_ref(), request, response)?,
        Reply::Record(record) => {
            serialize_records(std::slice::from_ref(&record), true, request, response)?
        }
        Reply::Records(records) => serialize_records(&records, false, request, response)?,
    }
    Ok(())
}

/// Render a typed document in the negotiated format.
pub fn serialize_document(
    doc: &dyn Document,
    request: &RequestContext,
    response: &mut ResponseContext,
) -> Result<(), ServiceError> {
    let format = negotiate_format(request, response);
    let body = match format {
        MessageFormat::Json => doc.to_json().map_err(|e| {
            ServiceError::invalid_operation(format!(
                "failed to serialise {} as JSON: {e}",
                doc.type_name()
            ))
        })?,
        MessageFormat::Xml => doc
            .to_xml()
            .map_err(|e| {
                ServiceError::invalid_operation(format!(
                    "failed to serialise {} as XML: {e}",
                    doc.type_name()
                ))
            })?
            .into_bytes(),
    };
    finish(format, body, response);
    Ok(())
}

fn serialize_records(
    records: &[DynamicRecord],
    single: bool,
    request: &RequestContext,
    response: &mut ResponseContext,
) -> Result<(), ServiceError> {
    let format = negotiate_format(request, response);
    let body = match format {
        MessageFormat::Json if single => serde_json::to_vec(&records[0]),
        MessageFormat::Json => serde_json::to_vec(records),
        MessageFormat::Xml => {
            let body = write_xml(records)?;
            finish(format, body, response);
            return Ok(());
        }
    }
    .map_err(|e| ServiceError::invalid_operation(format!("failed to serialise records: {e}")))?;
    finish(format, body, response);
    Ok(())
}

fn finish(format: MessageFormat, body: Vec<u8>, response: &mut ResponseContext) {
    response.set_format(format);
    response.set_content_type(format.content_type());
    response.set_body(body);
}
