use tracing::debug;

use super::format::{media, MessageFormat};
use crate::description::{ParamKind, ParamSpec};
use crate::fault::ServiceError;
use crate::message::{ArgValue, FormData, RequestContext};

/// Fill empty body-kind slots from the request body.
///
/// Slots already bound from the route, and scalar slots routing did not
/// fill, are left alone. With nothing to fill this is a no-op whatever the
/// content type; with no content type the slots stay empty.
pub fn deserialize_request(
    params: &[ParamSpec],
    request: &RequestContext,
    slots: &mut [Option<ArgValue>],
) -> Result<(), ServiceError> {
    let pending = params
        .iter()
        .zip(slots.iter())
        .filter(|(param, slot)| slot.is_none() && param.kind.is_negotiated())
        .count();
    if pending == 0 {
        return Ok(());
    }

    let Some(content_type) = request.content_type() else {
        debug!(
            request_id = %request.request_id(),
            pending,
            "No content type; leaving body parameters unbound"
        );
        return Ok(());
    };

    for (param, slot) in params.iter().zip(slots.iter_mut()) {
        if slot.is_some() || !param.kind.is_negotiated() {
            continue;
        }
        *slot = Some(decode_slot(param, &content_type, request.body())?);
    }
    Ok(())
}

fn decode_slot(param: &ParamSpec, content_type: &str, body: &[u8]) -> Result<ArgValue, ServiceError> {
    match content_type {
        media::OCTET_STREAM => Ok(ArgValue::Stream(body.to_vec())),
        media::FORM_URLENCODED => Ok(ArgValue::Form(parse_form(body))),
        other => match MessageFormat::from_media_type(other) {
            Some(format) => match &param.kind {
                ParamKind::Body(decoder) => decoder.decode(body, format).map(ArgValue::Body),
                kind => Err(ServiceError::bad_request(format!(
                    "parameter '{}' of kind {} cannot be read from {}",
                    param.name,
                    kind.name(),
                    format.content_type()
                ))),
            },
            None => Err(ServiceError::bad_request(format!(
                "Invalid request format: unsupported content type '{other}'"
            ))),
        },
    }
}

fn parse_form(body: &[u8]) -> FormData {
    FormData::new(
        url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
    )
}
