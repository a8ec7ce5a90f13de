//! Command codec
//!
//! Requests come in three forms:
//! - resource commands are CBOR arrays `[verb, path]` or `[verb, path, body]`
//!   where `body` is the JSON text of the document
//! - control words (`info`, `api_version`, `https_on`, ...) are plain UTF-8
//! - broker switches are a single `0x00` / `0x01` byte, polled with an empty
//!   message
//!
//! Replies are raw bytes: JSON text for documents, UTF-8 for text, the first
//! byte for flags. Mutations answer with an empty message on success or a
//! phrase explaining the refusal; toggles answer with a fixed marker.
//!
//! A peer may also report an application error with the JSON object
//! `{"error": <kind>, "message": <text>}`.

use ciborium::Value;
use serde_json::Value as Document;

use super::types::{IpcError, Rejection, RejectionKind};

/// Operation requested from a peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Read,
    Create,
    Replace,
    Delete,
    /// Peer-specific control word (`info`, `api_version`, `https_on`, ...)
    Control(String),
    /// Empty message asking for the current switch state
    Poll,
    /// Single-byte switch
    Switch(bool),
}

impl Verb {
    /// Name used in logs and by in-process peers
    pub fn name(&self) -> &str {
        match self {
            Verb::Read => "GET",
            Verb::Create => "POST",
            Verb::Replace => "PUT",
            Verb::Delete => "DELETE",
            Verb::Control(name) => name,
            Verb::Poll => "poll",
            Verb::Switch(true) => "switch_on",
            Verb::Switch(false) => "switch_off",
        }
    }

    /// Resource verb carried in a CBOR array
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "GET" => Some(Verb::Read),
            "POST" => Some(Verb::Create),
            "PUT" => Some(Verb::Replace),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }
}

/// One request to a peer
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub verb: Verb,
    pub path: String,
    pub body: Option<Document>,
}

impl Command {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            body: None,
        }
    }

    pub fn read(path: impl Into<String>) -> Self {
        Self::new(Verb::Read, path)
    }

    pub fn create(path: impl Into<String>, body: Document) -> Self {
        Self::new(Verb::Create, path).with_body(body)
    }

    pub fn replace(path: impl Into<String>) -> Self {
        Self::new(Verb::Replace, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Verb::Delete, path)
    }

    pub fn control(name: impl Into<String>) -> Self {
        Self::new(Verb::Control(name.into()), "")
    }

    pub fn poll() -> Self {
        Self::new(Verb::Poll, "")
    }

    pub fn switch(on: bool) -> Self {
        Self::new(Verb::Switch(on), "")
    }

    pub fn with_body(mut self, body: Document) -> Self {
        self.body = Some(body);
        self
    }
}

/// Reply shape expected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    Flag,
    Text,
    Document,
}

/// A decoded reply
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Flag(bool),
    Text(String),
    Document(Document),
}

impl Reply {
    pub fn into_flag(self) -> Result<bool, IpcError> {
        match self {
            Reply::Flag(flag) => Ok(flag),
            other => Err(unexpected("flag", &other)),
        }
    }

    pub fn into_text(self) -> Result<String, IpcError> {
        match self {
            Reply::Text(text) => Ok(text),
            other => Err(unexpected("text", &other)),
        }
    }

    pub fn into_document(self) -> Result<Document, IpcError> {
        match self {
            Reply::Document(doc) => Ok(doc),
            other => Err(unexpected("document", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Reply) -> IpcError {
    IpcError::DecodeError(format!("expected {}, got {:?}", expected, got))
}

fn write_value(value: &Value) -> Result<Vec<u8>, IpcError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| IpcError::ProtocolError(format!("CBOR encode failed: {}", e)))?;
    Ok(buf)
}

fn utf8(bytes: &[u8]) -> Result<&str, IpcError> {
    std::str::from_utf8(bytes)
        .map_err(|e| IpcError::DecodeError(format!("invalid UTF-8: {}", e)))
}

/// Encode a request
pub fn encode(command: &Command) -> Result<Vec<u8>, IpcError> {
    match &command.verb {
        Verb::Control(name) => Ok(name.as_bytes().to_vec()),
        Verb::Poll => Ok(Vec::new()),
        Verb::Switch(on) => Ok(vec![u8::from(*on)]),
        verb => {
            let mut items = vec![
                Value::Text(verb.name().to_string()),
                Value::Text(command.path.clone()),
            ];
            if let Some(body) = &command.body {
                let text = serde_json::to_string(body)
                    .map_err(|e| IpcError::ProtocolError(format!("unsupported body: {}", e)))?;
                items.push(Value::Text(text));
            }
            write_value(&Value::Array(items))
        }
    }
}

/// Decode a request (peer side; used by in-process peers)
pub fn decode_command(bytes: &[u8]) -> Result<Command, IpcError> {
    match bytes {
        [] => return Ok(Command::poll()),
        [0] => return Ok(Command::switch(false)),
        [1] => return Ok(Command::switch(true)),
        _ => {}
    }

    // CBOR arrays start with major type 4, never a valid UTF-8 lead byte
    if bytes[0] & 0xe0 != 0x80 {
        return Ok(Command::control(utf8(bytes)?));
    }

    let Value::Array(items) = ciborium::from_reader::<Value, _>(bytes)
        .map_err(|e| IpcError::DecodeError(format!("invalid CBOR: {}", e)))?
    else {
        return Err(IpcError::DecodeError("command is not an array".into()));
    };

    let mut items = items.into_iter();
    let verb = match items.next() {
        Some(Value::Text(verb)) => Verb::from_wire(&verb)
            .ok_or_else(|| IpcError::DecodeError(format!("unknown verb {}", verb)))?,
        _ => return Err(IpcError::DecodeError("missing verb".into())),
    };
    let path = match items.next() {
        Some(Value::Text(path)) => path,
        _ => return Err(IpcError::DecodeError("missing path".into())),
    };
    let body = match items.next() {
        None => None,
        Some(Value::Text(text)) => Some(
            serde_json::from_str(&text)
                .map_err(|e| IpcError::DecodeError(format!("body is not JSON: {}", e)))?,
        ),
        Some(_) => return Err(IpcError::DecodeError("body is not JSON text".into())),
    };

    if items.next().is_some() {
        return Err(IpcError::DecodeError("trailing command items".into()));
    }

    Ok(Command { verb, path, body })
}

/// Encode a reply (peer side)
pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>, IpcError> {
    match reply {
        Reply::Flag(flag) => Ok(vec![u8::from(*flag)]),
        Reply::Text(text) => Ok(text.as_bytes().to_vec()),
        Reply::Document(doc) => serde_json::to_vec(doc)
            .map_err(|e| IpcError::ProtocolError(format!("JSON encode failed: {}", e))),
    }
}

/// Encode a peer-reported application error (peer side)
pub fn encode_rejection(rejection: &Rejection) -> Result<Vec<u8>, IpcError> {
    serde_json::to_vec(&serde_json::json!({
        "error": rejection.kind.as_wire(),
        "message": rejection.message,
    }))
    .map_err(|e| IpcError::ProtocolError(format!("JSON encode failed: {}", e)))
}

/// Recognise the `{"error": kind, "message": text}` envelope
fn as_rejection(value: &Document) -> Option<Rejection> {
    let entries = value.as_object()?;

    let mut kind = None;
    let mut message = String::new();
    for (key, val) in entries {
        match (key.as_str(), val) {
            ("error", Document::String(k)) => kind = Some(RejectionKind::from_wire(k)),
            ("message", Document::String(m)) => message = m.clone(),
            _ => return None,
        }
    }

    kind.map(|kind| Rejection { kind, message })
}

/// Envelope check for replies that are not themselves documents
fn rejection_in(bytes: &[u8]) -> Option<Rejection> {
    if bytes.first() != Some(&b'{') {
        return None;
    }
    serde_json::from_slice::<Document>(bytes)
        .ok()
        .and_then(|value| as_rejection(&value))
}

/// Decode a reply under the shape the caller expects
pub fn decode(bytes: &[u8], shape: ReplyShape) -> Result<Reply, IpcError> {
    if let Some(rejection) = rejection_in(bytes) {
        return Err(IpcError::Rejected(rejection));
    }

    match shape {
        ReplyShape::Flag => bytes
            .first()
            .map(|b| Reply::Flag(*b != 0))
            .ok_or_else(|| IpcError::DecodeError("empty flag reply".into())),
        ReplyShape::Text => utf8(bytes).map(|text| Reply::Text(text.to_string())),
        ReplyShape::Document => {
            let value: Document = serde_json::from_slice(bytes)
                .map_err(|e| IpcError::DecodeError(format!("invalid JSON: {}", e)))?;
            match value {
                Document::Object(_) | Document::Array(_) => Ok(Reply::Document(value)),
                other => Err(IpcError::DecodeError(format!(
                    "expected a document, got {}",
                    other
                ))),
            }
        }
    }
}

/// Interpret a mutation reply
///
/// An empty reply acknowledges the command; any other text is the peer's
/// reason for refusing it.
pub fn decode_ack(bytes: &[u8]) -> Result<(), IpcError> {
    if bytes.is_empty() {
        return Ok(());
    }
    if let Some(rejection) = rejection_in(bytes) {
        return Err(IpcError::Rejected(rejection));
    }
    let phrase = utf8(bytes)?;
    Err(IpcError::Rejected(Rejection::refused(phrase)))
}

/// Require a reply that is exactly `marker`
pub fn decode_marker(bytes: &[u8], marker: &str) -> Result<(), IpcError> {
    if bytes == marker.as_bytes() {
        return Ok(());
    }
    if let Some(rejection) = rejection_in(bytes) {
        return Err(IpcError::Rejected(rejection));
    }

    let got = String::from_utf8_lossy(bytes);
    let message = if got.trim().is_empty() {
        format!("peer did not confirm the command (expected {})", marker)
    } else {
        got.into_owned()
    };
    Err(IpcError::Rejected(Rejection::refused(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_envelope_without_body() {
        let bytes = encode(&Command::read("channel/")).unwrap();
        let decoded = decode_command(&bytes).unwrap();
        assert_eq!(decoded.verb, Verb::Read);
        assert_eq!(decoded.path, "channel/");
        assert!(decoded.body.is_none());
    }

    #[test]
    fn test_body_travels_as_json_text() {
        let body = json!({
            "type": "mqtt",
            "enabled": true,
            "port": 1883,
            "ratio": 0.25,
            "topics": ["a/b", "c/#"],
            "auth": {"authtype": "password", "username": null}
        });
        let bytes = encode(&Command::create("channel/sensor-1", body.clone())).unwrap();

        let value: Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        let items = value.into_array().unwrap();
        assert_eq!(items.len(), 3);
        let text = items[2].as_text().unwrap();
        assert_eq!(serde_json::from_str::<Document>(text).unwrap(), body);

        assert_eq!(decode_command(&bytes).unwrap().body, Some(body));
    }

    #[test]
    fn test_scalar_bodies_survive_the_envelope() {
        for body in [json!(true), json!(42), json!("text"), json!(null)] {
            let command = Command::replace("channel/c1").with_body(body.clone());
            let decoded = decode_command(&encode(&command).unwrap()).unwrap();
            assert_eq!(decoded.body, Some(body));
        }
    }

    #[test]
    fn test_control_words_are_plain_text() {
        assert_eq!(encode(&Command::control("https_on")).unwrap(), b"https_on");
        assert_eq!(
            decode_command(b"api_version").unwrap().verb,
            Verb::Control("api_version".into())
        );
    }

    #[test]
    fn test_switch_and_poll_bytes() {
        assert_eq!(encode(&Command::poll()).unwrap(), b"");
        assert_eq!(encode(&Command::switch(true)).unwrap(), [0x01]);
        assert_eq!(encode(&Command::switch(false)).unwrap(), [0x00]);
        assert_eq!(decode_command(&[0x01]).unwrap().verb, Verb::Switch(true));
        assert_eq!(decode_command(b"").unwrap().verb, Verb::Poll);
    }

    #[test]
    fn test_unknown_resource_verb_is_rejected() {
        let bytes = write_value(&Value::Array(vec![
            Value::Text("PATCH".into()),
            Value::Text("channel/x".into()),
        ]))
        .unwrap();
        assert!(matches!(
            decode_command(&bytes),
            Err(IpcError::DecodeError(_))
        ));
    }

    #[test]
    fn test_replies_are_raw_bytes() {
        assert_eq!(decode(b"2.1", ReplyShape::Text).unwrap(), Reply::Text("2.1".into()));
        assert_eq!(decode(&[0x01], ReplyShape::Flag).unwrap(), Reply::Flag(true));
        assert_eq!(decode(&[0x00], ReplyShape::Flag).unwrap(), Reply::Flag(false));
        assert_eq!(
            decode(br#"[{"id":"m1"}]"#, ReplyShape::Document).unwrap(),
            Reply::Document(json!([{"id": "m1"}]))
        );
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        assert!(matches!(
            decode(b"1.2.0", ReplyShape::Document),
            Err(IpcError::DecodeError(_))
        ));
        assert!(matches!(
            decode(b"", ReplyShape::Flag),
            Err(IpcError::DecodeError(_))
        ));
        assert!(matches!(
            decode(&[0xff, 0x00], ReplyShape::Text),
            Err(IpcError::DecodeError(_))
        ));
    }

    #[test]
    fn test_rejection_is_reported_distinctly() {
        let bytes = encode_rejection(&Rejection::not_found("no such channel")).unwrap();
        match decode(&bytes, ReplyShape::Document) {
            Err(IpcError::Rejected(r)) => {
                assert_eq!(r.kind, RejectionKind::NotFound);
                assert_eq!(r.message, "no such channel");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ack_requires_empty_reply() {
        assert!(decode_ack(b"").is_ok());

        match decode_ack(b"topic is invalid") {
            Err(IpcError::Rejected(r)) => {
                assert_eq!(r.kind, RejectionKind::Refused);
                assert_eq!(r.message, "topic is invalid");
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(decode_ack(b"ok").is_err());
    }

    #[test]
    fn test_marker_is_exact() {
        assert!(decode_marker(b"OK", "OK").is_ok());
        assert!(decode_marker(b"ok", "ok").is_ok());

        let replies: [&[u8]; 4] = [b"", b"ok", b"OK\n", &[0x01]];
        for reply in replies {
            assert!(
                matches!(decode_marker(reply, "OK"), Err(IpcError::Rejected(_))),
                "{:?} accepted",
                reply
            );
        }

        let conflict = encode_rejection(&Rejection::conflict("busy")).unwrap();
        match decode_marker(&conflict, "ok") {
            Err(IpcError::Rejected(r)) => assert_eq!(r.kind, RejectionKind::Conflict),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
