use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use supchat_types::{ChatError, ChatResult};

/// Opaque keyset cursor naming a position in the (created_at, id) total
/// order of a channel's log. Clients hand it back verbatim; its contents
/// are not part of the API contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: String,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        B64.encode(format!("{}|{}", self.created_at, self.id))
    }

    pub fn decode(raw: &str) -> ChatResult<Self> {
        let bytes = B64
            .decode(raw)
            .map_err(|_| ChatError::invalid("malformed cursor"))?;
        let text =
            String::from_utf8(bytes).map_err(|_| ChatError::invalid("malformed cursor"))?;
        let (created_at, id) = text
            .split_once('|')
            .ok_or_else(|| ChatError::invalid("malformed cursor"))?;
        if created_at.is_empty() || id.is_empty() {
            return Err(ChatError::invalid("malformed cursor"));
        }
        Ok(Cursor {
            created_at: created_at.to_string(),
            id: id.to_string(),
        })
    }
}
