use serde::Serialize;
use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// Suppresses human-oriented output (progress, per-file lines) when
/// `VARDECL_QUIET` is set
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("VARDECL_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Human }
    }

    pub fn is_human(self) -> bool {
        self == Self::Human
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a, T: Serialize> {
    ok: bool,
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Print `{"ok": true, "command": .., "data": ..}` on stdout in JSON mode
pub fn emit_success<T: Serialize>(mode: OutputMode, command: &str, data: T) -> crate::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    let envelope = Envelope {
        ok: true,
        command,
        data: Some(data),
        error: None,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Print `{"ok": false, "command": .., "error": ..}` on stdout in JSON mode
pub fn emit_error(mode: OutputMode, command: &str, message: &str) -> crate::Result<()> {
    if mode.is_human() {
        return Ok(());
    }
    let envelope: Envelope<'_, ()> = Envelope {
        ok: false,
        command,
        data: None,
        error: Some(message.to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope {
            ok: true,
            command: "check",
            data: Some(serde_json::json!({ "changed": 2 })),
            error: None,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "ok": true, "command": "check", "data": { "changed": 2 } })
        );
    }

    #[test]
    fn test_mode_from_flag() {
        assert!(OutputMode::from_flag(false).is_human());
        assert_eq!(OutputMode::from_flag(true), OutputMode::Json);
    }
}
