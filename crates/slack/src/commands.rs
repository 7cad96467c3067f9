use serde::Deserialize;

/// Slash command that starts an emotional check-in.
pub const CHECKIN_COMMAND: &str = "/vibe";

/// Wire payload of a `slash_commands` envelope.
///
/// Slack omits fields freely depending on workspace settings, so every field
/// defaults to empty rather than failing deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
}

#[cfg(test)]
mod tests {
    use super::{SlashCommandPayload, CHECKIN_COMMAND};

    #[test]
    fn payload_deserializes_from_full_envelope_json() {
        let payload: SlashCommandPayload = serde_json::from_str(
            r#"{
                "command": "/vibe",
                "text": ":smile: had a great day",
                "user_id": "U123",
                "channel_id": "C456",
                "team_id": "T789"
            }"#,
        )
        .expect("deserialize payload");

        assert_eq!(payload.command, CHECKIN_COMMAND);
        assert_eq!(payload.text, ":smile: had a great day");
        assert_eq!(payload.user_id, "U123");
        assert_eq!(payload.channel_id, "C456");
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let payload: SlashCommandPayload =
            serde_json::from_str(r#"{"command": "/vibe"}"#).expect("deserialize sparse payload");

        assert_eq!(payload.command, "/vibe");
        assert_eq!(payload.text, "");
        assert_eq!(payload.user_id, "");
        assert_eq!(payload.channel_id, "");
    }
}
