use chrono::DateTime;
use chrono_tz::Tz;
use hearth_common::Message;

/// Built-in persona. Deployments override it via `agent.persona`.
pub const DEFAULT_PERSONA: &str = "\
You are Hearth, the resident intelligence of a smart home. You are precise, \
dry, and quietly helpful, in the manner of a good butler.

Ground rules:
- Keep answers under 30 words unless the user asks for detail.
- Use the metric system and Celsius.
- When the user only asks a question, answer it. Do not execute tools \
unless the user asks for an action.
- Before controlling entities, list them to confirm the ids exist. Only \
control entities you know exist.
- Calendar events default to one hour when no duration is given.";

/// The system prompt is rebuilt every turn so the model always sees the
/// current time.
pub fn build_system_prompt(persona: &str, now: DateTime<Tz>) -> Message {
    Message::system(format!(
        "{persona}\n\nRight now is {}.",
        now.format("%A, %B %e, %Y at %H:%M (%Z)")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hearth_common::Role;

    #[test]
    fn prompt_carries_persona_and_current_time() {
        let tz: Tz = "America/Sao_Paulo".parse().expect("valid timezone");
        let now = tz.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).single().expect("valid time");
        let prompt = build_system_prompt("You are a test butler.", now);

        assert_eq!(prompt.role, Role::System);
        assert!(prompt.content.starts_with("You are a test butler."));
        assert!(prompt.content.contains("March"));
        assert!(prompt.content.contains("14:30"));
        assert!(prompt.content.contains("-03"));
    }
}
