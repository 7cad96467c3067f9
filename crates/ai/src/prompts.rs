//! Prompt catalog for the Gemini sentiment backend.
//!
//! Each prompt pins the scale in-text so replies stay parseable without a
//! structured-output API.

use vibecheck_core::domain::SentimentScore;

/// Asks for a bare integer score on the 0..=100 scale.
pub fn emotion_score(input: &str) -> String {
    format!(
        "Analyze the emotion in the following text or emoji and provide a score \
         from 0 to 100, where 0 is very negative and 100 is very positive. \
         Only respond with the number, no other text. Text to analyze: {input}"
    )
}

/// Asks for one short mood-improving task for a scored check-in.
pub fn task_suggestion(emoji: &str, description: &str, score: SentimentScore) -> String {
    format!(
        "Based on the emoji {emoji}, description '{description}', and emotion score {score} \
         (0-100, where 0 is very negative and 100 is very positive), suggest a task \
         that can improve mood in an office setting. Provide only one short suggestion, \
         no numbering or explanation."
    )
}

/// Asks for a short digest of the mood behind an average score.
pub fn daily_summary(average_score: f64) -> String {
    format!(
        "Based on the average emotion score of {average_score:.2} (0-100, where 0 is very \
         negative and 100 is very positive), provide a brief summary of the overall mood \
         and a general suggestion for improvement. Keep it concise and positive."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(value: i64) -> SentimentScore {
        SentimentScore::new(value).unwrap()
    }

    #[test]
    fn score_prompt_demands_a_bare_number() {
        let prompt = emotion_score(":smile: had a great day");
        assert!(prompt.contains("Only respond with the number"));
        assert!(prompt.contains("Text to analyze: :smile: had a great day"));
    }

    #[test]
    fn task_prompt_carries_all_three_inputs() {
        let prompt = task_suggestion(":frown:", "rough standup", score(20));
        assert!(prompt.contains("emoji :frown:"));
        assert!(prompt.contains("description 'rough standup'"));
        assert!(prompt.contains("score 20"));
        assert!(prompt.contains("one short suggestion"));
    }

    #[test]
    fn summary_prompt_formats_average_with_two_decimals() {
        let prompt = daily_summary(72.5);
        assert!(prompt.contains("average emotion score of 72.50"));
    }
}
