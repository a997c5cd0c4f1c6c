use crate::core::relationship::CompatibilityResult;

pub fn compatibility_prompt(your_name: &str, partner_name: &str) -> String {
    format!(
        "Analyze the compatibility between {} and {}. Provide match percentage, \
         compatibility level, advice, strengths, and areas to work on.",
        your_name, partner_name
    )
}

pub fn prediction_prompt(
    your_name: &str,
    partner_name: &str,
    compatibility: &CompatibilityResult,
) -> String {
    format!(
        "Generate a future relationship prediction for {} and {}. Their compatibility \
         level is {} at {}%. Provide short-term prediction, long-term prediction, \
         potential challenges, emotional trajectory, key advice, and overall outlook.",
        your_name,
        partner_name,
        compatibility.compatibility_level,
        compatibility.match_percentage
    )
}

/// The chat specialist receives the user's words unchanged.
pub fn chat_prompt(message: &str) -> String {
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_prompt_names() {
        let prompt = compatibility_prompt("Ana", "Leo");
        assert!(prompt.starts_with("Analyze the compatibility between Ana and Leo."));
    }

    #[test]
    fn test_prediction_prompt_includes_prior_result() {
        let compat = CompatibilityResult {
            match_percentage: 91,
            compatibility_level: "Soulmates".to_string(),
            advice: String::new(),
            strengths: String::new(),
            areas_to_work_on: String::new(),
        };
        let prompt = prediction_prompt("Ana", "Leo", &compat);
        assert!(prompt.contains("for Ana and Leo"));
        assert!(prompt.contains("level is Soulmates at 91%"));
    }
}
