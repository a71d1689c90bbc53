/// Budget used when the user omits the third token.
pub const DEFAULT_BUDGET: &str = "不限";

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendQuery {
    pub location: String,
    pub category: String,
    pub budget: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand {
    Query(RecommendQuery),
    /// Fewer than two tokens: the user needs the usage guidance text.
    GuidanceNeeded,
}

/// Splits "地點 種類 [價位]" out of free text. Commas are accepted as
/// separators ("台中,火鍋,500"). Token content is deliberately not
/// validated, any string is a valid location/category/budget.
pub fn parse_command(text: &str) -> ParsedCommand {
    let normalized = text.trim().replace(',', " ");
    let mut tokens = normalized.split_whitespace();

    let (Some(location), Some(category)) = (tokens.next(), tokens.next()) else {
        return ParsedCommand::GuidanceNeeded;
    };

    ParsedCommand::Query(RecommendQuery {
        location: location.to_string(),
        category: category.to_string(),
        budget: tokens
            .next()
            .unwrap_or(DEFAULT_BUDGET)
            .to_string(),
    })
}

#[cfg(test)]
mod command_tests {
    use super::*;

    fn query(location: &str, category: &str, budget: &str) -> ParsedCommand {
        ParsedCommand::Query(RecommendQuery {
            location: location.to_string(),
            category: category.to_string(),
            budget: budget.to_string(),
        })
    }

    #[test]
    fn test_three_tokens_whitespace() {
        assert_eq!(parse_command("台中 火鍋 500"), query("台中", "火鍋", "500"));
    }

    #[test]
    fn test_three_tokens_commas() {
        assert_eq!(parse_command("台中,火鍋,500"), query("台中", "火鍋", "500"));
    }

    #[test]
    fn test_two_tokens_default_budget() {
        assert_eq!(parse_command("新竹 拉麵"), query("新竹", "拉麵", "不限"));
    }

    #[test]
    fn test_underspecified_input_needs_guidance() {
        assert_eq!(parse_command(""), ParsedCommand::GuidanceNeeded);
        assert_eq!(parse_command("   "), ParsedCommand::GuidanceNeeded);
        assert_eq!(parse_command("台中"), ParsedCommand::GuidanceNeeded);
        assert_eq!(parse_command(",,,"), ParsedCommand::GuidanceNeeded);
    }

    #[test]
    fn test_extra_tokens_are_ignored_beyond_budget() {
        // Token content is unvalidated; the fourth token is simply dropped.
        assert_eq!(
            parse_command("  台北   燒肉   1000 人均  "),
            query("台北", "燒肉", "1000")
        );
    }

    #[test]
    fn test_mixed_comma_and_space_separators() {
        assert_eq!(parse_command("台南,牛肉湯 100"), query("台南", "牛肉湯", "100"));
    }
}
