//! Output formatting for resolved cards (table, JSON, markdown, CSV).

use crate::cardmarket::CardData;
use crate::config::OutputFormat;
use crate::error::ResolutionError;
use serde_json::json;

/// Result of resolving one tag, as shown to the user.
pub type Outcome = (String, Result<CardData, ResolutionError>);

/// Formats cards and resolution errors for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a single resolved card.
    pub fn format_card(&self, tag: &str, card: &CardData) -> String {
        match self.format {
            OutputFormat::Json => pretty(&self.json_card(tag, card)),
            OutputFormat::Table => self.table_card(card),
            OutputFormat::Markdown => self.markdown_card(tag, card),
            OutputFormat::Csv => self.csv_outcomes(&[(tag.to_string(), Ok(card.clone()))]),
        }
    }

    /// Formats a single resolution failure.
    pub fn format_error(&self, tag: &str, error: &ResolutionError) -> String {
        match self.format {
            OutputFormat::Json => pretty(&self.json_error(tag, error)),
            OutputFormat::Csv => self.csv_outcomes(&[(tag.to_string(), Err(error.clone()))]),
            _ => format!("Error: {}", error),
        }
    }

    /// Formats the outcomes of several lookups.
    pub fn format_outcomes(&self, outcomes: &[Outcome]) -> String {
        if outcomes.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No tags given.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                let values: Vec<_> = outcomes
                    .iter()
                    .map(|(tag, result)| match result {
                        Ok(card) => self.json_card(tag, card),
                        Err(e) => self.json_error(tag, e),
                    })
                    .collect();
                serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_outcomes(outcomes),
            OutputFormat::Markdown => self.markdown_outcomes(outcomes),
            OutputFormat::Csv => self.csv_outcomes(outcomes),
        }
    }

    // JSON formatting

    fn json_card(&self, tag: &str, card: &CardData) -> serde_json::Value {
        json!({
            "tag": tag,
            "name": card.name,
            "image_url": card.image_url,
            "price": card.price,
        })
    }

    fn json_error(&self, tag: &str, error: &ResolutionError) -> serde_json::Value {
        json!({
            "tag": tag,
            "error": error.kind(),
            "message": error.to_string(),
        })
    }

    // Table formatting

    fn table_card(&self, card: &CardData) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Name:        {}", card.name));
        lines.push(format!("From:        {}", card.price.from));
        lines.push(format!("Price Trend: {}", card.price.trend));
        lines.push(format!("30-Day Avg:  {}", card.price.avg30));

        if card.has_image() {
            lines.push(format!("Image:       {}", card.image_url));
        }

        lines.join("\n")
    }

    fn table_outcomes(&self, outcomes: &[Outcome]) -> String {
        let tag_width = 12;
        let price_width = 10;
        let name_width = 40;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<tag_width$}  {:>price_width$}  {:>price_width$}  {:>price_width$}  {}",
            "Tag", "From", "Trend", "30-Day", "Name"
        ));
        lines.push(format!(
            "{:-<tag_width$}  {:-<price_width$}  {:-<price_width$}  {:-<price_width$}  {:-<name_width$}",
            "", "", "", "", ""
        ));

        for (tag, result) in outcomes {
            match result {
                Ok(card) => {
                    let name = truncate(&card.name, name_width);
                    lines.push(format!(
                        "{:<tag_width$}  {:>price_width$}  {:>price_width$}  {:>price_width$}  {}",
                        tag, card.price.from, card.price.trend, card.price.avg30, name
                    ));
                }
                Err(e) => lines.push(format!("{:<tag_width$}  Error: {}", tag, e)),
            }
        }

        let found = outcomes.iter().filter(|(_, r)| r.is_ok()).count();
        lines.push(String::new());
        lines.push(format!("Resolved: {}/{}", found, outcomes.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_card(&self, tag: &str, card: &CardData) -> String {
        let mut lines = Vec::new();

        lines.push(format!("## {}", card.name));
        lines.push(String::new());
        lines.push(format!("- **Tag:** {}", tag));
        lines.push(format!("- **From:** {}", card.price.from));
        lines.push(format!("- **Price Trend:** {}", card.price.trend));
        lines.push(format!("- **30-Day Avg:** {}", card.price.avg30));

        if card.has_image() {
            lines.push(String::new());
            lines.push(format!("![{}]({})", card.name, card.image_url));
        }

        lines.join("\n")
    }

    fn markdown_outcomes(&self, outcomes: &[Outcome]) -> String {
        let mut lines = Vec::new();

        lines.push("| Tag | Name | From | Trend | 30-Day |".to_string());
        lines.push("|-----|------|------|-------|--------|".to_string());

        for (tag, result) in outcomes {
            match result {
                Ok(card) => lines.push(format!(
                    "| {} | {} | {} | {} | {} |",
                    tag,
                    truncate(&card.name, 40),
                    card.price.from,
                    card.price.trend,
                    card.price.avg30
                )),
                Err(e) => lines.push(format!("| {} | *{}* | | | |", tag, e)),
            }
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "tag,name,from,trend,avg30,image_url,error".to_string()
    }

    fn csv_outcomes(&self, outcomes: &[Outcome]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for (tag, result) in outcomes {
            let tag = Self::csv_escape(tag);
            match result {
                Ok(card) => lines.push(format!(
                    "{},{},{},{},{},{},",
                    tag,
                    Self::csv_escape(&card.name),
                    Self::csv_escape(&card.price.from),
                    Self::csv_escape(&card.price.trend),
                    Self::csv_escape(&card.price.avg30),
                    Self::csv_escape(&card.image_url)
                )),
                Err(e) => lines.push(format!("{},,,,,,{}", tag, e.kind())),
            }
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cardmarket::CardPrice;

    fn make_card() -> CardData {
        CardData {
            name: "Charizard ex".to_string(),
            image_url: "https://product-images.example/151/sv2a182.jpg".to_string(),
            price: CardPrice {
                from: "3,49 €".to_string(),
                trend: "4,12 €".to_string(),
                avg30: "4,35 €".to_string(),
            },
        }
    }

    fn make_partial_card() -> CardData {
        CardData {
            name: "Name not found".to_string(),
            image_url: String::new(),
            price: CardPrice { from: "0,50 €".to_string(), ..CardPrice::unavailable() },
        }
    }

    #[test]
    fn test_table_single_card() {
        let output = Formatter::new(OutputFormat::Table).format_card("sv2a182", &make_card());

        assert!(output.contains("Name:        Charizard ex"));
        assert!(output.contains("From:        3,49 €"));
        assert!(output.contains("Price Trend: 4,12 €"));
        assert!(output.contains("30-Day Avg:  4,35 €"));
        assert!(output.contains("Image:       https://product-images.example"));
    }

    #[test]
    fn test_table_partial_card() {
        let output = Formatter::new(OutputFormat::Table).format_card("x", &make_partial_card());

        assert!(output.contains("Price Trend: N/A"));
        assert!(!output.contains("Image:"));
    }

    #[test]
    fn test_json_card() {
        let output = Formatter::new(OutputFormat::Json).format_card("sv2a182", &make_card());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["tag"], "sv2a182");
        assert_eq!(value["name"], "Charizard ex");
        assert_eq!(value["price"]["trend"], "4,12 €");
        assert_eq!(value["price"]["avg30"], "4,35 €");
    }

    #[test]
    fn test_json_error() {
        let output =
            Formatter::new(OutputFormat::Json).format_error("zzz", &ResolutionError::NotFound);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["error"], "not_found");
        assert_eq!(value["message"], "No product found for tag.");
    }

    #[test]
    fn test_table_error() {
        let output = Formatter::new(OutputFormat::Table)
            .format_error("sv2a", &ResolutionError::AmbiguousTag);
        assert_eq!(output, "Error: Tag was not specific. Landed on a search results page.");
    }

    #[test]
    fn test_markdown_card() {
        let output = Formatter::new(OutputFormat::Markdown).format_card("sv2a182", &make_card());

        assert!(output.contains("## Charizard ex"));
        assert!(output.contains("- **Tag:** sv2a182"));
        assert!(output.contains("- **Price Trend:** 4,12 €"));
        assert!(output.contains("![Charizard ex](https://product-images.example/151/sv2a182.jpg)"));
    }

    #[test]
    fn test_csv_card_escapes_prices() {
        let output = Formatter::new(OutputFormat::Csv).format_card("sv2a182", &make_card());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "tag,name,from,trend,avg30,image_url,error");
        assert!(lines[1].starts_with("sv2a182,Charizard ex,\"3,49 €\",\"4,12 €\",\"4,35 €\""));
        assert!(lines[1].ends_with(','));
    }

    #[test]
    fn test_csv_escapes_image_url() {
        let mut card = make_card();
        card.image_url = "https://cdn.example/img,w=200/sv2a182.jpg".to_string();

        let output = Formatter::new(OutputFormat::Csv).format_card("sv2a182", &card);
        let row = output.lines().nth(1).unwrap();
        assert!(row.ends_with(",\"https://cdn.example/img,w=200/sv2a182.jpg\","));
    }

    #[test]
    fn test_csv_error() {
        let output = Formatter::new(OutputFormat::Csv)
            .format_error("sv2a182", &ResolutionError::Timeout { secs: 20 });
        assert!(output.ends_with("sv2a182,,,,,,timeout"));
    }

    #[test]
    fn test_outcomes_table() {
        let outcomes = vec![
            ("sv2a182".to_string(), Ok(make_card())),
            ("zzz".to_string(), Err(ResolutionError::NotFound)),
        ];
        let output = Formatter::new(OutputFormat::Table).format_outcomes(&outcomes);

        assert!(output.contains("Tag"));
        assert!(output.contains("----------"));
        assert!(output.contains("Charizard ex"));
        assert!(output.contains("Error: No product found for tag."));
        assert!(output.contains("Resolved: 1/2"));
    }

    #[test]
    fn test_outcomes_json() {
        let outcomes = vec![
            ("sv2a182".to_string(), Ok(make_card())),
            ("".to_string(), Err(ResolutionError::InvalidInput)),
        ];
        let output = Formatter::new(OutputFormat::Json).format_outcomes(&outcomes);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[1]["error"], "invalid_input");
    }

    #[test]
    fn test_outcomes_markdown() {
        let outcomes = vec![("sv2a182".to_string(), Ok(make_card()))];
        let output = Formatter::new(OutputFormat::Markdown).format_outcomes(&outcomes);

        assert!(output.contains("| Tag | Name | From | Trend | 30-Day |"));
        assert!(output.contains("| sv2a182 | Charizard ex | 3,49 € | 4,12 € | 4,35 € |"));
    }

    #[test]
    fn test_outcomes_empty() {
        assert_eq!(Formatter::new(OutputFormat::Json).format_outcomes(&[]), "[]");
        assert_eq!(Formatter::new(OutputFormat::Table).format_outcomes(&[]), "No tags given.");
        assert_eq!(
            Formatter::new(OutputFormat::Csv).format_outcomes(&[]),
            "tag,name,from,trend,avg30,image_url,error"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Pokémon Card 151 Charizard", 10), "Pokémon...");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(Formatter::csv_escape("simple"), "simple");
        assert_eq!(Formatter::csv_escape("with,comma"), "\"with,comma\"");
        assert_eq!(Formatter::csv_escape("with\"quote"), "\"with\"\"quote\"");
    }
}
