use std::fs;
use std::path::Path;

use crate::error::RuleLoadError;

use super::descriptor::{Descriptor, RuleKind};
use super::set::RuleBook;

/// Reads a rule file and builds the rule book.
pub fn load_rules(path: &Path) -> Result<RuleBook, RuleLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptors = parse_rules(&contents);
    if descriptors.is_empty() {
        return Err(RuleLoadError::NoRules {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), rules = descriptors.len(), "rules loaded");
    Ok(RuleBook::new(descriptors))
}

/// Parses rule text, one rule per line.
///
/// Lines without keywords are skipped and do not consume a rule index.
pub fn parse_rules(contents: &str) -> Vec<Descriptor> {
    let mut descriptors = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        let Some(parsed) = parse_line(line) else {
            continue;
        };
        let kind = match (parsed.blacklist, parsed.soft) {
            (true, true) => {
                tracing::warn!(
                    line = line_number + 1,
                    "rule can't be both soft match and blacklist, keeping blacklist"
                );
                RuleKind::Blacklist
            }
            (true, false) => RuleKind::Blacklist,
            (false, true) => RuleKind::Soft,
            (false, false) => RuleKind::Hard,
        };
        let name = parsed
            .name
            .unwrap_or_else(|| format!("#{}", descriptors.len()));
        if let Some(descriptor) = Descriptor::new(name, parsed.words, parsed.required, kind) {
            descriptors.push(descriptor);
        }
    }
    descriptors
}

#[derive(Debug, Default)]
struct ParsedLine {
    words: Vec<String>,
    required: Option<i64>,
    name: Option<String>,
    soft: bool,
    blacklist: bool,
}

fn parse_line(line: &str) -> Option<ParsedLine> {
    let mut parsed = ParsedLine::default();
    let mut tokens = Tokens::new(line);

    while let Some(token) = tokens.next() {
        if let Some(stripped) = token.strip_prefix('#') {
            parsed.name = if stripped.is_empty() {
                tokens
                    .next()
                    .map(|next| next.strip_prefix('#').unwrap_or(next).to_string())
            } else {
                Some(format!("{stripped}{}", tokens.rest()).trim_end().to_string())
            }
            .filter(|name| !name.is_empty());
            break;
        }
        if parsed.words.is_empty() {
            match token {
                "-" => {
                    parsed.blacklist = true;
                    continue;
                }
                "~" => {
                    parsed.soft = true;
                    continue;
                }
                _ => {}
            }
        }
        if let Ok(required) = token.parse::<i64>() {
            parsed.required = Some(required);
            continue;
        }
        parsed.words.push(token.to_string());
    }

    (!parsed.words.is_empty()).then_some(parsed)
}

/// Whitespace tokenizer that can hand back the untouched rest of the line.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn rest(&self) -> &'a str {
        self.rest
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let trimmed = self.rest.trim_start();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }
        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        let (token, rest) = trimmed.split_at(end);
        self.rest = rest;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::descriptor::Required;

    #[test]
    fn parses_markers_counts_and_names() {
        let rules = parse_rules(
            "sign in 1 #login screen\n\
             - sponsored skip 2 #ads\n\
             ~ loading\n",
        );
        assert_eq!(rules.len(), 3);

        assert_eq!(rules[0].name(), "login screen");
        assert_eq!(rules[0].words(), ["sign", "in"]);
        assert_eq!(rules[0].required(), Required::Count(1));
        assert_eq!(rules[0].kind(), RuleKind::Hard);

        assert_eq!(rules[1].name(), "ads");
        assert!(rules[1].is_blacklist());
        assert_eq!(rules[1].required(), Required::Count(2));

        assert_eq!(rules[2].name(), "#2");
        assert!(rules[2].is_soft());
    }

    #[test]
    fn attached_name_takes_rest_of_line() {
        let rules = parse_rules("game over #Final screen  shown \n");
        assert_eq!(rules[0].name(), "Final screen  shown");
        assert_eq!(rules[0].words(), ["game", "over"]);
    }

    #[test]
    fn keyword_parsing_stops_at_name() {
        let rules = parse_rules("pause #menu resume quit\n");
        assert_eq!(rules[0].words(), ["pause"]);
        assert_eq!(rules[0].name(), "menu resume quit");
    }

    #[test]
    fn markers_after_keywords_are_keywords() {
        let rules = parse_rules("score - ~\n");
        assert_eq!(rules[0].words(), ["score", "-", "~"]);
        assert_eq!(rules[0].kind(), RuleKind::Hard);
    }

    #[test]
    fn soft_and_blacklist_together_keeps_blacklist() {
        let rules = parse_rules("~ - banner\n");
        assert_eq!(rules[0].kind(), RuleKind::Blacklist);
        assert!(!rules[0].is_soft());
    }

    #[test]
    fn empty_lines_do_not_consume_indices() {
        let rules = parse_rules("\n   \n# only a name\n-\nfirst\n\nsecond\n");
        let names: Vec<&str> = rules.iter().map(|rule| rule.name()).collect();
        assert_eq!(names, ["#0", "#1"]);
    }

    #[test]
    fn last_count_wins_and_is_clamped() {
        let rules = parse_rules("a 1 b c 7\nx y -1\n");
        assert_eq!(rules[0].required(), Required::Count(3));
        assert_eq!(rules[1].required(), Required::All);
    }

    #[test]
    fn bare_hash_takes_next_token_as_name() {
        let rules = parse_rules("continue # resume now\nplay #\n");
        assert_eq!(rules[0].name(), "resume");
        assert_eq!(rules[1].name(), "#1");
    }
}
