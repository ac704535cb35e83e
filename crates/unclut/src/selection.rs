//! Parsing of the "1 3 5" / "all" / "quit" sender selection.

/// Result of parsing a selection line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// One-based indexes in the order given, without duplicates
    pub valid: Vec<usize>,
    /// Tokens that were out of range or not numbers
    pub invalid: Vec<String>,
    pub cancelled: bool,
}

impl Selection {
    fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }
}

pub fn parse_sequence_numbers(input: &str, max_index: usize) -> Selection {
    let input = input.trim().to_lowercase();

    if input.is_empty() || input == "quit" {
        return Selection::cancelled();
    }
    if input == "all" {
        return Selection {
            valid: (1..=max_index).collect(),
            ..Default::default()
        };
    }

    let mut selection = Selection::default();
    for token in input.split_whitespace() {
        match token.parse::<usize>() {
            Ok(n) if (1..=max_index).contains(&n) => {
                if !selection.valid.contains(&n) {
                    selection.valid.push(n);
                }
            }
            _ => selection.invalid.push(token.to_string()),
        }
    }

    selection
}
