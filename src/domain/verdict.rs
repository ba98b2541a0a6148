/// Reading of a constrained yes/no model answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
    Unclear,
}

const AFFIRMATIVE: [&str; 3] = ["YES", "TRUE", "PASS"];
const NEGATIVE: [&str; 3] = ["NO", "FALSE", "FAIL"];

impl Verdict {
    /// The first recognised word wins, so "No, yes would be wrong" reads as `No`.
    pub fn parse(text: &str) -> Self {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(|word| word.to_ascii_uppercase())
            .find_map(|word| {
                if AFFIRMATIVE.contains(&word.as_str()) {
                    Some(Verdict::Yes)
                } else if NEGATIVE.contains(&word.as_str()) {
                    Some(Verdict::No)
                } else {
                    None
                }
            })
            .unwrap_or(Verdict::Unclear)
    }

    pub fn is_yes_or(&self, default: bool) -> bool {
        match self {
            Verdict::Yes => true,
            Verdict::No => false,
            Verdict::Unclear => default,
        }
    }
}
