//! Yes/no questions asked before anything irreversible happens.
//!
//! Anything other than an explicit `y`/`yes` counts as "no".

use std::io::{self, BufRead, Write};

/// Source of answers to yes/no questions
pub trait Prompter {
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Asks on stderr and reads one line from stdin per question
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let mut stderr = io::stderr();
        write!(stderr, "{} (y/n): ", question)?;
        stderr.flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        Ok(is_affirmative(&input))
    }
}

/// Gives the same answer to every question (`--yes`, tests)
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn confirm(&mut self, _question: &str) -> io::Result<bool> {
        Ok(self.0)
    }
}

/// Replays scripted answers in order, then answers "no"
#[derive(Debug, Default)]
pub struct ScriptedAnswers {
    answers: Vec<bool>,
    pub asked: Vec<String>,
}

impl ScriptedAnswers {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        let mut answers: Vec<bool> = answers.into_iter().collect();
        answers.reverse();
        Self {
            answers,
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedAnswers {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop().unwrap_or(false))
    }
}

/// `y` and `yes` in any case are the only affirmative answers
pub fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yep"));
        assert!(!is_affirmative("\n"));
    }

    #[test]
    fn test_scripted_answers_default_to_no() {
        let mut prompter = ScriptedAnswers::new([true, false]);
        assert!(prompter.confirm("first?").unwrap());
        assert!(!prompter.confirm("second?").unwrap());
        assert!(!prompter.confirm("third?").unwrap());
        assert_eq!(prompter.asked, vec!["first?", "second?", "third?"]);
    }

    #[test]
    fn test_fixed_answer() {
        assert!(FixedAnswer(true).confirm("continue?").unwrap());
        assert!(!FixedAnswer(false).confirm("continue?").unwrap());
    }
}
