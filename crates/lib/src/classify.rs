//! Reply selection: an ordered list of (predicate, reply builder) rules, first match wins.
//!
//! Each update is classified from its text alone. There is no per-chat state, so a
//! birth date and a name arriving in sequence are answered independently.

use regex::Regex;
use std::sync::OnceLock;

pub const WELCOME_TEXT: &str = "Привет! Я твой ассистент по цифровой психологии по системе Миланы Тарба.\n\nВведите дату рождения в формате: 20.05.1997";

pub const ANALYSIS_STARTED_TEXT: &str = "Ваши данные приняты начинаем анализ\n\n🔮 **АНАЛИЗ ПО ЦИФРОВОЙ ПСИХОЛОГИИ**\n\n*Анализ выполняется...*";

pub const FORMAT_ERROR_TEXT: &str =
    "❌ **Неверный формат.**\n\nВведите дату в формате `dd.mm.yyyy` или нажмите `/start`";

const START_COMMAND: &str = "/start";

/// Which rule produced a reply. Logged with each update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Start,
    BirthDate,
    Name,
    FormatError,
}

impl RuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Start => "start",
            RuleKind::BirthDate => "birth_date",
            RuleKind::Name => "name",
            RuleKind::FormatError => "format_error",
        }
    }
}

/// Reply chosen for one inbound text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub rule: RuleKind,
    pub reply: String,
}

struct Rule {
    kind: RuleKind,
    matches: fn(&str) -> bool,
    reply: fn(&str) -> String,
}

static RULES: &[Rule] = &[
    Rule {
        kind: RuleKind::Start,
        matches: is_start_command,
        reply: |_| WELCOME_TEXT.to_string(),
    },
    Rule {
        kind: RuleKind::BirthDate,
        matches: is_birth_date,
        reply: |text| format!("Спасибо дата принята: {}\nВведите имя", text),
    },
    Rule {
        kind: RuleKind::Name,
        matches: is_name,
        reply: |_| ANALYSIS_STARTED_TEXT.to_string(),
    },
];

fn is_start_command(text: &str) -> bool {
    text == START_COMMAND
}

// ASCII digits only: `\d` in the regex crate also matches other Unicode digits.
fn birth_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{2}\.[0-9]{2}\.[0-9]{4}$").expect("birth date regex"))
}

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[а-яёА-ЯЁa-zA-Z]+$").expect("name regex"))
}

fn is_birth_date(text: &str) -> bool {
    birth_date_regex().is_match(text)
}

fn is_name(text: &str) -> bool {
    name_regex().is_match(text)
}

/// Pick the reply for an update's text. Absent text falls through to the format error.
pub fn classify(text: Option<&str>) -> Classification {
    let text = text.unwrap_or("");
    RULES
        .iter()
        .find(|rule| (rule.matches)(text))
        .map(|rule| Classification {
            rule: rule.kind,
            reply: (rule.reply)(text),
        })
        .unwrap_or_else(|| Classification {
            rule: RuleKind::FormatError,
            reply: FORMAT_ERROR_TEXT.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_command_gets_welcome() {
        let c = classify(Some("/start"));
        assert_eq!(c.rule, RuleKind::Start);
        assert_eq!(c.reply, WELCOME_TEXT);
    }

    #[test]
    fn start_must_match_exactly() {
        for text in ["/start ", " /start", "/Start", "/start now"] {
            assert_eq!(classify(Some(text)).rule, RuleKind::FormatError, "{text:?}");
        }
    }

    #[test]
    fn birth_date_is_echoed() {
        for text in ["20.05.1997", "01.01.2000", "31.12.1999", "99.99.9999"] {
            let c = classify(Some(text));
            assert_eq!(c.rule, RuleKind::BirthDate);
            assert_eq!(c.reply, format!("Спасибо дата принята: {}\nВведите имя", text));
        }
    }

    #[test]
    fn near_dates_are_format_errors() {
        for text in [
            "20-05-1997",
            "2.05.1997",
            "20.05.97",
            "20.05.1997\n",
            " 20.05.1997",
            "20.05.19975",
            "٢٠.٠٥.١٩٩٧",
        ] {
            assert_eq!(classify(Some(text)).rule, RuleKind::FormatError, "{text:?}");
        }
    }

    #[test]
    fn latin_and_cyrillic_names_start_analysis() {
        for text in ["Maria", "Мария", "Алёна", "ЁЖ", "x"] {
            let c = classify(Some(text));
            assert_eq!(c.rule, RuleKind::Name, "{text:?}");
            assert_eq!(c.reply, ANALYSIS_STARTED_TEXT);
        }
    }

    #[test]
    fn non_letter_names_are_rejected() {
        for text in ["Anna Maria", "Анна-Мария", "Zoë", "Ñandú", "123abc", "Maria1"] {
            assert_eq!(classify(Some(text)).rule, RuleKind::FormatError, "{text:?}");
        }
    }

    #[test]
    fn empty_or_missing_text_is_format_error() {
        assert_eq!(classify(Some("")).reply, FORMAT_ERROR_TEXT);
        assert_eq!(classify(None).reply, FORMAT_ERROR_TEXT);
    }

    #[test]
    fn classification_is_idempotent() {
        for text in ["/start", "20.05.1997", "Мария", "???"] {
            assert_eq!(classify(Some(text)), classify(Some(text)));
        }
    }
}
