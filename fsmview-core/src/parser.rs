//! State machine definition language.
//!
//! A definition is a sequence of `;`-terminated statements. `#` starts a
//! comment that runs to the end of the line (`\#` is a literal `#`).
//!
//! ```text
//! STATE <id> <parentId|_> "<name>" : <INITIAL|SIMPLE|COMPOUND|FINAL>;
//! TRIGGER <id> "<name>";
//! ACTION <id> "<name>" : <ENTRY_ACTION|EXIT_ACTION|DO_ACTION|TRANSITION_ACTION> [ON <ownerId>];
//! TRANSITION <id> <sourceId> -> <targetId> [<triggerId>] ["<guard>"];
//! ```
//!
//! `ON <ownerId>` binds an action when it is declared: entry, exit and do
//! actions to a state, transition actions to a transition. The owner must
//! already be defined.
//!
//! A `TRANSITION` without a trigger gets an anonymous trigger with id
//! `__<transitionId>__` and an empty name.
//!
//! Parsing is best-effort: a statement that does not fit its grammar, or
//! starts with an unknown keyword, is skipped with a [`ParseWarning`].

use crate::builder::ModelBuilder;
use crate::error::{FsmError, ReferenceRole};
use crate::model::{ActionKind, Model};
use std::fmt;

/// A statement that was skipped or only partly applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// The trimmed statement text.
    pub statement: String,
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}'", self.reason, self.statement)
    }
}

/// Result of parsing a definition.
#[derive(Debug)]
pub struct ParseOutput {
    pub model: Model,
    pub warnings: Vec<ParseWarning>,
}

/// Parses a definition with a default builder.
pub fn parse(source: &str) -> ParseOutput {
    Parser::new(ModelBuilder::new()).parse_str(source)
}

/// Removes comments, keeping line breaks.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                chars.next();
                out.push('#');
            }
            '#' => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Splits a definition into trimmed, non-empty statements.
pub fn statements(source: &str) -> Vec<String> {
    strip_comments(source)
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Drives a [`ModelBuilder`] from definition text.
pub struct Parser {
    builder: ModelBuilder,
    warnings: Vec<ParseWarning>,
}

impl Parser {
    pub fn new(builder: ModelBuilder) -> Self {
        Self {
            builder,
            warnings: Vec::new(),
        }
    }

    /// Parses every statement and builds the model.
    pub fn parse_str(mut self, source: &str) -> ParseOutput {
        for statement in statements(source) {
            self.parse_statement(&statement);
        }

        ParseOutput {
            model: self.builder.build(),
            warnings: self.warnings,
        }
    }

    fn parse_statement(&mut self, statement: &str) {
        let keyword = statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        let result = match keyword.as_str() {
            "STATE" => self.parse_state(statement),
            "TRIGGER" => self.parse_trigger(statement),
            "ACTION" => self.parse_action(statement),
            "TRANSITION" => self.parse_transition(statement),
            _ => {
                self.warn(statement, "unknown statement ignored".to_string());
                return;
            }
        };

        if let Err(reason) = result {
            self.warn(statement, format!("invalid {}: {}", keyword, reason));
        }
    }

    fn warn(&mut self, statement: &str, reason: String) {
        let warning = ParseWarning {
            statement: statement.to_string(),
            reason,
        };
        tracing::warn!("Parser warning: {}", warning);
        self.warnings.push(warning);
    }

    fn parse_state(&mut self, statement: &str) -> Result<(), String> {
        let mut cursor = Cursor::new(statement)?;
        cursor.keyword()?;
        let id = cursor.word("state id")?;
        let parent = cursor.word("parent id or '_'")?;
        let name = cursor.quoted("state name")?;
        cursor.colon()?;
        let kind_tag = cursor.word("state kind")?;
        cursor.finish()?;

        let parent = (parent != "_").then_some(parent);
        let orphan = parent.filter(|p| !self.builder.has_state(p));

        self.builder
            .add_state_tagged(id, name, kind_tag, parent)
            .map_err(|e| e.to_string())?;

        if let Some(parent_id) = orphan {
            self.warn(
                statement,
                format!(
                    "parent '{}' is not defined yet; state '{}' added without parent",
                    parent_id, id
                ),
            );
        }
        Ok(())
    }

    fn parse_trigger(&mut self, statement: &str) -> Result<(), String> {
        let mut cursor = Cursor::new(statement)?;
        cursor.keyword()?;
        let id = cursor.word("trigger id")?;
        let name = cursor.quoted("trigger name")?;
        cursor.finish()?;

        self.builder.add_trigger(id, name);
        Ok(())
    }

    fn parse_action(&mut self, statement: &str) -> Result<(), String> {
        let mut cursor = Cursor::new(statement)?;
        cursor.keyword()?;
        let id = cursor.word("action id")?;
        let name = cursor.quoted("action name")?;
        cursor.colon()?;
        let kind_tag = cursor.word("action kind")?;
        let owner = if cursor.peek_keyword("ON") {
            cursor.keyword()?;
            Some(cursor.word("owner id after ON")?)
        } else {
            None
        };
        cursor.finish()?;

        let kind: ActionKind = kind_tag.parse().map_err(|e| format!("{}", e))?;
        self.builder.add_action(id, name, kind);

        if let Some(owner) = owner {
            self.bind_action(statement, id, kind, owner);
        }
        Ok(())
    }

    fn bind_action(&mut self, statement: &str, id: &str, kind: ActionKind, owner: &str) {
        let bound = match kind {
            ActionKind::TransitionAction => self.builder.has_transition(owner),
            _ => self.builder.has_state(owner),
        };
        if !bound {
            let owner_kind = match kind {
                ActionKind::TransitionAction => "transition",
                _ => "state",
            };
            self.warn(
                statement,
                format!(
                    "{} '{}' is not defined; action '{}' left unbound",
                    owner_kind, owner, id
                ),
            );
            return;
        }

        match kind {
            ActionKind::EntryAction => self.builder.add_entry_action(owner, id),
            ActionKind::ExitAction => self.builder.add_exit_action(owner, id),
            ActionKind::DoAction => self.builder.add_do_action(owner, id),
            ActionKind::TransitionAction => self.builder.add_transition_action(owner, id),
        };
    }

    fn parse_transition(&mut self, statement: &str) -> Result<(), String> {
        let mut cursor = Cursor::new(statement)?;
        cursor.keyword()?;
        let id = cursor.word("transition id")?;
        let source = cursor.word("source state id")?;
        cursor.arrow()?;
        let target = cursor.word("target state id")?;
        let trigger = cursor.optional_word();
        let guard = cursor.optional_quoted().unwrap_or_default();
        cursor.finish()?;

        let trigger_id = match trigger {
            Some(trigger) => trigger.to_string(),
            None => {
                // The anonymous trigger exists only alongside its transition.
                let ends = [(ReferenceRole::Source, source), (ReferenceRole::Target, target)];
                for (role, state) in ends {
                    if !self.builder.has_state(state) {
                        return Err(FsmError::InvalidReference {
                            transition: id.to_string(),
                            role,
                            id: state.to_string(),
                        }
                        .to_string());
                    }
                }
                let anonymous = format!("__{}__", id);
                self.builder.add_trigger(&anonymous, "");
                anonymous
            }
        };

        self.builder
            .add_transition(id, source, target, &trigger_id, guard)
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(&'a str),
    Colon,
    Arrow,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{}'", w),
            Token::Quoted(q) => write!(f, "\"{}\"", q),
            Token::Colon => f.write_str("':'"),
            Token::Arrow => f.write_str("'->'"),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits one statement into tokens.
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn tokenize(mut self) -> Result<Vec<Token<'a>>, String> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek_char() else {
                return Ok(tokens);
            };

            let token = match c {
                ':' => {
                    self.pos += 1;
                    Token::Colon
                }
                '-' if self.input[self.pos..].starts_with("->") => {
                    self.pos += 2;
                    Token::Arrow
                }
                '"' => self.quoted()?,
                c if is_word_char(c) => self.word(),
                c => return Err(format!("unexpected character '{}'", c)),
            };
            tokens.push(token);
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn word(&mut self) -> Token<'a> {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !is_word_char(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        Token::Word(&self.input[start..self.pos])
    }

    fn quoted(&mut self) -> Result<Token<'a>, String> {
        let start = self.pos + 1;
        match self.input[start..].find('"') {
            Some(len) => {
                self.pos = start + len + 1;
                Ok(Token::Quoted(&self.input[start..start + len]))
            }
            None => Err("unterminated string".to_string()),
        }
    }
}

/// Grammar helper over a statement's tokens.
struct Cursor<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(statement: &'a str) -> Result<Self, String> {
        Ok(Self {
            tokens: Lexer::new(statement).tokenize()?,
            pos: 0,
        })
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn keyword(&mut self) -> Result<(), String> {
        self.word("keyword").map(|_| ())
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn word(&mut self, what: &str) -> Result<&'a str, String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            Some(other) => Err(format!("expected {}, found {}", what, other)),
            None => Err(format!("missing {}", what)),
        }
    }

    fn quoted(&mut self, what: &str) -> Result<&'a str, String> {
        match self.next() {
            Some(Token::Quoted(q)) => Ok(q),
            Some(other) => Err(format!("expected quoted {}, found {}", what, other)),
            None => Err(format!("missing quoted {}", what)),
        }
    }

    fn colon(&mut self) -> Result<(), String> {
        match self.next() {
            Some(Token::Colon) => Ok(()),
            Some(other) => Err(format!("expected ':', found {}", other)),
            None => Err("missing ':'".to_string()),
        }
    }

    fn arrow(&mut self) -> Result<(), String> {
        match self.next() {
            Some(Token::Arrow) => Ok(()),
            Some(other) => Err(format!("expected '->', found {}", other)),
            None => Err("missing '->'".to_string()),
        }
    }

    fn optional_word(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Some(w)
            }
            _ => None,
        }
    }

    fn optional_quoted(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Quoted(q)) => {
                self.pos += 1;
                Some(q)
            }
            _ => None,
        }
    }

    fn finish(&self) -> Result<(), String> {
        match self.peek() {
            None => Ok(()),
            Some(extra) => Err(format!("unexpected trailing {}", extra)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StateKind;
    use proptest::prelude::*;

    const TRAFFIC: &str = r#"
        STATE s1 _ "S1" : INITIAL;
        STATE s2 _ "S2" : SIMPLE;
        STATE s3 _ "S3" : FINAL;
        TRIGGER t1 "T1";
        TRANSITION tr1 s1 -> s2 t1;
        TRANSITION tr2 s2 -> s3 t1;
    "#;

    #[test]
    fn test_parse_basic_definition() {
        let output = parse(TRAFFIC);
        assert!(output.warnings.is_empty());

        let model = output.model;
        assert_eq!(model.state_count(), 3);
        assert_eq!(model.transition_count(), 2);
        assert_eq!(model.initial_state().unwrap().id, "s1");
        assert!(model.is_final("s3"));

        let tr1 = model.transition("tr1").unwrap();
        assert_eq!((tr1.source.as_str(), tr1.target.as_str()), ("s1", "s2"));
        assert_eq!(tr1.trigger, "t1");
        assert!(!tr1.is_guarded());
    }

    #[test]
    fn test_malformed_transition_is_skipped() {
        let output = parse(r#"STATE a _ "A" : INITIAL; TRANSITION broken a => b;"#);
        assert_eq!(output.model.state_count(), 1);
        assert_eq!(output.model.transition_count(), 0);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].statement, "TRANSITION broken a => b");
        assert!(output.warnings[0].reason.starts_with("invalid TRANSITION"));
    }

    #[test]
    fn test_unknown_statement_warns_and_continues() {
        let output = parse(r#"REGION r1; STATE a _ "A" : INITIAL;"#);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].statement, "REGION r1");
        assert!(output.model.has_state("a"));
    }

    #[test]
    fn test_comments_and_escapes() {
        let source = "# leading comment\n\
                      STATE a _ \"Room \\#1\" : INITIAL; # trailing ; not a statement\n\
                      TRIGGER go \"Go\";";
        let output = parse(source);
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
        assert_eq!(output.model.state("a").unwrap().name, "Room #1");
        assert!(output.model.trigger("go").is_some());
    }

    #[test]
    fn test_keywords_and_kinds_are_case_insensitive() {
        let output = parse(r#"state a _ "A" : initial; Trigger go "Go"; transition t a -> a go;"#);
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
        assert_eq!(output.model.state("a").unwrap().kind, StateKind::Initial);
        assert_eq!(output.model.transition_count(), 1);
    }

    #[test]
    fn test_unknown_kind_tag() {
        let output = parse(r#"STATE h _ "History" : HISTORY;"#);
        assert_eq!(output.model.state_count(), 0);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].reason.contains("unknown state kind"));
    }

    #[test]
    fn test_anonymous_trigger() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL; STATE b _ "B" : SIMPLE; TRANSITION auto a -> b "ready";"#,
        );
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);
        let transition = output.model.transition("auto").unwrap();
        assert_eq!(transition.trigger, "__auto__");
        assert_eq!(transition.guard, "ready");
        assert_eq!(output.model.trigger("__auto__").unwrap().name, "");
    }

    #[test]
    fn test_rejected_anonymous_transition_leaves_no_trigger() {
        let output = parse(r#"STATE a _ "A" : INITIAL; TRANSITION t a -> ghost;"#);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].reason.contains("target state 'ghost' not found"));
        assert_eq!(output.model.transition_count(), 0);
        assert!(output.model.trigger("__t__").is_none());
        assert_eq!(output.model.triggers().count(), 0);
    }

    #[test]
    fn test_transition_with_trigger_and_guard() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL; STATE b _ "B" : SIMPLE; TRIGGER go "Go";
               TRANSITION t a -> b go "door closed";"#,
        );
        let transition = output.model.transition("t").unwrap();
        assert_eq!(transition.trigger, "go");
        assert_eq!(transition.guard, "door closed");
    }

    #[test]
    fn test_transition_with_unknown_reference_warns() {
        let output = parse(r#"STATE a _ "A" : INITIAL; TRIGGER go "Go"; TRANSITION t a -> b go;"#);
        assert_eq!(output.model.transition_count(), 0);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].reason.contains("target state 'b' not found"));
    }

    #[test]
    fn test_nested_states() {
        let output = parse(
            r#"STATE on _ "On" : COMPOUND;
               STATE idle on "Idle" : SIMPLE;
               STATE busy on "Busy" : SIMPLE;"#,
        );
        assert!(output.warnings.is_empty());
        assert_eq!(output.model.state("on").unwrap().children(), ["idle", "busy"]);
        assert_eq!(output.model.state("busy").unwrap().parent(), Some("on"));
    }

    #[test]
    fn test_child_before_parent_warns() {
        let output = parse(r#"STATE idle on "Idle" : SIMPLE; STATE on _ "On" : COMPOUND;"#);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].reason.contains("parent 'on' is not defined yet"));
        assert!(output.model.state("idle").unwrap().parent().is_none());
    }

    #[test]
    fn test_action_binding_with_on_clause() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL;
               STATE b _ "B" : SIMPLE;
               TRIGGER go "Go";
               TRANSITION t a -> b go;
               ACTION leave "Leave A" : EXIT_ACTION ON a;
               ACTION log "Log" : TRANSITION_ACTION ON t;
               ACTION enter "Enter B" : ENTRY_ACTION on b;
               ACTION hum "Hum" : DO_ACTION ON b;
               ACTION spare "Spare" : ENTRY_ACTION;"#,
        );
        assert!(output.warnings.is_empty(), "{:?}", output.warnings);

        let model = output.model;
        assert_eq!(model.state("a").unwrap().exit_actions(), ["leave"]);
        assert_eq!(model.state("b").unwrap().entry_actions(), ["enter"]);
        assert_eq!(model.state("b").unwrap().do_actions(), ["hum"]);
        assert_eq!(model.transition("t").unwrap().actions(), ["log"]);
        assert_eq!(model.action("spare").unwrap().kind, ActionKind::EntryAction);
    }

    #[test]
    fn test_action_binding_to_unknown_owner() {
        let output = parse(
            r#"STATE a _ "A" : INITIAL; ACTION log "Log" : TRANSITION_ACTION ON a;"#,
        );
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0]
            .reason
            .contains("transition 'a' is not defined"));
        assert!(output.model.action("log").is_some());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let output = parse(r#"TRIGGER go "Go" extra;"#);
        assert!(output.model.trigger("go").is_none());
        assert!(output.warnings[0].reason.contains("unexpected trailing 'extra'"));
    }

    #[test]
    fn test_unterminated_string() {
        let output = parse(r#"TRIGGER go "Go;"#);
        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].reason.contains("unterminated string"));
    }

    #[test]
    fn test_statement_splitting() {
        let parts = statements("  A ;; B # c ; d\n ; C");
        assert_eq!(parts, vec!["A", "B", "C"]);
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(source in "\\PC{0,200}") {
            let output = parse(&source);
            for t in output.model.transitions() {
                prop_assert!(output.model.has_state(&t.source));
                prop_assert!(output.model.has_state(&t.target));
                prop_assert!(output.model.trigger(&t.trigger).is_some());
            }
        }

        #[test]
        fn prop_strip_comments_removes_unescaped_hashes(source in "[a-z #;\n\"]{0,120}") {
            let stripped = strip_comments(&source);
            prop_assert!(!stripped.contains('#'));
            prop_assert_eq!(
                stripped.matches('\n').count(),
                source.matches('\n').count()
            );
        }
    }
}
