//! Extraction of action requests from free-form model replies.

use regex::Regex;

/// An action the model asked for, parsed from one action line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActionRequest {
    /// The action (tool) name.
    pub name: String,
    /// Everything after the name up to the end of the line, verbatim.
    pub argument: String,
}

impl ActionRequest {
    /// Creates an action request.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, argument: S2) -> Self {
        Self {
            name: name.into(),
            argument: argument.into(),
        }
    }
}

/// How many actions of one reply are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActionPolicy {
    /// Only the first action line of a reply is executed.
    #[default]
    SingleAction,
    /// Every action line is executed in order, and the results are
    /// combined into one observation.
    AllActionsPerTurn,
}

/// Parses lines of the shape `<marker>: <name>: <argument>`.
///
/// Any other line is narrative text (thoughts, pauses, ...) and is ignored.
#[derive(Clone, Debug)]
pub struct ActionParser {
    pattern: Regex,
    policy: ActionPolicy,
}

impl ActionParser {
    /// Creates a parser for the given action marker, e.g. `Action`.
    pub fn new(marker: &str, policy: ActionPolicy) -> Self {
        let pattern = format!(r"^\s*{}:\s*(\w+):[ \t]?(.*)$", regex::escape(marker));
        Self {
            pattern: Regex::new(&pattern)
                .expect("valid action pattern"),
            policy,
        }
    }

    /// Returns the policy of this parser.
    #[inline]
    pub fn policy(&self) -> ActionPolicy {
        self.policy
    }

    /// Extracts action requests in the order they appear in `text`.
    ///
    /// With [`ActionPolicy::SingleAction`] at most one request is returned.
    pub fn parse(&self, text: &str) -> Vec<ActionRequest> {
        let requests = text.lines().filter_map(|line| {
            let captures = self.pattern.captures(line)?;
            Some(ActionRequest::new(&captures[1], &captures[2]))
        });
        match self.policy {
            ActionPolicy::SingleAction => requests.take(1).collect(),
            ActionPolicy::AllActionsPerTurn => requests.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_action_lines() {
        let parser = ActionParser::new("Action", ActionPolicy::AllActionsPerTurn);
        assert!(parser.parse("").is_empty());
        assert!(parser.parse("Thought: I already know.\nParis").is_empty());
        // The name must be followed by its own colon.
        assert!(parser.parse("Action: wikipedia Paris").is_empty());
    }

    #[test]
    fn test_single_action() {
        let parser = ActionParser::new("Action", ActionPolicy::SingleAction);
        let requests = parser.parse("Thought: x\nAction: wikipedia: Paris\n");
        assert_eq!(requests, [ActionRequest::new("wikipedia", "Paris")]);

        let requests = parser.parse(
            "Action: wikipedia: Paris\nAction: wikipedia: Berlim\nPAUSE",
        );
        assert_eq!(requests, [ActionRequest::new("wikipedia", "Paris")]);
    }

    #[test]
    fn test_all_actions_in_order() {
        let parser = ActionParser::new("Action", ActionPolicy::AllActionsPerTurn);
        let requests = parser.parse(
            "Thought: two lookups\nAction: wikipedia: França\nAction: wikipedia: Alemanha\nPAUSE",
        );
        assert_eq!(
            requests,
            [
                ActionRequest::new("wikipedia", "França"),
                ActionRequest::new("wikipedia", "Alemanha"),
            ]
        );
    }

    #[test]
    fn test_argument_is_verbatim() {
        let parser = ActionParser::new("Action", ActionPolicy::SingleAction);
        let requests = parser.parse("Action: chat: Que horas são: manhã ou tarde?");
        assert_eq!(requests[0].argument, "Que horas são: manhã ou tarde?");

        let requests = parser.parse("  Action: calculate: 4 * 7 / 3\r\n");
        assert_eq!(requests[0], ActionRequest::new("calculate", "4 * 7 / 3"));
    }

    #[test]
    fn test_localized_marker() {
        let parser = ActionParser::new("Ação", ActionPolicy::SingleAction);
        let requests = parser.parse("Pensamento: pesquisar\nAção: wikipedia: França\nPAUSA");
        assert_eq!(requests, [ActionRequest::new("wikipedia", "França")]);
        assert!(parser.parse("Action: wikipedia: França").is_empty());
    }
}
