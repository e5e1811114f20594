//! The textual protocol spoken with the model.
//!
//! Everything here is pure formatting: the loop only depends on the
//! markers, never on the exact wording of the instructions.

use std::fmt::Write as _;

use crate::parser::ActionRequest;
use crate::tool::{Error as ToolError, ToolDescriptor};

/// The language the instructions are written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    /// English instructions.
    #[default]
    English,
    /// Brazilian Portuguese instructions.
    Portuguese,
}

/// How the final-answer marker is looked for in a reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FinalAnswerMatch {
    /// A line must start with the marker (leading whitespace ignored).
    #[default]
    LinePrefix,
    /// The marker may appear anywhere.
    Substring,
}

/// Keywords of the thought / action / observation protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProtocolMarkers {
    /// Language of the surrounding instructions.
    pub language: Language,
    /// Prefix of reasoning lines.
    pub thought: String,
    /// Prefix of action lines, e.g. `Action` in `Action: wikipedia: Paris`.
    pub action: String,
    /// Keyword the model writes after an action to yield the turn.
    pub pause: String,
    /// Prefix of observation messages fed back to the model.
    pub observation: String,
    /// Sentinel announcing the final answer.
    pub final_answer: String,
    /// How [`ProtocolMarkers::final_answer`] is matched.
    pub final_answer_match: FinalAnswerMatch,
}

impl ProtocolMarkers {
    /// Markers with English keywords.
    pub fn english() -> Self {
        Self {
            language: Language::English,
            thought: "Thought".to_owned(),
            action: "Action".to_owned(),
            pause: "PAUSE".to_owned(),
            observation: "Observation".to_owned(),
            final_answer: "Final Answer:".to_owned(),
            final_answer_match: FinalAnswerMatch::default(),
        }
    }

    /// Markers with Portuguese keywords.
    pub fn portuguese() -> Self {
        Self {
            language: Language::Portuguese,
            thought: "Pensamento".to_owned(),
            action: "Ação".to_owned(),
            pause: "PAUSA".to_owned(),
            observation: "Observação".to_owned(),
            final_answer: "Resposta:".to_owned(),
            final_answer_match: FinalAnswerMatch::default(),
        }
    }

    /// Returns the markers for `language`.
    #[inline]
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self::english(),
            Language::Portuguese => Self::portuguese(),
        }
    }

    /// Looks for the final-answer marker and returns the text after it,
    /// following lines included.
    pub fn find_final_answer(&self, reply: &str) -> Option<String> {
        let marker = self.final_answer.as_str();
        if marker.is_empty() {
            return None;
        }
        let start = match self.final_answer_match {
            FinalAnswerMatch::Substring => reply.find(marker)? + marker.len(),
            FinalAnswerMatch::LinePrefix => {
                let mut offset = 0;
                let mut start = None;
                for line in reply.split_inclusive('\n') {
                    let trimmed = line.trim_start();
                    if trimmed.starts_with(marker) {
                        start = Some(offset + (line.len() - trimmed.len()) + marker.len());
                        break;
                    }
                    offset += line.len();
                }
                start?
            }
        };
        Some(reply[start..].trim().to_owned())
    }
}

impl Default for ProtocolMarkers {
    #[inline]
    fn default() -> Self {
        Self::english()
    }
}

/// Renders the system instructions: the loop protocol, the available
/// actions and a worked example.
pub fn render_instructions(
    markers: &ProtocolMarkers,
    tools: &[ToolDescriptor],
) -> String {
    let ProtocolMarkers {
        thought,
        action,
        pause,
        observation,
        final_answer,
        ..
    } = markers;

    let mut actions = String::new();
    for tool in tools {
        let _ = writeln!(actions, "{}:\n{}\n", tool.name, tool.description.trim());
    }

    let example_tool = tools
        .iter()
        .find(|t| t.name == "wikipedia")
        .or_else(|| tools.first())
        .map(|t| t.name.as_str())
        .unwrap_or("wikipedia");

    match markers.language {
        Language::English => format!(
            "\
You run in a loop of {thought}, {action}, {pause} and {observation}.
At the end of the loop you output the answer.
Use {thought} to describe what you think the next actions should be.
Use {action} to run one of the available actions, then write {pause}.
{observation} will be the result of running that action.

Available actions:
{actions}
Example session:
Question: What is the capital of France?
{thought}: I should look up France.
{action}: {example_tool}: France
{pause}

You will be called again with this:
{observation}: France is a country. Its capital is Paris.

You then output:
{final_answer} Paris
"
        ),
        Language::Portuguese => format!(
            "\
Você fala português e funciona em um loop de {thought}, {action}, {pause} e {observation}.
No final do loop você exibe a resposta.
Execute somente um passo de cada vez.
Use {thought} para descrever o que você acha que devem ser as ações a serem tomadas.
Use {action} para executar uma das ações disponíveis e então você escreve {pause}.
{observation} será o resultado de executar uma {action}.

Ações disponíveis:
{actions}
Exemplo de uma sessão:
Pergunta: Qual a capital da França?
{thought}: Eu devo pesquisar conteúdo sobre a França.
{action}: {example_tool}: França
{pause}

Você será chamado novamente com isto:
{observation}: França é um país. Sua capital é Paris.

Você então irá retornar:
{final_answer} Paris
"
        ),
    }
}

/// Combines the results of one turn into a single observation message.
///
/// A lone result is fed back as is; several results are labelled with the
/// action that produced them, in execution order.
pub fn format_observation(
    markers: &ProtocolMarkers,
    results: &[(ActionRequest, String)],
) -> String {
    let observation = &markers.observation;
    match results {
        [(_, result)] => format!("{observation}: {result}"),
        results => {
            let mut text = String::new();
            for (request, result) in results {
                if !text.is_empty() {
                    text.push('\n');
                }
                let _ = write!(
                    text,
                    "{observation} ({}: {}): {result}",
                    request.name, request.argument
                );
            }
            text
        }
    }
}

/// Describes a failed action so the model can correct itself.
pub fn format_failure(
    markers: &ProtocolMarkers,
    request: &ActionRequest,
    error: &ToolError,
) -> String {
    match markers.language {
        Language::English => {
            format!("action `{}` failed: {}", request.name, error.reason())
        }
        Language::Portuguese => {
            format!("a ação `{}` falhou: {}", request.name, error.reason())
        }
    }
}

/// Renders the prompt of the extraction call, which asks whether the
/// observations gathered so far already answer the question.
pub fn render_extraction_prompt(
    markers: &ProtocolMarkers,
    observation: &str,
) -> String {
    let final_answer = &markers.final_answer;
    match markers.language {
        Language::English => format!(
            "{observation}\n\n\
Decide whether the observations so far are enough to answer the question. \
If they are, reply with a line starting with `{final_answer}` followed by the answer. \
Otherwise, summarize the relevant facts and what is still missing."
        ),
        Language::Portuguese => format!(
            "{observation}\n\n\
Decida se as observações até agora são suficientes para responder a pergunta. \
Se forem, responda com uma linha começando com `{final_answer}` seguida da resposta. \
Caso contrário, resuma os fatos relevantes e o que ainda falta."
        ),
    }
}
