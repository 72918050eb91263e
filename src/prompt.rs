use crate::models::ScoredChunk;

/// Sentence the model must return when the context does not hold the answer.
pub const REFUSAL: &str = "Não tenho informações necessárias para responder sua pergunta.";

pub const PROMPT_TEMPLATE: &str = r#"
CONTEXTO:
{context}

REGRAS:
- Responda somente com base no CONTEXTO.
- Se a informação não estiver explicitamente no CONTEXTO, responda:
  "{refusal}"
- Nunca invente ou use conhecimento externo.
- Nunca produza opiniões ou interpretações além do que está escrito.

EXEMPLOS DE PERGUNTAS FORA DO CONTEXTO:
Pergunta: "Qual é a capital da França?"
Resposta: "{refusal}"

Pergunta: "Quantos clientes temos em 2024?"
Resposta: "{refusal}"

Pergunta: "Você acha isso bom ou ruim?"
Resposta: "{refusal}"

PERGUNTA DO USUÁRIO:
{question}

RESPONDA A "PERGUNTA DO USUÁRIO"
"#;

/// Retrieved chunk texts joined by blank lines; empty when nothing matched.
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Fills the template in a single left-to-right pass, so placeholder text
/// inside the context or question is never substituted again.
pub fn build_prompt(context: &str, question: &str) -> String {
    let placeholders = [
        ("{context}", context),
        ("{question}", question),
        ("{refusal}", REFUSAL),
    ];
    let mut prompt = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        rest = &rest[open..];
        match placeholders.iter().find(|(key, _)| rest.starts_with(key)) {
            Some((key, value)) => {
                prompt.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                prompt.push('{');
                rest = &rest[1..];
            }
        }
    }
    prompt.push_str(rest);
    prompt
}

/// Text between the CONTEXTO header and the rules, trimmed.
pub fn context_section(prompt: &str) -> Option<&str> {
    let start = prompt.find("CONTEXTO:\n")? + "CONTEXTO:\n".len();
    let end = prompt[start..].find("\nREGRAS:")? + start;
    Some(prompt[start..end].trim())
}
