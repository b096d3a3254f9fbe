//! Explanation prompt

use std::fmt::Write;

use super::ExplainError;
use crate::models::{Alternative, Question};

const INSTRUCTIONS: &str = "\
INSTRUÇÕES:
- Fale diretamente com o estudante usando \"você\" e \"sua resposta\"
- Explique por que a resposta escolhida está errada
- Mostre por que a resposta correta é a melhor opção
- Foque no conceito principal que o estudante precisa entender
- Use linguagem acessível para estudantes do ensino médio
- Seja direto e didático, como um professor conversando
- Se houver imagens mencionadas, considere que elas contêm informações importantes para a resolução
- Use formatação simples: **texto importante** para destacar conceitos chave";

/// Build the tutoring prompt for a wrong answer
pub fn build_prompt(question: &Question, user_answer: &str) -> Result<String, ExplainError> {
    let letter = parse_user_answer(user_answer)?;
    let correct = question.correct().ok_or(ExplainError::MissingCorrectAlternative)?;
    let chosen = question
        .alternative(letter)
        .ok_or_else(|| ExplainError::UnknownAlternative(user_answer.trim().to_string()))?;

    let mut prompt = String::from(
        "Você é um professor especialista em questões do ENEM. Explique de forma clara e \
         direta o erro do estudante, falando diretamente com ele.\n\n",
    );

    let _ = write!(prompt, "ENUNCIADO:\n{}\n\n", question.title);
    if !question.context.trim().is_empty() {
        let _ = write!(prompt, "CONTEXTO:\n{}\n", question.context);
    }
    if !question.files.is_empty() {
        prompt.push_str("\nENUNCIADO IMAGENS:\n");
        let images: Vec<String> = question.files.iter().map(|f| format!("- {}", f)).collect();
        prompt.push_str(&images.join("\n"));
    }
    prompt.push_str("\n\n");

    push_alternative(&mut prompt, "ALTERNATIVA CORRETA", "ALTERNATIVA CORRETA", correct);
    push_alternative(
        &mut prompt,
        "ALTERNATIVA ESCOLHIDA (INCORRETA)",
        "ALTERNATIVA ESCOLHIDA",
        chosen,
    );

    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\nEXPLICAÇÃO:");
    Ok(prompt)
}

fn push_alternative(prompt: &mut String, heading: &str, image_label: &str, alt: &Alternative) {
    let _ = write!(
        prompt,
        "{}: {}) {}",
        heading,
        alt.letter,
        alt.text.as_deref().unwrap_or("")
    );
    if let Some(file) = &alt.file {
        let _ = write!(prompt, "\n{} IMAGEM: {}", image_label, file);
    }
    prompt.push_str("\n\n");
}

fn parse_user_answer(raw: &str) -> Result<char, ExplainError> {
    let mut chars = raw.trim().chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(ExplainError::MissingInput),
        (Some(c), None) => Ok(c.to_ascii_uppercase()),
        _ => Err(ExplainError::UnknownAlternative(raw.trim().to_string())),
    }
}
